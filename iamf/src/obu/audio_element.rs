//! Audio element records (§3.4): channel-based, scene-based (Ambisonics), and
//! object-based audio element descriptors, plus the parameter definitions an
//! element attaches (Demixing, ReconGain).

use crate::utils::bitstream_io::{BitstreamIoWriter, BsIoSliceReader};
use crate::utils::errors::{AudioElementError, ObuError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoudspeakerLayout {
    Mono,
    Stereo,
    Surround5_1,
    Surround5_1_2,
    Surround5_1_4,
    Surround7_1,
    Surround7_1_2,
    Surround7_1_4,
    Surround3_1_2,
    Binaural,
    Expanded(ExpandedLoudspeakerLayout),
    Reserved(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandedLoudspeakerLayout {
    /// LFE subset of 7.1.4.
    Lfe,
    /// Stereo surround subset (Ls/Rs) of 5.1.4.
    StereoS,
    /// Side surround subset (Lss/Rss) of 7.1.4.
    StereoSS,
    /// Rear surround subset (Lrs/Rrs) of 7.1.4.
    StereoRS,
    /// Top front subset (Ltf/Rtf) of 7.1.4.
    StereoTF,
    /// Top back subset (Ltb/Rtb) of 7.1.4.
    StereoTB,
    /// Top four channels (Ltf/Rtf/Ltb/Rtb) of 7.1.4.
    Top4Ch,
    /// Front three channels (L/C/R) of 7.1.4.
    Front3_0,
    /// Subset of Sound System H (ITU-2051-3).
    Surround9_1_6,
    /// Front stereo subset (FL/FR) of 9.1.6.
    StereoF,
    /// Side surround subset (SiL/SiR) of 9.1.6.
    StereoSi,
    /// Top surround subset (TpSiL/TpSiR) of 9.1.6.
    StereoTpSi,
    /// Top six channels (TpFL/TpFR/TpSiL/TpSiR/TpBL/TpBR) of 9.1.6.
    Top6Ch,
    Reserved(u8),
}

impl LoudspeakerLayout {
    const EXPANDED_CODE: u8 = 0b1111;

    fn code(self) -> u8 {
        match self {
            LoudspeakerLayout::Mono => 0,
            LoudspeakerLayout::Stereo => 1,
            LoudspeakerLayout::Surround5_1 => 2,
            LoudspeakerLayout::Surround5_1_2 => 3,
            LoudspeakerLayout::Surround5_1_4 => 4,
            LoudspeakerLayout::Surround7_1 => 5,
            LoudspeakerLayout::Surround7_1_2 => 6,
            LoudspeakerLayout::Surround7_1_4 => 7,
            LoudspeakerLayout::Surround3_1_2 => 8,
            LoudspeakerLayout::Binaural => 9,
            LoudspeakerLayout::Expanded(_) => Self::EXPANDED_CODE,
            LoudspeakerLayout::Reserved(code) => code,
        }
    }

    fn from_code(code: u8) -> LoudspeakerLayout {
        match code {
            0 => LoudspeakerLayout::Mono,
            1 => LoudspeakerLayout::Stereo,
            2 => LoudspeakerLayout::Surround5_1,
            3 => LoudspeakerLayout::Surround5_1_2,
            4 => LoudspeakerLayout::Surround5_1_4,
            5 => LoudspeakerLayout::Surround7_1,
            6 => LoudspeakerLayout::Surround7_1_2,
            7 => LoudspeakerLayout::Surround7_1_4,
            8 => LoudspeakerLayout::Surround3_1_2,
            9 => LoudspeakerLayout::Binaural,
            other => LoudspeakerLayout::Reserved(other),
        }
    }

    pub fn is_expanded(self) -> bool {
        self.code() == Self::EXPANDED_CODE
    }
}

impl ExpandedLoudspeakerLayout {
    fn code(self) -> u8 {
        match self {
            ExpandedLoudspeakerLayout::Lfe => 0,
            ExpandedLoudspeakerLayout::StereoS => 1,
            ExpandedLoudspeakerLayout::StereoSS => 2,
            ExpandedLoudspeakerLayout::StereoRS => 3,
            ExpandedLoudspeakerLayout::StereoTF => 4,
            ExpandedLoudspeakerLayout::StereoTB => 5,
            ExpandedLoudspeakerLayout::Top4Ch => 6,
            ExpandedLoudspeakerLayout::Front3_0 => 7,
            ExpandedLoudspeakerLayout::Surround9_1_6 => 8,
            ExpandedLoudspeakerLayout::StereoF => 9,
            ExpandedLoudspeakerLayout::StereoSi => 10,
            ExpandedLoudspeakerLayout::StereoTpSi => 11,
            ExpandedLoudspeakerLayout::Top6Ch => 12,
            ExpandedLoudspeakerLayout::Reserved(code) => code,
        }
    }

    fn from_code(code: u8) -> ExpandedLoudspeakerLayout {
        match code {
            0 => ExpandedLoudspeakerLayout::Lfe,
            1 => ExpandedLoudspeakerLayout::StereoS,
            2 => ExpandedLoudspeakerLayout::StereoSS,
            3 => ExpandedLoudspeakerLayout::StereoRS,
            4 => ExpandedLoudspeakerLayout::StereoTF,
            5 => ExpandedLoudspeakerLayout::StereoTB,
            6 => ExpandedLoudspeakerLayout::Top4Ch,
            7 => ExpandedLoudspeakerLayout::Front3_0,
            8 => ExpandedLoudspeakerLayout::Surround9_1_6,
            9 => ExpandedLoudspeakerLayout::StereoF,
            10 => ExpandedLoudspeakerLayout::StereoSi,
            11 => ExpandedLoudspeakerLayout::StereoTpSi,
            12 => ExpandedLoudspeakerLayout::Top6Ch,
            other => ExpandedLoudspeakerLayout::Reserved(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAudioLayerConfig {
    pub loudspeaker_layout: LoudspeakerLayout,
    pub output_gain_is_present: bool,
    pub recon_gain_is_present: bool,
    pub substream_count: u32,
    pub coupled_substream_count: u32,
    pub output_gain_flag: u8,
    pub output_gain: i16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalableChannelLayoutConfig {
    pub layers: Vec<ChannelAudioLayerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmbisonicsConfig {
    Mono {
        output_channel_count: u32,
        substream_count: u32,
        /// Per-output-channel substream index, or the sentinel `255` for an
        /// inactive mixed-order channel.
        channel_mapping: Vec<u8>,
    },
    Projection {
        output_channel_count: u32,
        substream_count: u32,
        coupled_substream_count: u32,
        demixing_matrix: Vec<i16>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioElementConfig {
    Channel(ScalableChannelLayoutConfig),
    Scene(AmbisonicsConfig),
    Object { num_objects: u32, extension: Vec<u8> },
    Extension(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioElementType {
    ChannelBased,
    SceneBased,
    ObjectBased,
    Reserved(u8),
}

impl AudioElementType {
    fn code(self) -> u8 {
        match self {
            AudioElementType::ChannelBased => 0,
            AudioElementType::SceneBased => 1,
            AudioElementType::ObjectBased => 2,
            AudioElementType::Reserved(c) => c,
        }
    }

    fn from_code(code: u8) -> AudioElementType {
        match code {
            0 => AudioElementType::ChannelBased,
            1 => AudioElementType::SceneBased,
            2 => AudioElementType::ObjectBased,
            other => AudioElementType::Reserved(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DMixPMode {
    Mode1,
    Mode2,
    Mode3,
    Reserved1,
    Mode1N,
    Mode2N,
    Mode3N,
    Reserved2,
}

impl DMixPMode {
    pub fn code(self) -> u8 {
        match self {
            DMixPMode::Mode1 => 0,
            DMixPMode::Mode2 => 1,
            DMixPMode::Mode3 => 2,
            DMixPMode::Reserved1 => 3,
            DMixPMode::Mode1N => 4,
            DMixPMode::Mode2N => 5,
            DMixPMode::Mode3N => 6,
            DMixPMode::Reserved2 => 7,
        }
    }

    pub fn from_code(code: u8) -> DMixPMode {
        match code & 0x7 {
            0 => DMixPMode::Mode1,
            1 => DMixPMode::Mode2,
            2 => DMixPMode::Mode3,
            3 => DMixPMode::Reserved1,
            4 => DMixPMode::Mode1N,
            5 => DMixPMode::Mode2N,
            6 => DMixPMode::Mode3N,
            _ => DMixPMode::Reserved2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultDemixingInfo {
    pub default_dmixp_mode: DMixPMode,
    pub default_w: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterDefinitionType {
    MixGain,
    Demixing,
    ReconGain,
    Reserved(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterDefinition {
    Demixing {
        parameter_id: u64,
        parameter_rate: u64,
        param_definition_mode: bool,
        duration: u64,
        default_demixing_info: DefaultDemixingInfo,
    },
    ReconGain {
        parameter_id: u64,
        parameter_rate: u64,
        param_definition_mode: bool,
        duration: u64,
    },
    Extension {
        parameter_id: u64,
        parameter_definition_type: u8,
        bytes: Vec<u8>,
    },
}

impl ParameterDefinition {
    pub fn parameter_id(&self) -> u64 {
        match self {
            ParameterDefinition::Demixing { parameter_id, .. } => *parameter_id,
            ParameterDefinition::ReconGain { parameter_id, .. } => *parameter_id,
            ParameterDefinition::Extension { parameter_id, .. } => *parameter_id,
        }
    }

    pub fn kind(&self) -> ParameterDefinitionType {
        match self {
            ParameterDefinition::Demixing { .. } => ParameterDefinitionType::Demixing,
            ParameterDefinition::ReconGain { .. } => ParameterDefinitionType::ReconGain,
            ParameterDefinition::Extension {
                parameter_definition_type,
                ..
            } => ParameterDefinitionType::Reserved(*parameter_definition_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioElement {
    pub audio_element_id: u64,
    pub audio_element_type: AudioElementType,
    pub codec_config_id: u64,
    pub substream_ids: Vec<u64>,
    pub parameter_definitions: Vec<ParameterDefinition>,
    pub config: AudioElementConfig,
}

impl AudioElement {
    pub fn write_payload(&self) -> Result<Vec<u8>, ObuError> {
        let mut writer = BitstreamIoWriter::new();
        writer.put_uleb128(self.audio_element_id)?;
        writer
            .put_n(3, self.audio_element_type.code())
            .map_err(|_| ObuError::UnexpectedEof("audio_element_type"))?;
        writer
            .put_n(5, 0u8)
            .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
        writer.put_uleb128(self.codec_config_id)?;

        writer.put_uleb128(self.substream_ids.len() as u64)?;
        for id in &self.substream_ids {
            writer.put_uleb128(*id)?;
        }

        writer.put_uleb128(self.parameter_definitions.len() as u64)?;
        for param in &self.parameter_definitions {
            write_parameter_definition(&mut writer, param)?;
        }

        write_config(&mut writer, &self.config)?;

        writer.into_bytes().map_err(|_| ObuError::UnexpectedEof("audio_element"))
    }

    pub fn parse_payload(payload: &[u8]) -> Result<Self, ObuError> {
        let mut reader = BsIoSliceReader::from_slice(payload);
        let audio_element_id = reader.get_uleb128()?;
        let type_code: u8 = reader
            .get_n(3)
            .map_err(|_| ObuError::UnexpectedEof("audio_element_type"))?;
        let _reserved: u8 = reader
            .get_n(5)
            .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
        let audio_element_type = AudioElementType::from_code(type_code);
        let codec_config_id = reader.get_uleb128()?;

        let substream_count = reader.get_uleb128()?;
        let mut substream_ids = Vec::with_capacity(substream_count as usize);
        for _ in 0..substream_count {
            substream_ids.push(reader.get_uleb128()?);
        }

        let param_count = reader.get_uleb128()?;
        let mut parameter_definitions = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            parameter_definitions.push(read_parameter_definition(&mut reader)?);
        }

        let config = read_config(&mut reader, audio_element_type)?;

        Ok(AudioElement {
            audio_element_id,
            audio_element_type,
            codec_config_id,
            substream_ids,
            parameter_definitions,
            config,
        })
    }
}

const PARAM_TAG_DEMIXING: u8 = 1;
const PARAM_TAG_RECON_GAIN: u8 = 2;

fn write_parameter_definition(
    writer: &mut BitstreamIoWriter,
    param: &ParameterDefinition,
) -> Result<(), ObuError> {
    writer.put_uleb128(param.parameter_id())?;
    match param {
        ParameterDefinition::Demixing {
            parameter_rate,
            param_definition_mode,
            duration,
            default_demixing_info,
            ..
        } => {
            writer
                .put_n(8, PARAM_TAG_DEMIXING)
                .map_err(|_| ObuError::UnexpectedEof("param_definition_type"))?;
            writer.put_uleb128(*parameter_rate)?;
            writer
                .put_bit(*param_definition_mode)
                .map_err(|_| ObuError::UnexpectedEof("param_definition_mode"))?;
            if !*param_definition_mode {
                writer.put_uleb128(*duration)?;
            }
            writer
                .put_n(3, default_demixing_info.default_dmixp_mode.code())
                .map_err(|_| ObuError::UnexpectedEof("default_dmixp_mode"))?;
            writer
                .put_n(5, 0u8)
                .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
            writer
                .put_n(4, default_demixing_info.default_w)
                .map_err(|_| ObuError::UnexpectedEof("default_w"))?;
            writer
                .put_n(4, 0u8)
                .map_err(|_| ObuError::UnexpectedEof("reserved_default"))?;
        }
        ParameterDefinition::ReconGain {
            parameter_rate,
            param_definition_mode,
            duration,
            ..
        } => {
            writer
                .put_n(8, PARAM_TAG_RECON_GAIN)
                .map_err(|_| ObuError::UnexpectedEof("param_definition_type"))?;
            writer.put_uleb128(*parameter_rate)?;
            writer
                .put_bit(*param_definition_mode)
                .map_err(|_| ObuError::UnexpectedEof("param_definition_mode"))?;
            if !*param_definition_mode {
                writer.put_uleb128(*duration)?;
            }
        }
        ParameterDefinition::Extension {
            parameter_definition_type,
            bytes,
            ..
        } => {
            writer
                .put_n(8, *parameter_definition_type)
                .map_err(|_| ObuError::UnexpectedEof("param_definition_type"))?;
            writer.put_uleb128(bytes.len() as u64)?;
            writer
                .put_bytes(bytes)
                .map_err(|_| ObuError::UnexpectedEof("extension bytes"))?;
        }
    }
    Ok(())
}

fn read_parameter_definition(reader: &mut BsIoSliceReader) -> Result<ParameterDefinition, ObuError> {
    let parameter_id = reader.get_uleb128()?;
    let tag: u8 = reader
        .get_n(8)
        .map_err(|_| ObuError::UnexpectedEof("param_definition_type"))?;
    Ok(match tag {
        PARAM_TAG_DEMIXING => {
            let parameter_rate = reader.get_uleb128()?;
            let param_definition_mode: bool =
                reader.get().map_err(|_| ObuError::UnexpectedEof("param_definition_mode"))?;
            let duration = if !param_definition_mode {
                reader.get_uleb128()?
            } else {
                0
            };
            let dmixp_code: u8 = reader
                .get_n(3)
                .map_err(|_| ObuError::UnexpectedEof("default_dmixp_mode"))?;
            let _reserved: u8 = reader.get_n(5).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
            let default_w: u8 = reader
                .get_n(4)
                .map_err(|_| ObuError::UnexpectedEof("default_w"))?;
            let _reserved_default: u8 = reader
                .get_n(4)
                .map_err(|_| ObuError::UnexpectedEof("reserved_default"))?;
            ParameterDefinition::Demixing {
                parameter_id,
                parameter_rate,
                param_definition_mode,
                duration,
                default_demixing_info: DefaultDemixingInfo {
                    default_dmixp_mode: DMixPMode::from_code(dmixp_code),
                    default_w,
                },
            }
        }
        PARAM_TAG_RECON_GAIN => {
            let parameter_rate = reader.get_uleb128()?;
            let param_definition_mode: bool =
                reader.get().map_err(|_| ObuError::UnexpectedEof("param_definition_mode"))?;
            let duration = if !param_definition_mode {
                reader.get_uleb128()?
            } else {
                0
            };
            ParameterDefinition::ReconGain {
                parameter_id,
                parameter_rate,
                param_definition_mode,
                duration,
            }
        }
        other => {
            let len = reader.get_uleb128()?;
            let mut bytes = vec![0u8; len as usize];
            reader
                .get_bytes(&mut bytes)
                .map_err(|_| ObuError::UnexpectedEof("extension bytes"))?;
            ParameterDefinition::Extension {
                parameter_id,
                parameter_definition_type: other,
                bytes,
            }
        }
    })
}

fn write_config(writer: &mut BitstreamIoWriter, config: &AudioElementConfig) -> Result<(), ObuError> {
    match config {
        AudioElementConfig::Channel(scalable) => {
            writer
                .put_n(8, scalable.layers.len() as u8)
                .map_err(|_| ObuError::UnexpectedEof("num_layers"))?;
            for layer in &scalable.layers {
                writer
                    .put_n(4, layer.loudspeaker_layout.code())
                    .map_err(|_| ObuError::UnexpectedEof("loudspeaker_layout"))?;
                writer
                    .put_bit(layer.output_gain_is_present)
                    .map_err(|_| ObuError::UnexpectedEof("output_gain_is_present"))?;
                writer
                    .put_bit(layer.recon_gain_is_present)
                    .map_err(|_| ObuError::UnexpectedEof("recon_gain_is_present"))?;
                writer
                    .put_n(2, 0u8)
                    .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                writer
                    .put_n(8, layer.substream_count as u8)
                    .map_err(|_| ObuError::UnexpectedEof("substream_count"))?;
                writer
                    .put_n(8, layer.coupled_substream_count as u8)
                    .map_err(|_| ObuError::UnexpectedEof("coupled_substream_count"))?;
                if layer.loudspeaker_layout.is_expanded() {
                    let expanded_code = match layer.loudspeaker_layout {
                        LoudspeakerLayout::Expanded(e) => e.code(),
                        _ => unreachable!(),
                    };
                    writer
                        .put_n(8, expanded_code)
                        .map_err(|_| ObuError::UnexpectedEof("expanded_loudspeaker_layout"))?;
                }
                if layer.output_gain_is_present {
                    writer
                        .put_n(6, layer.output_gain_flag)
                        .map_err(|_| ObuError::UnexpectedEof("output_gain_flag"))?;
                    writer
                        .put_n(2, 0u8)
                        .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                    writer
                        .put_s(16, layer.output_gain as i32)
                        .map_err(|_| ObuError::UnexpectedEof("output_gain"))?;
                }
            }
        }
        AudioElementConfig::Scene(AmbisonicsConfig::Mono {
            output_channel_count,
            substream_count,
            channel_mapping,
        }) => {
            writer
                .put_bit(false)
                .map_err(|_| ObuError::UnexpectedEof("ambisonics_mode"))?;
            writer
                .put_n(8, *output_channel_count as u8)
                .map_err(|_| ObuError::UnexpectedEof("output_channel_count"))?;
            writer
                .put_n(8, *substream_count as u8)
                .map_err(|_| ObuError::UnexpectedEof("substream_count"))?;
            for entry in channel_mapping {
                writer
                    .put_n(8, *entry)
                    .map_err(|_| ObuError::UnexpectedEof("channel_mapping entry"))?;
            }
        }
        AudioElementConfig::Scene(AmbisonicsConfig::Projection {
            output_channel_count,
            substream_count,
            coupled_substream_count,
            demixing_matrix,
        }) => {
            writer
                .put_bit(true)
                .map_err(|_| ObuError::UnexpectedEof("ambisonics_mode"))?;
            writer
                .put_n(8, *output_channel_count as u8)
                .map_err(|_| ObuError::UnexpectedEof("output_channel_count"))?;
            writer
                .put_n(8, *substream_count as u8)
                .map_err(|_| ObuError::UnexpectedEof("substream_count"))?;
            writer
                .put_n(8, *coupled_substream_count as u8)
                .map_err(|_| ObuError::UnexpectedEof("coupled_substream_count"))?;
            for entry in demixing_matrix {
                writer
                    .put_s(16, *entry as i32)
                    .map_err(|_| ObuError::UnexpectedEof("demixing_matrix entry"))?;
            }
        }
        AudioElementConfig::Object {
            num_objects,
            extension,
        } => {
            writer.put_uleb128(*num_objects as u64)?;
            writer.put_uleb128(extension.len() as u64)?;
            writer
                .put_bytes(extension)
                .map_err(|_| ObuError::UnexpectedEof("object extension bytes"))?;
        }
        AudioElementConfig::Extension(bytes) => {
            writer.put_uleb128(bytes.len() as u64)?;
            writer
                .put_bytes(bytes)
                .map_err(|_| ObuError::UnexpectedEof("extension bytes"))?;
        }
    }
    Ok(())
}

fn read_config(
    reader: &mut BsIoSliceReader,
    audio_element_type: AudioElementType,
) -> Result<AudioElementConfig, ObuError> {
    Ok(match audio_element_type {
        AudioElementType::ChannelBased => {
            let num_layers: u8 = reader.get_n(8).map_err(|_| ObuError::UnexpectedEof("num_layers"))?;
            let mut layers = Vec::with_capacity(num_layers as usize);
            for _ in 0..num_layers {
                let layout_code: u8 = reader
                    .get_n(4)
                    .map_err(|_| ObuError::UnexpectedEof("loudspeaker_layout"))?;
                let output_gain_is_present: bool = reader
                    .get()
                    .map_err(|_| ObuError::UnexpectedEof("output_gain_is_present"))?;
                let recon_gain_is_present: bool = reader
                    .get()
                    .map_err(|_| ObuError::UnexpectedEof("recon_gain_is_present"))?;
                let _reserved: u8 = reader.get_n(2).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                let substream_count: u8 = reader
                    .get_n(8)
                    .map_err(|_| ObuError::UnexpectedEof("substream_count"))?;
                let coupled_substream_count: u8 = reader
                    .get_n(8)
                    .map_err(|_| ObuError::UnexpectedEof("coupled_substream_count"))?;
                let mut loudspeaker_layout = LoudspeakerLayout::from_code(layout_code);
                if loudspeaker_layout.is_expanded() {
                    let expanded_code: u8 = reader
                        .get_n(8)
                        .map_err(|_| ObuError::UnexpectedEof("expanded_loudspeaker_layout"))?;
                    loudspeaker_layout =
                        LoudspeakerLayout::Expanded(ExpandedLoudspeakerLayout::from_code(expanded_code));
                }
                let (output_gain_flag, output_gain) = if output_gain_is_present {
                    let flag: u8 = reader
                        .get_n(6)
                        .map_err(|_| ObuError::UnexpectedEof("output_gain_flag"))?;
                    let _reserved: u8 = reader.get_n(2).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                    let gain: i32 = reader
                        .get_s(16)
                        .map_err(|_| ObuError::UnexpectedEof("output_gain"))?;
                    (flag, gain as i16)
                } else {
                    (0, 0)
                };
                layers.push(ChannelAudioLayerConfig {
                    loudspeaker_layout,
                    output_gain_is_present,
                    recon_gain_is_present,
                    substream_count: substream_count as u32,
                    coupled_substream_count: coupled_substream_count as u32,
                    output_gain_flag,
                    output_gain,
                });
            }
            AudioElementConfig::Channel(ScalableChannelLayoutConfig { layers })
        }
        AudioElementType::SceneBased => {
            let ambisonics_mode: bool = reader
                .get()
                .map_err(|_| ObuError::UnexpectedEof("ambisonics_mode"))?;
            let output_channel_count: u8 = reader
                .get_n(8)
                .map_err(|_| ObuError::UnexpectedEof("output_channel_count"))?;
            let substream_count: u8 = reader
                .get_n(8)
                .map_err(|_| ObuError::UnexpectedEof("substream_count"))?;
            if !ambisonics_mode {
                let mut channel_mapping = vec![0u8; output_channel_count as usize];
                for entry in channel_mapping.iter_mut() {
                    *entry = reader
                        .get_n(8)
                        .map_err(|_| ObuError::UnexpectedEof("channel_mapping entry"))?;
                }
                AudioElementConfig::Scene(AmbisonicsConfig::Mono {
                    output_channel_count: output_channel_count as u32,
                    substream_count: substream_count as u32,
                    channel_mapping,
                })
            } else {
                let coupled_substream_count: u8 = reader
                    .get_n(8)
                    .map_err(|_| ObuError::UnexpectedEof("coupled_substream_count"))?;
                let matrix_len =
                    (substream_count as usize + coupled_substream_count as usize) * output_channel_count as usize;
                let mut demixing_matrix = Vec::with_capacity(matrix_len);
                for _ in 0..matrix_len {
                    let value: i32 = reader
                        .get_s(16)
                        .map_err(|_| ObuError::UnexpectedEof("demixing_matrix entry"))?;
                    demixing_matrix.push(value as i16);
                }
                AudioElementConfig::Scene(AmbisonicsConfig::Projection {
                    output_channel_count: output_channel_count as u32,
                    substream_count: substream_count as u32,
                    coupled_substream_count: coupled_substream_count as u32,
                    demixing_matrix,
                })
            }
        }
        AudioElementType::ObjectBased => {
            let num_objects = reader.get_uleb128()? as u32;
            let extension_len = reader.get_uleb128()?;
            let mut extension = vec![0u8; extension_len as usize];
            reader
                .get_bytes(&mut extension)
                .map_err(|_| ObuError::UnexpectedEof("object extension bytes"))?;
            AudioElementConfig::Object {
                num_objects,
                extension,
            }
        }
        AudioElementType::Reserved(_) => {
            let len = reader.get_uleb128()?;
            let mut bytes = vec![0u8; len as usize];
            reader
                .get_bytes(&mut bytes)
                .map_err(|_| ObuError::UnexpectedEof("extension bytes"))?;
            AudioElementConfig::Extension(bytes)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalable_channel_layout_with_two_layers() {
        let element = AudioElement {
            audio_element_id: 1,
            audio_element_type: AudioElementType::ChannelBased,
            codec_config_id: 1,
            substream_ids: vec![0, 1, 2],
            parameter_definitions: vec![ParameterDefinition::Demixing {
                parameter_id: 100,
                parameter_rate: 48000,
                param_definition_mode: false,
                duration: 1024,
                default_demixing_info: DefaultDemixingInfo {
                    default_dmixp_mode: DMixPMode::Mode1,
                    default_w: 0,
                },
            }],
            config: AudioElementConfig::Channel(ScalableChannelLayoutConfig {
                layers: vec![
                    ChannelAudioLayerConfig {
                        loudspeaker_layout: LoudspeakerLayout::Stereo,
                        output_gain_is_present: false,
                        recon_gain_is_present: false,
                        substream_count: 1,
                        coupled_substream_count: 1,
                        output_gain_flag: 0,
                        output_gain: 0,
                    },
                    ChannelAudioLayerConfig {
                        loudspeaker_layout: LoudspeakerLayout::Surround5_1,
                        output_gain_is_present: true,
                        recon_gain_is_present: true,
                        substream_count: 2,
                        coupled_substream_count: 1,
                        output_gain_flag: 0b101010,
                        output_gain: -256,
                    },
                ],
            }),
        };
        let payload = element.write_payload().unwrap();
        assert_eq!(AudioElement::parse_payload(&payload).unwrap(), element);
    }

    #[test]
    fn round_trips_ambisonics_mono() {
        let element = AudioElement {
            audio_element_id: 2,
            audio_element_type: AudioElementType::SceneBased,
            codec_config_id: 1,
            substream_ids: vec![5, 6],
            parameter_definitions: vec![],
            config: AudioElementConfig::Scene(AmbisonicsConfig::Mono {
                output_channel_count: 4,
                substream_count: 2,
                channel_mapping: vec![0, 1, 255, 255],
            }),
        };
        let payload = element.write_payload().unwrap();
        assert_eq!(AudioElement::parse_payload(&payload).unwrap(), element);
    }

    #[test]
    fn round_trips_ambisonics_projection() {
        let element = AudioElement {
            audio_element_id: 3,
            audio_element_type: AudioElementType::SceneBased,
            codec_config_id: 1,
            substream_ids: vec![7],
            parameter_definitions: vec![],
            config: AudioElementConfig::Scene(AmbisonicsConfig::Projection {
                output_channel_count: 1,
                substream_count: 1,
                coupled_substream_count: 0,
                demixing_matrix: vec![100, -100],
            }),
        };
        let payload = element.write_payload().unwrap();
        assert_eq!(AudioElement::parse_payload(&payload).unwrap(), element);
    }
}
