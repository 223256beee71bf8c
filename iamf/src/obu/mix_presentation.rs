//! Mix presentation records (§3.5): how a set of audio elements is combined,
//! rendered to one or more target layouts, and measured for loudness.

use crate::obu::audio_element::LoudspeakerLayout;
use crate::utils::bitstream_io::{BitstreamIoWriter, BsIoSliceReader};
use crate::utils::errors::{MixPresentationError, ObuError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadphonesRenderingMode {
    Stereo,
    Binaural,
    Reserved(u8),
}

impl HeadphonesRenderingMode {
    fn code(self) -> u8 {
        match self {
            HeadphonesRenderingMode::Stereo => 0,
            HeadphonesRenderingMode::Binaural => 1,
            HeadphonesRenderingMode::Reserved(c) => c,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            0 => HeadphonesRenderingMode::Stereo,
            1 => HeadphonesRenderingMode::Binaural,
            other => HeadphonesRenderingMode::Reserved(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderingConfig {
    pub headphones_rendering_mode: HeadphonesRenderingMode,
    pub extension: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixGainParamDefinition {
    pub parameter_id: u64,
    pub parameter_rate: u64,
    pub param_definition_mode: bool,
    pub duration: u64,
    pub default_mix_gain: i16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubMixAudioElement {
    pub audio_element_id: u64,
    pub localized_element_annotations: Vec<String>,
    pub rendering_config: RenderingConfig,
    pub element_mix_gain: MixGainParamDefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    LoudspeakersSsConvention(LoudspeakerLayout),
    Binaural,
    Reserved(u8),
}

impl Layout {
    fn code(self) -> u8 {
        match self {
            Layout::LoudspeakersSsConvention(_) => 0,
            Layout::Binaural => 1,
            Layout::Reserved(c) => c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchoredLoudnessElement {
    pub anchor_element: u8,
    pub anchored_loudness: i16,
}

pub const INFO_TYPE_TRUE_PEAK: u32 = 1;
pub const INFO_TYPE_ANCHORED_LOUDNESS: u32 = 2;
pub const INFO_TYPE_EXT_BIT_4: u32 = 4;
pub const INFO_TYPE_EXT_BIT_64: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoudnessInfo {
    pub info_type: u32,
    pub integrated_loudness: i16,
    pub digital_peak: i16,
    pub true_peak: Option<i16>,
    pub anchored_loudness: Option<Vec<AnchoredLoudnessElement>>,
    pub layout_extension: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixPresentationLayout {
    pub loudness_layout: Layout,
    pub loudness_info: LoudnessInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubMix {
    pub audio_elements: Vec<SubMixAudioElement>,
    pub output_mix_gain: MixGainParamDefinition,
    pub layouts: Vec<MixPresentationLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixPresentationTag {
    pub tag_name: String,
    pub tag_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixPresentation {
    pub mix_presentation_id: u64,
    pub annotations_language: Vec<String>,
    pub localized_presentation_annotations: Vec<String>,
    pub sub_mixes: Vec<SubMix>,
    pub tags: Option<Vec<MixPresentationTag>>,
}

fn write_string(writer: &mut BitstreamIoWriter, s: &str) -> Result<(), ObuError> {
    let bytes = s.as_bytes();
    writer.put_uleb128(bytes.len() as u64)?;
    writer
        .put_bytes(bytes)
        .map_err(|_| ObuError::UnexpectedEof("string bytes"))
}

fn read_string(reader: &mut BsIoSliceReader) -> Result<String, ObuError> {
    let len = reader.get_uleb128()?;
    let mut bytes = vec![0u8; len as usize];
    reader
        .get_bytes(&mut bytes)
        .map_err(|_| ObuError::UnexpectedEof("string bytes"))?;
    String::from_utf8(bytes).map_err(|_| ObuError::UnexpectedEof("utf8 string"))
}

fn write_mix_gain(writer: &mut BitstreamIoWriter, mg: &MixGainParamDefinition) -> Result<(), ObuError> {
    writer.put_uleb128(mg.parameter_id)?;
    writer.put_uleb128(mg.parameter_rate)?;
    writer
        .put_bit(mg.param_definition_mode)
        .map_err(|_| ObuError::UnexpectedEof("param_definition_mode"))?;
    if !mg.param_definition_mode {
        writer.put_uleb128(mg.duration)?;
    }
    writer
        .put_s(16, mg.default_mix_gain as i32)
        .map_err(|_| ObuError::UnexpectedEof("default_mix_gain"))
}

fn read_mix_gain(reader: &mut BsIoSliceReader) -> Result<MixGainParamDefinition, ObuError> {
    let parameter_id = reader.get_uleb128()?;
    let parameter_rate = reader.get_uleb128()?;
    let param_definition_mode: bool = reader
        .get()
        .map_err(|_| ObuError::UnexpectedEof("param_definition_mode"))?;
    let duration = if !param_definition_mode {
        reader.get_uleb128()?
    } else {
        0
    };
    let default_mix_gain: i32 = reader
        .get_s(16)
        .map_err(|_| ObuError::UnexpectedEof("default_mix_gain"))?;
    Ok(MixGainParamDefinition {
        parameter_id,
        parameter_rate,
        param_definition_mode,
        duration,
        default_mix_gain: default_mix_gain as i16,
    })
}

impl MixPresentation {
    pub fn write_payload(&self) -> Result<Vec<u8>, ObuError> {
        let mut writer = BitstreamIoWriter::new();
        writer.put_uleb128(self.mix_presentation_id)?;
        let count_label = self.annotations_language.len();
        if self.localized_presentation_annotations.len() != count_label {
            return Err(ObuError::UnexpectedEof("annotation count mismatch"));
        }
        writer.put_uleb128(count_label as u64)?;
        for lang in &self.annotations_language {
            write_string(&mut writer, lang)?;
        }
        for annotation in &self.localized_presentation_annotations {
            write_string(&mut writer, annotation)?;
        }

        writer.put_uleb128(self.sub_mixes.len() as u64)?;
        for sub_mix in &self.sub_mixes {
            writer.put_uleb128(sub_mix.audio_elements.len() as u64)?;
            for element in &sub_mix.audio_elements {
                writer.put_uleb128(element.audio_element_id)?;
                writer.put_uleb128(element.localized_element_annotations.len() as u64)?;
                for annotation in &element.localized_element_annotations {
                    write_string(&mut writer, annotation)?;
                }
                writer
                    .put_n(2, element.rendering_config.headphones_rendering_mode.code())
                    .map_err(|_| ObuError::UnexpectedEof("headphones_rendering_mode"))?;
                writer
                    .put_n(6, 0u8)
                    .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                writer.put_uleb128(element.rendering_config.extension.len() as u64)?;
                writer
                    .put_bytes(&element.rendering_config.extension)
                    .map_err(|_| ObuError::UnexpectedEof("rendering_config extension"))?;
                write_mix_gain(&mut writer, &element.element_mix_gain)?;
            }

            write_mix_gain(&mut writer, &sub_mix.output_mix_gain)?;

            writer.put_uleb128(sub_mix.layouts.len() as u64)?;
            for layout in &sub_mix.layouts {
                writer
                    .put_n(2, layout.loudness_layout.code())
                    .map_err(|_| ObuError::UnexpectedEof("layout_type"))?;
                match layout.loudness_layout {
                    Layout::LoudspeakersSsConvention(loudspeaker_layout) => {
                        writer
                            .put_n(4, loudspeaker_layout_code(loudspeaker_layout))
                            .map_err(|_| ObuError::UnexpectedEof("sound_system"))?;
                        writer
                            .put_n(2, 0u8)
                            .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                    }
                    _ => {
                        writer
                            .put_n(6, 0u8)
                            .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                    }
                }

                writer
                    .put_n(8, layout.loudness_info.info_type as u8)
                    .map_err(|_| ObuError::UnexpectedEof("info_type"))?;
                writer
                    .put_s(16, layout.loudness_info.integrated_loudness as i32)
                    .map_err(|_| ObuError::UnexpectedEof("integrated_loudness"))?;
                writer
                    .put_s(16, layout.loudness_info.digital_peak as i32)
                    .map_err(|_| ObuError::UnexpectedEof("digital_peak"))?;
                if layout.loudness_info.info_type & INFO_TYPE_TRUE_PEAK as u32 != 0 {
                    let true_peak = layout.loudness_info.true_peak.unwrap_or(0);
                    writer
                        .put_s(16, true_peak as i32)
                        .map_err(|_| ObuError::UnexpectedEof("true_peak"))?;
                }
                if layout.loudness_info.info_type & INFO_TYPE_ANCHORED_LOUDNESS != 0 {
                    let anchors = layout.loudness_info.anchored_loudness.as_deref().unwrap_or(&[]);
                    writer
                        .put_n(8, anchors.len() as u8)
                        .map_err(|_| ObuError::UnexpectedEof("num_anchored_loudness"))?;
                    for anchor in anchors {
                        writer
                            .put_n(8, anchor.anchor_element)
                            .map_err(|_| ObuError::UnexpectedEof("anchor_element"))?;
                        writer
                            .put_s(16, anchor.anchored_loudness as i32)
                            .map_err(|_| ObuError::UnexpectedEof("anchored_loudness"))?;
                    }
                }
                if layout.loudness_info.info_type & INFO_TYPE_EXT_BIT_4 != 0
                    || layout.loudness_info.info_type & INFO_TYPE_EXT_BIT_64 != 0
                {
                    let extension = layout.loudness_info.layout_extension.as_deref().unwrap_or(&[]);
                    writer.put_uleb128(extension.len() as u64)?;
                    writer
                        .put_bytes(extension)
                        .map_err(|_| ObuError::UnexpectedEof("layout_extension"))?;
                }
            }
        }

        match &self.tags {
            Some(tags) => {
                writer
                    .put_bit(true)
                    .map_err(|_| ObuError::UnexpectedEof("include_tags"))?;
                writer
                    .put_n(7, 0u8)
                    .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                writer
                    .put_n(8, tags.len() as u8)
                    .map_err(|_| ObuError::UnexpectedEof("num_tags"))?;
                for tag in tags {
                    write_string(&mut writer, &tag.tag_name)?;
                    write_string(&mut writer, &tag.tag_value)?;
                }
            }
            None => {
                writer
                    .put_bit(false)
                    .map_err(|_| ObuError::UnexpectedEof("include_tags"))?;
                writer
                    .put_n(7, 0u8)
                    .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
            }
        }

        writer.into_bytes().map_err(|_| ObuError::UnexpectedEof("mix_presentation"))
    }

    pub fn parse_payload(payload: &[u8]) -> Result<Self, ObuError> {
        let mut reader = BsIoSliceReader::from_slice(payload);
        let mix_presentation_id = reader.get_uleb128()?;
        let count_label = reader.get_uleb128()?;
        let mut annotations_language = Vec::with_capacity(count_label as usize);
        for _ in 0..count_label {
            annotations_language.push(read_string(&mut reader)?);
        }
        let mut localized_presentation_annotations = Vec::with_capacity(count_label as usize);
        for _ in 0..count_label {
            localized_presentation_annotations.push(read_string(&mut reader)?);
        }

        let num_sub_mixes = reader.get_uleb128()?;
        let mut sub_mixes = Vec::with_capacity(num_sub_mixes as usize);
        for _ in 0..num_sub_mixes {
            let num_elements = reader.get_uleb128()?;
            let mut audio_elements = Vec::with_capacity(num_elements as usize);
            for _ in 0..num_elements {
                let audio_element_id = reader.get_uleb128()?;
                let num_annotations = reader.get_uleb128()?;
                let mut localized_element_annotations = Vec::with_capacity(num_annotations as usize);
                for _ in 0..num_annotations {
                    localized_element_annotations.push(read_string(&mut reader)?);
                }
                let mode_code: u8 = reader
                    .get_n(2)
                    .map_err(|_| ObuError::UnexpectedEof("headphones_rendering_mode"))?;
                let _reserved: u8 = reader.get_n(6).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                let extension_len = reader.get_uleb128()?;
                let mut extension = vec![0u8; extension_len as usize];
                reader
                    .get_bytes(&mut extension)
                    .map_err(|_| ObuError::UnexpectedEof("rendering_config extension"))?;
                let element_mix_gain = read_mix_gain(&mut reader)?;
                audio_elements.push(SubMixAudioElement {
                    audio_element_id,
                    localized_element_annotations,
                    rendering_config: RenderingConfig {
                        headphones_rendering_mode: HeadphonesRenderingMode::from_code(mode_code),
                        extension,
                    },
                    element_mix_gain,
                });
            }

            let output_mix_gain = read_mix_gain(&mut reader)?;

            let num_layouts = reader.get_uleb128()?;
            let mut layouts = Vec::with_capacity(num_layouts as usize);
            for _ in 0..num_layouts {
                let layout_code: u8 = reader.get_n(2).map_err(|_| ObuError::UnexpectedEof("layout_type"))?;
                let loudness_layout = match layout_code {
                    0 => {
                        let sound_system: u8 =
                            reader.get_n(4).map_err(|_| ObuError::UnexpectedEof("sound_system"))?;
                        let _reserved: u8 = reader.get_n(2).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                        Layout::LoudspeakersSsConvention(loudspeaker_layout_from_code(sound_system))
                    }
                    1 => {
                        let _reserved: u8 = reader.get_n(6).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                        Layout::Binaural
                    }
                    other => {
                        let _reserved: u8 = reader.get_n(6).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                        Layout::Reserved(other)
                    }
                };

                let info_type: u8 = reader.get_n(8).map_err(|_| ObuError::UnexpectedEof("info_type"))?;
                let info_type = info_type as u32;
                let integrated_loudness: i32 = reader
                    .get_s(16)
                    .map_err(|_| ObuError::UnexpectedEof("integrated_loudness"))?;
                let digital_peak: i32 = reader
                    .get_s(16)
                    .map_err(|_| ObuError::UnexpectedEof("digital_peak"))?;
                let true_peak = if info_type & INFO_TYPE_TRUE_PEAK != 0 {
                    let v: i32 = reader.get_s(16).map_err(|_| ObuError::UnexpectedEof("true_peak"))?;
                    Some(v as i16)
                } else {
                    None
                };
                let anchored_loudness = if info_type & INFO_TYPE_ANCHORED_LOUDNESS != 0 {
                    let num: u8 = reader
                        .get_n(8)
                        .map_err(|_| ObuError::UnexpectedEof("num_anchored_loudness"))?;
                    let mut anchors = Vec::with_capacity(num as usize);
                    for _ in 0..num {
                        let anchor_element: u8 = reader
                            .get_n(8)
                            .map_err(|_| ObuError::UnexpectedEof("anchor_element"))?;
                        let anchored_loudness: i32 = reader
                            .get_s(16)
                            .map_err(|_| ObuError::UnexpectedEof("anchored_loudness"))?;
                        anchors.push(AnchoredLoudnessElement {
                            anchor_element,
                            anchored_loudness: anchored_loudness as i16,
                        });
                    }
                    Some(anchors)
                } else {
                    None
                };
                let layout_extension = if info_type & INFO_TYPE_EXT_BIT_4 != 0 || info_type & INFO_TYPE_EXT_BIT_64 != 0
                {
                    let len = reader.get_uleb128()?;
                    let mut bytes = vec![0u8; len as usize];
                    reader
                        .get_bytes(&mut bytes)
                        .map_err(|_| ObuError::UnexpectedEof("layout_extension"))?;
                    Some(bytes)
                } else {
                    None
                };

                layouts.push(MixPresentationLayout {
                    loudness_layout,
                    loudness_info: LoudnessInfo {
                        info_type,
                        integrated_loudness: integrated_loudness as i16,
                        digital_peak: digital_peak as i16,
                        true_peak,
                        anchored_loudness,
                        layout_extension,
                    },
                });
            }

            sub_mixes.push(SubMix {
                audio_elements,
                output_mix_gain,
                layouts,
            });
        }

        let include_tags: bool = reader.get().map_err(|_| ObuError::UnexpectedEof("include_tags"))?;
        let _reserved: u8 = reader.get_n(7).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
        let tags = if include_tags {
            let num_tags: u8 = reader.get_n(8).map_err(|_| ObuError::UnexpectedEof("num_tags"))?;
            let mut tags = Vec::with_capacity(num_tags as usize);
            for _ in 0..num_tags {
                let tag_name = read_string(&mut reader)?;
                let tag_value = read_string(&mut reader)?;
                tags.push(MixPresentationTag { tag_name, tag_value });
            }
            Some(tags)
        } else {
            None
        };

        Ok(MixPresentation {
            mix_presentation_id,
            annotations_language,
            localized_presentation_annotations,
            sub_mixes,
            tags,
        })
    }
}

fn loudspeaker_layout_code(layout: LoudspeakerLayout) -> u8 {
    match layout {
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
        LoudspeakerLayout::Expanded(_) => 15,
        LoudspeakerLayout::Reserved(code) => code,
    }
}

fn loudspeaker_layout_from_code(code: u8) -> LoudspeakerLayout {
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

/// Cross-checks a sub-mix's distinct referenced audio elements against a profile's
/// declared cardinality limit (§4.4 profile check).
pub fn check_profile_cardinality(sub_mix: &SubMix, max_audio_elements: usize) -> Result<(), MixPresentationError> {
    let mut distinct = sub_mix
        .audio_elements
        .iter()
        .map(|e| e.audio_element_id)
        .collect::<Vec<_>>();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() > max_audio_elements {
        return Err(MixPresentationError::ProfileCardinalityExceeded {
            actual: distinct.len(),
            max: max_audio_elements,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mix_gain(parameter_id: u64) -> MixGainParamDefinition {
        MixGainParamDefinition {
            parameter_id,
            parameter_rate: 48000,
            param_definition_mode: false,
            duration: 1024,
            default_mix_gain: 0,
        }
    }

    #[test]
    fn round_trips_a_minimal_mix_presentation() {
        let mix = MixPresentation {
            mix_presentation_id: 42,
            annotations_language: vec!["en-us".to_string()],
            localized_presentation_annotations: vec!["Stereo mix".to_string()],
            sub_mixes: vec![SubMix {
                audio_elements: vec![SubMixAudioElement {
                    audio_element_id: 1,
                    localized_element_annotations: vec!["Music".to_string()],
                    rendering_config: RenderingConfig {
                        headphones_rendering_mode: HeadphonesRenderingMode::Stereo,
                        extension: vec![],
                    },
                    element_mix_gain: sample_mix_gain(10),
                }],
                output_mix_gain: sample_mix_gain(11),
                layouts: vec![MixPresentationLayout {
                    loudness_layout: Layout::LoudspeakersSsConvention(LoudspeakerLayout::Stereo),
                    loudness_info: LoudnessInfo {
                        info_type: 0,
                        integrated_loudness: -2300,
                        digital_peak: -100,
                        true_peak: None,
                        anchored_loudness: None,
                        layout_extension: None,
                    },
                }],
            }],
            tags: None,
        };
        let payload = mix.write_payload().unwrap();
        assert_eq!(MixPresentation::parse_payload(&payload).unwrap(), mix);
    }

    #[test]
    fn round_trips_loudness_info_with_true_peak_and_anchors() {
        let mix = MixPresentation {
            mix_presentation_id: 1,
            annotations_language: vec![],
            localized_presentation_annotations: vec![],
            sub_mixes: vec![SubMix {
                audio_elements: vec![],
                output_mix_gain: sample_mix_gain(1),
                layouts: vec![MixPresentationLayout {
                    loudness_layout: Layout::Binaural,
                    loudness_info: LoudnessInfo {
                        info_type: INFO_TYPE_TRUE_PEAK | INFO_TYPE_ANCHORED_LOUDNESS,
                        integrated_loudness: -1000,
                        digital_peak: -50,
                        true_peak: Some(-40),
                        anchored_loudness: Some(vec![AnchoredLoudnessElement {
                            anchor_element: 0,
                            anchored_loudness: -2000,
                        }]),
                        layout_extension: None,
                    },
                }],
            }],
            tags: Some(vec![MixPresentationTag {
                tag_name: "build_information".to_string(),
                tag_value: "1.0.0".to_string(),
            }]),
        };
        let payload = mix.write_payload().unwrap();
        assert_eq!(MixPresentation::parse_payload(&payload).unwrap(), mix);
    }

    #[test]
    fn profile_cardinality_check_rejects_too_many_distinct_elements() {
        let sub_mix = SubMix {
            audio_elements: vec![
                SubMixAudioElement {
                    audio_element_id: 1,
                    localized_element_annotations: vec![],
                    rendering_config: RenderingConfig {
                        headphones_rendering_mode: HeadphonesRenderingMode::Stereo,
                        extension: vec![],
                    },
                    element_mix_gain: sample_mix_gain(1),
                },
                SubMixAudioElement {
                    audio_element_id: 2,
                    localized_element_annotations: vec![],
                    rendering_config: RenderingConfig {
                        headphones_rendering_mode: HeadphonesRenderingMode::Stereo,
                        extension: vec![],
                    },
                    element_mix_gain: sample_mix_gain(2),
                },
            ],
            output_mix_gain: sample_mix_gain(3),
            layouts: vec![],
        };
        assert!(check_profile_cardinality(&sub_mix, 1).is_err());
        assert!(check_profile_cardinality(&sub_mix, 2).is_ok());
    }
}
