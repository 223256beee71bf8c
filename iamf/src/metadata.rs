//! Deserializable user-metadata structs consumed by the generators in
//! [`crate::generate`]. Deserialization itself (e.g. from YAML) is outside
//! this crate's scope; these structs only describe the shape callers deliver.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CodecConfigMetadata {
    pub codec_config_id: u64,
    pub codec_id: String,
    pub samples_per_frame: u64,
    pub audio_roll_distance: i16,
    #[serde(default)]
    pub decoder_config: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamDefinitionTypeMetadata {
    MixGain,
    Demixing,
    ReconGain,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioElementParamMetadata {
    pub parameter_id: u64,
    pub parameter_rate: u64,
    #[serde(default)]
    pub param_definition_mode: bool,
    #[serde(default)]
    pub duration: u64,
    pub param_definition_type: ParamDefinitionTypeMetadata,
    #[serde(default)]
    pub default_dmixp_mode: Option<u8>,
    #[serde(default)]
    pub default_w: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelAudioLayerConfigMetadata {
    pub loudspeaker_layout: String,
    #[serde(default)]
    pub expanded_loudspeaker_layout: Option<String>,
    #[serde(default)]
    pub output_gain_is_present: bool,
    #[serde(default)]
    pub recon_gain_is_present: bool,
    pub substream_count: u32,
    pub coupled_substream_count: u32,
    #[serde(default)]
    pub output_gain_flag: u8,
    #[serde(default)]
    pub output_gain: i16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbisonicsConfigMetadata {
    Mono {
        output_channel_count: u32,
        substream_count: u32,
        channel_mapping: Vec<u8>,
    },
    Projection {
        output_channel_count: u32,
        substream_count: u32,
        coupled_substream_count: u32,
        demixing_matrix: Vec<i16>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "audio_element_type")]
pub enum AudioElementConfigMetadata {
    ChannelBased { layers: Vec<ChannelAudioLayerConfigMetadata> },
    SceneBased { ambisonics_config: AmbisonicsConfigMetadata },
    ObjectBased { num_objects: u32, #[serde(default)] extension: Vec<u8> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioElementMetadata {
    pub audio_element_id: u64,
    pub codec_config_id: u64,
    pub substream_ids: Vec<u64>,
    #[serde(default)]
    pub audio_element_params: Vec<AudioElementParamMetadata>,
    #[serde(flatten)]
    pub config: AudioElementConfigMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderingConfigMetadata {
    #[serde(default)]
    pub headphones_rendering_mode: Option<String>,
    #[serde(default)]
    pub extension: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MixGainMetadata {
    pub parameter_id: u64,
    pub parameter_rate: u64,
    #[serde(default)]
    pub param_definition_mode: bool,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub default_mix_gain: i16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubMixAudioElementMetadata {
    pub audio_element_id: u64,
    #[serde(default)]
    pub localized_element_annotations: Vec<String>,
    pub rendering_config: RenderingConfigMetadata,
    pub element_mix_gain: MixGainMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchoredLoudnessMetadata {
    pub anchor_element: u8,
    pub anchored_loudness: i16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoudnessInfoMetadata {
    pub layout: String,
    pub integrated_loudness: i16,
    pub digital_peak: i16,
    #[serde(default)]
    pub true_peak: Option<i16>,
    #[serde(default)]
    pub anchored_loudness: Vec<AnchoredLoudnessMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubMixMetadata {
    pub audio_elements: Vec<SubMixAudioElementMetadata>,
    pub output_mix_gain: MixGainMetadata,
    pub loudness_layouts: Vec<LoudnessInfoMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MixPresentationMetadata {
    pub mix_presentation_id: u64,
    #[serde(default)]
    pub annotations_language: Vec<String>,
    #[serde(default)]
    pub localized_presentation_annotations: Vec<String>,
    pub sub_mixes: Vec<SubMixMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconGainLayerMetadata {
    #[serde(default)]
    pub gains: std::collections::BTreeMap<String, f64>,
    #[serde(default)]
    pub override_computed_recon_gains: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SubblockMetadata {
    MixGainStep { start: i16 },
    MixGainLinear { start: i16, end: i16 },
    MixGainBezier { start: i16, end: i16, control: i16, control_relative_time: u8 },
    Demixing { dmixp_mode: u8 },
    ReconGain { layers: Vec<ReconGainLayerMetadata> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterBlockMetadata {
    pub parameter_id: u64,
    #[serde(default)]
    pub start_timestamp: Option<i64>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub constant_subblock_duration: Option<u64>,
    pub subblocks: Vec<SubblockMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub codec_configs: Vec<CodecConfigMetadata>,
    #[serde(default)]
    pub audio_elements: Vec<AudioElementMetadata>,
    #[serde(default)]
    pub mix_presentations: Vec<MixPresentationMetadata>,
    #[serde(default)]
    pub parameter_blocks: Vec<ParameterBlockMetadata>,
    #[serde(default)]
    pub append_build_information_tag: bool,
}
