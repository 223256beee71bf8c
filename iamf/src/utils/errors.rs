#[derive(thiserror::Error, Debug)]
pub enum ChannelLabelError {
    #[error("unknown channel label string: {0:?}")]
    UnknownLabel(String),

    #[error("ambisonics channel number out of range: {0} (must be in [0, 24])")]
    AmbisonicsChannelOutOfRange(u8),

    #[error("no demixed label defined for {0:?}")]
    NotDemixable(String),

    #[error("no canonical label ordering defined for expanded layout {0:?}")]
    UnknownExpandedLayout(String),

    #[error("label {0:?} already present in output")]
    DuplicateLabel(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ObuError {
    #[error("payload_size ({declared}) does not match bytes actually consumed ({consumed})")]
    MalformedObu { declared: u64, consumed: u64 },

    #[error("unsigned LEB128 exceeded 8 bytes without terminating")]
    Leb128TooLong,

    #[error("value {0} does not fit in unsigned LEB128's 63 usable bits")]
    Leb128ValueTooLarge(u64),

    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("reserved obu_type {0} encountered outside an extension context")]
    ReservedObuType(u8),
}

#[derive(thiserror::Error, Debug)]
pub enum AudioElementError {
    #[error("duplicate audio_element_id {0}")]
    DuplicateAudioElementId(u64),

    #[error("codec_config_id {0} referenced by audio element {1} does not exist")]
    UnknownCodecConfigId(u64, u64),

    #[error("layer channel counts must be monotone non-decreasing, layer {index} has {actual} < previous {previous}")]
    NonMonotonicLayerChannelCount {
        index: usize,
        actual: u32,
        previous: u32,
    },

    #[error("coupled_substream_count ({coupled}) exceeds substream_count ({total}) in layer {index}")]
    CoupledExceedsTotal {
        index: usize,
        coupled: u32,
        total: u32,
    },

    #[error("expanded loudspeaker layout is only allowed in a single-layer configuration, found {0} layers")]
    ExpandedLayoutRequiresSingleLayer(usize),

    #[error("channel_mapping length {actual} does not match output_channel_count {expected}")]
    AmbisonicsMonoChannelMappingLengthMismatch { actual: usize, expected: u32 },

    #[error("ambisonics mono channel_mapping entry {0} is not < substream_count {1} and is not the inactive sentinel 255")]
    AmbisonicsMonoChannelMappingOutOfRange(u8, u32),

    #[error("demixing_matrix length {actual} does not match (substream_count + coupled_substream_count) * output_channel_count = {expected}")]
    AmbisonicsProjectionMatrixLengthMismatch { actual: usize, expected: u32 },

    #[error("recon gain presence mismatch on layer {index}: required={required}, present={present}")]
    ReconGainPresenceMismatch {
        index: usize,
        required: bool,
        present: bool,
    },

    #[error("recon_gain_is_present must be false on the first layer")]
    ReconGainPresentOnFirstLayer,

    #[error("demixing or recon-gain parameter duration {actual} must equal the referenced codec config's samples_per_frame {expected}")]
    ParamDurationMismatch { actual: u64, expected: u64 },

    #[error("deprecated field {0} ignored")]
    DeprecatedFieldIgnored(&'static str),

    #[error("value {value} for {field} does not fit in the target width")]
    OutOfRange { field: &'static str, value: i64 },
}

#[derive(thiserror::Error, Debug)]
pub enum MixPresentationError {
    #[error("duplicate mix_presentation_id {0}")]
    DuplicateMixPresentationId(u64),

    #[error("annotations_language and localized_presentation_annotations must have count_label ({0}) entries")]
    AnnotationCountMismatch(u64),

    #[error("layout_extension size ({declared}) does not match the supplied byte count ({actual})")]
    ExtensionSizeMismatch { declared: u64, actual: usize },

    #[error("rendering config extension size ({declared}) does not match the supplied byte count ({actual})")]
    RenderingConfigExtensionSizeMismatch { declared: u64, actual: usize },

    #[error("unknown sound system enum value {0}")]
    UnknownSoundSystem(u32),

    #[error("unknown info_type bit combination {0:#x}")]
    UnknownInfoType(u32),

    #[error("value {value} for {field} does not fit in the target width")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("sub-mix references more audio elements ({actual}) than the declared profile allows ({max})")]
    ProfileCardinalityExceeded { actual: usize, max: usize },

    #[error("mix presentation tag count {0} exceeds 255")]
    TooManyTags(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum ReconGainError {
    #[error("no relevant mixed label defined for {0:?}")]
    NoRelevantMixedLabel(String),

    #[error("missing samples for label {0:?}")]
    MissingSamples(String),

    #[error("recon gain {0} is outside [0, 1]")]
    GainOutOfRange(f64),
}

#[derive(Debug, Clone)]
pub struct ReconGainMismatchEntry {
    pub layer: usize,
    pub label: String,
    pub computed: u8,
    pub supplied: u8,
}

#[derive(thiserror::Error, Debug)]
pub enum ParameterBlockError {
    #[error("parameter_id {0} has no known definition and no codec config is available to infer one")]
    UnknownParameterStray(u64),

    #[error("mismatched next start timestamp for parameter_id {id}: expected {expected}, got {actual}")]
    NonContiguousTimestamp { id: u64, expected: i64, actual: i64 },

    #[error("demixing and recon-gain parameter blocks must have exactly one subblock, found {0}")]
    ExpectedSingleSubblock(usize),

    #[error("recon gain mismatches found: {}", .0.iter().map(|m| format!("label {:?} in layer {}: computed {}, supplied {}", m.label, m.layer, m.computed, m.supplied)).collect::<Vec<_>>().join("; "))]
    ReconGainMismatches(Vec<ReconGainMismatchEntry>),

    #[error("recon gain present-bitmask mismatch in layer {layer}: computed {computed:#05x}, supplied {supplied:#05x}")]
    ReconGainBitmaskMismatch {
        layer: usize,
        computed: u16,
        supplied: u16,
    },

    #[error("value {value} for {field} does not fit in the target width")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("parameter stream for parameter_id {id} does not cover substream span [{substream_start}, {substream_end}); stream only covers [{stream_start}, {stream_end})")]
    IncompleteCoverage {
        id: u64,
        stream_start: i64,
        stream_end: i64,
        substream_start: i64,
        substream_end: i64,
    },

    #[error("unknown animation type tag {0}")]
    UnknownAnimationType(u8),

    #[error("unknown dmixp_mode {0}")]
    UnknownDMixPMode(u8),
}

#[derive(thiserror::Error, Debug)]
pub enum ParametersManagerError {
    #[error("audio element {0} has more than one demixing parameter definition attached")]
    MultipleDemixingDefinitions(u64),

    #[error("mismatching timestamps for down-mixing parameters on audio element {audio_element_id}: expected {expected}, got {actual}")]
    TimestampMismatch {
        audio_element_id: u64,
        expected: i64,
        actual: i64,
    },

    #[error("w_idx {0} out of range [0, 10]")]
    WIdxOutOfRange(i32),
}

#[derive(thiserror::Error, Debug)]
pub enum TemporalUnitError {
    #[error("temporal unit has no audio frames, parameter blocks, or invalidating arbitrary records")]
    Empty,

    #[error("audio frames in one temporal unit must share start_timestamp/end_timestamp/trim; frame for substream {substream_id} disagrees")]
    InconsistentFrameTiming { substream_id: u64 },

    #[error("duplicate substream_id {0} within one temporal unit")]
    DuplicateSubstreamId(u64),

    #[error("trim_start ({trim_start}) + trim_end ({trim_end}) exceeds samples_per_frame ({samples_per_frame})")]
    TrimExceedsFrame {
        trim_start: u32,
        trim_end: u32,
        samples_per_frame: u32,
    },

    #[error("duplicate parameter_id {0} within one temporal unit")]
    DuplicateParameterId(u64),

    #[error("arbitrary records within one temporal unit must share one insertion tick")]
    InconsistentArbitraryTick,
}

#[derive(thiserror::Error, Debug)]
pub enum SequencerError {
    #[error("push_descriptor_obus called more than once")]
    DescriptorsAlreadyPushed,

    #[error("push_temporal_unit called before push_descriptor_obus")]
    DescriptorsNotYetPushed,

    #[error("push_temporal_unit called after close")]
    AlreadyClosed,

    #[error("close called after a prior failure; call abort instead")]
    CloseAfterFailure,

    #[error("all codec configs in one sequence must share one sample_rate; found {found} and {expected}")]
    MixedSampleRates { found: u32, expected: u32 },

    #[error("trim_start > 0 on temporal unit at timestamp {timestamp} after a later-than-trim-prefix frame was already observed")]
    TrimAfterPrefixEnded { timestamp: i64 },

    #[error("temporal units must be pushed in non-decreasing timestamp order: {previous} then {next}")]
    OutOfOrderTemporalUnit { previous: i64, next: i64 },

    #[error("re-serialized descriptor length ({actual}) does not match the original ({original})")]
    DescriptorResized { original: usize, actual: usize },

    #[error("failed to serialize a record for sequencing: {0}")]
    Serialization(#[from] ObuError),
}
