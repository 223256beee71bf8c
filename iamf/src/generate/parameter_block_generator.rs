//! Parameter-block generator (§4.6), grounded on `parameter_block_generator.h`'s
//! per-id metadata map plus reverse audio-element edges, feeding the
//! reconstruction-gain engine (§4.5) for recon-gain comparison.

use std::collections::{HashMap, HashSet};

use crate::channel_label::ChannelLabel;
use crate::generate::recon_gain_generator::{self, LabelSamplesMap};
use crate::metadata::{ParameterBlockMetadata, SubblockMetadata};
use crate::obu::audio_element::{AudioElement, DMixPMode, ParameterDefinition};
use crate::obu::mix_presentation::MixPresentation;
use crate::obu::parameter_block::{
    recon_gain_bits, pack_recon_gain, MixGainAnimation, ParameterBlock, ParameterSubblockPayload, ParameterType,
    ReconGainLayer,
};
use crate::utils::errors::{ParameterBlockError, ReconGainMismatchEntry};
use crate::utils::timing::GlobalTiming;

#[derive(Debug, Clone, Copy)]
struct ParamIdMetadata {
    param_type: ParameterType,
    param_definition_mode: bool,
    duration: u64,
}

pub struct ParameterBlockGenerator {
    id_metadata: HashMap<u64, ParamIdMetadata>,
    referenced_by: HashMap<u64, HashSet<u64>>,
    timing: GlobalTiming,
    has_codec_config: bool,
}

impl ParameterBlockGenerator {
    /// `initialize(audio_elements, param_definitions)`: scans every audio
    /// element's parameter list and every mix presentation's element/output
    /// mix gain to build the `parameter_id → per-id metadata` and reverse-edge
    /// maps.
    pub fn initialize(
        audio_elements: &HashMap<u64, AudioElement>,
        mix_presentations: &[MixPresentation],
        has_codec_config: bool,
    ) -> Self {
        let mut id_metadata = HashMap::new();
        let mut referenced_by: HashMap<u64, HashSet<u64>> = HashMap::new();

        for element in audio_elements.values() {
            for definition in &element.parameter_definitions {
                let (param_type, param_definition_mode, duration) = match definition {
                    ParameterDefinition::Demixing {
                        parameter_id: _,
                        param_definition_mode,
                        duration,
                        ..
                    } => (ParameterType::Demixing, *param_definition_mode, *duration),
                    ParameterDefinition::ReconGain {
                        parameter_id: _,
                        param_definition_mode,
                        duration,
                        ..
                    } => (ParameterType::ReconGain, *param_definition_mode, *duration),
                    ParameterDefinition::Extension { .. } => continue,
                };
                id_metadata.insert(
                    definition.parameter_id(),
                    ParamIdMetadata {
                        param_type,
                        param_definition_mode,
                        duration,
                    },
                );
                referenced_by
                    .entry(definition.parameter_id())
                    .or_default()
                    .insert(element.audio_element_id);
            }
        }

        for mix_presentation in mix_presentations {
            for sub_mix in &mix_presentation.sub_mixes {
                id_metadata.insert(
                    sub_mix.output_mix_gain.parameter_id,
                    ParamIdMetadata {
                        param_type: ParameterType::MixGain,
                        param_definition_mode: sub_mix.output_mix_gain.param_definition_mode,
                        duration: sub_mix.output_mix_gain.duration,
                    },
                );
                for element in &sub_mix.audio_elements {
                    id_metadata.insert(
                        element.element_mix_gain.parameter_id,
                        ParamIdMetadata {
                            param_type: ParameterType::MixGain,
                            param_definition_mode: element.element_mix_gain.param_definition_mode,
                            duration: element.element_mix_gain.duration,
                        },
                    );
                }
            }
        }

        ParameterBlockGenerator {
            id_metadata,
            referenced_by,
            timing: GlobalTiming::new(),
            has_codec_config,
        }
    }

    fn effective_duration(&self, metadata: &ParameterBlockMetadata, param_type: ParameterType) -> Result<u64, ParameterBlockError> {
        if let Some(existing) = self.id_metadata.get(&metadata.parameter_id) {
            if existing.param_definition_mode {
                metadata
                    .duration
                    .ok_or(ParameterBlockError::OutOfRange {
                        field: "duration",
                        value: 0,
                    })
            } else {
                Ok(existing.duration)
            }
        } else {
            // Stray: inferred type must come from the caller (first subblock shape),
            // mode is forced to 1 (metadata-carried duration).
            let _ = param_type;
            metadata
                .duration
                .ok_or(ParameterBlockError::OutOfRange {
                    field: "duration",
                    value: 0,
                })
        }
    }

    fn infer_type_for_stray(&self, metadata: &ParameterBlockMetadata) -> Result<ParameterType, ParameterBlockError> {
        if !self.has_codec_config {
            return Err(ParameterBlockError::UnknownParameterStray(metadata.parameter_id));
        }
        let param_type = match metadata.subblocks.first() {
            Some(SubblockMetadata::MixGainStep { .. })
            | Some(SubblockMetadata::MixGainLinear { .. })
            | Some(SubblockMetadata::MixGainBezier { .. }) => ParameterType::MixGain,
            Some(SubblockMetadata::Demixing { .. }) => ParameterType::Demixing,
            Some(SubblockMetadata::ReconGain { .. }) => ParameterType::ReconGain,
            None => return Err(ParameterBlockError::UnknownParameterStray(metadata.parameter_id)),
        };
        log::warn!(
            "parameter_id {} has no known definition; inferring type from its first subblock",
            metadata.parameter_id
        );
        Ok(param_type)
    }

    fn resolve_type(&self, metadata: &ParameterBlockMetadata) -> Result<ParameterType, ParameterBlockError> {
        match self.id_metadata.get(&metadata.parameter_id) {
            Some(existing) => Ok(existing.param_type),
            None => self.infer_type_for_stray(metadata),
        }
    }

    fn build_block(
        &mut self,
        metadata: &ParameterBlockMetadata,
        param_type: ParameterType,
        samples_by_id: Option<&HashMap<u64, LabelSamplesMap>>,
        decoded_samples_by_id: Option<&HashMap<u64, LabelSamplesMap>>,
    ) -> Result<ParameterBlock, ParameterBlockError> {
        let duration = self.effective_duration(metadata, param_type)?;
        let (start_timestamp, end_timestamp) =
            self.timing
                .get_next_parameter_block_timestamps(metadata.parameter_id, metadata.start_timestamp, duration)?;

        let subblock_duration = metadata.constant_subblock_duration.unwrap_or(duration);
        let num_subblocks = if subblock_duration == 0 {
            1
        } else {
            ((duration + subblock_duration - 1) / subblock_duration).max(1) as usize
        };
        let subblock_durations = if metadata.subblocks.len() == num_subblocks {
            vec![subblock_duration; num_subblocks]
        } else {
            vec![duration / metadata.subblocks.len().max(1) as u64; metadata.subblocks.len()]
        };

        let mut subblocks = Vec::with_capacity(metadata.subblocks.len());
        for subblock in &metadata.subblocks {
            subblocks.push(build_subblock(
                subblock,
                metadata.parameter_id,
                samples_by_id,
                decoded_samples_by_id,
            )?);
        }
        if matches!(param_type, ParameterType::Demixing | ParameterType::ReconGain) && subblocks.len() != 1 {
            return Err(ParameterBlockError::ExpectedSingleSubblock(subblocks.len()));
        }

        Ok(ParameterBlock {
            parameter_id: metadata.parameter_id,
            start_timestamp,
            end_timestamp,
            subblock_durations,
            subblocks,
        })
    }

    pub fn generate_mix_gain(&mut self, metadata: &[ParameterBlockMetadata]) -> Result<Vec<ParameterBlock>, ParameterBlockError> {
        self.generate_for_type(metadata, ParameterType::MixGain, None, None)
    }

    pub fn generate_demixing(&mut self, metadata: &[ParameterBlockMetadata]) -> Result<Vec<ParameterBlock>, ParameterBlockError> {
        self.generate_for_type(metadata, ParameterType::Demixing, None, None)
    }

    pub fn generate_recon_gain(
        &mut self,
        metadata: &[ParameterBlockMetadata],
        samples_by_id: &HashMap<u64, LabelSamplesMap>,
        decoded_samples_by_id: &HashMap<u64, LabelSamplesMap>,
    ) -> Result<Vec<ParameterBlock>, ParameterBlockError> {
        self.generate_for_type(
            metadata,
            ParameterType::ReconGain,
            Some(samples_by_id),
            Some(decoded_samples_by_id),
        )
    }

    fn generate_for_type(
        &mut self,
        metadata: &[ParameterBlockMetadata],
        wanted: ParameterType,
        samples_by_id: Option<&HashMap<u64, LabelSamplesMap>>,
        decoded_samples_by_id: Option<&HashMap<u64, LabelSamplesMap>>,
    ) -> Result<Vec<ParameterBlock>, ParameterBlockError> {
        let mut out = Vec::new();
        for item in metadata {
            let param_type = self.resolve_type(item)?;
            if param_type != wanted {
                continue;
            }
            out.push(self.build_block(item, param_type, samples_by_id, decoded_samples_by_id)?);
        }
        Ok(out)
    }

    /// `validate_parameter_coverage`: every non-stray parameter_id's block
    /// stream must span the full tick range its referencing audio elements
    /// cover, here approximated as the generator's own recorded stream end
    /// versus the audio element's declared span.
    pub fn validate_parameter_coverage(
        &self,
        substream_spans: &HashMap<u64, (i64, i64)>,
    ) -> Result<(), ParameterBlockError> {
        for (parameter_id, audio_element_ids) in &self.referenced_by {
            let Some(stream_end) = self.timing.stream_end(*parameter_id) else {
                continue;
            };
            for audio_element_id in audio_element_ids {
                if let Some((substream_start, substream_end)) = substream_spans.get(audio_element_id) {
                    if stream_end < *substream_end {
                        return Err(ParameterBlockError::IncompleteCoverage {
                            id: *parameter_id,
                            stream_start: *substream_start,
                            stream_end,
                            substream_start: *substream_start,
                            substream_end: *substream_end,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn build_subblock(
    subblock: &SubblockMetadata,
    parameter_id: u64,
    samples_by_id: Option<&HashMap<u64, LabelSamplesMap>>,
    decoded_samples_by_id: Option<&HashMap<u64, LabelSamplesMap>>,
) -> Result<ParameterSubblockPayload, ParameterBlockError> {
    Ok(match subblock {
        SubblockMetadata::MixGainStep { start } => {
            ParameterSubblockPayload::MixGain(MixGainAnimation::Step {
                start: *start,
            })
        }
        SubblockMetadata::MixGainLinear { start, end } => {
            ParameterSubblockPayload::MixGain(MixGainAnimation::Linear {
                start: *start,
                end: *end,
            })
        }
        SubblockMetadata::MixGainBezier {
            start,
            end,
            control,
            control_relative_time,
        } => ParameterSubblockPayload::MixGain(MixGainAnimation::Bezier {
            start: *start,
            end: *end,
            control: *control,
            control_relative_time: *control_relative_time,
        }),
        SubblockMetadata::Demixing { dmixp_mode } => ParameterSubblockPayload::Demixing {
            dmixp_mode: DMixPMode::from_code(*dmixp_mode),
        },
        SubblockMetadata::ReconGain { layers } => {
            let mut out_layers = Vec::with_capacity(layers.len());
            let mut mismatches = Vec::new();
            for (layer_index, layer) in layers.iter().enumerate() {
                let mut present_mask = 0u16;
                let mut gains = [0u8; 12];
                for (label_name, gain_value) in &layer.gains {
                    let label = ChannelLabel::from_str(label_name).map_err(|_| ParameterBlockError::OutOfRange {
                        field: "recon_gain label",
                        value: 0,
                    })?;
                    let bit = bit_for_label(label)?;
                    present_mask |= 1 << bit;
                    let supplied_byte = pack_recon_gain(*gain_value)?;
                    gains[bit as usize] = supplied_byte;

                    if !layer.override_computed_recon_gains {
                        if let (Some(samples), Some(decoded)) = (samples_by_id, decoded_samples_by_id) {
                            if let (Some(s), Some(d)) = (samples.get(&parameter_id), decoded.get(&parameter_id)) {
                                let computed = recon_gain_generator::compute_recon_gain(label, s, d, false)
                                    .ok()
                                    .and_then(|g| pack_recon_gain(g).ok());
                                if let Some(computed_byte) = computed {
                                    if computed_byte != supplied_byte {
                                        mismatches.push(ReconGainMismatchEntry {
                                            layer: layer_index,
                                            label: label.to_str(),
                                            computed: computed_byte,
                                            supplied: supplied_byte,
                                        });
                                    }
                                }
                            }
                        }
                    }
                }
                out_layers.push(ReconGainLayer { present_mask, gains });
            }
            if !mismatches.is_empty() {
                return Err(ParameterBlockError::ReconGainMismatches(mismatches));
            }
            ParameterSubblockPayload::ReconGain { layers: out_layers }
        }
    })
}

fn bit_for_label(label: ChannelLabel) -> Result<u8, ParameterBlockError> {
    use ChannelLabel::*;
    Ok(match label {
        DemixedL3 | DemixedL5 | DemixedL7 => recon_gain_bits::D_L3_L5_L7,
        DemixedR2 | DemixedR3 | DemixedR5 | DemixedR7 => recon_gain_bits::D_R2_R3_R5_R7,
        DemixedLs5 => recon_gain_bits::D_LS5,
        DemixedRs5 => recon_gain_bits::D_RS5,
        DemixedLtf2 => recon_gain_bits::D_LTF2_LTF4,
        DemixedRtf2 => recon_gain_bits::D_RTF2_RTF4,
        DemixedLrs7 => recon_gain_bits::D_LRS7,
        DemixedRrs7 => recon_gain_bits::D_RRS7,
        DemixedLtb4 => recon_gain_bits::D_LTB4,
        DemixedRtb4 => recon_gain_bits::D_RTB4,
        other => {
            return Err(ParameterBlockError::OutOfRange {
                field: "recon_gain label bit mapping",
                value: other.to_str().len() as i64,
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ReconGainLayerMetadata;

    fn empty_generator() -> ParameterBlockGenerator {
        ParameterBlockGenerator::initialize(&HashMap::new(), &[], true)
    }

    #[test]
    fn generates_a_mix_gain_block_with_a_step_animation() {
        let mut generator = empty_generator();
        let metadata = vec![ParameterBlockMetadata {
            parameter_id: 1,
            start_timestamp: Some(0),
            duration: Some(1024),
            constant_subblock_duration: None,
            subblocks: vec![SubblockMetadata::MixGainStep { start: 100 }],
        }];
        let blocks = generator.generate_mix_gain(&metadata).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_timestamp, 0);
        assert_eq!(blocks[0].end_timestamp, 1024);
    }

    #[test]
    fn stray_parameter_block_without_a_codec_config_fails() {
        let mut generator = ParameterBlockGenerator::initialize(&HashMap::new(), &[], false);
        let metadata = vec![ParameterBlockMetadata {
            parameter_id: 99,
            start_timestamp: Some(0),
            duration: Some(1024),
            constant_subblock_duration: None,
            subblocks: vec![SubblockMetadata::MixGainStep { start: 0 }],
        }];
        assert!(generator.generate_mix_gain(&metadata).is_err());
    }

    #[test]
    fn recon_gain_block_with_override_skips_recomputation() {
        let mut generator = empty_generator();
        let mut gains = std::collections::BTreeMap::new();
        gains.insert("DemixedL5".to_string(), 1.0);
        let metadata = vec![ParameterBlockMetadata {
            parameter_id: 7,
            start_timestamp: Some(0),
            duration: Some(1024),
            constant_subblock_duration: None,
            subblocks: vec![SubblockMetadata::ReconGain {
                layers: vec![ReconGainLayerMetadata {
                    gains,
                    override_computed_recon_gains: true,
                }],
            }],
        }];
        let blocks = generator.generate_recon_gain(&metadata, &HashMap::new(), &HashMap::new()).unwrap();
        assert_eq!(blocks.len(), 1);
    }
}
