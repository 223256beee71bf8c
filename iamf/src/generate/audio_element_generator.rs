//! Audio-element generator (§4.3), grounded on
//! `proto_to_obu/audio_element_generator.cc`: turns user metadata into
//! validated [`AudioElement`] records plus the derived per-substream channel
//! labeling a renderer needs.

use std::collections::HashMap;

use crate::channel_label::{self, ChannelLabel};
use crate::metadata::{AmbisonicsConfigMetadata, AudioElementConfigMetadata, AudioElementMetadata, CodecConfigMetadata};
use crate::obu::audio_element::{
    AmbisonicsConfig, AudioElement, AudioElementConfig, AudioElementType, ChannelAudioLayerConfig, DMixPMode,
    DefaultDemixingInfo, ExpandedLoudspeakerLayout, LoudspeakerLayout, ParameterDefinition, ScalableChannelLayoutConfig,
};
use crate::utils::errors::AudioElementError;

fn parse_loudspeaker_layout(name: &str) -> Result<LoudspeakerLayout, AudioElementError> {
    Ok(match name {
        "Mono" => LoudspeakerLayout::Mono,
        "Stereo" => LoudspeakerLayout::Stereo,
        "5.1" => LoudspeakerLayout::Surround5_1,
        "5.1.2" => LoudspeakerLayout::Surround5_1_2,
        "5.1.4" => LoudspeakerLayout::Surround5_1_4,
        "7.1" => LoudspeakerLayout::Surround7_1,
        "7.1.2" => LoudspeakerLayout::Surround7_1_2,
        "7.1.4" => LoudspeakerLayout::Surround7_1_4,
        "3.1.2" => LoudspeakerLayout::Surround3_1_2,
        "Binaural" => LoudspeakerLayout::Binaural,
        "Expanded" => LoudspeakerLayout::Expanded(ExpandedLoudspeakerLayout::Surround9_1_6),
        _ => {
            return Err(AudioElementError::OutOfRange {
                field: "loudspeaker_layout",
                value: 0,
            });
        }
    })
}

fn parse_expanded_layout(name: &str) -> Result<ExpandedLoudspeakerLayout, AudioElementError> {
    match name {
        "9.1.6" => Ok(ExpandedLoudspeakerLayout::Surround9_1_6),
        _ => Err(AudioElementError::OutOfRange {
            field: "expanded_loudspeaker_layout",
            value: 0,
        }),
    }
}

/// Per-layer derived channel numbers, tracked monotone non-decreasing across layers (§4.3.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelNumbers {
    pub surround: u32,
    pub lfe: u32,
    pub height: u32,
}

pub struct FinalizedScalableLayout {
    pub substream_id_to_labels: HashMap<u64, Vec<ChannelLabel>>,
    pub channel_numbers_for_layers: Vec<ChannelNumbers>,
}

fn channel_numbers_for(labels: &[ChannelLabel]) -> ChannelNumbers {
    use ChannelLabel::*;
    let mut numbers = ChannelNumbers::default();
    for label in labels {
        match label {
            Lfe => numbers.lfe += 1,
            Ltf2 | Rtf2 | Ltf4 | Rtf4 | Ltb4 | Rtb4 | Ltf3 | Rtf3 => numbers.height += 1,
            _ => numbers.surround += 1,
        }
    }
    numbers
}

/// `finalize_scalable_channel_layout_config` (§4.3.1).
pub fn finalize_scalable_channel_layout_config(
    substream_ids: &[u64],
    layers: &[ChannelAudioLayerConfig],
) -> Result<FinalizedScalableLayout, AudioElementError> {
    if layers.iter().any(|l| l.loudspeaker_layout.is_expanded()) && layers.len() != 1 {
        return Err(AudioElementError::ExpandedLayoutRequiresSingleLayer(layers.len()));
    }

    let mut substream_id_to_labels = HashMap::new();
    let mut channel_numbers_for_layers = Vec::with_capacity(layers.len());
    let mut accumulated: Vec<ChannelLabel> = Vec::new();
    let mut substream_cursor = 0usize;
    let mut previous_numbers = ChannelNumbers::default();

    for (index, layer) in layers.iter().enumerate() {
        let ordered_labels = channel_label::ear_channel_order_from_layout(layer.loudspeaker_layout)
            .map_err(|_| AudioElementError::OutOfRange {
                field: "loudspeaker_layout",
                value: index as i64,
            })?;
        let new_labels: Vec<ChannelLabel> = ordered_labels
            .into_iter()
            .filter(|label| !accumulated.contains(label))
            .collect();

        let total_substreams = layer.substream_count as usize;
        if layer.coupled_substream_count as usize > layer.substream_count as usize {
            return Err(AudioElementError::CoupledExceedsTotal {
                index,
                coupled: layer.coupled_substream_count,
                total: layer.substream_count,
            });
        }

        let mut label_cursor = new_labels.iter();
        for i in 0..total_substreams {
            let substream_id = *substream_ids
                .get(substream_cursor + i)
                .ok_or(AudioElementError::OutOfRange {
                    field: "substream_ids",
                    value: (substream_cursor + i) as i64,
                })?;
            let mut labels_for_substream = Vec::with_capacity(2);
            if i < layer.coupled_substream_count as usize {
                labels_for_substream.push(*label_cursor.next().ok_or(AudioElementError::OutOfRange {
                    field: "channel_mapping",
                    value: i as i64,
                })?);
                labels_for_substream.push(*label_cursor.next().ok_or(AudioElementError::OutOfRange {
                    field: "channel_mapping",
                    value: i as i64,
                })?);
            } else {
                labels_for_substream.push(*label_cursor.next().ok_or(AudioElementError::OutOfRange {
                    field: "channel_mapping",
                    value: i as i64,
                })?);
            }
            substream_id_to_labels.insert(substream_id, labels_for_substream);
        }
        substream_cursor += total_substreams;

        accumulated.extend(new_labels);
        let numbers = channel_numbers_for(&accumulated);
        if numbers.surround < previous_numbers.surround
            || numbers.lfe < previous_numbers.lfe
            || numbers.height < previous_numbers.height
        {
            return Err(AudioElementError::NonMonotonicLayerChannelCount {
                index,
                actual: numbers.surround + numbers.lfe + numbers.height,
                previous: previous_numbers.surround + previous_numbers.lfe + previous_numbers.height,
            });
        }
        previous_numbers = numbers;
        channel_numbers_for_layers.push(numbers);
    }

    Ok(FinalizedScalableLayout {
        substream_id_to_labels,
        channel_numbers_for_layers,
    })
}

fn build_config(
    config: &AudioElementConfigMetadata,
) -> Result<(AudioElementType, AudioElementConfig), AudioElementError> {
    match config {
        AudioElementConfigMetadata::ChannelBased { layers } => {
            let mut out_layers = Vec::with_capacity(layers.len());
            for layer in layers {
                let mut loudspeaker_layout = parse_loudspeaker_layout(&layer.loudspeaker_layout)?;
                if loudspeaker_layout.is_expanded() {
                    let expanded_name = layer.expanded_loudspeaker_layout.as_deref().ok_or(
                        AudioElementError::ExpandedLayoutRequiresSingleLayer(layers.len()),
                    )?;
                    loudspeaker_layout = LoudspeakerLayout::Expanded(parse_expanded_layout(expanded_name)?);
                }
                out_layers.push(ChannelAudioLayerConfig {
                    loudspeaker_layout,
                    output_gain_is_present: layer.output_gain_is_present,
                    recon_gain_is_present: layer.recon_gain_is_present,
                    substream_count: layer.substream_count,
                    coupled_substream_count: layer.coupled_substream_count,
                    output_gain_flag: layer.output_gain_flag,
                    output_gain: layer.output_gain,
                });
            }
            if let Some((first, rest)) = out_layers.split_first() {
                if first.recon_gain_is_present {
                    return Err(AudioElementError::ReconGainPresentOnFirstLayer);
                }
                let _ = rest;
            }
            Ok((
                AudioElementType::ChannelBased,
                AudioElementConfig::Channel(ScalableChannelLayoutConfig { layers: out_layers }),
            ))
        }
        AudioElementConfigMetadata::SceneBased { ambisonics_config } => {
            let ambisonics = match ambisonics_config {
                AmbisonicsConfigMetadata::Mono {
                    output_channel_count,
                    substream_count,
                    channel_mapping,
                } => {
                    if channel_mapping.len() != *output_channel_count as usize {
                        return Err(AudioElementError::AmbisonicsMonoChannelMappingLengthMismatch {
                            actual: channel_mapping.len(),
                            expected: *output_channel_count,
                        });
                    }
                    for entry in channel_mapping {
                        if *entry != 255 && *entry as u32 >= *substream_count {
                            return Err(AudioElementError::AmbisonicsMonoChannelMappingOutOfRange(
                                *entry,
                                *substream_count,
                            ));
                        }
                    }
                    AmbisonicsConfig::Mono {
                        output_channel_count: *output_channel_count,
                        substream_count: *substream_count,
                        channel_mapping: channel_mapping.clone(),
                    }
                }
                AmbisonicsConfigMetadata::Projection {
                    output_channel_count,
                    substream_count,
                    coupled_substream_count,
                    demixing_matrix,
                } => {
                    let expected = (*substream_count + *coupled_substream_count) * *output_channel_count;
                    if demixing_matrix.len() != expected as usize {
                        return Err(AudioElementError::AmbisonicsProjectionMatrixLengthMismatch {
                            actual: demixing_matrix.len(),
                            expected,
                        });
                    }
                    AmbisonicsConfig::Projection {
                        output_channel_count: *output_channel_count,
                        substream_count: *substream_count,
                        coupled_substream_count: *coupled_substream_count,
                        demixing_matrix: demixing_matrix.clone(),
                    }
                }
            };
            Ok((AudioElementType::SceneBased, AudioElementConfig::Scene(ambisonics)))
        }
        AudioElementConfigMetadata::ObjectBased { num_objects, extension } => Ok((
            AudioElementType::ObjectBased,
            AudioElementConfig::Object {
                num_objects: *num_objects,
                extension: extension.clone(),
            },
        )),
    }
}

fn build_parameter_definitions(
    item: &AudioElementMetadata,
    codec_config: &CodecConfigMetadata,
) -> Result<Vec<ParameterDefinition>, AudioElementError> {
    use crate::metadata::ParamDefinitionTypeMetadata;

    let mut definitions = Vec::with_capacity(item.audio_element_params.len());
    for param in &item.audio_element_params {
        match &param.param_definition_type {
            ParamDefinitionTypeMetadata::Demixing => {
                if !param.param_definition_mode && param.duration != codec_config.samples_per_frame {
                    return Err(AudioElementError::ParamDurationMismatch {
                        actual: param.duration,
                        expected: codec_config.samples_per_frame,
                    });
                }
                definitions.push(ParameterDefinition::Demixing {
                    parameter_id: param.parameter_id,
                    parameter_rate: param.parameter_rate,
                    param_definition_mode: param.param_definition_mode,
                    duration: param.duration,
                    default_demixing_info: DefaultDemixingInfo {
                        default_dmixp_mode: DMixPMode::from_code(param.default_dmixp_mode.unwrap_or(0)),
                        default_w: param.default_w.unwrap_or(0),
                    },
                });
            }
            ParamDefinitionTypeMetadata::ReconGain => {
                if !param.param_definition_mode && param.duration != codec_config.samples_per_frame {
                    return Err(AudioElementError::ParamDurationMismatch {
                        actual: param.duration,
                        expected: codec_config.samples_per_frame,
                    });
                }
                definitions.push(ParameterDefinition::ReconGain {
                    parameter_id: param.parameter_id,
                    parameter_rate: param.parameter_rate,
                    param_definition_mode: param.param_definition_mode,
                    duration: param.duration,
                });
            }
            ParamDefinitionTypeMetadata::MixGain => {
                return Err(AudioElementError::DeprecatedFieldIgnored("mix_gain on an audio element"));
            }
        }
    }
    Ok(definitions)
}

/// `generate(codec_configs, metadata) → map<audio_element_id, AudioElement>`.
pub fn generate(
    codec_configs: &HashMap<u64, CodecConfigMetadata>,
    metadata: &[AudioElementMetadata],
) -> Result<HashMap<u64, AudioElement>, AudioElementError> {
    let mut out = HashMap::with_capacity(metadata.len());
    for item in metadata {
        if out.contains_key(&item.audio_element_id) {
            return Err(AudioElementError::DuplicateAudioElementId(item.audio_element_id));
        }
        let codec_config = codec_configs
            .get(&item.codec_config_id)
            .ok_or(AudioElementError::UnknownCodecConfigId(item.codec_config_id, item.audio_element_id))?;

        let (audio_element_type, config) = build_config(&item.config)?;
        if let AudioElementConfig::Channel(scalable) = &config {
            finalize_scalable_channel_layout_config(&item.substream_ids, &scalable.layers)?;
        }

        let parameter_definitions = build_parameter_definitions(item, codec_config)?;

        out.insert(
            item.audio_element_id,
            AudioElement {
                audio_element_id: item.audio_element_id,
                audio_element_type,
                codec_config_id: item.codec_config_id,
                substream_ids: item.substream_ids.clone(),
                parameter_definitions,
                config,
            },
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AudioElementParamMetadata, ChannelAudioLayerConfigMetadata, ParamDefinitionTypeMetadata};

    fn codec_config(id: u64) -> CodecConfigMetadata {
        CodecConfigMetadata {
            codec_config_id: id,
            codec_id: "ipcm".to_string(),
            samples_per_frame: 1024,
            audio_roll_distance: -1,
            decoder_config: vec![],
        }
    }

    #[test]
    fn generates_a_stereo_channel_based_element() {
        let mut codec_configs = HashMap::new();
        codec_configs.insert(1, codec_config(1));

        let metadata = vec![AudioElementMetadata {
            audio_element_id: 1,
            codec_config_id: 1,
            substream_ids: vec![0],
            audio_element_params: vec![AudioElementParamMetadata {
                parameter_id: 100,
                parameter_rate: 48000,
                param_definition_mode: false,
                duration: 1024,
                param_definition_type: ParamDefinitionTypeMetadata::Demixing,
                default_dmixp_mode: Some(0),
                default_w: Some(0),
            }],
            config: AudioElementConfigMetadata::ChannelBased {
                layers: vec![ChannelAudioLayerConfigMetadata {
                    loudspeaker_layout: "Stereo".to_string(),
                    expanded_loudspeaker_layout: None,
                    output_gain_is_present: false,
                    recon_gain_is_present: false,
                    substream_count: 1,
                    coupled_substream_count: 1,
                    output_gain_flag: 0,
                    output_gain: 0,
                }],
            },
        }];

        let generated = generate(&codec_configs, &metadata).unwrap();
        let element = &generated[&1];
        assert_eq!(element.substream_ids, vec![0]);
        assert_eq!(element.parameter_definitions.len(), 1);
    }

    #[test]
    fn rejects_duplicate_audio_element_ids() {
        let mut codec_configs = HashMap::new();
        codec_configs.insert(1, codec_config(1));
        let element = AudioElementMetadata {
            audio_element_id: 1,
            codec_config_id: 1,
            substream_ids: vec![0],
            audio_element_params: vec![],
            config: AudioElementConfigMetadata::ChannelBased {
                layers: vec![ChannelAudioLayerConfigMetadata {
                    loudspeaker_layout: "Mono".to_string(),
                    expanded_loudspeaker_layout: None,
                    output_gain_is_present: false,
                    recon_gain_is_present: false,
                    substream_count: 1,
                    coupled_substream_count: 0,
                    output_gain_flag: 0,
                    output_gain: 0,
                }],
            },
        };
        let metadata = vec![element.clone(), element];
        assert!(generate(&codec_configs, &metadata).is_err());
    }

    #[test]
    fn rejects_mismatched_demixing_duration() {
        let mut codec_configs = HashMap::new();
        codec_configs.insert(1, codec_config(1));
        let metadata = vec![AudioElementMetadata {
            audio_element_id: 1,
            codec_config_id: 1,
            substream_ids: vec![0],
            audio_element_params: vec![AudioElementParamMetadata {
                parameter_id: 100,
                parameter_rate: 48000,
                param_definition_mode: false,
                duration: 512,
                param_definition_type: ParamDefinitionTypeMetadata::Demixing,
                default_dmixp_mode: Some(0),
                default_w: Some(0),
            }],
            config: AudioElementConfigMetadata::ChannelBased {
                layers: vec![ChannelAudioLayerConfigMetadata {
                    loudspeaker_layout: "Mono".to_string(),
                    expanded_loudspeaker_layout: None,
                    output_gain_is_present: false,
                    recon_gain_is_present: false,
                    substream_count: 1,
                    coupled_substream_count: 0,
                    output_gain_flag: 0,
                    output_gain: 0,
                }],
            },
        }];
        assert!(generate(&codec_configs, &metadata).is_err());
    }
}
