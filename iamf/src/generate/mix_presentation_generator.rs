//! Mix-presentation generator (§4.4), grounded on
//! `mix_presentation_finalizer.cc`'s "copy user-provided loudness, render
//! nothing" posture: this crate ships no renderer, so loudness values are
//! copied verbatim from metadata rather than measured.

use crate::metadata::{LoudnessInfoMetadata, MixGainMetadata, MixPresentationMetadata, SubMixMetadata};
use crate::obu::audio_element::LoudspeakerLayout;
use crate::obu::mix_presentation::{
    check_profile_cardinality, AnchoredLoudnessElement, Layout, LoudnessInfo, MixGainParamDefinition,
    MixPresentation, MixPresentationLayout, MixPresentationTag, SubMix, SubMixAudioElement,
    INFO_TYPE_ANCHORED_LOUDNESS, INFO_TYPE_TRUE_PEAK,
};
use crate::utils::errors::MixPresentationError;

fn copy_sound_system(name: &str) -> Result<Layout, MixPresentationError> {
    Ok(match name {
        "Binaural" => Layout::Binaural,
        "Mono" => Layout::LoudspeakersSsConvention(LoudspeakerLayout::Mono),
        "Stereo" => Layout::LoudspeakersSsConvention(LoudspeakerLayout::Stereo),
        "5.1" => Layout::LoudspeakersSsConvention(LoudspeakerLayout::Surround5_1),
        "5.1.2" => Layout::LoudspeakersSsConvention(LoudspeakerLayout::Surround5_1_2),
        "5.1.4" => Layout::LoudspeakersSsConvention(LoudspeakerLayout::Surround5_1_4),
        "7.1" => Layout::LoudspeakersSsConvention(LoudspeakerLayout::Surround7_1),
        "7.1.2" => Layout::LoudspeakersSsConvention(LoudspeakerLayout::Surround7_1_2),
        "7.1.4" => Layout::LoudspeakersSsConvention(LoudspeakerLayout::Surround7_1_4),
        "3.1.2" => Layout::LoudspeakersSsConvention(LoudspeakerLayout::Surround3_1_2),
        _ => return Err(MixPresentationError::UnknownSoundSystem(0)),
    })
}

fn copy_info_type(true_peak: Option<i16>, anchored_loudness: &[crate::metadata::AnchoredLoudnessMetadata]) -> u32 {
    let mut info_type = 0u32;
    if true_peak.is_some() {
        info_type |= INFO_TYPE_TRUE_PEAK;
    }
    if !anchored_loudness.is_empty() {
        info_type |= INFO_TYPE_ANCHORED_LOUDNESS;
    }
    info_type
}

fn copy_user_integrated_loudness_and_peaks(metadata: &LoudnessInfoMetadata) -> (i16, i16, Option<i16>) {
    (metadata.integrated_loudness, metadata.digital_peak, metadata.true_peak)
}

fn copy_user_anchored_loudness(
    metadata: &[crate::metadata::AnchoredLoudnessMetadata],
) -> Option<Vec<AnchoredLoudnessElement>> {
    if metadata.is_empty() {
        return None;
    }
    Some(
        metadata
            .iter()
            .map(|entry| AnchoredLoudnessElement {
                anchor_element: entry.anchor_element,
                anchored_loudness: entry.anchored_loudness,
            })
            .collect(),
    )
}

fn copy_user_layout_extension() -> Option<Vec<u8>> {
    None
}

fn build_mix_gain(metadata: &MixGainMetadata) -> MixGainParamDefinition {
    MixGainParamDefinition {
        parameter_id: metadata.parameter_id,
        parameter_rate: metadata.parameter_rate,
        param_definition_mode: metadata.param_definition_mode,
        duration: metadata.duration,
        default_mix_gain: metadata.default_mix_gain,
    }
}

fn build_sub_mix(metadata: &SubMixMetadata) -> Result<SubMix, MixPresentationError> {
    let mut audio_elements = Vec::with_capacity(metadata.audio_elements.len());
    for element in &metadata.audio_elements {
        let headphones_rendering_mode = match element.rendering_config.headphones_rendering_mode.as_deref() {
            Some("Stereo") | None => crate::obu::mix_presentation::HeadphonesRenderingMode::Stereo,
            Some("Binaural") => crate::obu::mix_presentation::HeadphonesRenderingMode::Binaural,
            Some(_) => {
                return Err(MixPresentationError::OutOfRange {
                    field: "headphones_rendering_mode",
                    value: 0,
                });
            }
        };
        audio_elements.push(SubMixAudioElement {
            audio_element_id: element.audio_element_id,
            localized_element_annotations: element.localized_element_annotations.clone(),
            rendering_config: crate::obu::mix_presentation::RenderingConfig {
                headphones_rendering_mode,
                extension: element.rendering_config.extension.clone(),
            },
            element_mix_gain: build_mix_gain(&element.element_mix_gain),
        });
    }

    let mut layouts = Vec::with_capacity(metadata.loudness_layouts.len());
    for layout_metadata in &metadata.loudness_layouts {
        let loudness_layout = copy_sound_system(&layout_metadata.layout)?;
        let (integrated_loudness, digital_peak, true_peak) =
            copy_user_integrated_loudness_and_peaks(layout_metadata);
        let anchored_loudness = copy_user_anchored_loudness(&layout_metadata.anchored_loudness);
        let info_type = copy_info_type(true_peak, &layout_metadata.anchored_loudness);
        layouts.push(MixPresentationLayout {
            loudness_layout,
            loudness_info: LoudnessInfo {
                info_type,
                integrated_loudness,
                digital_peak,
                true_peak,
                anchored_loudness,
                layout_extension: copy_user_layout_extension(),
            },
        });
    }

    let sub_mix = SubMix {
        audio_elements,
        output_mix_gain: build_mix_gain(&metadata.output_mix_gain),
        layouts,
    };
    Ok(sub_mix)
}

/// `generate(append_build_information_tag_bool, metadata) → list<MixPresentation>`.
pub fn generate(
    append_build_information_tag: bool,
    metadata: &[MixPresentationMetadata],
    max_audio_elements_per_submix: usize,
) -> Result<Vec<MixPresentation>, MixPresentationError> {
    let mut seen_ids = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(metadata.len());

    for item in metadata {
        if !seen_ids.insert(item.mix_presentation_id) {
            return Err(MixPresentationError::DuplicateMixPresentationId(item.mix_presentation_id));
        }

        let mut sub_mixes = Vec::with_capacity(item.sub_mixes.len());
        for sub_mix_metadata in &item.sub_mixes {
            let sub_mix = build_sub_mix(sub_mix_metadata)?;
            check_profile_cardinality(&sub_mix, max_audio_elements_per_submix)?;
            sub_mixes.push(sub_mix);
        }

        let mut tags = vec![];
        if append_build_information_tag {
            tags.push(MixPresentationTag {
                tag_name: "build_information".to_string(),
                tag_value: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            });
        }
        if tags.len() > 255 {
            return Err(MixPresentationError::TooManyTags(tags.len()));
        }

        out.push(MixPresentation {
            mix_presentation_id: item.mix_presentation_id,
            annotations_language: item.annotations_language.clone(),
            localized_presentation_annotations: item.localized_presentation_annotations.clone(),
            sub_mixes,
            tags: Some(tags),
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{RenderingConfigMetadata, SubMixAudioElementMetadata};

    fn minimal_metadata() -> MixPresentationMetadata {
        MixPresentationMetadata {
            mix_presentation_id: 42,
            annotations_language: vec!["en-us".to_string()],
            localized_presentation_annotations: vec!["mix".to_string()],
            sub_mixes: vec![SubMixMetadata {
                audio_elements: vec![SubMixAudioElementMetadata {
                    audio_element_id: 1,
                    localized_element_annotations: vec![],
                    rendering_config: RenderingConfigMetadata {
                        headphones_rendering_mode: None,
                        extension: vec![],
                    },
                    element_mix_gain: MixGainMetadata {
                        parameter_id: 10,
                        parameter_rate: 48000,
                        param_definition_mode: false,
                        duration: 1024,
                        default_mix_gain: 0,
                    },
                }],
                output_mix_gain: MixGainMetadata {
                    parameter_id: 11,
                    parameter_rate: 48000,
                    param_definition_mode: false,
                    duration: 1024,
                    default_mix_gain: 0,
                },
                loudness_layouts: vec![LoudnessInfoMetadata {
                    layout: "Stereo".to_string(),
                    integrated_loudness: -1000,
                    digital_peak: -100,
                    true_peak: None,
                    anchored_loudness: vec![],
                }],
            }],
        }
    }

    #[test]
    fn generates_a_mix_presentation_with_a_build_information_tag() {
        let generated = generate(true, &[minimal_metadata()], 16).unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].tags.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn rejects_duplicate_mix_presentation_ids() {
        let metadata = vec![minimal_metadata(), minimal_metadata()];
        assert!(generate(false, &metadata, 16).is_err());
    }

    #[test]
    fn rejects_submixes_exceeding_the_profile_cardinality() {
        let result = generate(false, &[minimal_metadata()], 0);
        assert!(result.is_err());
    }
}
