use std::collections::HashMap;
use std::io::Read;

use anyhow::{bail, Context, Result};

use iamf::generate::parameter_block_generator::ParameterBlockGenerator;
use iamf::generate::{audio_element_generator, mix_presentation_generator};
use iamf::metadata::UserMetadata;
use iamf::obu::arbitrary_obu::ArbitraryObu;
use iamf::obu::audio_element::AudioElement;
use iamf::obu::audio_frame::AudioFrame;
use iamf::obu::codec_config::{CodecConfig, CodecId};
use iamf::obu::sequence_header::{Profile, SequenceHeader};
use iamf::sequencer::{InMemorySequenceWriter, Sequencer};

use crate::cli::command::GenerateArgs;

fn parse_codec_id(codec_id: &str) -> Result<CodecId> {
    Ok(match codec_id {
        "Lpcm" | "LPCM" | "lpcm" => CodecId::Lpcm,
        "Opus" | "opus" => CodecId::Opus,
        "Aac" | "AAC" | "aac" => CodecId::Aac,
        "Flac" | "FLAC" | "flac" => CodecId::Flac,
        other => bail!("unknown codec_id {other:?}"),
    })
}

fn load_metadata(path: &std::path::Path) -> Result<UserMetadata> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading metadata document from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_yaml_ng::from_str(&text).context("parsing user metadata")
}

/// Runs the three generators over deserialized metadata, groups the result
/// into temporal units, and sequences everything to `args.output`.
///
/// Codec encode and on-disk audio ingestion are excluded collaborators (the
/// metadata document carries no sample data), so each audio element's
/// substreams are sequenced with a single placeholder frame at timestamp 0.
/// This is enough to exercise every sequencer invariant without a renderer.
pub fn cmd_generate(args: &GenerateArgs) -> Result<()> {
    let metadata = load_metadata(&args.metadata)?;

    let codec_config_metadata: HashMap<_, _> = metadata
        .codec_configs
        .iter()
        .map(|item| (item.codec_config_id, item.clone()))
        .collect();

    let codec_configs = metadata
        .codec_configs
        .iter()
        .map(|item| {
            Ok(CodecConfig {
                codec_config_id: item.codec_config_id,
                codec_id: parse_codec_id(&item.codec_id)?,
                samples_per_frame: item.samples_per_frame,
                audio_roll_distance: item.audio_roll_distance,
                decoder_config: item.decoder_config.clone(),
            })
        })
        .collect::<Result<Vec<CodecConfig>>>()?;

    let audio_elements_by_id = audio_element_generator::generate(&codec_config_metadata, &metadata.audio_elements)
        .context("generating audio elements")?;
    let mut audio_elements: Vec<AudioElement> = audio_elements_by_id.values().cloned().collect();
    audio_elements.sort_by_key(|element| element.audio_element_id);

    let mix_presentations = mix_presentation_generator::generate(
        metadata.append_build_information_tag,
        &metadata.mix_presentations,
        args.max_audio_elements_per_submix,
    )
    .context("generating mix presentations")?;

    let has_codec_config = !codec_configs.is_empty();
    let mut parameter_block_generator =
        ParameterBlockGenerator::initialize(&audio_elements_by_id, &mix_presentations, has_codec_config);
    let mut parameter_blocks = parameter_block_generator
        .generate_mix_gain(&metadata.parameter_blocks)
        .context("generating mix-gain parameter blocks")?;
    parameter_blocks.extend(
        parameter_block_generator
            .generate_demixing(&metadata.parameter_blocks)
            .context("generating demixing parameter blocks")?,
    );
    parameter_blocks.extend(
        parameter_block_generator
            .generate_recon_gain(&metadata.parameter_blocks, &HashMap::new(), &HashMap::new())
            .context("generating recon-gain parameter blocks")?,
    );
    // No substream spans are known without real encoded audio, so coverage
    // checking degrades to a no-op here; a caller with real substream spans
    // would pass them in.
    parameter_block_generator
        .validate_parameter_coverage(&HashMap::new())
        .context("validating parameter coverage")?;

    let audio_frames: Vec<(u64, AudioFrame, i64)> = audio_elements
        .iter()
        .flat_map(|element| {
            let samples_per_frame = codec_config_metadata
                .get(&element.codec_config_id)
                .map(|c| c.samples_per_frame as u32)
                .unwrap_or(1024);
            element.substream_ids.iter().map(move |substream_id| {
                (
                    element.audio_element_id,
                    AudioFrame {
                        substream_id: *substream_id,
                        num_samples_to_trim_at_start: 0,
                        num_samples_to_trim_at_end: 0,
                        samples_per_frame,
                        encoded_samples: vec![],
                    },
                    0i64,
                )
            })
        })
        .collect();

    let sequence_header = SequenceHeader {
        primary_profile: Profile::Simple,
        additional_profile: Profile::Simple,
    };

    let mut sequencer = Sequencer::new(InMemorySequenceWriter::default(), args.delay_descriptors);
    sequencer
        .pick_and_place(
            sequence_header,
            codec_configs,
            audio_elements,
            mix_presentations,
            audio_frames,
            parameter_blocks,
            Vec::<ArbitraryObu>::new(),
        )
        .context("sequencing the bitstream")?;

    let sink = sequencer.into_sink();
    let mut bytes = sink.descriptor_bytes;
    for (_, _, chunk) in &sink.temporal_unit_bytes {
        bytes.extend_from_slice(chunk);
    }
    if let Some(finalized) = sink.finalized_descriptor_bytes {
        bytes = finalized;
    }

    std::fs::write(&args.output, &bytes).with_context(|| format!("writing {}", args.output.display()))?;
    log::info!("wrote {} bytes to {}", bytes.len(), args.output.display());

    Ok(())
}
