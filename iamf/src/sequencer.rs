//! Sequencer (§4.9): orders descriptor OBUs and per-tick temporal units into
//! a serialized bitstream.
//!
//! The corpus ships concrete sinks that stream to a socket or a file; this
//! crate's reference sink buffers everything in memory instead, since no
//! streaming transport is part of this crate's surface.

use crate::obu::arbitrary_obu::ArbitraryObu;
use crate::obu::audio_element::AudioElement;
use crate::obu::codec_config::CodecConfig;
use crate::obu::header::{write_obu, ObuType, TrimInfo};
use crate::obu::mix_presentation::MixPresentation;
use crate::obu::parameter_block::ParameterBlock;
use crate::obu::sequence_header::SequenceHeader;
use crate::temporal_unit::TemporalUnit;
use crate::utils::bitstream_io::BitstreamIoWriter;
use crate::utils::errors::{ObuError, SequencerError};

/// The three hooks a concrete writer implements.
pub trait SequenceSink {
    fn push_serialized_descriptor_obus(
        &mut self,
        samples_per_frame: u64,
        sample_rate: u32,
        bit_depth: u16,
        first_untrimmed_timestamp: Option<i64>,
        num_channels: u32,
        bytes: &[u8],
    );

    fn push_serialized_temporal_unit(&mut self, timestamp: i64, num_untrimmed_samples: u32, bytes: &[u8]);

    fn push_finalized_descriptor_obus(&mut self, bytes: &[u8]);

    fn close_derived(&mut self) {}

    fn abort_derived(&mut self) {}
}

/// In-memory reference sink: buffers every serialized record it's handed.
#[derive(Debug, Default)]
pub struct InMemorySequenceWriter {
    pub descriptor_bytes: Vec<u8>,
    pub temporal_unit_bytes: Vec<(i64, u32, Vec<u8>)>,
    pub finalized_descriptor_bytes: Option<Vec<u8>>,
    pub first_untrimmed_timestamp: Option<i64>,
    pub closed: bool,
    pub aborted: bool,
}

impl SequenceSink for InMemorySequenceWriter {
    fn push_serialized_descriptor_obus(
        &mut self,
        _samples_per_frame: u64,
        _sample_rate: u32,
        _bit_depth: u16,
        first_untrimmed_timestamp: Option<i64>,
        _num_channels: u32,
        bytes: &[u8],
    ) {
        self.descriptor_bytes = bytes.to_vec();
        self.first_untrimmed_timestamp = first_untrimmed_timestamp;
    }

    fn push_serialized_temporal_unit(&mut self, timestamp: i64, num_untrimmed_samples: u32, bytes: &[u8]) {
        self.temporal_unit_bytes.push((timestamp, num_untrimmed_samples, bytes.to_vec()));
    }

    fn push_finalized_descriptor_obus(&mut self, bytes: &[u8]) {
        self.finalized_descriptor_bytes = Some(bytes.to_vec());
    }

    fn close_derived(&mut self) {
        self.closed = true;
    }

    fn abort_derived(&mut self) {
        self.aborted = true;
    }
}

const DEFAULT_SAMPLES_PER_FRAME: u64 = 1024;
const DEFAULT_SAMPLE_RATE: u32 = 48000;
const DEFAULT_BIT_DEPTH: u16 = 16;
const DEFAULT_NUM_CHANNELS: u32 = 2;

struct Descriptors<'a> {
    sequence_header: &'a SequenceHeader,
    codec_configs: &'a [CodecConfig],
    audio_elements: &'a [AudioElement],
    mix_presentations: &'a [MixPresentation],
    arbitrary: &'a [ArbitraryObu],
}

fn serialize_descriptors(descriptors: &Descriptors) -> Result<Vec<u8>, ObuError> {
    let mut writer = BitstreamIoWriter::new();
    write_obu(&mut writer, ObuType::SequenceHeader, None, &descriptors.sequence_header.write_payload()?)?;
    for codec_config in descriptors.codec_configs {
        write_obu(&mut writer, ObuType::CodecConfig, None, &codec_config.write_payload()?)?;
    }
    for audio_element in descriptors.audio_elements {
        write_obu(&mut writer, ObuType::AudioElement, None, &audio_element.write_payload()?)?;
    }
    for mix_presentation in descriptors.mix_presentations {
        write_obu(&mut writer, ObuType::MixPresentation, None, &mix_presentation.write_payload()?)?;
    }
    for arbitrary_obu in descriptors.arbitrary {
        write_obu(&mut writer, ObuType::Arbitrary, None, &arbitrary_obu.write_payload()?)?;
    }
    writer.into_bytes().map_err(|_| ObuError::UnexpectedEof("descriptor obus"))
}

fn serialize_temporal_unit(unit: &TemporalUnit) -> Result<Vec<u8>, ObuError> {
    let mut writer = BitstreamIoWriter::new();
    for block in unit.parameter_blocks() {
        write_obu(&mut writer, ObuType::ParameterBlock, None, &block.write_payload()?)?;
    }
    for (_, frame) in unit.audio_frames() {
        let trim = Some(TrimInfo {
            num_samples_to_trim_at_start: frame.num_samples_to_trim_at_start as u64,
            num_samples_to_trim_at_end: frame.num_samples_to_trim_at_end as u64,
        });
        write_obu(
            &mut writer,
            ObuType::AudioFrame((frame.substream_id & 0x1f) as u8),
            trim,
            &frame.write_payload()?,
        )?;
    }
    for arbitrary_obu in unit.arbitrary_obus() {
        write_obu(&mut writer, ObuType::Arbitrary, None, &arbitrary_obu.write_payload()?)?;
    }
    writer.into_bytes().map_err(|_| ObuError::UnexpectedEof("temporal unit"))
}

fn derive_summary_properties(codec_configs: &[CodecConfig]) -> (u64, u32, u16, u32) {
    let samples_per_frame = codec_configs
        .first()
        .map(|c| c.samples_per_frame)
        .unwrap_or(DEFAULT_SAMPLES_PER_FRAME);
    (samples_per_frame, DEFAULT_SAMPLE_RATE, DEFAULT_BIT_DEPTH, DEFAULT_NUM_CHANNELS)
}

enum DescriptorState {
    NotPushed,
    Delayed {
        sequence_header: SequenceHeader,
        codec_configs: Vec<CodecConfig>,
        audio_elements: Vec<AudioElement>,
        mix_presentations: Vec<MixPresentation>,
        arbitrary: Vec<ArbitraryObu>,
    },
    Pushed { serialized_len: usize },
}

pub struct Sequencer<S: SequenceSink> {
    sink: S,
    descriptor_state: DescriptorState,
    closed: bool,
    failed: bool,
    last_timestamp: Option<i64>,
    trim_prefix_ended: bool,
    delay_descriptors: bool,
}

impl<S: SequenceSink> Sequencer<S> {
    pub fn new(sink: S, delay_descriptors: bool) -> Self {
        Sequencer {
            sink,
            descriptor_state: DescriptorState::NotPushed,
            closed: false,
            failed: false,
            last_timestamp: None,
            trim_prefix_ended: false,
            delay_descriptors,
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn push_descriptor_obus(
        &mut self,
        sequence_header: SequenceHeader,
        codec_configs: Vec<CodecConfig>,
        audio_elements: Vec<AudioElement>,
        mix_presentations: Vec<MixPresentation>,
        descriptor_arbitrary: Vec<ArbitraryObu>,
    ) -> Result<(), SequencerError> {
        if !matches!(self.descriptor_state, DescriptorState::NotPushed) {
            return Err(SequencerError::DescriptorsAlreadyPushed);
        }

        if self.delay_descriptors {
            self.descriptor_state = DescriptorState::Delayed {
                sequence_header,
                codec_configs,
                audio_elements,
                mix_presentations,
                arbitrary: descriptor_arbitrary,
            };
            return Ok(());
        }

        self.flush_descriptors(
            &sequence_header,
            &codec_configs,
            &audio_elements,
            &mix_presentations,
            &descriptor_arbitrary,
            Some(0),
        )
    }

    fn flush_descriptors(
        &mut self,
        sequence_header: &SequenceHeader,
        codec_configs: &[CodecConfig],
        audio_elements: &[AudioElement],
        mix_presentations: &[MixPresentation],
        arbitrary: &[ArbitraryObu],
        first_untrimmed_timestamp: Option<i64>,
    ) -> Result<(), SequencerError> {
        let descriptors = Descriptors {
            sequence_header,
            codec_configs,
            audio_elements,
            mix_presentations,
            arbitrary,
        };
        let bytes = serialize_descriptors(&descriptors)?;
        let (samples_per_frame, sample_rate, bit_depth, num_channels) = derive_summary_properties(codec_configs);
        self.sink.push_serialized_descriptor_obus(
            samples_per_frame,
            sample_rate,
            bit_depth,
            first_untrimmed_timestamp,
            num_channels,
            &bytes,
        );
        self.descriptor_state = DescriptorState::Pushed { serialized_len: bytes.len() };
        Ok(())
    }

    pub fn push_temporal_unit(&mut self, unit: &TemporalUnit) -> Result<(), SequencerError> {
        if self.closed {
            return Err(SequencerError::AlreadyClosed);
        }

        if let DescriptorState::Delayed {
            sequence_header,
            codec_configs,
            audio_elements,
            mix_presentations,
            arbitrary,
        } = &self.descriptor_state
        {
            let (samples_per_frame, ..) = derive_summary_properties(codec_configs);
            let trim_start = unit.num_samples_to_trim_at_start();
            if (trim_start as u64) < samples_per_frame {
                let (sequence_header, codec_configs, audio_elements, mix_presentations, arbitrary) = (
                    sequence_header.clone(),
                    codec_configs.clone(),
                    audio_elements.clone(),
                    mix_presentations.clone(),
                    arbitrary.clone(),
                );
                let first_untrimmed_timestamp = unit.start_timestamp() + trim_start as i64;
                self.flush_descriptors(
                    &sequence_header,
                    &codec_configs,
                    &audio_elements,
                    &mix_presentations,
                    &arbitrary,
                    Some(first_untrimmed_timestamp),
                )?;
            }
        }

        if matches!(self.descriptor_state, DescriptorState::NotPushed) {
            return Err(SequencerError::DescriptorsNotYetPushed);
        }

        if let Some(previous) = self.last_timestamp {
            if unit.start_timestamp() < previous {
                self.failed = true;
                return Err(SequencerError::OutOfOrderTemporalUnit {
                    previous,
                    next: unit.start_timestamp(),
                });
            }
        }

        let trim_start = unit.num_samples_to_trim_at_start();
        if trim_start == 0 {
            self.trim_prefix_ended = true;
        } else if self.trim_prefix_ended {
            self.failed = true;
            return Err(SequencerError::TrimAfterPrefixEnded {
                timestamp: unit.start_timestamp(),
            });
        }

        let bytes = match serialize_temporal_unit(unit) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.failed = true;
                return Err(SequencerError::Serialization(err));
            }
        };
        self.sink
            .push_serialized_temporal_unit(unit.start_timestamp(), unit.num_untrimmed_samples(), &bytes);
        self.last_timestamp = Some(unit.start_timestamp());
        Ok(())
    }

    pub fn update_descriptor_obus_and_close(
        &mut self,
        sequence_header: &SequenceHeader,
        codec_configs: &[CodecConfig],
        audio_elements: &[AudioElement],
        mix_presentations: &[MixPresentation],
        descriptor_arbitrary: &[ArbitraryObu],
    ) -> Result<(), SequencerError> {
        let DescriptorState::Pushed { serialized_len } = &self.descriptor_state else {
            return Err(SequencerError::DescriptorsNotYetPushed);
        };
        let original = *serialized_len;

        let descriptors = Descriptors {
            sequence_header,
            codec_configs,
            audio_elements,
            mix_presentations,
            arbitrary: descriptor_arbitrary,
        };
        let bytes = serialize_descriptors(&descriptors)?;
        if bytes.len() != original {
            self.failed = true;
            return Err(SequencerError::DescriptorResized {
                original,
                actual: bytes.len(),
            });
        }
        self.sink.push_finalized_descriptor_obus(&bytes);
        self.close()
    }

    pub fn close(&mut self) -> Result<(), SequencerError> {
        if self.failed {
            return Err(SequencerError::CloseAfterFailure);
        }
        self.closed = true;
        self.sink.close_derived();
        Ok(())
    }

    pub fn abort(&mut self) {
        self.closed = true;
        self.sink.abort_derived();
    }

    /// Convenience: groups audio frames and parameter blocks into temporal
    /// units keyed by start timestamp, pushes descriptors, then one temporal
    /// unit per tick, then closes.
    #[allow(clippy::too_many_arguments)]
    pub fn pick_and_place(
        &mut self,
        sequence_header: SequenceHeader,
        codec_configs: Vec<CodecConfig>,
        audio_elements: Vec<AudioElement>,
        mix_presentations: Vec<MixPresentation>,
        audio_frames: Vec<(u64, crate::obu::audio_frame::AudioFrame, i64)>,
        parameter_blocks: Vec<ParameterBlock>,
        arbitrary: Vec<ArbitraryObu>,
    ) -> Result<(), SequencerError> {
        self.push_descriptor_obus(sequence_header, codec_configs, audio_elements, mix_presentations, arbitrary)?;

        let mut ticks: std::collections::BTreeMap<i64, (Vec<(u64, crate::obu::audio_frame::AudioFrame)>, Vec<ParameterBlock>)> =
            std::collections::BTreeMap::new();
        for (audio_element_id, frame, timestamp) in audio_frames {
            ticks.entry(timestamp).or_default().0.push((audio_element_id, frame));
        }
        for block in parameter_blocks {
            ticks.entry(block.start_timestamp).or_default().1.push(block);
        }

        for (timestamp, (frames, blocks)) in ticks {
            let end_timestamp = frames
                .first()
                .map(|(_, f)| timestamp + f.samples_per_frame as i64)
                .or_else(|| blocks.first().map(|b| b.end_timestamp))
                .unwrap_or(timestamp);
            let unit = TemporalUnit::new(timestamp, end_timestamp, blocks, frames, vec![])
                .map_err(|_| SequencerError::OutOfOrderTemporalUnit {
                    previous: timestamp,
                    next: timestamp,
                })?;
            self.push_temporal_unit(&unit)?;
        }

        self.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obu::audio_frame::AudioFrame;
    use crate::obu::codec_config::CodecId;
    use crate::obu::sequence_header::Profile;

    fn header() -> SequenceHeader {
        SequenceHeader {
            primary_profile: Profile::Simple,
            additional_profile: Profile::Simple,
        }
    }

    fn codec_config() -> CodecConfig {
        CodecConfig {
            codec_config_id: 1,
            codec_id: CodecId::Lpcm,
            samples_per_frame: 1024,
            audio_roll_distance: -1,
            decoder_config: vec![],
        }
    }

    fn frame(substream_id: u64) -> AudioFrame {
        AudioFrame {
            substream_id,
            num_samples_to_trim_at_start: 0,
            num_samples_to_trim_at_end: 0,
            samples_per_frame: 1024,
            encoded_samples: vec![1, 2, 3],
        }
    }

    #[test]
    fn pushes_descriptors_then_one_temporal_unit_then_closes() {
        let mut sequencer = Sequencer::new(InMemorySequenceWriter::default(), false);
        sequencer
            .push_descriptor_obus(header(), vec![codec_config()], vec![], vec![], vec![])
            .unwrap();

        let unit = TemporalUnit::new(0, 1024, vec![], vec![(1, frame(0))], vec![]).unwrap();
        sequencer.push_temporal_unit(&unit).unwrap();
        sequencer.close().unwrap();

        let sink = sequencer.into_sink();
        assert!(!sink.descriptor_bytes.is_empty());
        assert_eq!(sink.temporal_unit_bytes.len(), 1);
        assert!(sink.closed);
    }

    #[test]
    fn rejects_out_of_order_temporal_units() {
        let mut sequencer = Sequencer::new(InMemorySequenceWriter::default(), false);
        sequencer
            .push_descriptor_obus(header(), vec![codec_config()], vec![], vec![], vec![])
            .unwrap();

        let first = TemporalUnit::new(1024, 2048, vec![], vec![(1, frame(0))], vec![]).unwrap();
        sequencer.push_temporal_unit(&first).unwrap();

        let second = TemporalUnit::new(0, 1024, vec![], vec![(1, frame(0))], vec![]).unwrap();
        assert!(sequencer.push_temporal_unit(&second).is_err());
    }

    #[test]
    fn rejects_trim_start_after_the_trim_prefix_ended() {
        let mut sequencer = Sequencer::new(InMemorySequenceWriter::default(), false);
        sequencer
            .push_descriptor_obus(header(), vec![codec_config()], vec![], vec![], vec![])
            .unwrap();

        let mut untrimmed = frame(0);
        untrimmed.num_samples_to_trim_at_start = 0;
        let first = TemporalUnit::new(0, 1024, vec![], vec![(1, untrimmed)], vec![]).unwrap();
        sequencer.push_temporal_unit(&first).unwrap();

        let mut trimmed = frame(0);
        trimmed.num_samples_to_trim_at_start = 8;
        let second = TemporalUnit::new(1024, 2048, vec![], vec![(1, trimmed)], vec![]).unwrap();
        assert!(sequencer.push_temporal_unit(&second).is_err());
    }

    #[test]
    fn delayed_descriptors_flush_at_the_first_not_fully_trimmed_unit() {
        let mut small_frame_config = codec_config();
        small_frame_config.samples_per_frame = 8;

        let mut sequencer = Sequencer::new(InMemorySequenceWriter::default(), true);
        sequencer
            .push_descriptor_obus(header(), vec![small_frame_config], vec![], vec![], vec![])
            .unwrap();

        let mut fully_trimmed = frame(0);
        fully_trimmed.samples_per_frame = 8;
        fully_trimmed.num_samples_to_trim_at_start = 8;
        let first = TemporalUnit::new(0, 8, vec![], vec![(1, fully_trimmed)], vec![]).unwrap();
        sequencer.push_temporal_unit(&first).unwrap();
        assert!(sequencer.sink().descriptor_bytes.is_empty());

        let mut partially_trimmed = frame(0);
        partially_trimmed.samples_per_frame = 8;
        partially_trimmed.num_samples_to_trim_at_start = 3;
        let second = TemporalUnit::new(8, 16, vec![], vec![(1, partially_trimmed)], vec![]).unwrap();
        sequencer.push_temporal_unit(&second).unwrap();

        sequencer.close().unwrap();
        let sink = sequencer.into_sink();
        assert!(!sink.descriptor_bytes.is_empty());
        assert_eq!(sink.first_untrimmed_timestamp, Some(11));
        assert_eq!(sink.temporal_unit_bytes.len(), 2);
    }
}
