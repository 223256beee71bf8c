//! Temporal-unit view (§3.9): a read-only grouping of everything that belongs
//! to one tick — parameter blocks, audio frames, and arbitrary records —
//! grounded on `temporal_unit_view.h`'s field set.

use crate::obu::arbitrary_obu::ArbitraryObu;
use crate::obu::audio_frame::AudioFrame;
use crate::obu::parameter_block::ParameterBlock;
use crate::utils::errors::TemporalUnitError;

#[derive(Debug, Clone, PartialEq)]
pub struct TemporalUnit {
    start_timestamp: i64,
    end_timestamp: i64,
    parameter_blocks: Vec<ParameterBlock>,
    audio_frames: Vec<(u64, AudioFrame)>,
    arbitrary_obus: Vec<ArbitraryObu>,
}

impl TemporalUnit {
    pub fn new(
        start_timestamp: i64,
        end_timestamp: i64,
        mut parameter_blocks: Vec<ParameterBlock>,
        mut audio_frames: Vec<(u64, AudioFrame)>,
        arbitrary_obus: Vec<ArbitraryObu>,
    ) -> Result<Self, TemporalUnitError> {
        let invalidated = arbitrary_obus.iter().any(|obu| obu.invalidates_bitstream);
        if parameter_blocks.is_empty() && audio_frames.is_empty() && !invalidated {
            return Err(TemporalUnitError::Empty);
        }

        if !arbitrary_obus.is_empty() {
            let first_tick = arbitrary_obus[0].insertion_tick;
            if arbitrary_obus.iter().any(|obu| obu.insertion_tick != first_tick) {
                return Err(TemporalUnitError::InconsistentArbitraryTick);
            }
        }

        let mut seen_params = std::collections::HashSet::new();
        for block in &parameter_blocks {
            if !seen_params.insert(block.parameter_id) {
                return Err(TemporalUnitError::DuplicateParameterId(block.parameter_id));
            }
        }

        let mut seen_substreams = std::collections::HashSet::new();
        for (_, frame) in &audio_frames {
            if !seen_substreams.insert(frame.substream_id) {
                return Err(TemporalUnitError::DuplicateSubstreamId(frame.substream_id));
            }
            if frame.num_samples_to_trim_at_start + frame.num_samples_to_trim_at_end > frame.samples_per_frame {
                return Err(TemporalUnitError::TrimExceedsFrame {
                    trim_start: frame.num_samples_to_trim_at_start,
                    trim_end: frame.num_samples_to_trim_at_end,
                    samples_per_frame: frame.samples_per_frame,
                });
            }
        }

        if let Some((_, first)) = audio_frames.first() {
            let (trim_start, trim_end, samples_per_frame) = (
                first.num_samples_to_trim_at_start,
                first.num_samples_to_trim_at_end,
                first.samples_per_frame,
            );
            for (substream_id, frame) in &audio_frames {
                if frame.num_samples_to_trim_at_start != trim_start
                    || frame.num_samples_to_trim_at_end != trim_end
                    || frame.samples_per_frame != samples_per_frame
                {
                    return Err(TemporalUnitError::InconsistentFrameTiming {
                        substream_id: *substream_id,
                    });
                }
            }
        }

        parameter_blocks.sort_by_key(|b| b.parameter_id);
        audio_frames.sort_by_key(|(audio_element_id, frame)| (*audio_element_id, frame.substream_id));

        Ok(TemporalUnit {
            start_timestamp,
            end_timestamp,
            parameter_blocks,
            audio_frames,
            arbitrary_obus,
        })
    }

    pub fn start_timestamp(&self) -> i64 {
        self.start_timestamp
    }

    pub fn end_timestamp(&self) -> i64 {
        self.end_timestamp
    }

    pub fn parameter_blocks(&self) -> &[ParameterBlock] {
        &self.parameter_blocks
    }

    pub fn audio_frames(&self) -> &[(u64, AudioFrame)] {
        &self.audio_frames
    }

    pub fn arbitrary_obus(&self) -> &[ArbitraryObu] {
        &self.arbitrary_obus
    }

    pub fn num_samples_to_trim_at_start(&self) -> u32 {
        self.audio_frames
            .first()
            .map(|(_, f)| f.num_samples_to_trim_at_start)
            .unwrap_or(0)
    }

    pub fn num_untrimmed_samples(&self) -> u32 {
        self.audio_frames
            .first()
            .map(|(_, f)| f.num_untrimmed_samples())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obu::arbitrary_obu::InsertionHook;

    fn frame(substream_id: u64) -> AudioFrame {
        AudioFrame {
            substream_id,
            num_samples_to_trim_at_start: 0,
            num_samples_to_trim_at_end: 0,
            samples_per_frame: 1024,
            encoded_samples: vec![],
        }
    }

    #[test]
    fn orders_parameter_blocks_and_frames_and_derives_untrimmed_count() {
        let unit = TemporalUnit::new(
            0,
            1024,
            vec![
                ParameterBlock {
                    parameter_id: 5,
                    start_timestamp: 0,
                    end_timestamp: 1024,
                    subblock_durations: vec![1024],
                    subblocks: vec![],
                },
                ParameterBlock {
                    parameter_id: 1,
                    start_timestamp: 0,
                    end_timestamp: 1024,
                    subblock_durations: vec![1024],
                    subblocks: vec![],
                },
            ],
            vec![(0, frame(2)), (0, frame(1))],
            vec![],
        )
        .unwrap();

        let ids: Vec<u64> = unit.parameter_blocks().iter().map(|b| b.parameter_id).collect();
        assert_eq!(ids, vec![1, 5]);
        let substreams: Vec<u64> = unit.audio_frames().iter().map(|(_, f)| f.substream_id).collect();
        assert_eq!(substreams, vec![1, 2]);
        assert_eq!(unit.num_untrimmed_samples(), 1024);
    }

    #[test]
    fn empty_unit_without_an_invalidating_arbitrary_record_is_rejected() {
        assert!(TemporalUnit::new(0, 1024, vec![], vec![], vec![]).is_err());
    }

    #[test]
    fn empty_unit_with_an_invalidating_arbitrary_record_is_allowed() {
        let unit = TemporalUnit::new(
            0,
            1024,
            vec![],
            vec![],
            vec![ArbitraryObu {
                insertion_hook: InsertionHook::AfterAudioFramesAtTick,
                insertion_tick: Some(0),
                invalidates_bitstream: true,
                payload_bytes: vec![],
            }],
        )
        .unwrap();
        assert!(unit.audio_frames().is_empty());
    }

    #[test]
    fn duplicate_substream_id_is_rejected() {
        assert!(TemporalUnit::new(0, 1024, vec![], vec![(0, frame(1)), (0, frame(1))], vec![]).is_err());
    }
}
