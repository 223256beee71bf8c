//! Sample-processor façade (§6.2): the interface a downstream renderer
//! implements. This crate ships no concrete renderer — channel-mixing,
//! ambisonics-to-channel, and loudness rendering are excluded collaborators —
//! only the trait and a trivial test double that exercises its push/flush/drain
//! state machine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SampleProcessorError {
    #[error("expected {expected} channels, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    #[error("pushed {ticks} ticks, exceeding max_input_ticks {max}")]
    TooManyTicks { ticks: usize, max: usize },

    #[error("push_frame called after flush")]
    PushAfterFlush,

    #[error("flush called twice")]
    DoubleFlush,
}

pub trait SampleProcessor {
    fn push_frame(&mut self, samples: &[Vec<f64>]) -> Result<(), SampleProcessorError>;
    fn flush(&mut self) -> Result<(), SampleProcessorError>;
    fn get_output_samples_as_span(&mut self) -> Vec<Vec<f64>>;
    fn is_finalized(&self) -> bool;
}

/// Test double: buffers whatever it's given and hands it straight back,
/// validating only the push/flush/drain contract, never the sample values.
#[cfg(test)]
pub struct PassthroughSampleProcessor {
    num_channels: usize,
    max_input_ticks: usize,
    buffered: Vec<Vec<f64>>,
    flushed: bool,
}

#[cfg(test)]
impl PassthroughSampleProcessor {
    pub fn new(num_channels: usize, max_input_ticks: usize) -> Self {
        PassthroughSampleProcessor {
            num_channels,
            max_input_ticks,
            buffered: vec![Vec::new(); num_channels],
            flushed: false,
        }
    }
}

#[cfg(test)]
impl SampleProcessor for PassthroughSampleProcessor {
    fn push_frame(&mut self, samples: &[Vec<f64>]) -> Result<(), SampleProcessorError> {
        if self.flushed {
            return Err(SampleProcessorError::PushAfterFlush);
        }
        if samples.len() != self.num_channels {
            return Err(SampleProcessorError::ChannelCountMismatch {
                expected: self.num_channels,
                actual: samples.len(),
            });
        }
        if let Some(ticks) = samples.first().map(|c| c.len()) {
            if ticks > self.max_input_ticks {
                return Err(SampleProcessorError::TooManyTicks {
                    ticks,
                    max: self.max_input_ticks,
                });
            }
        }
        for (channel, frame) in self.buffered.iter_mut().zip(samples) {
            channel.extend_from_slice(frame);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SampleProcessorError> {
        if self.flushed {
            return Err(SampleProcessorError::DoubleFlush);
        }
        self.flushed = true;
        Ok(())
    }

    fn get_output_samples_as_span(&mut self) -> Vec<Vec<f64>> {
        if self.buffered.iter().all(|c| c.is_empty()) {
            return vec![Vec::new(); self.num_channels];
        }
        std::mem::replace(&mut self.buffered, vec![Vec::new(); self.num_channels])
    }

    fn is_finalized(&self) -> bool {
        self.flushed && self.buffered.iter().all(|c| c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_flush_then_drain_empties_the_buffer() {
        let mut processor = PassthroughSampleProcessor::new(2, 1024);
        processor
            .push_frame(&[vec![1.0, 2.0], vec![3.0, 4.0]])
            .unwrap();
        processor.flush().unwrap();
        let drained = processor.get_output_samples_as_span();
        assert_eq!(drained, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert!(processor.is_finalized());
    }

    #[test]
    fn push_after_flush_fails() {
        let mut processor = PassthroughSampleProcessor::new(1, 1024);
        processor.flush().unwrap();
        assert!(processor.push_frame(&[vec![1.0]]).is_err());
    }

    #[test]
    fn mismatched_channel_count_fails() {
        let mut processor = PassthroughSampleProcessor::new(2, 1024);
        assert!(processor.push_frame(&[vec![1.0]]).is_err());
    }

    #[test]
    fn exceeding_max_input_ticks_fails() {
        let mut processor = PassthroughSampleProcessor::new(1, 2);
        assert!(processor.push_frame(&[vec![1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn double_flush_fails() {
        let mut processor = PassthroughSampleProcessor::new(1, 1024);
        processor.flush().unwrap();
        assert!(processor.flush().is_err());
    }
}
