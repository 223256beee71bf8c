//! Centralized per-parameter-id timestamp bookkeeping.
//!
//! Parameter blocks for one `parameter_id` must tile a contiguous stretch of
//! ticks: each new block's start must equal the previous block's end. Rather
//! than have every call site track "what timestamp do I expect next", that
//! state lives here, mirroring how [`crate::utils`]'s other timing helper
//! centralizes FIFO bookkeeping behind a small struct instead of scattering it
//! across callers.

use std::collections::HashMap;

use crate::utils::errors::ParameterBlockError;

#[derive(Debug, Default)]
pub struct GlobalTiming {
    next_start: HashMap<u64, i64>,
}

impl GlobalTiming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and records the next expected start timestamp for `parameter_id`.
    ///
    /// `metadata_start` is `Some` only for the first block on a given id (or when
    /// the caller otherwise knows the authoritative start); later blocks pass
    /// `None` and get the previously recorded end timestamp.
    pub fn get_next_parameter_block_timestamps(
        &mut self,
        parameter_id: u64,
        metadata_start: Option<i64>,
        duration: u64,
    ) -> Result<(i64, i64), ParameterBlockError> {
        let expected = *self.next_start.get(&parameter_id).unwrap_or(&0);
        let start = match metadata_start {
            Some(declared) if self.next_start.contains_key(&parameter_id) => {
                if declared != expected {
                    return Err(ParameterBlockError::NonContiguousTimestamp {
                        id: parameter_id,
                        expected,
                        actual: declared,
                    });
                }
                declared
            }
            Some(declared) => declared,
            None => expected,
        };
        let end = start + duration as i64;
        self.next_start.insert(parameter_id, end);
        Ok((start, end))
    }

    /// The last recorded end timestamp for `parameter_id`, if any blocks were registered.
    pub fn stream_end(&self, parameter_id: u64) -> Option<i64> {
        self.next_start.get(&parameter_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_blocks_advance_the_expected_start() {
        let mut timing = GlobalTiming::new();
        let (s0, e0) = timing
            .get_next_parameter_block_timestamps(100, Some(0), 8)
            .unwrap();
        assert_eq!((s0, e0), (0, 8));
        let (s1, e1) = timing
            .get_next_parameter_block_timestamps(100, None, 8)
            .unwrap();
        assert_eq!((s1, e1), (8, 16));
    }

    #[test]
    fn non_contiguous_start_is_rejected() {
        let mut timing = GlobalTiming::new();
        timing
            .get_next_parameter_block_timestamps(100, Some(0), 8)
            .unwrap();
        let err = timing
            .get_next_parameter_block_timestamps(100, Some(9), 8)
            .unwrap_err();
        assert!(matches!(
            err,
            ParameterBlockError::NonContiguousTimestamp { expected: 8, actual: 9, .. }
        ));
    }
}
