//! Audio frame records (§3.7): opaque per-substream codec payloads, tagged
//! with the encoding substream and the number of padding samples trimmed
//! from each end of the frame.

use crate::utils::bitstream_io::{BitstreamIoWriter, BsIoSliceReader};
use crate::utils::errors::{ObuError, TemporalUnitError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub substream_id: u64,
    pub num_samples_to_trim_at_start: u32,
    pub num_samples_to_trim_at_end: u32,
    pub samples_per_frame: u32,
    pub encoded_samples: Vec<u8>,
}

impl AudioFrame {
    pub fn validate(&self) -> Result<(), TemporalUnitError> {
        if self.num_samples_to_trim_at_start + self.num_samples_to_trim_at_end > self.samples_per_frame {
            return Err(TemporalUnitError::TrimExceedsFrame {
                trim_start: self.num_samples_to_trim_at_start,
                trim_end: self.num_samples_to_trim_at_end,
                samples_per_frame: self.samples_per_frame,
            });
        }
        Ok(())
    }

    /// Number of samples in this frame that are neither leading nor trailing padding.
    pub fn num_untrimmed_samples(&self) -> u32 {
        self.samples_per_frame
            .saturating_sub(self.num_samples_to_trim_at_start)
            .saturating_sub(self.num_samples_to_trim_at_end)
    }

    pub fn write_payload(&self) -> Result<Vec<u8>, ObuError> {
        let mut writer = BitstreamIoWriter::new();
        writer.put_uleb128(self.substream_id)?;
        writer
            .put_bytes(&self.encoded_samples)
            .map_err(|_| ObuError::UnexpectedEof("encoded_samples"))?;
        writer.into_bytes().map_err(|_| ObuError::UnexpectedEof("audio_frame"))
    }

    /// `num_samples_to_trim_at_start`/`_end` come from the shared OBU header
    /// trim fields (§4.2), not this payload, since trimming is common to every
    /// record type; callers supply them alongside `samples_per_frame`.
    pub fn parse_payload(
        payload: &[u8],
        num_samples_to_trim_at_start: u32,
        num_samples_to_trim_at_end: u32,
        samples_per_frame: u32,
    ) -> Result<Self, ObuError> {
        let mut reader = BsIoSliceReader::from_slice(payload);
        let substream_id = reader.get_uleb128()?;
        let consumed = crate::utils::bitstream_io::uleb128_len(substream_id);
        let encoded_samples = payload[consumed..].to_vec();
        Ok(AudioFrame {
            substream_id,
            num_samples_to_trim_at_start,
            num_samples_to_trim_at_end,
            samples_per_frame,
            encoded_samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_untrimmed_frame() {
        let frame = AudioFrame {
            substream_id: 3,
            num_samples_to_trim_at_start: 0,
            num_samples_to_trim_at_end: 0,
            samples_per_frame: 1024,
            encoded_samples: vec![1, 2, 3, 4, 5],
        };
        let payload = frame.write_payload().unwrap();
        let parsed = AudioFrame::parse_payload(&payload, 0, 0, 1024).unwrap();
        assert_eq!(parsed, frame);
        assert_eq!(parsed.num_untrimmed_samples(), 1024);
    }

    #[test]
    fn fully_trimmed_frame_is_legal() {
        let frame = AudioFrame {
            substream_id: 1,
            num_samples_to_trim_at_start: 512,
            num_samples_to_trim_at_end: 512,
            samples_per_frame: 1024,
            encoded_samples: vec![],
        };
        assert!(frame.validate().is_ok());
        assert_eq!(frame.num_untrimmed_samples(), 0);
    }

    #[test]
    fn trim_exceeding_frame_size_is_rejected() {
        let frame = AudioFrame {
            substream_id: 1,
            num_samples_to_trim_at_start: 600,
            num_samples_to_trim_at_end: 600,
            samples_per_frame: 1024,
            encoded_samples: vec![],
        };
        assert!(frame.validate().is_err());
    }
}
