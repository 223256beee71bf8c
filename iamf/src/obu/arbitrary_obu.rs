//! Arbitrary records (§3.8): an opaque payload placed at a named point in the
//! descriptor prelude or at a tick, used by conformance tests to inject
//! extension data or stand in for a missing audio frame.

use crate::utils::bitstream_io::{BitstreamIoWriter, BsIoSliceReader};
use crate::utils::errors::ObuError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionHook {
    AfterIaSequenceHeader,
    AfterCodecConfigs,
    AfterAudioElements,
    AfterMixPresentations,
    AfterDescriptors,
    BeforeParameterBlocksAtTick,
    AfterParameterBlocksAtTick,
    AfterAudioFramesAtTick,
}

impl InsertionHook {
    fn code(self) -> u8 {
        match self {
            InsertionHook::AfterIaSequenceHeader => 0,
            InsertionHook::AfterCodecConfigs => 1,
            InsertionHook::AfterAudioElements => 2,
            InsertionHook::AfterMixPresentations => 3,
            InsertionHook::AfterDescriptors => 4,
            InsertionHook::BeforeParameterBlocksAtTick => 5,
            InsertionHook::AfterParameterBlocksAtTick => 6,
            InsertionHook::AfterAudioFramesAtTick => 7,
        }
    }

    fn from_code(code: u8) -> Result<Self, ObuError> {
        Ok(match code {
            0 => InsertionHook::AfterIaSequenceHeader,
            1 => InsertionHook::AfterCodecConfigs,
            2 => InsertionHook::AfterAudioElements,
            3 => InsertionHook::AfterMixPresentations,
            4 => InsertionHook::AfterDescriptors,
            5 => InsertionHook::BeforeParameterBlocksAtTick,
            6 => InsertionHook::AfterParameterBlocksAtTick,
            7 => InsertionHook::AfterAudioFramesAtTick,
            other => return Err(ObuError::ReservedObuType(other)),
        })
    }

    pub fn is_per_tick(self) -> bool {
        matches!(
            self,
            InsertionHook::BeforeParameterBlocksAtTick
                | InsertionHook::AfterParameterBlocksAtTick
                | InsertionHook::AfterAudioFramesAtTick
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbitraryObu {
    pub insertion_hook: InsertionHook,
    pub insertion_tick: Option<i64>,
    pub invalidates_bitstream: bool,
    pub payload_bytes: Vec<u8>,
}

impl ArbitraryObu {
    pub fn write_payload(&self) -> Result<Vec<u8>, ObuError> {
        let mut writer = BitstreamIoWriter::new();
        writer
            .put_n(3, self.insertion_hook.code())
            .map_err(|_| ObuError::UnexpectedEof("insertion_hook"))?;
        writer
            .put_bit(self.invalidates_bitstream)
            .map_err(|_| ObuError::UnexpectedEof("invalidates_bitstream"))?;
        writer
            .put_n(4, 0u8)
            .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
        writer.byte_align().map_err(|_| ObuError::UnexpectedEof("align"))?;

        if self.insertion_hook.is_per_tick() {
            let tick = self.insertion_tick.ok_or(ObuError::UnexpectedEof("insertion_tick"))?;
            writer.put_uleb128(tick as u64)?;
        }

        writer.put_uleb128(self.payload_bytes.len() as u64)?;
        writer
            .put_bytes(&self.payload_bytes)
            .map_err(|_| ObuError::UnexpectedEof("payload_bytes"))?;
        writer.into_bytes().map_err(|_| ObuError::UnexpectedEof("arbitrary_obu"))
    }

    pub fn parse_payload(payload: &[u8]) -> Result<Self, ObuError> {
        let mut reader = BsIoSliceReader::from_slice(payload);
        let hook_code: u8 = reader.get_n(3).map_err(|_| ObuError::UnexpectedEof("insertion_hook"))?;
        let invalidates_bitstream: bool = reader
            .get()
            .map_err(|_| ObuError::UnexpectedEof("invalidates_bitstream"))?;
        let _reserved: u8 = reader.get_n(4).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
        reader.byte_align();

        let insertion_hook = InsertionHook::from_code(hook_code)?;
        let insertion_tick = if insertion_hook.is_per_tick() {
            Some(reader.get_uleb128()? as i64)
        } else {
            None
        };

        let len = reader.get_uleb128()?;
        let mut payload_bytes = vec![0u8; len as usize];
        reader
            .get_bytes(&mut payload_bytes)
            .map_err(|_| ObuError::UnexpectedEof("payload_bytes"))?;

        Ok(ArbitraryObu {
            insertion_hook,
            insertion_tick,
            invalidates_bitstream,
            payload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_descriptor_hook_record() {
        let obu = ArbitraryObu {
            insertion_hook: InsertionHook::AfterDescriptors,
            insertion_tick: None,
            invalidates_bitstream: false,
            payload_bytes: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let payload = obu.write_payload().unwrap();
        assert_eq!(ArbitraryObu::parse_payload(&payload).unwrap(), obu);
    }

    #[test]
    fn round_trips_a_per_tick_record_that_invalidates_the_bitstream() {
        let obu = ArbitraryObu {
            insertion_hook: InsertionHook::AfterAudioFramesAtTick,
            insertion_tick: Some(4096),
            invalidates_bitstream: true,
            payload_bytes: vec![],
        };
        let payload = obu.write_payload().unwrap();
        let parsed = ArbitraryObu::parse_payload(&payload).unwrap();
        assert_eq!(parsed, obu);
        assert!(parsed.invalidates_bitstream);
    }

    #[test]
    fn per_tick_hook_without_a_tick_fails_to_write() {
        let obu = ArbitraryObu {
            insertion_hook: InsertionHook::BeforeParameterBlocksAtTick,
            insertion_tick: None,
            invalidates_bitstream: false,
            payload_bytes: vec![],
        };
        assert!(obu.write_payload().is_err());
    }
}
