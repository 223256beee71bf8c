//! Shared record header: a 5-bit type tag, trim flags, and a ULEB128 payload size.

use crate::utils::bitstream_io::{BitstreamIoWriter, BsIoSliceReader};
use crate::utils::errors::ObuError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObuType {
    TemporalDelimiter,
    SequenceHeader,
    CodecConfig,
    AudioElement,
    MixPresentation,
    ParameterBlock,
    AudioFrame(u8),
    Arbitrary,
    Reserved(u8),
}

impl ObuType {
    fn tag(self) -> u8 {
        match self {
            ObuType::TemporalDelimiter => 0,
            ObuType::SequenceHeader => 1,
            ObuType::CodecConfig => 2,
            ObuType::AudioElement => 3,
            ObuType::MixPresentation => 4,
            ObuType::ParameterBlock => 5,
            ObuType::AudioFrame(substream_low_bits) => 6 + (substream_low_bits & 0x1f),
            ObuType::Arbitrary => 31,
            ObuType::Reserved(tag) => tag,
        }
    }

    fn from_tag(tag: u8) -> ObuType {
        match tag {
            0 => ObuType::TemporalDelimiter,
            1 => ObuType::SequenceHeader,
            2 => ObuType::CodecConfig,
            3 => ObuType::AudioElement,
            4 => ObuType::MixPresentation,
            5 => ObuType::ParameterBlock,
            6..=30 => ObuType::AudioFrame(tag - 6),
            31 => ObuType::Arbitrary,
            other => ObuType::Reserved(other),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimInfo {
    pub num_samples_to_trim_at_start: u64,
    pub num_samples_to_trim_at_end: u64,
}

/// Writes `obu_type`'s header, the ULEB128-encoded length of `payload`, then `payload` itself.
pub fn write_obu(
    writer: &mut BitstreamIoWriter,
    obu_type: ObuType,
    trim: Option<TrimInfo>,
    payload: &[u8],
) -> Result<(), ObuError> {
    writer
        .put_n(5, obu_type.tag())
        .map_err(|_| ObuError::UnexpectedEof("obu_type"))?;
    writer
        .put_bit(trim.is_some())
        .map_err(|_| ObuError::UnexpectedEof("obu_trimming_status_flag"))?;
    writer
        .put_n(2, 0u8)
        .map_err(|_| ObuError::UnexpectedEof("reserved header bits"))?;
    writer.byte_align().map_err(|_| ObuError::UnexpectedEof("header align"))?;

    if let Some(trim) = trim {
        writer
            .put_uleb128(trim.num_samples_to_trim_at_end)?;
        writer
            .put_uleb128(trim.num_samples_to_trim_at_start)?;
    }

    writer.put_uleb128(payload.len() as u64)?;
    writer
        .put_bytes(payload)
        .map_err(|_| ObuError::UnexpectedEof("payload"))?;
    Ok(())
}

pub struct ParsedObu {
    pub obu_type: ObuType,
    pub trim: Option<TrimInfo>,
    pub payload: Vec<u8>,
}

/// Reads one full framed record from `reader`.
pub fn read_obu(reader: &mut BsIoSliceReader) -> Result<ParsedObu, ObuError> {
    let tag: u8 = reader
        .get_n(5)
        .map_err(|_| ObuError::UnexpectedEof("obu_type"))?;
    let has_trim: bool = reader
        .get()
        .map_err(|_| ObuError::UnexpectedEof("obu_trimming_status_flag"))?;
    let _reserved: u8 = reader
        .get_n(2)
        .map_err(|_| ObuError::UnexpectedEof("reserved header bits"))?;
    reader.byte_align();

    let trim = if has_trim {
        let num_samples_to_trim_at_end = reader.get_uleb128()?;
        let num_samples_to_trim_at_start = reader.get_uleb128()?;
        Some(TrimInfo {
            num_samples_to_trim_at_start,
            num_samples_to_trim_at_end,
        })
    } else {
        None
    };

    let payload_size = reader.get_uleb128()?;
    let mut payload = vec![0u8; payload_size as usize];
    reader
        .get_bytes(&mut payload)
        .map_err(|_| ObuError::UnexpectedEof("payload"))?;

    Ok(ParsedObu {
        obu_type: ObuType::from_tag(tag),
        trim,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obu_round_trips_with_and_without_trim() {
        let mut writer = BitstreamIoWriter::new();
        write_obu(&mut writer, ObuType::SequenceHeader, None, &[1, 2, 3]).unwrap();
        let bytes = writer.into_bytes().unwrap();
        let mut reader = BsIoSliceReader::from_slice(&bytes);
        let parsed = read_obu(&mut reader).unwrap();
        assert_eq!(parsed.obu_type, ObuType::SequenceHeader);
        assert_eq!(parsed.trim, None);
        assert_eq!(parsed.payload, vec![1, 2, 3]);

        let mut writer = BitstreamIoWriter::new();
        let trim = TrimInfo {
            num_samples_to_trim_at_start: 8,
            num_samples_to_trim_at_end: 3,
        };
        write_obu(&mut writer, ObuType::AudioFrame(0), Some(trim), &[9, 9]).unwrap();
        let bytes = writer.into_bytes().unwrap();
        let mut reader = BsIoSliceReader::from_slice(&bytes);
        let parsed = read_obu(&mut reader).unwrap();
        assert_eq!(parsed.obu_type, ObuType::AudioFrame(0));
        assert_eq!(parsed.trim, Some(trim));
        assert_eq!(parsed.payload, vec![9, 9]);
    }
}
