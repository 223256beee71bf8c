//! Sequence header: the first record of a descriptor prelude, declaring the profile.

use crate::utils::bitstream_io::{BitstreamIoWriter, BsIoSliceReader};
use crate::utils::errors::ObuError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Simple,
    Base,
    BaseEnhanced,
    Reserved(u8),
}

impl Profile {
    fn code(self) -> u8 {
        match self {
            Profile::Simple => 0,
            Profile::Base => 1,
            Profile::BaseEnhanced => 2,
            Profile::Reserved(c) => c,
        }
    }

    fn from_code(code: u8) -> Profile {
        match code {
            0 => Profile::Simple,
            1 => Profile::Base,
            2 => Profile::BaseEnhanced,
            other => Profile::Reserved(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceHeader {
    pub primary_profile: Profile,
    pub additional_profile: Profile,
}

impl SequenceHeader {
    pub fn write_payload(&self) -> Result<Vec<u8>, ObuError> {
        let mut writer = BitstreamIoWriter::new();
        writer
            .put_bytes(b"iamf")
            .map_err(|_| ObuError::UnexpectedEof("ia_code"))?;
        writer
            .put_n(8, self.primary_profile.code())
            .map_err(|_| ObuError::UnexpectedEof("primary_profile"))?;
        writer
            .put_n(8, self.additional_profile.code())
            .map_err(|_| ObuError::UnexpectedEof("additional_profile"))?;
        writer.into_bytes().map_err(|_| ObuError::UnexpectedEof("sequence_header"))
    }

    pub fn parse_payload(payload: &[u8]) -> Result<Self, ObuError> {
        let mut reader = BsIoSliceReader::from_slice(payload);
        let mut ia_code = [0u8; 4];
        reader
            .get_bytes(&mut ia_code)
            .map_err(|_| ObuError::UnexpectedEof("ia_code"))?;
        if &ia_code != b"iamf" {
            return Err(ObuError::MalformedObu {
                declared: payload.len() as u64,
                consumed: 4,
            });
        }
        let primary: u8 = reader
            .get_n(8)
            .map_err(|_| ObuError::UnexpectedEof("primary_profile"))?;
        let additional: u8 = reader
            .get_n(8)
            .map_err(|_| ObuError::UnexpectedEof("additional_profile"))?;
        Ok(SequenceHeader {
            primary_profile: Profile::from_code(primary),
            additional_profile: Profile::from_code(additional),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_profile() {
        let header = SequenceHeader {
            primary_profile: Profile::Simple,
            additional_profile: Profile::Base,
        };
        let payload = header.write_payload().unwrap();
        assert_eq!(SequenceHeader::parse_payload(&payload).unwrap(), header);
    }
}
