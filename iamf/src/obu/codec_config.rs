//! Codec configuration records (§3.3): per-codec decoder parameters shared by
//! every audio element that references them.

use crate::utils::bitstream_io::{BitstreamIoWriter, BsIoSliceReader};
use crate::utils::errors::ObuError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecId {
    Lpcm,
    Opus,
    Aac,
    Flac,
    Reserved(u32),
}

impl CodecId {
    fn code(self) -> u32 {
        match self {
            CodecId::Lpcm => 0x6970_636d,  // 'ipcm'
            CodecId::Opus => 0x4f707573,   // 'Opus'
            CodecId::Aac => 0x6d703461,    // 'mp4a'
            CodecId::Flac => 0x664c6143,   // 'fLaC'
            CodecId::Reserved(code) => code,
        }
    }

    fn from_code(code: u32) -> CodecId {
        match code {
            0x6970_636d => CodecId::Lpcm,
            0x4f707573 => CodecId::Opus,
            0x6d703461 => CodecId::Aac,
            0x664c6143 => CodecId::Flac,
            other => CodecId::Reserved(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    pub codec_config_id: u64,
    pub codec_id: CodecId,
    pub samples_per_frame: u64,
    pub audio_roll_distance: i16,
    pub decoder_config: Vec<u8>,
}

impl CodecConfig {
    pub fn write_payload(&self) -> Result<Vec<u8>, ObuError> {
        let mut writer = BitstreamIoWriter::new();
        writer.put_uleb128(self.codec_config_id)?;
        writer
            .put_n(32, self.codec_id.code())
            .map_err(|_| ObuError::UnexpectedEof("codec_id"))?;
        writer.put_uleb128(self.samples_per_frame)?;
        writer
            .put_s(16, self.audio_roll_distance as i32)
            .map_err(|_| ObuError::UnexpectedEof("audio_roll_distance"))?;
        writer.put_uleb128(self.decoder_config.len() as u64)?;
        writer
            .put_bytes(&self.decoder_config)
            .map_err(|_| ObuError::UnexpectedEof("decoder_config"))?;
        writer.into_bytes().map_err(|_| ObuError::UnexpectedEof("codec_config"))
    }

    pub fn parse_payload(payload: &[u8]) -> Result<Self, ObuError> {
        let mut reader = BsIoSliceReader::from_slice(payload);
        let codec_config_id = reader.get_uleb128()?;
        let codec_code: u32 = reader
            .get_n(32)
            .map_err(|_| ObuError::UnexpectedEof("codec_id"))?;
        let samples_per_frame = reader.get_uleb128()?;
        let audio_roll_distance: i32 = reader
            .get_s(16)
            .map_err(|_| ObuError::UnexpectedEof("audio_roll_distance"))?;
        let decoder_config_len = reader.get_uleb128()?;
        let mut decoder_config = vec![0u8; decoder_config_len as usize];
        reader
            .get_bytes(&mut decoder_config)
            .map_err(|_| ObuError::UnexpectedEof("decoder_config"))?;

        Ok(CodecConfig {
            codec_config_id,
            codec_id: CodecId::from_code(codec_code),
            samples_per_frame,
            audio_roll_distance: audio_roll_distance as i16,
            decoder_config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_lpcm_config() {
        let config = CodecConfig {
            codec_config_id: 1,
            codec_id: CodecId::Lpcm,
            samples_per_frame: 1024,
            audio_roll_distance: -1,
            decoder_config: vec![16, 48, 0, 0],
        };
        let payload = config.write_payload().unwrap();
        assert_eq!(CodecConfig::parse_payload(&payload).unwrap(), config);
    }
}
