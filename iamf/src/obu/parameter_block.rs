//! Parameter block records (§3.6): per-tick control data for mix gain,
//! downmix recombination, and reconstruction gain.
//!
//! Unlike the other record types, a parameter block's wire layout cannot be
//! parsed in isolation: the type, rate, and duration of the parameter_id it
//! carries live in the audio-element or mix-presentation's parameter
//! definition, not in the block itself. Callers thread that context in as
//! `param_type` (and, for recon gain, the owning layer count).

use crate::obu::audio_element::DMixPMode;
use crate::utils::bitstream_io::{BitstreamIoWriter, BsIoSliceReader};
use crate::utils::errors::{ObuError, ParameterBlockError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    MixGain,
    Demixing,
    ReconGain,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MixGainAnimation {
    Step { start: i16 },
    Linear { start: i16, end: i16 },
    Bezier {
        start: i16,
        end: i16,
        control: i16,
        control_relative_time: u8,
    },
}

impl MixGainAnimation {
    fn tag(self) -> u8 {
        match self {
            MixGainAnimation::Step { .. } => 0,
            MixGainAnimation::Linear { .. } => 1,
            MixGainAnimation::Bezier { .. } => 2,
        }
    }
}

/// Recon gain for one channel layer: a 12-bit present mask and one byte per
/// demixed-label bit position (§4.5), whether or not that bit is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconGainLayer {
    pub present_mask: u16,
    pub gains: [u8; 12],
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSubblockPayload {
    MixGain(MixGainAnimation),
    Demixing { dmixp_mode: DMixPMode },
    ReconGain { layers: Vec<ReconGainLayer> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBlock {
    pub parameter_id: u64,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub subblock_durations: Vec<u64>,
    pub subblocks: Vec<ParameterSubblockPayload>,
}

impl ParameterBlock {
    pub fn write_payload(&self) -> Result<Vec<u8>, ObuError> {
        if self.subblocks.len() != self.subblock_durations.len() {
            return Err(ObuError::UnexpectedEof("subblock_durations length mismatch"));
        }
        check_single_subblock_rule(&self.subblocks)?;

        let mut writer = BitstreamIoWriter::new();
        writer.put_uleb128(self.parameter_id)?;
        writer.put_uleb128(self.subblocks.len() as u64)?;
        for (duration, subblock) in self.subblock_durations.iter().zip(&self.subblocks) {
            writer.put_uleb128(*duration)?;
            write_subblock(&mut writer, subblock)?;
        }
        writer.into_bytes().map_err(|_| ObuError::UnexpectedEof("parameter_block"))
    }

    pub fn parse_payload(
        payload: &[u8],
        param_type: ParameterType,
        num_layers: usize,
        start_timestamp: i64,
        end_timestamp: i64,
    ) -> Result<Self, ObuError> {
        let mut reader = BsIoSliceReader::from_slice(payload);
        let parameter_id = reader.get_uleb128()?;
        let num_subblocks = reader.get_uleb128()?;
        let mut subblock_durations = Vec::with_capacity(num_subblocks as usize);
        let mut subblocks = Vec::with_capacity(num_subblocks as usize);
        for _ in 0..num_subblocks {
            subblock_durations.push(reader.get_uleb128()?);
            subblocks.push(read_subblock(&mut reader, param_type, num_layers)?);
        }
        check_single_subblock_rule(&subblocks)?;

        Ok(ParameterBlock {
            parameter_id,
            start_timestamp,
            end_timestamp,
            subblock_durations,
            subblocks,
        })
    }
}

fn check_single_subblock_rule(subblocks: &[ParameterSubblockPayload]) -> Result<(), ObuError> {
    let needs_single = subblocks
        .first()
        .map(|s| matches!(s, ParameterSubblockPayload::Demixing { .. } | ParameterSubblockPayload::ReconGain { .. }))
        .unwrap_or(false);
    if needs_single && subblocks.len() != 1 {
        return Err(ObuError::UnexpectedEof("demixing/recon-gain block must have exactly one subblock"));
    }
    Ok(())
}

fn write_subblock(writer: &mut BitstreamIoWriter, subblock: &ParameterSubblockPayload) -> Result<(), ObuError> {
    match subblock {
        ParameterSubblockPayload::MixGain(animation) => {
            writer
                .put_n(2, animation.tag())
                .map_err(|_| ObuError::UnexpectedEof("animation_type"))?;
            writer
                .put_n(6, 0u8)
                .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
            match *animation {
                MixGainAnimation::Step { start } => {
                    writer
                        .put_s(16, start as i32)
                        .map_err(|_| ObuError::UnexpectedEof("start_point_value"))?;
                }
                MixGainAnimation::Linear { start, end } => {
                    writer
                        .put_s(16, start as i32)
                        .map_err(|_| ObuError::UnexpectedEof("start_point_value"))?;
                    writer
                        .put_s(16, end as i32)
                        .map_err(|_| ObuError::UnexpectedEof("end_point_value"))?;
                }
                MixGainAnimation::Bezier {
                    start,
                    end,
                    control,
                    control_relative_time,
                } => {
                    writer
                        .put_s(16, start as i32)
                        .map_err(|_| ObuError::UnexpectedEof("start_point_value"))?;
                    writer
                        .put_s(16, end as i32)
                        .map_err(|_| ObuError::UnexpectedEof("end_point_value"))?;
                    writer
                        .put_s(16, control as i32)
                        .map_err(|_| ObuError::UnexpectedEof("control_point_value"))?;
                    writer
                        .put_n(8, control_relative_time)
                        .map_err(|_| ObuError::UnexpectedEof("control_point_relative_time"))?;
                }
            }
        }
        ParameterSubblockPayload::Demixing { dmixp_mode } => {
            writer
                .put_n(3, dmixp_mode.code())
                .map_err(|_| ObuError::UnexpectedEof("dmixp_mode"))?;
            writer
                .put_n(5, 0u8)
                .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
        }
        ParameterSubblockPayload::ReconGain { layers } => {
            for layer in layers {
                writer
                    .put_n(12, layer.present_mask)
                    .map_err(|_| ObuError::UnexpectedEof("recon_gain_present_mask"))?;
                writer
                    .put_n(4, 0u8)
                    .map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                for gain in layer.gains {
                    writer
                        .put_n(8, gain)
                        .map_err(|_| ObuError::UnexpectedEof("recon_gain byte"))?;
                }
            }
        }
    }
    Ok(())
}

fn read_subblock(
    reader: &mut BsIoSliceReader,
    param_type: ParameterType,
    num_layers: usize,
) -> Result<ParameterSubblockPayload, ObuError> {
    Ok(match param_type {
        ParameterType::MixGain => {
            let tag: u8 = reader.get_n(2).map_err(|_| ObuError::UnexpectedEof("animation_type"))?;
            let _reserved: u8 = reader.get_n(6).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
            let animation = match tag {
                0 => {
                    let start: i32 = reader
                        .get_s(16)
                        .map_err(|_| ObuError::UnexpectedEof("start_point_value"))?;
                    MixGainAnimation::Step { start: start as i16 }
                }
                1 => {
                    let start: i32 = reader
                        .get_s(16)
                        .map_err(|_| ObuError::UnexpectedEof("start_point_value"))?;
                    let end: i32 = reader
                        .get_s(16)
                        .map_err(|_| ObuError::UnexpectedEof("end_point_value"))?;
                    MixGainAnimation::Linear {
                        start: start as i16,
                        end: end as i16,
                    }
                }
                2 => {
                    let start: i32 = reader
                        .get_s(16)
                        .map_err(|_| ObuError::UnexpectedEof("start_point_value"))?;
                    let end: i32 = reader
                        .get_s(16)
                        .map_err(|_| ObuError::UnexpectedEof("end_point_value"))?;
                    let control: i32 = reader
                        .get_s(16)
                        .map_err(|_| ObuError::UnexpectedEof("control_point_value"))?;
                    let control_relative_time: u8 = reader
                        .get_n(8)
                        .map_err(|_| ObuError::UnexpectedEof("control_point_relative_time"))?;
                    MixGainAnimation::Bezier {
                        start: start as i16,
                        end: end as i16,
                        control: control as i16,
                        control_relative_time,
                    }
                }
                other => return Err(ObuError::ReservedObuType(other)),
            };
            ParameterSubblockPayload::MixGain(animation)
        }
        ParameterType::Demixing => {
            let code: u8 = reader.get_n(3).map_err(|_| ObuError::UnexpectedEof("dmixp_mode"))?;
            let _reserved: u8 = reader.get_n(5).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
            ParameterSubblockPayload::Demixing {
                dmixp_mode: DMixPMode::from_code(code),
            }
        }
        ParameterType::ReconGain => {
            let mut layers = Vec::with_capacity(num_layers);
            for _ in 0..num_layers {
                let present_mask: u16 = reader
                    .get_n(12)
                    .map_err(|_| ObuError::UnexpectedEof("recon_gain_present_mask"))?;
                let _reserved: u8 = reader.get_n(4).map_err(|_| ObuError::UnexpectedEof("reserved"))?;
                let mut gains = [0u8; 12];
                for gain in gains.iter_mut() {
                    *gain = reader.get_n(8).map_err(|_| ObuError::UnexpectedEof("recon_gain byte"))?;
                }
                layers.push(ReconGainLayer { present_mask, gains });
            }
            ParameterSubblockPayload::ReconGain { layers }
        }
    })
}

/// Bit positions in a [`ReconGainLayer::present_mask`], fixed by the demixed-label
/// registry (§4.5). Bit 1 (`C`) and bit 11 (`LFE`) are never set.
pub mod recon_gain_bits {
    pub const D_L3_L5_L7: u8 = 0;
    pub const D_R2_R3_R5_R7: u8 = 2;
    pub const D_LS5: u8 = 3;
    pub const D_RS5: u8 = 4;
    pub const D_LTF2_LTF4: u8 = 5;
    pub const D_RTF2_RTF4: u8 = 6;
    pub const D_LRS7: u8 = 7;
    pub const D_RRS7: u8 = 8;
    pub const D_LTB4: u8 = 9;
    pub const D_RTB4: u8 = 10;
}

/// Converts a `[0,1]` recon gain ratio to its wire-format byte per §4.5.
pub fn pack_recon_gain(gain: f64) -> Result<u8, ParameterBlockError> {
    if !(0.0..=1.0).contains(&gain) {
        return Err(ParameterBlockError::OutOfRange {
            field: "recon_gain",
            value: (gain * 1000.0) as i64,
        });
    }
    Ok((gain * 255.0).round() as u8)
}

/// Inverse of [`pack_recon_gain`].
pub fn unpack_recon_gain(byte: u8) -> f64 {
    byte as f64 / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_mix_gain_bezier_subblock() {
        let block = ParameterBlock {
            parameter_id: 7,
            start_timestamp: 0,
            end_timestamp: 1024,
            subblock_durations: vec![1024],
            subblocks: vec![ParameterSubblockPayload::MixGain(MixGainAnimation::Bezier {
                start: 0,
                end: 256,
                control: 128,
                control_relative_time: 32,
            })],
        };
        let payload = block.write_payload().unwrap();
        let parsed = ParameterBlock::parse_payload(&payload, ParameterType::MixGain, 0, 0, 1024).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn round_trips_demixing_subblock_and_rejects_multiple() {
        let block = ParameterBlock {
            parameter_id: 100,
            start_timestamp: 0,
            end_timestamp: 8,
            subblock_durations: vec![8],
            subblocks: vec![ParameterSubblockPayload::Demixing {
                dmixp_mode: DMixPMode::Mode3,
            }],
        };
        let payload = block.write_payload().unwrap();
        let parsed = ParameterBlock::parse_payload(&payload, ParameterType::Demixing, 0, 0, 8).unwrap();
        assert_eq!(parsed, block);

        let invalid = ParameterBlock {
            parameter_id: 100,
            start_timestamp: 0,
            end_timestamp: 16,
            subblock_durations: vec![8, 8],
            subblocks: vec![
                ParameterSubblockPayload::Demixing {
                    dmixp_mode: DMixPMode::Mode1,
                },
                ParameterSubblockPayload::Demixing {
                    dmixp_mode: DMixPMode::Mode2,
                },
            ],
        };
        assert!(invalid.write_payload().is_err());
    }

    #[test]
    fn round_trips_recon_gain_subblock_with_two_layers() {
        let mut layer0_gains = [0u8; 12];
        layer0_gains[recon_gain_bits::D_LS5 as usize] = pack_recon_gain(0.75).unwrap();
        let mut layer1_gains = [0u8; 12];
        layer1_gains[recon_gain_bits::D_RTB4 as usize] = pack_recon_gain(1.0).unwrap();

        let block = ParameterBlock {
            parameter_id: 200,
            start_timestamp: 0,
            end_timestamp: 8,
            subblock_durations: vec![8],
            subblocks: vec![ParameterSubblockPayload::ReconGain {
                layers: vec![
                    ReconGainLayer {
                        present_mask: 1 << recon_gain_bits::D_LS5,
                        gains: layer0_gains,
                    },
                    ReconGainLayer {
                        present_mask: 1 << recon_gain_bits::D_RTB4,
                        gains: layer1_gains,
                    },
                ],
            }],
        };
        let payload = block.write_payload().unwrap();
        let parsed = ParameterBlock::parse_payload(&payload, ParameterType::ReconGain, 2, 0, 8).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn recon_gain_packing_round_trips_within_rounding_error() {
        for byte in 0..=255u8 {
            let gain = unpack_recon_gain(byte);
            assert_eq!(pack_recon_gain(gain).unwrap(), byte);
        }
        assert!(pack_recon_gain(-0.1).is_err());
        assert!(pack_recon_gain(1.1).is_err());
    }
}
