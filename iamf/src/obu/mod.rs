//! Record types making up the bitstream: the sequence header, codec configs,
//! audio elements, mix presentations, parameter blocks, audio frames, and
//! arbitrary records, plus the shared header framing all of them share.
//!
//! Every record type implements `validate_and_write` (producing header-framed
//! bytes) and a `parse_payload` counterpart, the way [`crate::obu::header`]'s
//! `ObuHeader` frames them; the codec never falls back to ad hoc byte
//! concatenation the way a fixed-width-only writer would.

pub mod arbitrary_obu;
pub mod audio_element;
pub mod audio_frame;
pub mod codec_config;
pub mod header;
pub mod mix_presentation;
pub mod parameter_block;
pub mod sequence_header;
