//! Encoder-side data model and bitstream codec for IAMF (Immersive Audio
//! Model and Formats).
//!
//! ## Technical Overview
//!
//! IAMF describes an immersive audio presentation as a sequence of tagged
//! records (OBUs): a sequence header, one or more codec configs, audio
//! elements (channel-based, scene-based/Ambisonics, or object-based), mix
//! presentations, per-tick parameter blocks (mix gain, demixing, recon
//! gain), audio frames, and arbitrary records for forward extensibility.
//!
//! ### Bitstream Organization
//!
//! **Descriptor OBUs**: the sequence header, codec configs, audio elements,
//! and mix presentations that describe the stream once, up front.
//! **Data OBUs**: per-tick parameter blocks and audio frames, grouped into
//! [`temporal_unit::TemporalUnit`]s.
//!
//! ### Audio Element Types
//!
//! - Channel-based (mono through 7.1.4, plus the 9.1.6 expanded layout)
//! - Scene-based (Ambisonics, mono or projection order)
//! - Object-based
//!
//! ## Quick Start
//!
//! 1. Deserialize [`metadata::UserMetadata`] describing the presentation.
//! 2. Run the generators in [`generate`] to produce validated OBU records.
//! 3. Group records into [`temporal_unit::TemporalUnit`]s in stream order.
//! 4. Feed everything to a [`sequencer::Sequencer`] to serialize the stream.

/// Bitstream record types (§3): the sequence header, codec configs, audio
/// elements, mix presentations, parameter blocks, audio frames, and
/// arbitrary records, plus the shared header framing all of them.
pub mod obu;

/// Closed channel-label registry and the layout/demixing tables keyed on it.
pub mod channel_label;

/// Metadata-to-OBU generators: audio elements, mix presentations, parameter
/// blocks, and the reconstruction-gain engine they share.
pub mod generate;

/// Per-audio-element demixing state, deriving down-mix weights for a renderer.
pub mod parameters_manager;

/// Deserializable user-metadata structs consumed by the generators.
pub mod metadata;

/// Read-only per-tick grouping of parameter blocks, audio frames, and
/// arbitrary records.
pub mod temporal_unit;

/// Sequencing: orders temporal units and descriptor OBUs into a serialized
/// bitstream.
pub mod sequencer;

/// The interface a downstream renderer implements; this crate ships no
/// concrete renderer.
pub mod sample_processor;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): bit-level reading/writing.
/// - **Error handling** ([`utils::errors`]): one `thiserror` enum per subsystem.
/// - **Timing** ([`utils::timing`]): per-parameter-id contiguity bookkeeping.
pub mod utils;
