//! Per-audio-element demixing state, grounded on `parameters_manager.cc`:
//! walks an ordered `{start_timestamp → parameter_block}` map one block at a
//! time and derives the down-mixing parameters a renderer needs for the
//! current tick.
//!
//! The `dmixp_mode → {alpha, beta, gamma, delta, w_idx_offset}` table and the
//! 11-entry w-index lookup are not present in the retrieved reference source
//! (only the enum/struct declarations survived extraction, not the `.cc` body
//! that fills them in) — the constants below come from the public IAMF
//! specification's downmix tables rather than from the grounding pack. See
//! `DESIGN.md` for the explicit callout.

use std::collections::BTreeMap;

use crate::obu::audio_element::DMixPMode;
use crate::obu::parameter_block::ParameterBlock;
use crate::utils::errors::ParametersManagerError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownMixingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub w: f64,
    pub w_idx_offset: i32,
    pub w_idx_used: i32,
    pub in_bitstream: bool,
}

impl DownMixingParams {
    /// The fixed default returned by `get_down_mixing_parameters` for an
    /// audio element with no demixing parameter definition at all.
    pub fn default_params() -> Self {
        DownMixingParams {
            alpha: 0.707,
            beta: 0.707,
            gamma: 0.707,
            delta: 0.707,
            w: 0.0,
            w_idx_offset: 0,
            w_idx_used: 0,
            in_bitstream: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WIdxUpdateRule {
    Normal,
    FirstFrame,
    Default,
}

struct DMixPModeParams {
    alpha: f64,
    beta: f64,
    gamma: f64,
    delta: f64,
    w_idx_offset: i32,
}

fn dmixp_mode_params(mode: DMixPMode) -> DMixPModeParams {
    match mode {
        DMixPMode::Mode1 => DMixPModeParams {
            alpha: 1.0,
            beta: 1.0,
            gamma: 0.866,
            delta: 0.866,
            w_idx_offset: 1,
        },
        DMixPMode::Mode2 => DMixPModeParams {
            alpha: 0.707,
            beta: 0.707,
            gamma: 0.866,
            delta: 0.866,
            w_idx_offset: 0,
        },
        DMixPMode::Mode3 => DMixPModeParams {
            alpha: 1.0,
            beta: 0.866,
            gamma: 0.866,
            delta: 0.866,
            w_idx_offset: -1,
        },
        DMixPMode::Mode1N => DMixPModeParams {
            alpha: 1.0,
            beta: 1.0,
            gamma: 0.866,
            delta: 0.866,
            w_idx_offset: 1,
        },
        DMixPMode::Mode2N => DMixPModeParams {
            alpha: 0.707,
            beta: 0.707,
            gamma: 0.866,
            delta: 0.866,
            w_idx_offset: 0,
        },
        DMixPMode::Mode3N => DMixPModeParams {
            alpha: 1.0,
            beta: 0.866,
            gamma: 0.866,
            delta: 0.866,
            w_idx_offset: -1,
        },
        DMixPMode::Reserved1 | DMixPMode::Reserved2 => DMixPModeParams {
            alpha: 1.0,
            beta: 1.0,
            gamma: 0.866,
            delta: 0.866,
            w_idx_offset: 0,
        },
    }
}

/// w_idx (0..=10) → w value, the fixed 11-entry lookup from the IAMF downmix tables.
const W_TABLE: [f64; 11] = [
    0.0, 0.0179, 0.0349, 0.0575, 0.0849, 0.121, 0.168, 0.231, 0.315, 0.4214, 0.5,
];

fn w_idx_to_w(w_idx: i32) -> Result<f64, ParametersManagerError> {
    if !(0..=10).contains(&w_idx) {
        return Err(ParametersManagerError::WIdxOutOfRange(w_idx));
    }
    Ok(W_TABLE[w_idx as usize])
}

/// `DMixPModeToDownMixingParams`: the static helper from `parameters_manager.cc`,
/// folding `previous_w_idx` forward by the mode's offset under `rule`.
pub fn dmixp_mode_to_down_mixing_params(
    mode: DMixPMode,
    previous_w_idx: i32,
    rule: WIdxUpdateRule,
) -> Result<(DownMixingParams, i32), ParametersManagerError> {
    let params = dmixp_mode_params(mode);
    let w_idx = match rule {
        WIdxUpdateRule::FirstFrame => params.w_idx_offset,
        // `previous_w_idx` carries the parameter definition's own `default_w`
        // here — the caller substitutes it in when the block iterator is at
        // its end and there's no real previous tick to fold forward from.
        WIdxUpdateRule::Default => previous_w_idx,
        WIdxUpdateRule::Normal => previous_w_idx + params.w_idx_offset,
    }
    .clamp(0, 10);

    let w = w_idx_to_w(w_idx)?;
    Ok((
        DownMixingParams {
            alpha: params.alpha,
            beta: params.beta,
            gamma: params.gamma,
            delta: params.delta,
            w,
            w_idx_offset: params.w_idx_offset,
            w_idx_used: w_idx,
            in_bitstream: false,
        },
        w_idx,
    ))
}

struct DemixingState {
    blocks: BTreeMap<i64, ParameterBlock>,
    previous_w_idx: i32,
    next_timestamp: i64,
    default_dmixp_mode: DMixPMode,
    default_w: i32,
}

/// Tracks, per audio element, the demixing-parameter walk described in
/// `parameters_manager.cc`'s `demixing_states_` map.
pub struct ParametersManager {
    demixing_states: BTreeMap<u64, DemixingState>,
}

impl ParametersManager {
    pub fn new() -> Self {
        ParametersManager {
            demixing_states: BTreeMap::new(),
        }
    }

    pub fn add_audio_element(
        &mut self,
        audio_element_id: u64,
        default_dmixp_mode: DMixPMode,
        default_w: i32,
    ) -> Result<(), ParametersManagerError> {
        if self.demixing_states.contains_key(&audio_element_id) {
            return Err(ParametersManagerError::MultipleDemixingDefinitions(audio_element_id));
        }
        self.demixing_states.insert(
            audio_element_id,
            DemixingState {
                blocks: BTreeMap::new(),
                previous_w_idx: 0,
                next_timestamp: 0,
                default_dmixp_mode,
                default_w,
            },
        );
        Ok(())
    }

    pub fn push_demixing_block(&mut self, audio_element_id: u64, block: ParameterBlock) {
        if let Some(state) = self.demixing_states.get_mut(&audio_element_id) {
            state.blocks.insert(block.start_timestamp, block);
        }
    }

    fn mode_and_rule_for(state: &DemixingState, timestamp: i64) -> (DMixPMode, WIdxUpdateRule, bool) {
        let block = state.blocks.get(&timestamp);
        let mode = block
            .and_then(|block| block.subblocks.first())
            .and_then(|sub| match sub {
                crate::obu::parameter_block::ParameterSubblockPayload::Demixing { dmixp_mode } => {
                    Some(*dmixp_mode)
                }
                _ => None,
            })
            .unwrap_or(state.default_dmixp_mode);

        let rule = if timestamp == 0 {
            WIdxUpdateRule::FirstFrame
        } else if block.is_some() {
            WIdxUpdateRule::Normal
        } else {
            WIdxUpdateRule::Default
        };

        (mode, rule, block.is_some())
    }

    /// `GetDownMixingParameters`: a read-only lookup of the down-mixing
    /// parameters in effect for `audio_element_id` at `timestamp`. Returns the
    /// fixed default when the audio element has no demixing parameter
    /// definition at all; never mutates the walk.
    pub fn get_down_mixing_parameters(&self, audio_element_id: u64, timestamp: i64) -> DownMixingParams {
        let Some(state) = self.demixing_states.get(&audio_element_id) else {
            return DownMixingParams::default_params();
        };

        let (mode, rule, in_bitstream) = Self::mode_and_rule_for(state, timestamp);
        let previous_w_idx = if rule == WIdxUpdateRule::Default {
            state.default_w
        } else {
            state.previous_w_idx
        };

        match dmixp_mode_to_down_mixing_params(mode, previous_w_idx, rule) {
            Ok((params, _)) => DownMixingParams { in_bitstream, ..params },
            Err(_) => DownMixingParams::default_params(),
        }
    }

    /// `UpdateDownMixingParameters`: advances the audio element's walk past
    /// `timestamp`, validating that it is the next timestamp expected (or the
    /// very first tick). Mutates `previous_w_idx`/`next_timestamp`; callers
    /// fetch the parameters for a tick with [`Self::get_down_mixing_parameters`]
    /// before calling this.
    pub fn update_down_mixing_parameters(
        &mut self,
        audio_element_id: u64,
        timestamp: i64,
    ) -> Result<(), ParametersManagerError> {
        let Some(state) = self.demixing_states.get_mut(&audio_element_id) else {
            return Ok(());
        };

        if timestamp != 0 && timestamp != state.next_timestamp {
            return Err(ParametersManagerError::TimestampMismatch {
                audio_element_id,
                expected: state.next_timestamp,
                actual: timestamp,
            });
        }

        let (mode, rule, _) = Self::mode_and_rule_for(state, timestamp);
        let previous_w_idx = if rule == WIdxUpdateRule::Default {
            state.default_w
        } else {
            state.previous_w_idx
        };

        let (_, w_idx) = dmixp_mode_to_down_mixing_params(mode, previous_w_idx, rule)?;
        state.previous_w_idx = w_idx;
        state.next_timestamp = match state.blocks.get(&timestamp) {
            Some(block) => block.end_timestamp,
            None => timestamp,
        };
        Ok(())
    }
}

impl Default for ParametersManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_rule_ignores_previous_w_idx() {
        let (_, w_idx) = dmixp_mode_to_down_mixing_params(DMixPMode::Mode1, 7, WIdxUpdateRule::FirstFrame).unwrap();
        assert_eq!(w_idx, 1);
    }

    #[test]
    fn normal_rule_folds_offset_onto_previous_w_idx_and_clamps() {
        let (_, w_idx) = dmixp_mode_to_down_mixing_params(DMixPMode::Mode1, 10, WIdxUpdateRule::Normal).unwrap();
        assert_eq!(w_idx, 10);
        let (_, w_idx) = dmixp_mode_to_down_mixing_params(DMixPMode::Mode3, 0, WIdxUpdateRule::Normal).unwrap();
        assert_eq!(w_idx, 0);
    }

    #[test]
    fn manager_rejects_a_second_demixing_definition_for_the_same_element() {
        let mut manager = ParametersManager::new();
        manager.add_audio_element(1, DMixPMode::Mode1, 0).unwrap();
        assert!(manager.add_audio_element(1, DMixPMode::Mode1, 0).is_err());
    }

    #[test]
    fn unknown_audio_element_gets_the_fixed_default_without_mutating_anything() {
        let manager = ParametersManager::new();
        let params = manager.get_down_mixing_parameters(7, 0);
        assert_eq!(params, DownMixingParams::default_params());
        assert!(!params.in_bitstream);
    }

    #[test]
    fn manager_walks_blocks_in_timestamp_order() {
        let mut manager = ParametersManager::new();
        manager.add_audio_element(1, DMixPMode::Mode1, 0).unwrap();
        manager.push_demixing_block(
            1,
            ParameterBlock {
                parameter_id: 100,
                start_timestamp: 0,
                end_timestamp: 8,
                subblock_durations: vec![8],
                subblocks: vec![crate::obu::parameter_block::ParameterSubblockPayload::Demixing {
                    dmixp_mode: DMixPMode::Mode3,
                }],
            },
        );
        manager.push_demixing_block(
            1,
            ParameterBlock {
                parameter_id: 100,
                start_timestamp: 8,
                end_timestamp: 16,
                subblock_durations: vec![8],
                subblocks: vec![crate::obu::parameter_block::ParameterSubblockPayload::Demixing {
                    dmixp_mode: DMixPMode::Mode2,
                }],
            },
        );

        let first = manager.get_down_mixing_parameters(1, 0);
        assert!(first.in_bitstream);
        manager.update_down_mixing_parameters(1, 0).unwrap();

        assert!(manager.update_down_mixing_parameters(1, 16).is_err());

        let second = manager.get_down_mixing_parameters(1, 8);
        assert!(second.in_bitstream);
        manager.update_down_mixing_parameters(1, 8).unwrap();
    }

    #[test]
    fn gap_past_the_last_known_block_falls_back_to_the_default_rule() {
        let mut manager = ParametersManager::new();
        manager.add_audio_element(1, DMixPMode::Mode2, 3).unwrap();
        manager.push_demixing_block(
            1,
            ParameterBlock {
                parameter_id: 100,
                start_timestamp: 0,
                end_timestamp: 8,
                subblock_durations: vec![8],
                subblocks: vec![crate::obu::parameter_block::ParameterSubblockPayload::Demixing {
                    dmixp_mode: DMixPMode::Mode1,
                }],
            },
        );
        manager.update_down_mixing_parameters(1, 0).unwrap();

        let params = manager.get_down_mixing_parameters(1, 8);
        assert!(!params.in_bitstream);
        assert_eq!(params.w, W_TABLE[3]);
    }
}
