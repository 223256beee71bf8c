//! Reconstruction-gain engine (§4.5), grounded on `recon_gain_generator.cc`.
//!
//! The reference computes signal power as RMS (not mean-square) and forms
//! every decibel ratio directly from that RMS value without re-squaring it —
//! so `10*log10(P_a / P_b)`, not `20*log10(P_a / P_b)` as the spec prose's
//! `O²/M²` notation would suggest. This module reproduces the reference's
//! literal ratio rather than the prose's doubled exponent.

use std::collections::HashMap;

use crate::channel_label::ChannelLabel;
use crate::utils::errors::ReconGainError;

pub type LabelSamplesMap = HashMap<ChannelLabel, Vec<f64>>;

const MAX_L_SQUARED: f64 = 32767.0 * 32767.0;

/// `ComputeSignalPower`: RMS power of one frame of samples.
fn compute_signal_power(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let scale = 1.0 / samples.len() as f64;
    let mean_square: f64 = samples.iter().map(|s| scale * s * s).sum();
    mean_square.sqrt()
}

/// The dimensionally-suspect `10*log10(a/b)` the reference uses both for the
/// RMS-over-maxL² "power in dB" readings and, via a second bug, for a ratio
/// against an already-dB value in the final logging path. Never feeds either
/// real decision threshold — only logging and the final gain computation's
/// diagnostic output call this.
pub fn db_ratio_quirk(numerator: f64, denominator: f64) -> f64 {
    10.0 * (numerator / denominator).log10()
}

fn relevant_mixed_label(label: ChannelLabel) -> Result<ChannelLabel, ReconGainError> {
    use ChannelLabel::*;
    Ok(match label {
        DemixedL7 => L5,
        DemixedR7 => R5,
        DemixedLrs7 => Ls5,
        DemixedRrs7 => Rs5,
        DemixedLtb4 => Ltf2,
        DemixedRtb4 => Rtf2,
        DemixedL5 => L3,
        DemixedR5 => R3,
        DemixedLs5 => L3,
        DemixedRs5 => R3,
        DemixedLtf2 => Ltf3,
        DemixedRtf2 => Rtf3,
        DemixedL3 => L2,
        DemixedR3 => R2,
        DemixedR2 => Mono,
        other => return Err(ReconGainError::NoRelevantMixedLabel(other.to_str())),
    })
}

/// `FindSamplesOrDemixedSamples`: looks `label` up in `map` first, falling
/// through to `demixed_map` before giving up.
fn find_samples<'a>(
    label: ChannelLabel,
    map: &'a LabelSamplesMap,
    demixed_map: &'a LabelSamplesMap,
) -> Result<&'a Vec<f64>, ReconGainError> {
    map.get(&label)
        .or_else(|| demixed_map.get(&label))
        .ok_or_else(|| ReconGainError::MissingSamples(label.to_str()))
}

/// `ComputeReconGain`: returns a gain in `[0,1]`.
pub fn compute_recon_gain(
    label: ChannelLabel,
    label_to_samples: &LabelSamplesMap,
    label_to_decoded_samples: &LabelSamplesMap,
    additional_logging: bool,
) -> Result<f64, ReconGainError> {
    let original_samples = find_samples(label, label_to_samples, label_to_decoded_samples)?;
    let original_power = compute_signal_power(original_samples);

    let original_power_db = 10.0 * (original_power / MAX_L_SQUARED).log10();
    if additional_logging {
        log::info!("[{}] level Ok (dB) = {original_power_db}", label.to_str());
    }
    if original_power_db < -80.0 {
        return Ok(0.0);
    }

    let mixed_label = relevant_mixed_label(label)?;
    let relevant_mixed_samples = find_samples(mixed_label, label_to_samples, label_to_decoded_samples)?;
    let relevant_mixed_power = compute_signal_power(relevant_mixed_samples);
    if additional_logging {
        let mixed_power_db = 10.0 * (relevant_mixed_power / MAX_L_SQUARED).log10();
        log::info!("[{}] level Mk (dB) = {mixed_power_db}", label.to_str());
    }

    let original_mixed_ratio_db = 10.0 * (original_power / relevant_mixed_power).log10();
    if additional_logging {
        log::info!(
            "[{}] level Ok (dB) / level Mk (dB) = {original_mixed_ratio_db}",
            label.to_str()
        );
    }
    if original_mixed_ratio_db >= -6.0 {
        return Ok(1.0);
    }

    let demixed_samples = find_samples(label, label_to_decoded_samples, label_to_samples)?;
    let demixed_power = compute_signal_power(demixed_samples);

    if additional_logging {
        let mixed_power_db = 10.0 * (relevant_mixed_power / MAX_L_SQUARED).log10();
        let demixed_power_ratio_db = db_ratio_quirk(demixed_power, mixed_power_db);
        log::info!("[{}] level Dk (dB) = {demixed_power_ratio_db}", label.to_str());
    }

    let gain = (original_power / demixed_power).sqrt();
    if !(0.0..=1.0).contains(&gain) {
        return Err(ReconGainError::GainOutOfRange(gain));
    }
    Ok(gain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_frame(amplitude: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| amplitude * (i as f64 * 0.1).sin())
            .collect()
    }

    #[test]
    fn silent_original_returns_zero_gain() {
        let mut samples = LabelSamplesMap::new();
        samples.insert(ChannelLabel::DemixedL7, vec![0.0; 64]);
        samples.insert(ChannelLabel::L5, sine_frame(20000.0, 64));
        let decoded = LabelSamplesMap::new();

        let gain = compute_recon_gain(ChannelLabel::DemixedL7, &samples, &decoded, false).unwrap();
        assert_eq!(gain, 0.0);
    }

    #[test]
    fn original_close_to_mixed_returns_one() {
        let mut samples = LabelSamplesMap::new();
        let signal = sine_frame(20000.0, 64);
        samples.insert(ChannelLabel::DemixedL7, signal.clone());
        samples.insert(ChannelLabel::L5, signal);
        let decoded = LabelSamplesMap::new();

        let gain = compute_recon_gain(ChannelLabel::DemixedL7, &samples, &decoded, false).unwrap();
        assert_eq!(gain, 1.0);
    }

    #[test]
    fn quiet_original_against_loud_mix_falls_through_to_demixed_ratio() {
        let mut samples = LabelSamplesMap::new();
        samples.insert(ChannelLabel::DemixedL7, sine_frame(500.0, 64));
        samples.insert(ChannelLabel::L5, sine_frame(20000.0, 64));
        let mut decoded = LabelSamplesMap::new();
        decoded.insert(ChannelLabel::DemixedL7, sine_frame(1000.0, 64));

        let gain = compute_recon_gain(ChannelLabel::DemixedL7, &samples, &decoded, false).unwrap();
        assert!(gain > 0.0 && gain < 1.0);
    }

    #[test]
    fn unknown_label_without_a_relevant_mixed_channel_fails() {
        let samples = LabelSamplesMap::new();
        let decoded = LabelSamplesMap::new();
        assert!(compute_recon_gain(ChannelLabel::Centre, &samples, &decoded, false).is_err());
    }
}
