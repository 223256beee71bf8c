//! Canonical channel labels and the layout/demixing tables keyed on them.
//!
//! All tables here are immutable and allocation-free; they back the scalable
//! channel layout generator ([`crate::generate::audio_element_generator`]) and
//! the reconstruction-gain engine ([`crate::generate::recon_gain_generator`]).

use crate::obu::audio_element::{ExpandedLoudspeakerLayout, LoudspeakerLayout};
use crate::utils::errors::ChannelLabelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelLabel {
    Omitted,
    Mono,
    L2,
    R2,
    DemixedR2,
    Centre,
    Lfe,
    L3,
    R3,
    Rtf3,
    Ltf3,
    DemixedL3,
    DemixedR3,
    L5,
    R5,
    Ls5,
    Rs5,
    Ltf2,
    Rtf2,
    DemixedL5,
    DemixedR5,
    DemixedLs5,
    DemixedRs5,
    DemixedRtf2,
    DemixedLtf2,
    L7,
    R7,
    Lss7,
    Rss7,
    Lrs7,
    Rrs7,
    Ltf4,
    Rtf4,
    Ltb4,
    Rtb4,
    DemixedL7,
    DemixedR7,
    DemixedLrs7,
    DemixedRrs7,
    DemixedLtb4,
    DemixedRtb4,
    FLc,
    FC,
    FRc,
    FL,
    FR,
    SiL,
    SiR,
    BL,
    BR,
    TpFL,
    TpFR,
    TpSiL,
    TpSiR,
    TpBL,
    TpBR,
    Ambisonics(u8),
}

impl ChannelLabel {
    /// Inverse of [`ChannelLabel::to_str`]. Fails on anything not in the closed set.
    pub fn from_str(label: &str) -> Result<Self, ChannelLabelError> {
        use ChannelLabel::*;
        Ok(match label {
            "Omitted" => Omitted,
            "M" => Mono,
            "L2" => L2,
            "R2" => R2,
            "DemixedR2" => DemixedR2,
            "C" => Centre,
            "LFE" => Lfe,
            "L3" => L3,
            "R3" => R3,
            "Rtf3" => Rtf3,
            "Ltf3" => Ltf3,
            "DemixedL3" => DemixedL3,
            "DemixedR3" => DemixedR3,
            "L5" => L5,
            "R5" => R5,
            "Ls5" => Ls5,
            "Rs5" => Rs5,
            "Ltf2" => Ltf2,
            "Rtf2" => Rtf2,
            "DemixedL5" => DemixedL5,
            "DemixedR5" => DemixedR5,
            "DemixedLs5" => DemixedLs5,
            "DemixedRs5" => DemixedRs5,
            "DemixedRtf2" => DemixedRtf2,
            "DemixedLtf2" => DemixedLtf2,
            "L7" => L7,
            "R7" => R7,
            "Lss7" => Lss7,
            "Rss7" => Rss7,
            "Lrs7" => Lrs7,
            "Rrs7" => Rrs7,
            "Ltf4" => Ltf4,
            "Rtf4" => Rtf4,
            "Ltb4" => Ltb4,
            "Rtb4" => Rtb4,
            "DemixedL7" => DemixedL7,
            "DemixedR7" => DemixedR7,
            "DemixedLrs7" => DemixedLrs7,
            "DemixedRrs7" => DemixedRrs7,
            "DemixedLtb4" => DemixedLtb4,
            "DemixedRtb4" => DemixedRtb4,
            "FLc" => FLc,
            "FC" => FC,
            "FRc" => FRc,
            "FL" => FL,
            "FR" => FR,
            "SiL" => SiL,
            "SiR" => SiR,
            "BL" => BL,
            "BR" => BR,
            "TpFL" => TpFL,
            "TpFR" => TpFR,
            "TpSiL" => TpSiL,
            "TpSiR" => TpSiR,
            "TpBL" => TpBL,
            "TpBR" => TpBR,
            other if other.starts_with('A') => {
                let n: u8 = other[1..]
                    .parse()
                    .map_err(|_| ChannelLabelError::UnknownLabel(label.to_string()))?;
                if n > 24 {
                    return Err(ChannelLabelError::UnknownLabel(label.to_string()));
                }
                Ambisonics(n)
            }
            _ => return Err(ChannelLabelError::UnknownLabel(label.to_string())),
        })
    }

    /// Total function: every variant has a canonical display string.
    pub fn to_str(self) -> String {
        use ChannelLabel::*;
        match self {
            Omitted => "Omitted".to_string(),
            Mono => "M".to_string(),
            L2 => "L2".to_string(),
            R2 => "R2".to_string(),
            DemixedR2 => "DemixedR2".to_string(),
            Centre => "C".to_string(),
            Lfe => "LFE".to_string(),
            L3 => "L3".to_string(),
            R3 => "R3".to_string(),
            Rtf3 => "Rtf3".to_string(),
            Ltf3 => "Ltf3".to_string(),
            DemixedL3 => "DemixedL3".to_string(),
            DemixedR3 => "DemixedR3".to_string(),
            L5 => "L5".to_string(),
            R5 => "R5".to_string(),
            Ls5 => "Ls5".to_string(),
            Rs5 => "Rs5".to_string(),
            Ltf2 => "Ltf2".to_string(),
            Rtf2 => "Rtf2".to_string(),
            DemixedL5 => "DemixedL5".to_string(),
            DemixedR5 => "DemixedR5".to_string(),
            DemixedLs5 => "DemixedLs5".to_string(),
            DemixedRs5 => "DemixedRs5".to_string(),
            DemixedRtf2 => "DemixedRtf2".to_string(),
            DemixedLtf2 => "DemixedLtf2".to_string(),
            L7 => "L7".to_string(),
            R7 => "R7".to_string(),
            Lss7 => "Lss7".to_string(),
            Rss7 => "Rss7".to_string(),
            Lrs7 => "Lrs7".to_string(),
            Rrs7 => "Rrs7".to_string(),
            Ltf4 => "Ltf4".to_string(),
            Rtf4 => "Rtf4".to_string(),
            Ltb4 => "Ltb4".to_string(),
            Rtb4 => "Rtb4".to_string(),
            DemixedL7 => "DemixedL7".to_string(),
            DemixedR7 => "DemixedR7".to_string(),
            DemixedLrs7 => "DemixedLrs7".to_string(),
            DemixedRrs7 => "DemixedRrs7".to_string(),
            DemixedLtb4 => "DemixedLtb4".to_string(),
            DemixedRtb4 => "DemixedRtb4".to_string(),
            FLc => "FLc".to_string(),
            FC => "FC".to_string(),
            FRc => "FRc".to_string(),
            FL => "FL".to_string(),
            FR => "FR".to_string(),
            SiL => "SiL".to_string(),
            SiR => "SiR".to_string(),
            BL => "BL".to_string(),
            BR => "BR".to_string(),
            TpFL => "TpFL".to_string(),
            TpFR => "TpFR".to_string(),
            TpSiL => "TpSiL".to_string(),
            TpSiR => "TpSiR".to_string(),
            TpBL => "TpBL".to_string(),
            TpBR => "TpBR".to_string(),
            Ambisonics(n) => format!("A{n}"),
        }
    }

    /// `ambisonics_channel_number_to_label`: valid for `k in [0, 24]`.
    pub fn from_ambisonics_channel_number(k: u8) -> Result<Self, ChannelLabelError> {
        if k > 24 {
            return Err(ChannelLabelError::AmbisonicsChannelOutOfRange(k));
        }
        Ok(ChannelLabel::Ambisonics(k))
    }

    /// The 15-entry canonical→demixed map. Undefined (fails) elsewhere.
    pub fn demixed_label(self) -> Result<Self, ChannelLabelError> {
        use ChannelLabel::*;
        Ok(match self {
            R2 => DemixedR2,
            L3 => DemixedL3,
            R3 => DemixedR3,
            L5 => DemixedL5,
            R5 => DemixedR5,
            Ls5 => DemixedLs5,
            Rs5 => DemixedRs5,
            Ltf2 => DemixedLtf2,
            Rtf2 => DemixedRtf2,
            L7 => DemixedL7,
            R7 => DemixedR7,
            Lrs7 => DemixedLrs7,
            Rrs7 => DemixedRrs7,
            Ltb4 => DemixedLtb4,
            Rtb4 => DemixedRtb4,
            other => return Err(ChannelLabelError::NotDemixable(other.to_str())),
        })
    }
}

/// Ordered labels for each non-expanded loudspeaker layout, in EAR channel order.
pub fn ear_channel_order_from_layout(
    layout: LoudspeakerLayout,
) -> Result<Vec<ChannelLabel>, ChannelLabelError> {
    use ChannelLabel::*;
    use LoudspeakerLayout::*;
    Ok(match layout {
        Mono => vec![ChannelLabel::Mono],
        Stereo => vec![L2, R2],
        Surround5_1 => vec![L5, R5, Centre, Lfe, Ls5, Rs5],
        Surround5_1_2 => vec![L5, R5, Centre, Lfe, Ls5, Rs5, Ltf2, Rtf2],
        Surround5_1_4 => vec![L5, R5, Centre, Lfe, Ls5, Rs5, Ltf4, Rtf4, Ltb4, Rtb4],
        Surround7_1 => vec![L7, R7, Centre, Lfe, Lss7, Rss7, Lrs7, Rrs7],
        Surround7_1_2 => vec![L7, R7, Centre, Lfe, Lss7, Rss7, Lrs7, Rrs7, Ltf2, Rtf2],
        Surround7_1_4 => vec![
            L7, R7, Centre, Lfe, Lss7, Rss7, Lrs7, Rrs7, Ltf4, Rtf4, Ltb4, Rtb4,
        ],
        Surround3_1_2 => vec![L3, R3, Centre, Lfe, Ltf3, Rtf3],
        Binaural => vec![L2, R2],
        Expanded(code) => ear_channel_order_from_expanded_layout(code)?,
        Reserved(code) => return Err(ChannelLabelError::UnknownExpandedLayout(format!("reserved({code})"))),
    })
}

/// Auxiliary table for the 13 named expanded-layout codes (§4.1).
fn ear_channel_order_from_expanded_layout(
    code: ExpandedLoudspeakerLayout,
) -> Result<Vec<ChannelLabel>, ChannelLabelError> {
    use ChannelLabel as C;
    use ExpandedLoudspeakerLayout as E;
    Ok(match code {
        E::Lfe => vec![C::Lfe],
        E::StereoS => vec![C::Ls5, C::Rs5],
        E::StereoSS => vec![C::Lss7, C::Rss7],
        E::StereoRS => vec![C::Lrs7, C::Rrs7],
        E::StereoTF => vec![C::Ltf4, C::Rtf4],
        E::StereoTB => vec![C::Ltb4, C::Rtb4],
        E::Top4Ch => vec![C::Ltf4, C::Rtf4, C::Ltb4, C::Rtb4],
        E::Front3_0 => vec![C::L7, C::Centre, C::R7],
        E::Surround9_1_6 => vec![
            C::FL, C::FR, C::FC, C::Lfe, C::BL, C::BR, C::FLc, C::FRc, C::SiL, C::SiR, C::TpFL, C::TpFR, C::TpSiL,
            C::TpSiR, C::TpBL, C::TpBR,
        ],
        E::StereoF => vec![C::FL, C::FR],
        E::StereoSi => vec![C::SiL, C::SiR],
        E::StereoTpSi => vec![C::TpSiL, C::TpSiR],
        E::Top6Ch => vec![C::TpFL, C::TpFR, C::TpSiL, C::TpSiR, C::TpBL, C::TpBR],
        E::Reserved(code) => return Err(ChannelLabelError::UnknownExpandedLayout(format!("reserved({code})"))),
    })
}

/// `fill_labels_from_strings`: appends to `out`, failing on duplicates or unknown strings.
pub fn fill_labels_from_strings(
    strings: &[String],
    out: &mut Vec<ChannelLabel>,
) -> Result<(), ChannelLabelError> {
    for s in strings {
        let label = ChannelLabel::from_str(s)?;
        if out.contains(&label) {
            return Err(ChannelLabelError::DuplicateLabel(s.clone()));
        }
        out.push(label);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_round_trips_through_its_string() {
        let labels = [
            ChannelLabel::Omitted,
            ChannelLabel::Mono,
            ChannelLabel::DemixedRtb4,
            ChannelLabel::TpBR,
            ChannelLabel::Ambisonics(0),
            ChannelLabel::Ambisonics(24),
        ];
        for label in labels {
            let s = label.to_str();
            assert_eq!(ChannelLabel::from_str(&s).unwrap(), label);
        }
    }

    #[test]
    fn ambisonics_channel_number_bounds() {
        assert!(ChannelLabel::from_ambisonics_channel_number(24).is_ok());
        assert!(ChannelLabel::from_ambisonics_channel_number(25).is_err());
    }

    #[test]
    fn demixed_label_defined_only_for_the_fifteen_mixable_channels() {
        assert_eq!(
            ChannelLabel::Lrs7.demixed_label().unwrap(),
            ChannelLabel::DemixedLrs7
        );
        assert!(ChannelLabel::Centre.demixed_label().is_err());
    }

    #[test]
    fn ear_channel_order_matches_layout_channel_count() {
        let labels = ear_channel_order_from_layout(LoudspeakerLayout::Surround5_1_4).unwrap();
        assert_eq!(labels.len(), 10);
    }

    #[test]
    fn fill_labels_rejects_duplicates_and_unknown_strings() {
        let mut out = Vec::new();
        fill_labels_from_strings(&["L2".to_string(), "R2".to_string()], &mut out).unwrap();
        assert_eq!(out.len(), 2);
        assert!(fill_labels_from_strings(&["L2".to_string()], &mut out).is_err());
        assert!(fill_labels_from_strings(&["Bogus".to_string()], &mut out).is_err());
    }
}
