//! Glyph class identifiers.
//!
//! Classes from the SMuFL specification use the `smufl::` prefix, classes
//! SMuFL lacks (beams, ledger lines) use `scoresynth::`.

use crate::error::{Result, SynthError};
use crate::semantic::{ClefSign, TypeDuration};

// ── Barlines and clefs ─────────────────────────────────────────────
pub const BARLINE_SINGLE: &str = "smufl::barlineSingle";
pub const G_CLEF: &str = "smufl::gClef";
pub const F_CLEF: &str = "smufl::fClef";
pub const C_CLEF: &str = "smufl::cClef";
pub const G_CLEF_SMALL: &str = "smufl::gClefSmall";
pub const F_CLEF_SMALL: &str = "smufl::fClefSmall";
pub const C_CLEF_SMALL: &str = "smufl::cClefSmall";

// ── Noteheads and stems ────────────────────────────────────────────
pub const NOTEHEAD_BLACK: &str = "smufl::noteheadBlack";
pub const NOTEHEAD_HALF: &str = "smufl::noteheadHalf";
pub const NOTEHEAD_WHOLE: &str = "smufl::noteheadWhole";
pub const NOTEHEAD_DOUBLE_WHOLE: &str = "smufl::noteheadDoubleWhole";
pub const NOTEHEAD_DOUBLE_WHOLE_SQUARE: &str = "smufl::noteheadDoubleWholeSquare";
pub const STEM: &str = "smufl::stem";

// ── Rests ──────────────────────────────────────────────────────────
pub const REST_MAXIMA: &str = "smufl::restMaxima";
pub const REST_LONGA: &str = "smufl::restLonga";
pub const REST_DOUBLE_WHOLE: &str = "smufl::restDoubleWhole";
pub const REST_WHOLE: &str = "smufl::restWhole";
pub const REST_HALF: &str = "smufl::restHalf";
pub const REST_QUARTER: &str = "smufl::restQuarter";
pub const REST_8TH: &str = "smufl::rest8th";
pub const REST_16TH: &str = "smufl::rest16th";
pub const REST_32ND: &str = "smufl::rest32nd";
pub const REST_64TH: &str = "smufl::rest64th";
pub const REST_128TH: &str = "smufl::rest128th";
pub const REST_256TH: &str = "smufl::rest256th";
pub const REST_512TH: &str = "smufl::rest512th";
pub const REST_1024TH: &str = "smufl::rest1024th";

// ── Non-SMuFL ──────────────────────────────────────────────────────
pub const BEAM: &str = "scoresynth::beam";
pub const BEAM_HOOK: &str = "scoresynth::beamHook";
pub const LEDGER_LINE: &str = "scoresynth::ledgerLine";

pub fn notehead_from_type_duration(duration: TypeDuration) -> &'static str {
    match duration {
        TypeDuration::Half => NOTEHEAD_HALF,
        TypeDuration::Whole => NOTEHEAD_WHOLE,
        TypeDuration::Breve => NOTEHEAD_DOUBLE_WHOLE,
        TypeDuration::Long | TypeDuration::Maxima => NOTEHEAD_DOUBLE_WHOLE_SQUARE,
        _ => NOTEHEAD_BLACK,
    }
}

pub fn rest_from_type_duration(duration: TypeDuration) -> &'static str {
    match duration {
        TypeDuration::Th1024 => REST_1024TH,
        TypeDuration::Th512 => REST_512TH,
        TypeDuration::Th256 => REST_256TH,
        TypeDuration::Th128 => REST_128TH,
        TypeDuration::Th64 => REST_64TH,
        TypeDuration::Th32 => REST_32ND,
        TypeDuration::Th16 => REST_16TH,
        TypeDuration::Eighth => REST_8TH,
        TypeDuration::Quarter => REST_QUARTER,
        TypeDuration::Half => REST_HALF,
        TypeDuration::Whole => REST_WHOLE,
        TypeDuration::Breve => REST_DOUBLE_WHOLE,
        TypeDuration::Long => REST_LONGA,
        TypeDuration::Maxima => REST_MAXIMA,
    }
}

/// Percussion clefs have no glyph class.
pub fn clef_from_clef_sign(sign: ClefSign, small: bool) -> Result<&'static str> {
    match (sign, small) {
        (ClefSign::G, false) => Ok(G_CLEF),
        (ClefSign::G, true) => Ok(G_CLEF_SMALL),
        (ClefSign::F, false) => Ok(F_CLEF),
        (ClefSign::F, true) => Ok(F_CLEF_SMALL),
        (ClefSign::C, false) => Ok(C_CLEF),
        (ClefSign::C, true) => Ok(C_CLEF_SMALL),
        (ClefSign::Percussion, _) => Err(SynthError::UnsupportedGlyphClass(format!(
            "clef for sign {sign:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups() {
        assert_eq!(notehead_from_type_duration(TypeDuration::Th16), NOTEHEAD_BLACK);
        assert_eq!(notehead_from_type_duration(TypeDuration::Maxima), NOTEHEAD_DOUBLE_WHOLE_SQUARE);
        assert_eq!(rest_from_type_duration(TypeDuration::Th32), REST_32ND);
        assert_eq!(clef_from_clef_sign(ClefSign::F, true).unwrap(), F_CLEF_SMALL);
        assert!(clef_from_clef_sign(ClefSign::Percussion, false).is_err());
    }
}
