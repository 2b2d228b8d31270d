//! Semantic score model.
//!
//! These entities live in the scene next to the visual ones but are only
//! read by layout. The graph is Score → Parts → Measures → (Events, Staves)
//! → Durables, with Chords and BeamedGroups linking notes across events:
//!
//! | source        | field       | targets                     |
//! |---------------|-------------|-----------------------------|
//! | Score         | Parts       | Part                        |
//! | Part          | Measures    | Measure                     |
//! | Measure       | Events      | Event (ascending onset)     |
//! | Measure       | Staves      | Staff (by staff number)     |
//! | Event, Staff  | Durables    | Note, Rest, MeasureRest     |
//! | Chord         | Notes       | Note (ascending pitch)      |
//! | BeamedGroup   | Chords      | Chord (chronological)       |

mod import;
mod queries;

pub use import::import_score;
pub use queries::{ScoreEvent, ScoreMeasure};

use crate::error::{Result, SynthError};
use num_rational::Ratio;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Onset in quarter notes from the start of the measure.
pub type Onset = Ratio<i64>;

// ── Pitch ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    pub const ORDER: [Step; 7] = [Step::C, Step::D, Step::E, Step::F, Step::G, Step::A, Step::B];

    pub fn index(&self) -> i32 {
        *self as i32
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "C" => Ok(Step::C),
            "D" => Ok(Step::D),
            "E" => Ok(Step::E),
            "F" => Ok(Step::F),
            "G" => Ok(Step::G),
            "A" => Ok(Step::A),
            "B" => Ok(Step::B),
            other => Err(SynthError::InvalidScore(format!("unknown step '{other}'"))),
        }
    }
}

/// Scientific pitch; alteration is kept but does not affect placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub step: Step,
    pub octave: i32,
    pub alter: i32,
}

impl Pitch {
    pub fn new(step: Step, octave: i32) -> Self {
        Self { step, octave, alter: 0 }
    }

    /// Diatonic index: one per white key, C0 = 0.
    pub fn linear_pitch(&self) -> i32 {
        self.octave * 7 + self.step.index()
    }

    pub fn from_linear_pitch(linear_pitch: i32) -> Self {
        let step = Step::ORDER[linear_pitch.rem_euclid(7) as usize];
        Self::new(step, linear_pitch.div_euclid(7))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{}", self.step, self.octave)?;
        match self.alter {
            0 => Ok(()),
            a => write!(f, "{a:+}"),
        }
    }
}

// ── Clefs ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClefSign {
    G,
    F,
    C,
    Percussion,
}

impl ClefSign {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "G" => Ok(ClefSign::G),
            "F" => Ok(ClefSign::F),
            "C" => Ok(ClefSign::C),
            "percussion" => Ok(ClefSign::Percussion),
            other => Err(SynthError::InvalidScore(format!("unsupported clef sign '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clef {
    pub sign: ClefSign,
    /// Staff line counted from the bottom, 1..=5.
    pub line: i32,
}

impl Clef {
    /// Pitch position of the line the clef sits on.
    pub fn line_pitch_position(&self) -> i32 {
        (self.line - 3) * 2
    }

    /// The pitch the clef sign names, sitting on the clef line.
    fn reference(&self) -> (Pitch, i32) {
        match self.sign {
            ClefSign::G => (Pitch::new(Step::G, 4), self.line),
            ClefSign::F => (Pitch::new(Step::F, 3), self.line),
            ClefSign::C => (Pitch::new(Step::C, 4), self.line),
            ClefSign::Percussion => (Pitch::new(Step::G, 4), 2),
        }
    }

    pub fn pitch_to_pitch_position(&self, pitch: Pitch) -> i32 {
        let (reference, line) = self.reference();
        pitch.linear_pitch() - reference.linear_pitch() + (line - 3) * 2
    }

    pub fn pitch_position_to_pitch(&self, pitch_position: i32) -> Pitch {
        let (reference, line) = self.reference();
        Pitch::from_linear_pitch(pitch_position + reference.linear_pitch() - (line - 3) * 2)
    }
}

// ── Durations, stems, beams ────────────────────────────────────────

/// What a note or rest looks like, not how long it lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeDuration {
    Th1024,
    Th512,
    Th256,
    Th128,
    Th64,
    Th32,
    Th16,
    Eighth,
    Quarter,
    Half,
    Whole,
    Breve,
    Long,
    Maxima,
}

impl TypeDuration {
    pub fn parse(s: &str) -> Result<Self> {
        Ok(match s.trim() {
            "1024th" => TypeDuration::Th1024,
            "512th" => TypeDuration::Th512,
            "256th" => TypeDuration::Th256,
            "128th" => TypeDuration::Th128,
            "64th" => TypeDuration::Th64,
            "32nd" => TypeDuration::Th32,
            "16th" => TypeDuration::Th16,
            "eighth" => TypeDuration::Eighth,
            "quarter" => TypeDuration::Quarter,
            "half" => TypeDuration::Half,
            "whole" => TypeDuration::Whole,
            "breve" => TypeDuration::Breve,
            "long" => TypeDuration::Long,
            "maxima" => TypeDuration::Maxima,
            other => {
                return Err(SynthError::InvalidScore(format!("unknown note type '{other}'")));
            }
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeDuration::Th1024 => "1024th",
            TypeDuration::Th512 => "512th",
            TypeDuration::Th256 => "256th",
            TypeDuration::Th128 => "128th",
            TypeDuration::Th64 => "64th",
            TypeDuration::Th32 => "32nd",
            TypeDuration::Th16 => "16th",
            TypeDuration::Eighth => "eighth",
            TypeDuration::Quarter => "quarter",
            TypeDuration::Half => "half",
            TypeDuration::Whole => "whole",
            TypeDuration::Breve => "breve",
            TypeDuration::Long => "long",
            TypeDuration::Maxima => "maxima",
        }
    }

    /// Length in quarter notes.
    pub fn to_quarter_multiple(&self) -> Onset {
        let exponent = *self as i32 - TypeDuration::Quarter as i32;
        if exponent >= 0 {
            Ratio::from_integer(1 << exponent)
        } else {
            Ratio::new(1, 1 << -exponent)
        }
    }

    /// Stemless by nature.
    pub fn is_whole_or_longer(&self) -> bool {
        *self >= TypeDuration::Whole
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StemValue {
    Up,
    Down,
    NoStem,
}

impl StemValue {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "up" => Ok(StemValue::Up),
            "down" => Ok(StemValue::Down),
            "none" => Ok(StemValue::NoStem),
            other => Err(SynthError::InvalidScore(format!("unknown stem value '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeamValue {
    Begin,
    Continue,
    End,
    ForwardHook,
    BackwardHook,
}

impl BeamValue {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "begin" => Ok(BeamValue::Begin),
            "continue" => Ok(BeamValue::Continue),
            "end" => Ok(BeamValue::End),
            "forward hook" => Ok(BeamValue::ForwardHook),
            "backward hook" => Ok(BeamValue::BackwardHook),
            other => Err(SynthError::InvalidScore(format!("unknown beam value '{other}'"))),
        }
    }

    pub fn is_hook(&self) -> bool {
        matches!(self, BeamValue::ForwardHook | BeamValue::BackwardHook)
    }
}

// ── Attributes ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: i32,
    pub beat_type: i32,
}

/// Changes of attributes entering an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributesChange {
    pub clefs: BTreeMap<u8, Clef>,
    pub key_fifths: Option<i32>,
    pub time_signature: Option<TimeSignature>,
}

impl AttributesChange {
    pub fn is_empty(&self) -> bool {
        self.clefs.is_empty() && self.key_fifths.is_none() && self.time_signature.is_none()
    }
}

/// Full attribute state valid at an event; a running aggregation of
/// [`AttributesChange`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub staff_count: usize,
    /// One clef per staff number, starting at 1.
    pub clefs: BTreeMap<u8, Clef>,
    pub key_fifths: i32,
    pub time_signature: Option<TimeSignature>,
}

impl Attributes {
    /// Fails unless the first change defines a clef for every staff.
    pub fn from_first_change(staff_count: usize, change: &AttributesChange) -> Result<Self> {
        let attributes = Attributes {
            staff_count,
            clefs: change.clefs.clone(),
            key_fifths: change.key_fifths.unwrap_or(0),
            time_signature: change.time_signature,
        };
        attributes.validate()?;
        Ok(attributes)
    }

    pub fn apply_change(&self, change: &AttributesChange) -> Result<Self> {
        let mut clefs = self.clefs.clone();
        clefs.extend(change.clefs.iter().map(|(k, v)| (*k, *v)));
        let attributes = Attributes {
            staff_count: self.staff_count,
            clefs,
            key_fifths: change.key_fifths.unwrap_or(self.key_fifths),
            time_signature: change.time_signature.or(self.time_signature),
        };
        attributes.validate()?;
        Ok(attributes)
    }

    pub fn clef(&self, staff_number: u8) -> Result<Clef> {
        self.clefs.get(&staff_number).copied().ok_or_else(|| {
            SynthError::InvalidScore(format!("no clef for staff {staff_number}"))
        })
    }

    fn validate(&self) -> Result<()> {
        if self.staff_count == 0 {
            return Err(SynthError::InvalidScore("a part needs at least one staff".into()));
        }
        let expected: BTreeSet<u8> = (1..=self.staff_count).filter_map(|n| u8::try_from(n).ok()).collect();
        let actual: BTreeSet<u8> = self.clefs.keys().copied().collect();
        if expected != actual {
            return Err(SynthError::InvalidScore(format!(
                "expected exactly one clef for each of {} staves, got staves {:?}",
                self.staff_count, actual
            )));
        }
        Ok(())
    }
}

// ── Entities ───────────────────────────────────────────────────────

/// Root of the semantic graph.
#[derive(Debug, Clone, Default)]
pub struct Score {
    /// Measure indices that start a new system.
    pub new_system_measure_indices: BTreeSet<usize>,
    /// Measure indices that start a new page.
    pub new_page_measure_indices: BTreeSet<usize>,
}

#[derive(Debug, Clone)]
pub struct Part {
    pub id: String,
    pub name: String,
    pub staff_count: usize,
}

#[derive(Debug, Clone)]
pub struct Measure {
    pub number: String,
}

/// One staff of one measure.
#[derive(Debug, Clone, Copy)]
pub struct Staff {
    pub staff_number: u8,
}

/// Durables of one part-measure sharing an onset.
#[derive(Debug, Clone)]
pub struct Event {
    pub onset: Onset,
    pub attributes: Attributes,
    pub attributes_change: Option<AttributesChange>,
}

#[derive(Debug, Clone, Copy)]
pub struct Note {
    pub pitch: Pitch,
    pub type_duration: TypeDuration,
}

#[derive(Debug, Clone, Copy)]
pub struct Rest {
    pub type_duration: TypeDuration,
    pub display_pitch: Option<Pitch>,
}

#[derive(Debug, Clone, Copy)]
pub struct MeasureRest {
    pub display_pitch: Option<Pitch>,
}

/// Notes sharing one stem. `None` means the orientation was not given.
#[derive(Debug, Clone, Copy)]
pub struct Chord {
    pub stem_value: Option<StemValue>,
}

/// Chords joined by beams. `beam_values[i]` belongs to the i-th linked
/// chord and maps beam numbers (1 = eighth beam) to their values.
#[derive(Debug, Clone, Default)]
pub struct BeamedGroup {
    pub beam_values: Vec<BTreeMap<u8, BeamValue>>,
}

impl BeamedGroup {
    /// Whether beam 1 was terminated on the last chord.
    pub fn is_complete(&self) -> bool {
        self.beam_values
            .last()
            .is_some_and(|values| values.get(&1) == Some(&BeamValue::End))
    }

    /// Every full beam to draw: its number and the indices of the chords it
    /// spans, in the order the beams end.
    pub fn beams(&self) -> Result<Vec<(u8, Vec<usize>)>> {
        let mut open: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
        let mut beams = Vec::new();
        for (index, values) in self.beam_values.iter().enumerate() {
            for (&number, value) in values {
                match value {
                    BeamValue::Begin => {
                        open.insert(number, vec![index]);
                    }
                    BeamValue::Continue | BeamValue::End => {
                        let chords = open.get_mut(&number).ok_or_else(|| {
                            SynthError::InvalidScore(format!("beam {number} continues without a begin"))
                        })?;
                        chords.push(index);
                        if *value == BeamValue::End {
                            if let Some(chords) = open.remove(&number) {
                                beams.push((number, chords));
                            }
                        }
                    }
                    BeamValue::ForwardHook | BeamValue::BackwardHook => {}
                }
            }
        }
        if let Some(number) = open.keys().next() {
            return Err(SynthError::InvalidScore(format!("beam {number} is never terminated")));
        }
        Ok(beams)
    }

    /// Every hook to draw: beam number, chord index and hook direction.
    pub fn hooks(&self) -> Vec<(u8, usize, BeamValue)> {
        let mut hooks = Vec::new();
        for (index, values) in self.beam_values.iter().enumerate() {
            for (&number, &value) in values {
                if value.is_hook() {
                    hooks.push((number, index, value));
                }
            }
        }
        hooks
    }
}
