//! Score document: the serde exchange format the semantic graph is
//! imported from.
//!
//! The layout mirrors a partwise MusicXML file reduced to what notation
//! synthesis needs. Whatever parses MusicXML upstream hands the result over
//! as this document (usually as JSON).

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A complete score document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Score {
    /// Title of the piece
    pub title: Option<String>,
    /// Musical parts (instruments); all must have the same measure count
    pub parts: Vec<Part>,
}

/// A musical part (one instrument).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Part {
    /// Part identifier (e.g., "P1")
    pub id: String,
    /// Part name (e.g., "Piano")
    pub name: String,
    /// Ordered list of measures
    pub measures: Vec<Measure>,
}

/// A single measure of one part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Measure {
    /// Measure number as printed
    pub number: String,
    /// Attributes (key, time, clef), present only when they change
    pub attributes: Option<Attributes>,
    /// Notes and rests in document order
    pub notes: Vec<Note>,
    /// Whether this measure starts a new system (line break)
    pub new_system: bool,
    /// Whether this measure starts a new page
    pub new_page: bool,
}

/// Attributes that may change at the start of a measure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    /// Divisions per quarter note
    pub divisions: Option<i32>,
    pub key: Option<Key>,
    pub time: Option<TimeSignature>,
    /// Clef(s), one per staff, each tagged with a staff `number`
    pub clefs: Vec<Clef>,
    /// Number of staves in this part (e.g. 2 for a grand staff)
    pub staves: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Number of sharps (positive) or flats (negative)
    pub fifths: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: i32,
    pub beat_type: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clef {
    /// Staff number this clef belongs to (1-based)
    #[serde(default = "first_staff")]
    pub number: i32,
    /// "G", "F", "C" or "percussion"
    pub sign: String,
    /// Staff line the clef sits on, counted from the bottom
    pub line: i32,
}

/// A single note or rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    /// Pitch (None for rests)
    pub pitch: Option<Pitch>,
    /// Duration in divisions
    pub duration: i32,
    /// Voice number (for multi-voice writing)
    pub voice: Option<i32>,
    /// Note type: "whole", "half", "quarter", "eighth", "16th", ...
    pub note_type: Option<String>,
    /// Stem direction: "up", "down" or "none"
    pub stem: Option<String>,
    /// Beam information
    pub beams: Vec<Beam>,
    /// Whether this is a rest
    pub rest: bool,
    /// Whether this rest fills the whole measure
    pub measure_rest: bool,
    /// Whether this note shares the onset and stem of the previous note
    pub chord: bool,
    /// Staff number (1-based)
    pub staff: Option<i32>,
    /// Vertical placement of a rest, expressed as a pitch
    pub display_pitch: Option<Pitch>,
}

/// Pitch of a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pitch {
    /// Note name: A, B, C, D, E, F, G
    pub step: String,
    /// Octave number (middle C = C4)
    pub octave: i32,
    /// Chromatic alteration
    #[serde(default)]
    pub alter: Option<f64>,
}

/// Beam grouping information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beam {
    /// Beam level (1 = eighth-note beam, 2 = sixteenth-note beam, etc.)
    pub number: i32,
    /// "begin", "continue", "end", "forward hook" or "backward hook"
    pub beam_type: String,
}

fn first_staff() -> i32 {
    1
}

impl Score {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of measures (taken from the first part).
    pub fn measure_count(&self) -> usize {
        self.parts.first().map_or(0, |p| p.measures.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_fill_defaults() {
        let json = r#"{
            "parts": [{
                "id": "P1",
                "measures": [{
                    "attributes": { "divisions": 1, "clefs": [{ "sign": "G", "line": 2 }] },
                    "notes": [{ "pitch": { "step": "C", "octave": 5 }, "duration": 4, "note_type": "whole" }]
                }]
            }]
        }"#;
        let score = Score::from_json(json).unwrap();
        assert_eq!(score.measure_count(), 1);
        let measure = &score.parts[0].measures[0];
        assert_eq!(measure.attributes.as_ref().unwrap().clefs[0].number, 1);
        assert!(!measure.new_system);
        assert!(measure.notes[0].beams.is_empty());
        assert_eq!(measure.notes[0].voice, None);
    }
}
