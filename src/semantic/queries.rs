//! Owner-of queries over the semantic graph.
//!
//! Each query walks one link backwards. Queries that must succeed for a
//! well-formed graph fail loudly; optional memberships return `Option`.

use super::Onset;
use crate::error::{Result, SynthError};
use crate::scene::{EntityKind, Field, GlyphKind, LineKind, ObjectId, Scene};

/// One onset of a score measure: the part events sharing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEvent {
    pub onset: Onset,
    pub events: Vec<ObjectId>,
}

/// A time-wise view of one measure index across every part.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMeasure {
    /// Part measures in part order.
    pub measures: Vec<ObjectId>,
    /// Events merged by onset, ascending.
    pub events: Vec<ScoreEvent>,
}

impl Scene {
    // ── Owners ─────────────────────────────────────────────────────

    pub fn staff_of_durable(&self, durable: ObjectId) -> Result<ObjectId> {
        self.inlinked_exactly_one(durable, EntityKind::Staff, Field::Durables)
    }

    pub fn event_of_durable(&self, durable: ObjectId) -> Result<ObjectId> {
        self.inlinked_exactly_one(durable, EntityKind::Event, Field::Durables)
    }

    pub fn measure_of_event(&self, event: ObjectId) -> Result<ObjectId> {
        self.inlinked_exactly_one(event, EntityKind::Measure, Field::Events)
    }

    pub fn measure_of_staff(&self, staff: ObjectId) -> Result<ObjectId> {
        self.inlinked_exactly_one(staff, EntityKind::Measure, Field::Staves)
    }

    pub fn part_of_measure(&self, measure: ObjectId) -> Result<ObjectId> {
        self.inlinked_exactly_one(measure, EntityKind::Part, Field::Measures)
    }

    pub fn score_of_part(&self, part: ObjectId) -> Result<ObjectId> {
        self.inlinked_exactly_one(part, EntityKind::Score, Field::Parts)
    }

    /// Every note belongs to exactly one chord, even a lone one.
    pub fn chord_of_note(&self, note: ObjectId) -> Result<ObjectId> {
        self.inlinked_exactly_one(note, EntityKind::Chord, Field::Notes)
    }

    pub fn beamed_group_of_chord(&self, chord: ObjectId) -> Result<Option<ObjectId>> {
        self.inlinked_at_most_one(chord, EntityKind::BeamedGroup, Field::Chords)
    }

    pub fn notehead_of_note(&self, note: ObjectId) -> Result<ObjectId> {
        self.inlinked_exactly_one(note, EntityKind::Glyph, Field::Notes)
    }

    /// The rest glyph drawn for a rest or measure rest.
    pub fn glyph_of_rest(&self, rest: ObjectId) -> Result<ObjectId> {
        self.inlinked_exactly_one(rest, EntityKind::Glyph, Field::Rest)
    }

    /// The stem line glyph of a chord; beam hooks also link chords and are
    /// skipped.
    pub fn stem_of_chord(&self, chord: ObjectId) -> Result<Option<ObjectId>> {
        let mut stems = Vec::new();
        for glyph in self.get_inlinked(chord, EntityKind::Glyph, Field::Chord)? {
            if self.glyph(glyph)?.kind == GlyphKind::Line(LineKind::Stem) {
                stems.push(glyph);
            }
        }
        match stems.as_slice() {
            [] => Ok(None),
            [stem] => Ok(Some(*stem)),
            _ => Err(SynthError::TooManyInlinks {
                target: chord,
                kind: EntityKind::Glyph,
                field: Field::Chord,
                found: stems.len(),
            }),
        }
    }

    pub fn beam_coordinate_system_of_group(&self, group: ObjectId) -> Result<Option<ObjectId>> {
        self.inlinked_at_most_one(group, EntityKind::BeamCoordinates, Field::BeamedGroup)
    }

    // ── Counts and indices ─────────────────────────────────────────

    pub fn parts_of(&self, score: ObjectId) -> Vec<ObjectId> {
        self.linked(score, Field::Parts)
    }

    /// Total staves across all parts.
    pub fn staff_count(&self, score: ObjectId) -> Result<usize> {
        let mut count = 0;
        for part in self.parts_of(score) {
            count += self.part(part)?.staff_count;
        }
        Ok(count)
    }

    pub fn measure_count(&self, score: ObjectId) -> usize {
        self.parts_of(score)
            .first()
            .map_or(0, |&p| self.linked(p, Field::Measures).len())
    }

    /// Index of the part's top staff among all staves of the score.
    pub fn first_staff_index_of_part(&self, part: ObjectId) -> Result<usize> {
        let score = self.score_of_part(part)?;
        let mut index = 0;
        for p in self.parts_of(score) {
            if p == part {
                return Ok(index);
            }
            index += self.part(p)?.staff_count;
        }
        Err(SynthError::InvalidScore(format!("part {part} is not listed by its score")))
    }

    /// Index of the durable's staff among all staves of the score.
    pub fn staff_index_of_durable(&self, durable: ObjectId) -> Result<usize> {
        let staff = self.staff_of_durable(durable)?;
        let measure = self.measure_of_staff(staff)?;
        let part = self.part_of_measure(measure)?;
        let number = usize::from(self.staff(staff)?.staff_number);
        Ok(self.first_staff_index_of_part(part)? + number - 1)
    }

    pub fn staff_number_of_durable(&self, durable: ObjectId) -> Result<u8> {
        Ok(self.staff(self.staff_of_durable(durable)?)?.staff_number)
    }

    /// Time-wise slice of the score at one measure index.
    pub fn score_measure(&self, score: ObjectId, measure_index: usize) -> Result<ScoreMeasure> {
        let mut measures = Vec::new();
        for part in self.parts_of(score) {
            let measure = self
                .linked(part, Field::Measures)
                .get(measure_index)
                .copied()
                .ok_or_else(|| {
                    SynthError::InvalidScore(format!("part {part} has no measure {measure_index}"))
                })?;
            measures.push(measure);
        }

        let mut events: Vec<ScoreEvent> = Vec::new();
        for &measure in &measures {
            for event in self.linked(measure, Field::Events) {
                let onset = self.event(event)?.onset;
                match events.binary_search_by(|e| e.onset.cmp(&onset)) {
                    Ok(i) => events[i].events.push(event),
                    Err(i) => events.insert(i, ScoreEvent { onset, events: vec![event] }),
                }
            }
        }
        Ok(ScoreMeasure { measures, events })
    }
}
