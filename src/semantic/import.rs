//! Builds the semantic graph from a [`crate::model::Score`] document.

use super::{
    Attributes, AttributesChange, BeamValue, BeamedGroup, Chord, Clef, ClefSign, Event, Measure,
    MeasureRest, Note, Onset, Part, Pitch, Rest, Score, Staff, Step, StemValue, TimeSignature,
    TypeDuration,
};
use crate::error::{Result, SynthError};
use crate::model;
use crate::scene::{Field, ObjectId, Scene};
use log::{debug, warn};
use num_rational::Ratio;
use std::collections::BTreeMap;

/// Imports the document into the scene and returns the score entity.
pub fn import_score(scene: &mut Scene, doc: &model::Score) -> Result<ObjectId> {
    let measure_count = doc.measure_count();
    if let Some(part) = doc.parts.iter().find(|p| p.measures.len() != measure_count) {
        return Err(SynthError::InvalidScore(format!(
            "part '{}' has {} measures, expected {}",
            part.id,
            part.measures.len(),
            measure_count
        )));
    }

    let mut score = Score::default();
    for part in &doc.parts {
        for (index, measure) in part.measures.iter().enumerate() {
            if measure.new_system {
                score.new_system_measure_indices.insert(index);
            }
            if measure.new_page {
                score.new_page_measure_indices.insert(index);
            }
        }
    }
    let score = scene.insert(score);

    for part in &doc.parts {
        let part_id = PartImporter::new(scene, part)?.run()?;
        scene.push_link(score, Field::Parts, part_id)?;
    }

    debug!(
        "Imported {} parts with {} measures each",
        doc.parts.len(),
        measure_count
    );
    Ok(score)
}

// ── Per-part state ─────────────────────────────────────────────────

#[derive(Default)]
struct VoiceState {
    time: Onset,
    last_onset: Onset,
    chord: Option<PendingChord>,
    group: Option<PendingGroup>,
}

struct PendingChord {
    id: ObjectId,
    notes: Vec<(i32, ObjectId)>,
}

struct PendingGroup {
    chords: Vec<ObjectId>,
    beam_values: Vec<BTreeMap<u8, BeamValue>>,
}

struct PartImporter<'a> {
    scene: &'a mut Scene,
    doc: &'a model::Part,
    staff_count: usize,
    divisions: i32,
    attributes: Option<Attributes>,
}

impl<'a> PartImporter<'a> {
    fn new(scene: &'a mut Scene, doc: &'a model::Part) -> Result<Self> {
        let staff_count = doc
            .measures
            .iter()
            .filter_map(|m| m.attributes.as_ref()?.staves)
            .next()
            .unwrap_or(1);
        let staff_count = usize::try_from(staff_count)
            .ok()
            .filter(|&n| (1..=u8::MAX as usize).contains(&n))
            .ok_or_else(|| {
                SynthError::InvalidScore(format!("part '{}' has {staff_count} staves", doc.id))
            })?;
        Ok(Self {
            scene,
            doc,
            staff_count,
            divisions: 1,
            attributes: None,
        })
    }

    fn run(mut self) -> Result<ObjectId> {
        let part = self.scene.insert(Part {
            id: self.doc.id.clone(),
            name: self.doc.name.clone(),
            staff_count: self.staff_count,
        });
        for measure in &self.doc.measures {
            let id = self.import_measure(measure)?;
            self.scene.push_link(part, Field::Measures, id)?;
        }
        Ok(part)
    }

    fn import_measure(&mut self, doc: &model::Measure) -> Result<ObjectId> {
        let change = match &doc.attributes {
            Some(attributes) => {
                if let Some(divisions) = attributes.divisions {
                    self.divisions = divisions.max(1);
                }
                Some(convert_attributes(attributes)?)
            }
            None => None,
        };
        let attributes = match (&self.attributes, &change) {
            (Some(current), Some(change)) => current.apply_change(change)?,
            (Some(current), None) => current.clone(),
            (None, Some(change)) => Attributes::from_first_change(self.staff_count, change)?,
            (None, None) => {
                return Err(SynthError::InvalidScore(format!(
                    "part '{}' starts without attributes",
                    self.doc.id
                )));
            }
        };
        self.attributes = Some(attributes.clone());

        let measure = self.scene.insert(Measure {
            number: doc.number.clone(),
        });
        let mut staves = Vec::with_capacity(self.staff_count);
        for number in 1..=self.staff_count {
            let staff_number = u8::try_from(number).unwrap_or(u8::MAX);
            staves.push(self.scene.insert(Staff { staff_number }));
        }
        self.scene.set_links(measure, Field::Staves, &staves)?;

        // The event at onset zero always exists: clefs and attribute
        // changes are read from it.
        let mut events: BTreeMap<Onset, ObjectId> = BTreeMap::new();
        let first = self.scene.insert(Event {
            onset: Ratio::from_integer(0),
            attributes: attributes.clone(),
            attributes_change: change.filter(|c| !c.is_empty()),
        });
        events.insert(Ratio::from_integer(0), first);

        let mut voices: BTreeMap<i32, VoiceState> = BTreeMap::new();
        for note in &doc.notes {
            let voice = voices.entry(note.voice.unwrap_or(1)).or_default();
            let onset = if note.chord { voice.last_onset } else { voice.time };
            if !note.chord {
                voice.last_onset = voice.time;
                voice.time += Ratio::new(i64::from(note.duration), i64::from(self.divisions));
            }

            let event = match events.get(&onset) {
                Some(&event) => event,
                None => {
                    let event = self.scene.insert(Event {
                        onset,
                        attributes: attributes.clone(),
                        attributes_change: None,
                    });
                    events.insert(onset, event);
                    event
                }
            };

            let staff_number = note.staff.unwrap_or(1);
            let staff = usize::try_from(staff_number)
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| staves.get(i))
                .copied()
                .ok_or_else(|| {
                    SynthError::InvalidScore(format!(
                        "note on staff {staff_number} in measure '{}'",
                        doc.number
                    ))
                })?;

            let durable = import_durable(self.scene, note)?;
            self.scene.push_link(event, Field::Durables, durable)?;
            self.scene.push_link(staff, Field::Durables, durable)?;

            if let Some(pitch) = note.pitch.as_ref().filter(|_| !note.rest && !note.measure_rest) {
                attach_to_chord(self.scene, voice, note, durable, convert_pitch(pitch)?)?;
            }
        }

        for (_, mut voice) in voices {
            finish_chord(self.scene, &mut voice)?;
            if let Some(group) = voice.group.take() {
                warn!(
                    "Dropping unterminated beamed group of {} chords in measure '{}'",
                    group.chords.len(),
                    doc.number
                );
            }
        }

        let events: Vec<ObjectId> = events.into_values().collect();
        self.scene.set_links(measure, Field::Events, &events)?;
        Ok(measure)
    }
}

// ── Durables, chords and beamed groups ─────────────────────────────

fn import_durable(scene: &mut Scene, note: &model::Note) -> Result<ObjectId> {
    let display_pitch = note.display_pitch.as_ref().map(convert_pitch).transpose()?;
    if note.measure_rest {
        return Ok(scene.insert(MeasureRest { display_pitch }));
    }
    let type_duration = match &note.note_type {
        Some(t) => TypeDuration::parse(t)?,
        None => {
            return Err(SynthError::InvalidScore("note without a type".into()));
        }
    };
    if note.rest {
        return Ok(scene.insert(Rest {
            type_duration,
            display_pitch,
        }));
    }
    let pitch = match &note.pitch {
        Some(pitch) => convert_pitch(pitch)?,
        None => return Err(SynthError::InvalidScore("pitched note without a pitch".into())),
    };
    Ok(scene.insert(Note {
        pitch,
        type_duration,
    }))
}

fn attach_to_chord(
    scene: &mut Scene,
    voice: &mut VoiceState,
    doc: &model::Note,
    note: ObjectId,
    pitch: Pitch,
) -> Result<()> {
    let type_duration = scene.note(note)?.type_duration;
    let stem_value = match &doc.stem {
        Some(stem) => Some(StemValue::parse(stem)?),
        None if type_duration.is_whole_or_longer() => Some(StemValue::NoStem),
        None => None,
    };

    if doc.chord {
        if let Some(pending) = voice.chord.as_mut() {
            let chord = scene.chord_mut(pending.id)?;
            match (chord.stem_value, stem_value) {
                (None, value) => chord.stem_value = value,
                (Some(a), Some(b)) if a != b => {
                    return Err(SynthError::InvalidScore(
                        "notes of one chord disagree on the stem".into(),
                    ));
                }
                _ => {}
            }
            pending.notes.push((pitch.linear_pitch(), note));
            return Ok(());
        }
    }

    finish_chord(scene, voice)?;
    let chord = scene.insert(Chord { stem_value });
    voice.chord = Some(PendingChord {
        id: chord,
        notes: vec![(pitch.linear_pitch(), note)],
    });

    if !doc.beams.is_empty() {
        let mut values = BTreeMap::new();
        for beam in &doc.beams {
            let number = u8::try_from(beam.number)
                .map_err(|_| SynthError::InvalidScore(format!("beam number {}", beam.number)))?;
            values.insert(number, BeamValue::parse(&beam.beam_type)?);
        }
        let first = values.get(&1).copied();
        if first == Some(BeamValue::Begin) || voice.group.is_none() {
            voice.group = Some(PendingGroup {
                chords: Vec::new(),
                beam_values: Vec::new(),
            });
        }
        if let Some(group) = voice.group.as_mut() {
            group.chords.push(chord);
            group.beam_values.push(values);
        }
        if first == Some(BeamValue::End) {
            if let Some(group) = voice.group.take() {
                let id = scene.insert(BeamedGroup {
                    beam_values: group.beam_values,
                });
                scene.set_links(id, Field::Chords, &group.chords)?;
            }
        }
    }
    Ok(())
}

/// Links the pending chord to its notes, sorted by ascending pitch.
fn finish_chord(scene: &mut Scene, voice: &mut VoiceState) -> Result<()> {
    if let Some(mut pending) = voice.chord.take() {
        pending.notes.sort_by_key(|(linear, _)| *linear);
        let notes: Vec<ObjectId> = pending.notes.iter().map(|(_, id)| *id).collect();
        scene.set_links(pending.id, Field::Notes, &notes)?;
    }
    Ok(())
}

// ── Conversions ────────────────────────────────────────────────────

fn convert_pitch(pitch: &model::Pitch) -> Result<Pitch> {
    Ok(Pitch {
        step: Step::parse(&pitch.step)?,
        octave: pitch.octave,
        alter: pitch.alter.unwrap_or(0.0).round() as i32,
    })
}

fn convert_attributes(doc: &model::Attributes) -> Result<AttributesChange> {
    let mut clefs = BTreeMap::new();
    for clef in &doc.clefs {
        let number = u8::try_from(clef.number)
            .ok()
            .filter(|&n| n >= 1)
            .ok_or_else(|| SynthError::InvalidScore(format!("clef on staff {}", clef.number)))?;
        let clef = Clef {
            sign: ClefSign::parse(&clef.sign)?,
            line: clef.line,
        };
        if clefs.insert(number, clef).is_some() {
            return Err(SynthError::InvalidScore(format!("two clefs for staff {number}")));
        }
    }
    Ok(AttributesChange {
        clefs,
        key_fifths: doc.key.map(|k| k.fifths),
        time_signature: doc.time.map(|t| TimeSignature {
            beats: t.beats,
            beat_type: t.beat_type,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::EntityKind;
    use pretty_assertions::assert_eq;

    fn pitch(step: &str, octave: i32) -> Option<model::Pitch> {
        Some(model::Pitch {
            step: step.into(),
            octave,
            alter: None,
        })
    }

    fn eighth(step: &str, octave: i32, beam: &str) -> model::Note {
        model::Note {
            pitch: pitch(step, octave),
            duration: 1,
            note_type: Some("eighth".into()),
            stem: Some("up".into()),
            beams: vec![model::Beam {
                number: 1,
                beam_type: beam.into(),
            }],
            ..Default::default()
        }
    }

    fn treble_attributes() -> Option<model::Attributes> {
        Some(model::Attributes {
            divisions: Some(2),
            clefs: vec![model::Clef {
                number: 1,
                sign: "G".into(),
                line: 2,
            }],
            ..Default::default()
        })
    }

    fn document(notes: Vec<model::Note>) -> model::Score {
        model::Score {
            title: None,
            parts: vec![model::Part {
                id: "P1".into(),
                name: "Piano".into(),
                measures: vec![model::Measure {
                    number: "1".into(),
                    attributes: treble_attributes(),
                    notes,
                    ..Default::default()
                }],
            }],
        }
    }

    #[test]
    fn chord_notes_share_an_onset_and_sort_by_pitch() {
        let mut scene = Scene::new();
        let mut upper = eighth("E", 5, "begin");
        upper.beams.clear();
        upper.note_type = Some("quarter".into());
        upper.duration = 2;
        let mut lower = upper.clone();
        lower.pitch = pitch("C", 5);
        lower.chord = true;
        let mut next = upper.clone();
        next.pitch = pitch("G", 4);

        let score = import_score(&mut scene, &document(vec![upper, lower, next])).unwrap();
        let measure = scene.score_measure(score, 0).unwrap();
        let onsets: Vec<Onset> = measure.events.iter().map(|e| e.onset).collect();
        assert_eq!(onsets, vec![Ratio::from_integer(0), Ratio::from_integer(1)]);

        let chords = scene.find(EntityKind::Chord);
        assert_eq!(chords.len(), 2);
        let pitches: Vec<Pitch> = scene
            .linked(chords[0], Field::Notes)
            .into_iter()
            .map(|n| scene.note(n).unwrap().pitch)
            .collect();
        assert_eq!(pitches, vec![Pitch::new(Step::C, 5), Pitch::new(Step::E, 5)]);
    }

    #[test]
    fn beam_values_build_a_group() {
        let mut scene = Scene::new();
        let doc = document(vec![
            eighth("C", 5, "begin"),
            eighth("D", 5, "continue"),
            eighth("E", 5, "end"),
            eighth("F", 5, "begin"),
        ]);
        import_score(&mut scene, &doc).unwrap();

        let groups = scene.find(EntityKind::BeamedGroup);
        assert_eq!(groups.len(), 1);
        let chords = scene.linked(groups[0], Field::Chords);
        assert_eq!(chords.len(), 3);
        assert_eq!(scene.beamed_group_of_chord(chords[1]).unwrap(), Some(groups[0]));
        assert!(scene.beamed_group_of_chord(scene.find(EntityKind::Chord)[3]).unwrap().is_none());
    }

    #[test]
    fn whole_notes_default_to_no_stem() {
        let mut scene = Scene::new();
        let whole = model::Note {
            pitch: pitch("C", 5),
            duration: 8,
            note_type: Some("whole".into()),
            ..Default::default()
        };
        let mut quarter = whole.clone();
        quarter.note_type = Some("quarter".into());
        quarter.duration = 2;
        import_score(&mut scene, &document(vec![whole, quarter])).unwrap();

        let stems: Vec<Option<StemValue>> = scene
            .find(EntityKind::Chord)
            .into_iter()
            .map(|c| scene.chord(c).unwrap().stem_value)
            .collect();
        assert_eq!(stems, vec![Some(StemValue::NoStem), None]);
    }

    #[test]
    fn owners_resolve_from_a_note() {
        let mut scene = Scene::new();
        let score = import_score(&mut scene, &document(vec![eighth("C", 5, "begin")])).unwrap();
        let note = scene.find(EntityKind::Note)[0];
        let event = scene.event_of_durable(note).unwrap();
        let measure = scene.measure_of_event(event).unwrap();
        let part = scene.part_of_measure(measure).unwrap();
        assert_eq!(scene.score_of_part(part).unwrap(), score);
        assert_eq!(scene.staff_index_of_durable(note).unwrap(), 0);
        assert_eq!(scene.staff_count(score).unwrap(), 1);
        assert_eq!(scene.measure_count(score), 1);
    }

    #[test]
    fn break_flags_become_index_sets() {
        let mut scene = Scene::new();
        let mut doc = document(vec![]);
        let mut second = doc.parts[0].measures[0].clone();
        second.attributes = None;
        second.new_system = true;
        doc.parts[0].measures.push(second);
        let score = import_score(&mut scene, &doc).unwrap();
        let score = scene.score(score).unwrap();
        assert!(score.new_system_measure_indices.contains(&1));
        assert!(score.new_page_measure_indices.is_empty());
    }

    #[test]
    fn missing_first_clef_is_rejected() {
        let mut scene = Scene::new();
        let mut doc = document(vec![]);
        doc.parts[0].measures[0].attributes = None;
        assert!(import_score(&mut scene, &doc).is_err());
    }
}
