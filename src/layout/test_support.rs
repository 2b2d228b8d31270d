//! Score fixtures and a ready-made synthesis harness for layout tests.

use super::column::Column;
use super::event_column::synthesize_event_column;
use super::{BeamStemSynthesizer, ColumnLayoutSynthesizer};
use crate::config::{BeamConfig, LayoutConfig, PageSetup};
use crate::error::Result;
use crate::geometry::Point;
use crate::model;
use crate::scene::{Field, ObjectId, Scene};
use crate::semantic::{import_score, Step};
use crate::synth::{
    GlyphLibrary, GlyphSynthesizer, LibraryGlyphSynthesizer, LineSynthesizer, NaiveLineSynthesizer,
    NaiveStafflinesSynthesizer, SimplePageSynthesizer,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;

pub(super) fn glyph_synthesizer(seed: u64) -> Box<dyn GlyphSynthesizer> {
    let library = GlyphLibrary::synthetic(&["writer-01".to_string()], 300.0);
    Box::new(LibraryGlyphSynthesizer::new(Rc::new(library), StdRng::seed_from_u64(seed)))
}

pub(super) fn layout_synthesizer(config: LayoutConfig, seed: u64) -> ColumnLayoutSynthesizer {
    ColumnLayoutSynthesizer::new(
        glyph_synthesizer(seed),
        Box::new(NaiveLineSynthesizer::default()),
        BeamStemSynthesizer::new(BeamConfig::default(), StdRng::seed_from_u64(seed + 1)),
        StdRng::seed_from_u64(seed + 2),
        config,
    )
}

/// One page of `staff_count` staves at the root origin.
pub(super) fn page(scene: &mut Scene, staff_count: usize) -> ObjectId {
    let setup = PageSetup {
        staff_count,
        ..PageSetup::musescore_a4()
    };
    page_with(scene, setup)
}

pub(super) fn page_with(scene: &mut Scene, setup: PageSetup) -> ObjectId {
    SimplePageSynthesizer::new(setup, Box::new(NaiveStafflinesSynthesizer::default()))
        .synthesize_page(scene, Point::ORIGIN)
        .unwrap()
        .page
}

pub(super) struct Harness {
    pub(super) scene: Scene,
    pub(super) score: ObjectId,
    pub(super) staves: Vec<ObjectId>,
    pub(super) glyphs: Box<dyn GlyphSynthesizer>,
    pub(super) lines: Box<dyn LineSynthesizer>,
    pub(super) rng: StdRng,
}

impl Harness {
    /// A single-part, single-staff score on a one-staff page.
    pub(super) fn new(measures: Vec<model::Measure>) -> Self {
        let mut scene = Scene::new();
        let score = import_score(&mut scene, &document(measures)).unwrap();
        let page = page(&mut scene, 1);
        let staves = scene.linked(page, Field::Staves);
        Self {
            scene,
            score,
            staves,
            glyphs: glyph_synthesizer(5),
            lines: Box::new(NaiveLineSynthesizer::default()),
            rng: StdRng::seed_from_u64(9),
        }
    }

    /// Synthesizes and positions the column of one score event.
    pub(super) fn try_event_column(&mut self, measure_index: usize, event_index: usize) -> Result<Column> {
        let score_measure = self.scene.score_measure(self.score, measure_index)?;
        let mut column = synthesize_event_column(
            &mut self.scene,
            &self.staves,
            &mut self.rng,
            self.glyphs.as_mut(),
            self.lines.as_mut(),
            &score_measure.events[event_index],
        )?;
        column.time_position = 30.0;
        column.position_glyphs(&mut self.scene, self.lines.as_mut())?;
        Ok(column)
    }

    pub(super) fn event_column(&mut self, measure_index: usize, event_index: usize) -> Column {
        self.try_event_column(measure_index, event_index).unwrap()
    }
}

// ── Documents ───────────────────────────────────────────────────────

pub(super) fn pitch(step: Step, octave: i32) -> model::Pitch {
    model::Pitch {
        step: format!("{step:?}"),
        octave,
        alter: None,
    }
}

fn treble() -> model::Attributes {
    model::Attributes {
        divisions: Some(2),
        time: Some(model::TimeSignature { beats: 4, beat_type: 4 }),
        clefs: vec![model::Clef {
            number: 1,
            sign: "G".into(),
            line: 2,
        }],
        ..Default::default()
    }
}

pub(super) fn document(mut measures: Vec<model::Measure>) -> model::Score {
    if let Some(first) = measures.first_mut() {
        first.attributes.get_or_insert_with(treble);
    }
    for (i, measure) in measures.iter_mut().enumerate() {
        measure.number = (i + 1).to_string();
    }
    model::Score {
        title: None,
        parts: vec![model::Part {
            id: "P1".into(),
            name: "Voice".into(),
            measures,
        }],
    }
}

/// A quarter note; an empty `stem` leaves the stem unspecified.
pub(super) fn quarter(step: Step, octave: i32, stem: &str) -> model::Note {
    model::Note {
        pitch: Some(pitch(step, octave)),
        duration: 2,
        note_type: Some("quarter".into()),
        stem: (!stem.is_empty()).then(|| stem.to_string()),
        ..Default::default()
    }
}

pub(super) fn eighth(step: Step, octave: i32, stem: &str, beam: &str) -> model::Note {
    model::Note {
        pitch: Some(pitch(step, octave)),
        duration: 1,
        note_type: Some("eighth".into()),
        stem: Some(stem.into()),
        beams: vec![model::Beam {
            number: 1,
            beam_type: beam.into(),
        }],
        ..Default::default()
    }
}

pub(super) fn measure(notes: Vec<model::Note>) -> model::Measure {
    model::Measure {
        notes,
        ..Default::default()
    }
}

/// One chord of quarter notes sharing a stem.
pub(super) fn chord_measure(pitches: &[(Step, i32)], stem: &str) -> model::Measure {
    let notes = pitches
        .iter()
        .enumerate()
        .map(|(i, &(step, octave))| model::Note {
            chord: i > 0,
            ..quarter(step, octave, stem)
        })
        .collect();
    measure(notes)
}

/// Two voices sounding the same pitch at once.
pub(super) fn two_voice_unison_measure() -> model::Measure {
    measure(vec![
        model::Note {
            voice: Some(1),
            ..quarter(Step::G, 4, "up")
        },
        model::Note {
            voice: Some(2),
            ..quarter(Step::G, 4, "down")
        },
    ])
}

pub(super) fn rest_measure(note_type: &str, display: Option<(Step, i32)>) -> model::Measure {
    measure(vec![model::Note {
        rest: true,
        duration: 8,
        note_type: Some(note_type.into()),
        display_pitch: display.map(|(step, octave)| pitch(step, octave)),
        ..Default::default()
    }])
}

/// Four quarter notes on the middle line.
pub(super) fn plain_measure() -> model::Measure {
    measure((0..4).map(|_| quarter(Step::B, 4, "down")).collect())
}
