//! Column layout engine.
//!
//! A system is built in four phases:
//!
//! 1. columns are synthesized (a clef header, then per measure one column
//!    per score event and one barline column) while the tight width of the
//!    system is tracked,
//! 2. the columns are placed horizontally, either tightly or stretched to
//!    the staff width like CSS flexbox,
//! 3. a [`System`] entity is recorded,
//! 4. stems and beams are drawn over the placed noteheads.
//!
//! Pages are filled system by system until they run out of staves, hit a
//! page break or the score ends.

mod barlines;
mod beam_stem;
mod clefs;
mod column;
mod constants;
mod event_column;
mod system_state;
#[cfg(test)]
mod test_support;

pub use beam_stem::{softclamp, BeamStemSynthesizer};
pub use column::{Column, ColumnKind};
pub use constants::PAGE_SPACING;

use crate::config::LayoutConfig;
use crate::error::{Result, SynthError};
use crate::scene::{Field, ObjectId, Scene, System};
use crate::synth::{GlyphSynthesizer, LineSynthesizer, Styler};
use log::{debug, warn};
use rand::rngs::StdRng;
use serde::Serialize;
use system_state::SystemState;

/// Horizontal extent of one placed column, as the system finished it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnExtent {
    pub kind: ColumnKind,
    pub measure_index: Option<usize>,
    pub time_position: f64,
    pub left_width: f64,
    pub right_width: f64,
    pub width: f64,
}

impl ColumnExtent {
    fn of(column: &Column) -> Self {
        Self {
            kind: column.kind(),
            measure_index: column.measure_index,
            time_position: column.time_position,
            left_width: column.left_width,
            right_width: column.right_width,
            width: column.width,
        }
    }
}

/// Result of laying out one system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemLayout {
    /// The `System` entity, linked to its stafflines.
    pub system: ObjectId,
    pub first_measure_index: usize,
    pub measure_count: usize,
    pub columns: Vec<ColumnExtent>,
}

pub struct ColumnLayoutSynthesizer {
    glyphs: Box<dyn GlyphSynthesizer>,
    lines: Box<dyn LineSynthesizer>,
    beam_stem: BeamStemSynthesizer,
    rng: StdRng,
    pub config: LayoutConfig,
}

impl ColumnLayoutSynthesizer {
    pub fn new(
        glyphs: Box<dyn GlyphSynthesizer>,
        lines: Box<dyn LineSynthesizer>,
        beam_stem: BeamStemSynthesizer,
        rng: StdRng,
        config: LayoutConfig,
    ) -> Self {
        Self {
            glyphs,
            lines,
            beam_stem,
            rng,
            config,
        }
    }

    /// Hands the per-sample style choices to the glyph synthesizer.
    pub fn apply_style(&mut self, styler: &Styler) -> Result<()> {
        self.glyphs.apply_style(styler)
    }

    /// Lays out systems onto the stafflines of `page`, starting at measure
    /// `start`, until the staves run out, a page break is reached or the
    /// score ends.
    pub fn fill_page(
        &mut self,
        scene: &mut Scene,
        page: ObjectId,
        score: ObjectId,
        start: usize,
    ) -> Result<Vec<SystemLayout>> {
        let staves = scene.linked(page, Field::Staves);
        let staff_count = scene.staff_count(score)?;
        let measure_count = scene.measure_count(score);
        let new_pages = scene.score(score)?.new_page_measure_indices.clone();

        let mut systems = Vec::new();
        let mut completed_staves = 0;
        let mut current = start;
        while staff_count > 0 && staves.len() - completed_staves >= staff_count {
            if current >= measure_count {
                break;
            }
            if self.config.respect_line_and_page_breaks && current != start && new_pages.contains(&current) {
                break;
            }
            let system_staves = &staves[completed_staves..completed_staves + staff_count];
            let system = self.synthesize_system(scene, system_staves, score, current)?;
            if system.measure_count == 0 {
                return Err(SynthError::Layout(format!("system starting at measure {current} holds no measures")));
            }
            completed_staves += staff_count;
            current += system.measure_count;
            systems.push(system);
        }
        Ok(systems)
    }

    /// Lays out one system onto `staves` (one stafflines per score staff),
    /// starting at measure `start`.
    pub fn synthesize_system(
        &mut self,
        scene: &mut Scene,
        staves: &[ObjectId],
        score: ObjectId,
        start: usize,
    ) -> Result<SystemLayout> {
        let measure_count = scene.measure_count(score);
        if start >= measure_count {
            return Err(SynthError::Layout(format!(
                "no measures left: start {start} of {measure_count}"
            )));
        }
        let staff_count = scene.staff_count(score)?;
        if staves.len() != staff_count {
            return Err(SynthError::Layout(format!(
                "system needs {staff_count} staves, got {}",
                staves.len()
            )));
        }
        let mut available_width = f64::INFINITY;
        for &stafflines in staves {
            available_width = available_width.min(scene.stafflines(stafflines)?.width);
        }
        let (new_systems, new_pages) = {
            let s = scene.score(score)?;
            (s.new_system_measure_indices.clone(), s.new_page_measure_indices.clone())
        };

        // ── Columns ──
        let mut state = SystemState::new(self.config.minimal_column_spacing);
        let header =
            clefs::synthesize_header_clefs(scene, staves, &mut self.rng, self.glyphs.as_mut(), score, start)?;
        state.append_column(scene, self.lines.as_mut(), header)?;

        let mut next = start;
        loop {
            // the first measure goes in even when the header alone fills the staff
            if !self.config.disable_wrapping && state.measure_count() >= 1 && state.total_width >= available_width {
                break;
            }
            if next >= measure_count {
                break;
            }
            if self.config.respect_line_and_page_breaks
                && next != start
                && (new_systems.contains(&next) || new_pages.contains(&next))
            {
                break;
            }

            state.enter_measure(next)?;
            let score_measure = scene.score_measure(score, next)?;
            for score_event in &score_measure.events {
                let column = event_column::synthesize_event_column(
                    scene,
                    staves,
                    &mut self.rng,
                    self.glyphs.as_mut(),
                    self.lines.as_mut(),
                    score_event,
                )?;
                state.append_column(scene, self.lines.as_mut(), column)?;
            }
            let barlines = barlines::synthesize_barlines_column(scene, staves, &mut self.rng, self.glyphs.as_mut())?;
            state.append_column(scene, self.lines.as_mut(), barlines)?;
            state.exit_measure();
            next += 1;
        }

        if !self.config.disable_wrapping {
            while state.total_width >= available_width && state.measure_count() > 1 {
                let Some(&last) = state.measure_indices.last() else {
                    break;
                };
                warn!(
                    "Measure {last} overflows the system ({:.1} of {available_width:.1} mm), moving it on",
                    state.total_width
                );
                state.delete_measure(scene, last)?;
            }
        }

        // ── Placement ──
        if self.config.stretch_out_columns {
            state.place_flexbox(scene, self.lines.as_mut(), available_width)?;
        } else {
            state.place_tightly(scene, self.lines.as_mut())?;
        }

        // ── System ──
        let placed = System {
            first_measure_index: start,
            measure_count: state.measure_count(),
        };
        let system = scene.insert(placed);
        scene.set_links(system, Field::Staves, staves)?;

        // ── Stems and beams ──
        let first_space = scene.require_linked(staves[0], Field::Space)?;
        let paper_space = scene
            .parent_space(first_space)
            .ok_or_else(|| SynthError::Layout(format!("stafflines {} have no paper space", staves[0])))?;
        for measure_index in start..placed.end_measure_index() {
            let score_measure = scene.score_measure(score, measure_index)?;
            self.beam_stem
                .synthesize_for_measure(scene, self.lines.as_mut(), paper_space, &score_measure)?;
        }

        debug!(
            "System of measures {start}..{} with {} columns, tight width {:.1} of {available_width:.1} mm",
            placed.end_measure_index(),
            state.columns.len(),
            state.total_width
        );
        Ok(SystemLayout {
            system,
            first_measure_index: start,
            measure_count: placed.measure_count,
            columns: state.columns.iter().map(ColumnExtent::of).collect(),
        })
    }
}

/// The error for a note whose chord has no stem orientation, located by
/// measure index and onset.
pub(crate) fn stem_inference_error(scene: &Scene, note: ObjectId) -> Result<SynthError> {
    let event = scene.event_of_durable(note)?;
    let onset = scene.event(event)?.onset;
    let measure = scene.measure_of_event(event)?;
    let part = scene.part_of_measure(measure)?;
    let measure_index = scene
        .linked(part, Field::Measures)
        .iter()
        .position(|&m| m == measure)
        .ok_or_else(|| SynthError::InvalidScore(format!("measure {measure} is not listed by its part")))?;
    Ok(SynthError::StemInferenceUnsupported {
        measure_index,
        onset: onset.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::config::PageSetup;
    use crate::model;
    use crate::scene::{EntityKind, GlyphKind, LineKind};
    use crate::semantic::{import_score, StemValue, Step};
    use pretty_assertions::assert_eq;

    fn setup(measures: Vec<model::Measure>, staff_count: usize) -> (Scene, ObjectId, ObjectId) {
        let mut scene = Scene::new();
        let score = import_score(&mut scene, &document(measures)).unwrap();
        let page = page(&mut scene, staff_count);
        (scene, score, page)
    }

    fn with_breaks(count: usize, system_breaks: &[usize], page_breaks: &[usize]) -> Vec<model::Measure> {
        (0..count)
            .map(|i| model::Measure {
                new_system: system_breaks.contains(&i),
                new_page: page_breaks.contains(&i),
                ..plain_measure()
            })
            .collect()
    }

    fn run_system(config: LayoutConfig, seed: u64) -> SystemLayout {
        let (mut scene, score, page) = setup(vec![plain_measure(), plain_measure()], 1);
        let staves = scene.linked(page, Field::Staves);
        let mut layout = layout_synthesizer(config, seed);
        layout.synthesize_system(&mut scene, &staves, score, 0).unwrap()
    }

    #[test]
    fn same_seed_reproduces_the_system() {
        let first = run_system(LayoutConfig::default(), 3);
        let second = run_system(LayoutConfig::default(), 3);
        assert_eq!(first, second);

        let kinds: Vec<ColumnKind> = first.columns.iter().map(|c| c.kind).collect();
        assert_eq!(kinds.len(), 11);
        assert_eq!(kinds[0], ColumnKind::Clefs);
        assert_eq!(kinds[5], ColumnKind::Barlines);
        assert_eq!(kinds[10], ColumnKind::Barlines);
        assert_eq!(first.columns[0].measure_index, None);
        assert_eq!(first.columns[6].measure_index, Some(1));
    }

    #[test]
    fn stretched_columns_reach_the_staff_end() {
        let layout = run_system(LayoutConfig::default(), 4);
        let last = layout.columns.last().unwrap();
        let right_edge = last.time_position + last.right_width;
        // surplus is shared around every column, so half a share remains
        assert!(right_edge < 190.0);
        assert!(right_edge > 150.0);

        let tight = run_system(
            LayoutConfig {
                stretch_out_columns: false,
                ..LayoutConfig::default()
            },
            4,
        );
        let last = tight.columns.last().unwrap();
        assert!(last.time_position + last.right_width < 60.0);
        for pair in tight.columns.windows(2) {
            assert!(pair[0].time_position < pair[1].time_position);
        }
    }

    #[test]
    fn system_breaks_are_respected() {
        let (mut scene, score, page) = setup(with_breaks(3, &[1], &[]), 1);
        let staves = scene.linked(page, Field::Staves);
        let mut layout = layout_synthesizer(LayoutConfig::default(), 1);

        let first = layout.synthesize_system(&mut scene, &staves, score, 0).unwrap();
        assert_eq!((first.first_measure_index, first.measure_count), (0, 1));
        let second = layout.synthesize_system(&mut scene, &staves, score, 1).unwrap();
        assert_eq!((second.first_measure_index, second.measure_count), (1, 2));

        let system = scene.system(second.system).unwrap();
        assert_eq!(system.end_measure_index(), 3);
        assert_eq!(scene.linked(second.system, Field::Staves), staves);
    }

    #[test]
    fn wrapping_moves_overflowing_measures_on() {
        let (mut scene, score, page) = setup(with_breaks(20, &[], &[]), 1);
        let staves = scene.linked(page, Field::Staves);
        let config = LayoutConfig {
            disable_wrapping: false,
            ..LayoutConfig::default()
        };
        let mut layout = layout_synthesizer(config, 2);
        let system = layout.synthesize_system(&mut scene, &staves, score, 0).unwrap();
        assert!(system.measure_count >= 1 && system.measure_count < 20);

        // the first dropped measure left nothing behind
        let dropped = scene.score_measure(score, system.measure_count).unwrap();
        let event = dropped.events[0].events[0];
        let note = scene.linked(event, Field::Durables)[0];
        assert!(scene.notehead_of_note(note).is_err());
        assert!(scene.is_link_index_consistent());

        // and the next system picks it up
        let next = layout
            .synthesize_system(&mut scene, &staves, score, system.measure_count)
            .unwrap();
        assert_eq!(next.first_measure_index, system.measure_count);
        assert!(scene.notehead_of_note(note).is_ok());
    }

    #[test]
    fn staff_narrower_than_the_header_still_takes_a_measure() {
        let mut scene = Scene::new();
        let score = import_score(&mut scene, &document(with_breaks(3, &[], &[]))).unwrap();
        let narrow = PageSetup {
            width: 21.0,
            staff_count: 1,
            ..PageSetup::musescore_a4()
        };
        let page = page_with(&mut scene, narrow);
        let staves = scene.linked(page, Field::Staves);
        let config = LayoutConfig {
            disable_wrapping: false,
            respect_line_and_page_breaks: false,
            ..LayoutConfig::default()
        };
        let mut layout = layout_synthesizer(config, 5);

        let first = layout.synthesize_system(&mut scene, &staves, score, 0).unwrap();
        assert_eq!((first.first_measure_index, first.measure_count), (0, 1));
        assert!(first.columns.iter().any(|c| c.measure_index == Some(0)));
        let second = layout.synthesize_system(&mut scene, &staves, score, 1).unwrap();
        assert_eq!((second.first_measure_index, second.measure_count), (1, 1));
        assert!(scene.is_link_index_consistent());
    }

    #[test]
    fn without_wrapping_everything_lands_on_one_system() {
        let (mut scene, score, page) = setup(with_breaks(20, &[], &[]), 1);
        let staves = scene.linked(page, Field::Staves);
        let mut layout = layout_synthesizer(LayoutConfig::default(), 2);
        let system = layout.synthesize_system(&mut scene, &staves, score, 0).unwrap();
        assert_eq!(system.measure_count, 20);
    }

    #[test]
    fn staff_count_must_match_the_score() {
        let (mut scene, score, page) = setup(vec![plain_measure()], 2);
        let staves = scene.linked(page, Field::Staves);
        let mut layout = layout_synthesizer(LayoutConfig::default(), 1);
        assert!(matches!(
            layout.synthesize_system(&mut scene, &staves, score, 0),
            Err(SynthError::Layout(_))
        ));
        assert!(matches!(
            layout.synthesize_system(&mut scene, &staves[..1], score, 1),
            Err(SynthError::Layout(_))
        ));
    }

    #[test]
    fn fill_page_stops_when_staves_run_out() {
        let (mut scene, score, first_page) = setup(with_breaks(5, &[1, 2, 3, 4], &[]), 3);
        let mut layout = layout_synthesizer(LayoutConfig::default(), 6);

        let systems = layout.fill_page(&mut scene, first_page, score, 0).unwrap();
        let starts: Vec<usize> = systems.iter().map(|s| s.first_measure_index).collect();
        assert_eq!(starts, vec![0, 1, 2]);

        let second_page = page(&mut scene, 3);
        let systems = layout.fill_page(&mut scene, second_page, score, 3).unwrap();
        let starts: Vec<usize> = systems.iter().map(|s| s.first_measure_index).collect();
        assert_eq!(starts, vec![3, 4]);
    }

    #[test]
    fn fill_page_stops_at_page_breaks() {
        let (mut scene, score, page) = setup(with_breaks(3, &[], &[2]), 4);
        let mut layout = layout_synthesizer(LayoutConfig::default(), 6);
        let systems = layout.fill_page(&mut scene, page, score, 0).unwrap();
        assert_eq!(systems.len(), 1);
        assert_eq!(systems[0].measure_count, 2);
    }

    #[test]
    fn beamed_stems_end_on_the_beam() {
        let beamed = measure(vec![
            eighth(Step::G, 4, "up", "begin"),
            eighth(Step::C, 5, "up", "continue"),
            eighth(Step::E, 4, "up", "end"),
            quarter(Step::B, 4, "down"),
            quarter(Step::B, 4, "down"),
        ]);
        let (mut scene, score, page) = setup(vec![beamed], 1);
        let staves = scene.linked(page, Field::Staves);
        let paper = scene.parent_space(scene.require_linked(staves[0], Field::Space).unwrap()).unwrap();
        let mut layout = layout_synthesizer(LayoutConfig::default(), 8);
        layout.synthesize_system(&mut scene, &staves, score, 0).unwrap();

        let groups = scene.find(EntityKind::BeamedGroup);
        assert_eq!(groups.len(), 1);
        let coordinates = scene.beam_coordinate_system_of_group(groups[0]).unwrap().unwrap();
        let beam = *scene.beam_coordinates(coordinates).unwrap();
        assert!(beam.k.abs() <= 0.35);

        let chords = scene.linked(groups[0], Field::Chords);
        for &chord in &chords {
            let stem = scene.stem_of_chord(chord).unwrap().unwrap();
            let (base, tip) = scene.line_endpoints(stem, paper).unwrap();
            assert!((tip.y - beam.y(tip.x, 1, StemValue::Up)).abs() < 1e-9);
            assert!(tip.y < base.y);
        }

        let beams: Vec<ObjectId> = scene
            .find(EntityKind::Glyph)
            .into_iter()
            .filter(|&g| matches!(scene.glyph(g).unwrap().kind, GlyphKind::Line(LineKind::Beam { .. })))
            .collect();
        assert_eq!(beams.len(), 1);
        assert_eq!(scene.linked(beams[0], Field::Chords), chords);
        // one stem per chord, none left over from the first pass
        let stems = scene
            .find(EntityKind::Glyph)
            .into_iter()
            .filter(|&g| scene.glyph(g).unwrap().kind == GlyphKind::Line(LineKind::Stem))
            .count();
        assert_eq!(stems, 5);
    }

    #[test]
    fn unspecified_stem_reports_where() {
        let (mut scene, score, page) = setup(vec![plain_measure(), chord_measure(&[(Step::F, 4)], "")], 1);
        let staves = scene.linked(page, Field::Staves);
        let mut layout = layout_synthesizer(LayoutConfig::default(), 1);
        match layout.synthesize_system(&mut scene, &staves, score, 0) {
            Err(SynthError::StemInferenceUnsupported { measure_index, onset }) => {
                assert_eq!(measure_index, 1);
                assert_eq!(onset, "0");
            }
            other => panic!("expected a stem inference error, got {other:?}"),
        }
    }
}
