//! Event columns: noteheads, ledger lines and rests of one score event.
//!
//! Noteheads sit in one of three sub-columns. The center one is the
//! default. When two noteheads on one stafflines are a single step apart,
//! the upper one kicks off to the side opposite its stem: right of an up
//! stem, left of a down stem. A kicked notehead lets the next one stay in
//! the center.

use super::column::{Column, ColumnContent, ColumnStaff};
use super::constants::*;
use super::stem_inference_error;
use crate::error::{Result, SynthError};
use crate::geometry::Point;
use crate::scene::{EntityKind, Field, GlyphKind, GlyphType, LineKind, NoteheadSide, ObjectId, Scene};
use crate::semantic::{Clef, Pitch, ScoreEvent, StemValue, TypeDuration};
use crate::synth::{glyph_class as gc, GlyphSynthesizer, LineSynthesizer};
use log::warn;
use rand::rngs::StdRng;
use rand::Rng;

// ── Column content ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(super) struct NoteheadContext {
    pub(super) notehead: ObjectId,
    /// Index into the column staves.
    pub(super) staff: usize,
    pub(super) linear_pitch: i32,
    pub(super) pitch_position: i32,
    /// Kick off to the right, as if the stem pointed up.
    kick_as_if_stem_up: bool,
    /// -1, 0 or +1 for the left, center and right sub-column.
    pub(super) kick_off: i32,
}

#[derive(Debug, Clone)]
pub(super) struct RestContext {
    pub(super) glyph: ObjectId,
    pub(super) staff: usize,
    pub(super) pitch_position: i32,
}

#[derive(Debug, Default)]
pub(super) struct EventContent {
    pub(super) noteheads: Vec<NoteheadContext>,
    pub(super) rests: Vec<RestContext>,
    pub(super) ledger_lines: Vec<ObjectId>,
}

impl EventContent {
    pub(super) fn position(
        &mut self,
        scene: &mut Scene,
        lines: &mut dyn LineSynthesizer,
        staves: &[ColumnStaff],
        glyphs: &mut Vec<ObjectId>,
        rng: &mut StdRng,
        time_position: f64,
    ) -> Result<()> {
        for staff in 0..staves.len() {
            self.kick_off_noteheads(scene, staff)?;
        }
        self.position_noteheads(scene, staves, time_position)?;

        self.delete_ledger_lines(scene, glyphs)?;
        for staff in 0..staves.len() {
            self.place_ledger_lines(scene, lines, staves, staff, glyphs, rng, time_position)?;
        }

        for rest in &self.rests {
            let t = staves[rest.staff].transform(scene, rest.pitch_position, time_position)?;
            scene.set_space_transform(scene.glyph_space(rest.glyph)?, t)?;
        }
        Ok(())
    }

    /// Walks the noteheads of one stafflines bottom-up and kicks off every
    /// notehead that is a single step above a notehead left in place.
    fn kick_off_noteheads(&mut self, scene: &mut Scene, staff: usize) -> Result<()> {
        let mut order: Vec<usize> = (0..self.noteheads.len())
            .filter(|&i| self.noteheads[i].staff == staff)
            .collect();
        order.sort_by_key(|&i| self.noteheads[i].linear_pitch);

        let mut previous: Option<i32> = None;
        let mut last_was_kicked_off = true;
        let mut cluster = 0;
        for i in order {
            let ctx = &mut self.noteheads[i];
            let tight = previous.is_some_and(|p| (ctx.linear_pitch - p).abs() < 2);
            previous = Some(ctx.linear_pitch);

            cluster = if tight { cluster + 1 } else { 1 };
            if cluster == 3 {
                warn!(
                    "Three or more noteheads within single steps at linear pitch {}; kick-off may overlap",
                    ctx.linear_pitch
                );
            }

            ctx.kick_off = 0;
            let mut kind = GlyphKind::notehead();
            if last_was_kicked_off || !tight {
                last_was_kicked_off = false;
            } else {
                last_was_kicked_off = true;
                if ctx.kick_as_if_stem_up {
                    ctx.kick_off = 1;
                    kind = GlyphKind::Notehead {
                        up_stem_side: Some(NoteheadSide::Left),
                        down_stem_side: None,
                    };
                } else {
                    ctx.kick_off = -1;
                    kind = GlyphKind::Notehead {
                        up_stem_side: None,
                        down_stem_side: Some(NoteheadSide::Right),
                    };
                }
            }
            scene.glyph_mut(ctx.notehead)?.kind = kind;
        }
        Ok(())
    }

    fn position_noteheads(&self, scene: &mut Scene, staves: &[ColumnStaff], time_position: f64) -> Result<()> {
        if self.noteheads.is_empty() {
            return Ok(());
        }
        let mut total_width = 0.0;
        for ctx in &self.noteheads {
            if let Some(bbox) = scene.glyph_bbox_in_space(ctx.notehead, staves[ctx.staff].space)? {
                total_width += bbox.width;
            }
        }
        let kick_off_distance = total_width / self.noteheads.len() as f64 * KICK_OFF_DISTANCE_FACTOR;

        for ctx in &self.noteheads {
            let time = time_position + f64::from(ctx.kick_off) * kick_off_distance;
            let t = staves[ctx.staff].transform(scene, ctx.pitch_position, time)?;
            scene.set_space_transform(scene.glyph_space(ctx.notehead)?, t)?;
        }
        Ok(())
    }

    fn delete_ledger_lines(&mut self, scene: &mut Scene, glyphs: &mut Vec<ObjectId>) -> Result<()> {
        for line in self.ledger_lines.drain(..) {
            glyphs.retain(|&g| g != line);
            scene.remove_glyph(line)?;
        }
        Ok(())
    }

    /// Walks from the outermost notehead towards the staff, top side then
    /// bottom side. Every even position beyond the staff edge gets one
    /// ledger line under all noteheads seen so far.
    #[allow(clippy::too_many_arguments)]
    fn place_ledger_lines(
        &mut self,
        scene: &mut Scene,
        lines: &mut dyn LineSynthesizer,
        staves: &[ColumnStaff],
        staff: usize,
        glyphs: &mut Vec<ObjectId>,
        rng: &mut StdRng,
        time_position: f64,
    ) -> Result<()> {
        let contexts: Vec<NoteheadContext> = self
            .noteheads
            .iter()
            .filter(|c| c.staff == staff)
            .cloned()
            .collect();
        let Some(max_abs) = contexts.iter().map(|c| c.pitch_position.abs()).max() else {
            return Ok(());
        };
        let column_staff = staves[staff];
        let column_x = column_staff
            .transform(scene, 0, time_position)?
            .apply_to(Point::ORIGIN)
            .x;

        for sign in [1, -1] {
            let mut affected: Vec<ObjectId> = Vec::new();
            let mut start = f64::INFINITY;
            let mut end = f64::NEG_INFINITY;
            for distance in ((STAFF_EDGE_PITCH_POSITION + 1)..=max_abs).rev() {
                let pitch_position = distance * sign;
                for ctx in contexts.iter().filter(|c| c.pitch_position == pitch_position) {
                    affected.push(ctx.notehead);
                    let Some(bbox) = scene.glyph_bbox_in_space(ctx.notehead, column_staff.space)? else {
                        continue;
                    };
                    let center = time_position + (bbox.center().x - column_x);
                    let width = bbox.width * rng.random_range(LEDGER_WIDTH_MIN_FACTOR..LEDGER_WIDTH_MAX_FACTOR);
                    start = start.min(center - width / 2.0);
                    end = end.max(center + width / 2.0);
                }

                if pitch_position % 2 == 0 && !affected.is_empty() && start <= end {
                    let from = column_staff.transform(scene, pitch_position, start)?.apply_to(Point::ORIGIN);
                    let to = column_staff.transform(scene, pitch_position, end)?.apply_to(Point::ORIGIN);
                    let line = lines.synthesize_line(scene, LineKind::LedgerLine, gc::LEDGER_LINE, from, to)?;
                    scene.set_parent_space(scene.glyph_space(line)?, Some(column_staff.space))?;
                    scene.set_links(line, Field::AffectedNoteheads, &affected)?;
                    glyphs.push(line);
                    self.ledger_lines.push(line);
                }
            }
        }
        Ok(())
    }
}

// ── Synthesis ───────────────────────────────────────────────────────

impl Column {
    fn event_content_mut(&mut self) -> Result<&mut EventContent> {
        let kind = self.kind();
        match &mut self.content {
            ColumnContent::Event(event) => Ok(event),
            _ => Err(SynthError::Layout(format!("{kind:?} column cannot hold notes or rests"))),
        }
    }

    fn add_notehead(&mut self, scene: &Scene, notehead: ObjectId) -> Result<()> {
        let staff = self.add_glyph(scene, notehead)?;
        let note = scene.require_linked(notehead, Field::Notes)?;
        let pitch = scene.note(note)?.pitch;
        let clef = clef_of_durable(scene, note)?;
        let chord = scene.chord_of_note(note)?;
        let kick_as_if_stem_up = match scene.chord(chord)?.stem_value {
            Some(StemValue::Up) => true,
            Some(StemValue::Down) => false,
            // whole notes kick as if they had an invisible up stem
            Some(StemValue::NoStem) => true,
            None => return Err(stem_inference_error(scene, note)?),
        };
        self.event_content_mut()?.noteheads.push(NoteheadContext {
            notehead,
            staff,
            linear_pitch: pitch.linear_pitch(),
            pitch_position: clef.pitch_to_pitch_position(pitch),
            kick_as_if_stem_up,
            kick_off: 0,
        });
        Ok(())
    }

    fn add_rest(&mut self, scene: &Scene, glyph: ObjectId, pitch_position: i32) -> Result<()> {
        let staff = self.add_glyph(scene, glyph)?;
        self.event_content_mut()?.rests.push(RestContext {
            glyph,
            staff,
            pitch_position,
        });
        Ok(())
    }
}

fn clef_of_durable(scene: &Scene, durable: ObjectId) -> Result<Clef> {
    let event = scene.event_of_durable(durable)?;
    let staff_number = scene.staff_number_of_durable(durable)?;
    scene.event(event)?.attributes.clef(staff_number)
}

/// Where the origin of a rest glyph goes. Without a display pitch, rests
/// sit on the center line.
pub(super) fn rest_pitch_position(clef: Clef, display_pitch: Option<Pitch>, type_duration: TypeDuration) -> i32 {
    let pitch = display_pitch.unwrap_or_else(|| clef.pitch_position_to_pitch(0));
    let pitch_position = clef.pitch_to_pitch_position(pitch);
    if type_duration == TypeDuration::Whole {
        pitch_position + WHOLE_REST_PITCH_OFFSET
    } else {
        pitch_position
    }
}

fn staff_for(staves: &[ObjectId], index: usize) -> Result<ObjectId> {
    staves.get(index).copied().ok_or_else(|| {
        SynthError::Layout(format!("staff index {index} is outside the {} staves of the system", staves.len()))
    })
}

/// Builds the column for one score event. Voices sharing a pitch on one
/// stafflines share a notehead.
pub(super) fn synthesize_event_column(
    scene: &mut Scene,
    staves: &[ObjectId],
    rng: &mut StdRng,
    glyphs: &mut dyn GlyphSynthesizer,
    lines: &mut dyn LineSynthesizer,
    score_event: &ScoreEvent,
) -> Result<Column> {
    let mut column = Column::new(scene, staves, rng.random(), ColumnContent::Event(EventContent::default()))?;

    let mut durables = Vec::new();
    for &event in &score_event.events {
        durables.extend(scene.linked(event, Field::Durables));
    }

    // noteheads
    let mut noteheads: Vec<((usize, i32), ObjectId)> = Vec::new();
    for &note in &durables {
        if scene.kind_of(note)? != EntityKind::Note {
            continue;
        }
        let staff_index = scene.staff_index_of_durable(note)?;
        let semantic = *scene.note(note)?;
        let key = (staff_index, semantic.pitch.linear_pitch());
        if let Some((_, notehead)) = noteheads.iter().find(|(k, _)| *k == key) {
            scene.push_link(*notehead, Field::Notes, note)?;
            continue;
        }
        let stafflines = staff_for(staves, staff_index)?;
        let class = gc::notehead_from_type_duration(semantic.type_duration);
        let notehead = glyphs.synthesize_glyph(scene, class, GlyphType::Notehead)?;
        let staff_space = scene.require_linked(stafflines, Field::Space)?;
        scene.set_parent_space(scene.glyph_space(notehead)?, Some(staff_space))?;
        scene.push_link(notehead, Field::Notes, note)?;
        noteheads.push((key, notehead));
    }
    for (_, notehead) in noteheads {
        column.add_notehead(scene, notehead)?;
    }

    // rests, measure rests included
    for &rest in &durables {
        let (type_duration, display_pitch) = match scene.kind_of(rest)? {
            EntityKind::Rest => {
                let r = scene.rest(rest)?;
                (r.type_duration, r.display_pitch)
            }
            EntityKind::MeasureRest => (TypeDuration::Whole, scene.measure_rest(rest)?.display_pitch),
            _ => continue,
        };
        let stafflines = staff_for(staves, scene.staff_index_of_durable(rest)?)?;
        let class = gc::rest_from_type_duration(type_duration);
        let glyph = glyphs.synthesize_glyph(scene, class, GlyphType::Rest)?;
        let staff_space = scene.require_linked(stafflines, Field::Space)?;
        scene.set_parent_space(scene.glyph_space(glyph)?, Some(staff_space))?;
        scene.set_link(glyph, Field::Rest, Some(rest))?;

        let clef = clef_of_durable(scene, rest)?;
        let pitch_position = rest_pitch_position(clef, display_pitch, type_duration);
        column.add_rest(scene, glyph, pitch_position)?;

        let needs_ledger_line = (class == gc::REST_WHOLE || class == gc::REST_HALF)
            && pitch_position.abs() >= STAFF_EDGE_PITCH_POSITION;
        if needs_ledger_line {
            synthesize_rest_ledger_line(scene, lines, rng, glyph)?;
        }
    }

    Ok(column)
}

/// A short ledger line through the origin of a whole or half rest, living
/// in the rest's own space so it follows the rest around.
fn synthesize_rest_ledger_line(
    scene: &mut Scene,
    lines: &mut dyn LineSynthesizer,
    rng: &mut StdRng,
    rest_glyph: ObjectId,
) -> Result<ObjectId> {
    let space = scene.glyph_space(rest_glyph)?;
    let rest_width = scene
        .glyph_bbox_in_space(rest_glyph, space)?
        .map_or(0.0, |bbox| bbox.width);
    let width = rest_width * rng.random_range(LEDGER_WIDTH_MIN_FACTOR..LEDGER_WIDTH_MAX_FACTOR);
    let line = lines.synthesize_line(
        scene,
        LineKind::LedgerLine,
        gc::LEDGER_LINE,
        Point::new(-width / 2.0, 0.0),
        Point::new(width / 2.0, 0.0),
    )?;
    scene.set_parent_space(scene.glyph_space(line)?, Some(space))?;
    scene.set_link(line, Field::AffectedRest, Some(rest_glyph))?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::semantic::Step;

    fn kick_offs(column: &Column) -> Vec<(i32, i32)> {
        match &column.content {
            ColumnContent::Event(event) => {
                let mut k: Vec<(i32, i32)> = event
                    .noteheads
                    .iter()
                    .map(|c| (c.pitch_position, c.kick_off))
                    .collect();
                k.sort();
                k
            }
            _ => panic!("not an event column"),
        }
    }

    fn ledger_positions(scene: &Scene, column: &Column) -> Vec<i32> {
        let ColumnContent::Event(event) = &column.content else {
            panic!("not an event column");
        };
        let staff = column.staves[0];
        let ss = scene.stafflines(staff.stafflines).unwrap();
        let unit = ss.coordinates.get_transform(1, 0.0).apply_to(Point::ORIGIN).y;
        event
            .ledger_lines
            .iter()
            .map(|&line| {
                let (start, _) = scene.line_endpoints(line, staff.space).unwrap();
                (start.y / unit).round() as i32
            })
            .collect()
    }

    fn single_chord_column(pitches: &[(Step, i32)], stem: &str) -> (Harness, Column) {
        let mut harness = Harness::new(vec![chord_measure(pitches, stem)]);
        let column = harness.event_column(0, 0);
        (harness, column)
    }

    #[test]
    fn neighbours_kick_off_to_the_stem_side() {
        // E4 and F4 in treble clef sit at pitch positions -4 and -3
        let (_, column) = single_chord_column(&[(Step::E, 4), (Step::F, 4)], "up");
        assert_eq!(kick_offs(&column), vec![(-4, 0), (-3, 1)]);

        let (_, column) = single_chord_column(&[(Step::E, 4), (Step::F, 4)], "down");
        assert_eq!(kick_offs(&column), vec![(-4, 0), (-3, -1)]);
    }

    #[test]
    fn thirds_stay_in_the_center() {
        let (_, column) = single_chord_column(&[(Step::E, 4), (Step::G, 4)], "up");
        assert_eq!(kick_offs(&column), vec![(-4, 0), (-2, 0)]);
    }

    #[test]
    fn a_kicked_notehead_releases_the_next_one() {
        let (_, column) = single_chord_column(&[(Step::E, 4), (Step::F, 4), (Step::G, 4)], "up");
        assert_eq!(kick_offs(&column), vec![(-4, 0), (-3, 1), (-2, 0)]);
    }

    #[test]
    fn kicked_notehead_moves_right_of_an_up_stem() {
        let (harness, column) = single_chord_column(&[(Step::E, 4), (Step::F, 4)], "up");
        let ColumnContent::Event(event) = &column.content else {
            panic!("not an event column");
        };
        let x = |i: usize| {
            let space = harness.scene.glyph_space(event.noteheads[i].notehead).unwrap();
            harness.scene.space_transform(space).unwrap().apply_to(Point::ORIGIN).x
        };
        let (center, kicked) = if event.noteheads[0].kick_off == 0 { (x(0), x(1)) } else { (x(1), x(0)) };
        assert!(kicked > center);

        let kicked_id = event.noteheads.iter().find(|c| c.kick_off == 1).unwrap().notehead;
        assert_eq!(
            harness.scene.glyph(kicked_id).unwrap().kind,
            GlyphKind::Notehead {
                up_stem_side: Some(NoteheadSide::Left),
                down_stem_side: None
            }
        );
    }

    #[test]
    fn ledger_lines_only_at_even_positions_beyond_the_staff() {
        // treble clef: C6 = 8, B5 = 7, A5 = 6, G5 = 5
        let cases = [
            ((Step::G, 5), vec![]),
            ((Step::A, 5), vec![6]),
            ((Step::B, 5), vec![6]),
            ((Step::C, 6), vec![8, 6]),
        ];
        for (pitch, expected) in cases {
            let (harness, column) = single_chord_column(&[pitch], "down");
            assert_eq!(ledger_positions(&harness.scene, &column), expected, "pitch {pitch:?}");
        }
    }

    #[test]
    fn ledger_lines_below_the_staff() {
        // treble clef: C4 = -6
        let (harness, column) = single_chord_column(&[(Step::C, 4)], "up");
        assert_eq!(ledger_positions(&harness.scene, &column), vec![-6]);
        let ColumnContent::Event(event) = &column.content else {
            panic!("not an event column");
        };
        let line = event.ledger_lines[0];
        assert_eq!(
            harness.scene.linked(line, Field::AffectedNoteheads),
            vec![event.noteheads[0].notehead]
        );
    }

    #[test]
    fn repositioning_replaces_ledger_lines() {
        let (mut harness, mut column) = single_chord_column(&[(Step::C, 6)], "down");
        let before = harness.scene.find(EntityKind::Glyph).len();
        column.time_position = 12.0;
        column
            .position_glyphs(&mut harness.scene, harness.lines.as_mut())
            .unwrap();
        assert_eq!(harness.scene.find(EntityKind::Glyph).len(), before);
        assert_eq!(ledger_positions(&harness.scene, &column), vec![8, 6]);
        assert!(harness.scene.is_link_index_consistent());
    }

    #[test]
    fn shared_pitches_share_a_notehead() {
        let mut harness = Harness::new(vec![two_voice_unison_measure()]);
        let column = harness.event_column(0, 0);
        let ColumnContent::Event(event) = &column.content else {
            panic!("not an event column");
        };
        assert_eq!(event.noteheads.len(), 1);
        assert_eq!(harness.scene.linked(event.noteheads[0].notehead, Field::Notes).len(), 2);
    }

    #[test]
    fn missing_stem_fails_loudly() {
        let mut harness = Harness::new(vec![chord_measure(&[(Step::G, 4)], "")]);
        let Err(err) = harness.try_event_column(0, 0) else {
            panic!("expected an error");
        };
        assert!(matches!(err, SynthError::StemInferenceUnsupported { measure_index: 0, .. }));
    }

    #[test]
    fn rest_positions() {
        let clef = Clef {
            sign: crate::semantic::ClefSign::G,
            line: 2,
        };
        assert_eq!(rest_pitch_position(clef, None, TypeDuration::Quarter), 0);
        assert_eq!(rest_pitch_position(clef, None, TypeDuration::Whole), 2);
        assert_eq!(
            rest_pitch_position(clef, Some(Pitch::new(Step::F, 5)), TypeDuration::Half),
            4
        );
    }

    #[test]
    fn high_whole_rest_gets_its_own_ledger_line() {
        let mut harness = Harness::new(vec![rest_measure("whole", Some((Step::D, 5)))]);
        let column = harness.event_column(0, 0);
        let ColumnContent::Event(event) = &column.content else {
            panic!("not an event column");
        };
        // D5 is 2, a whole rest hangs one line higher
        assert_eq!(event.rests[0].pitch_position, 4);
        let rest_glyph = event.rests[0].glyph;
        let ledger = harness
            .scene
            .get_inlinked(rest_glyph, EntityKind::Glyph, Field::AffectedRest)
            .unwrap();
        assert_eq!(ledger.len(), 1);
        let ledger_space = harness.scene.glyph_space(ledger[0]).unwrap();
        assert_eq!(
            harness.scene.parent_space(ledger_space),
            Some(harness.scene.glyph_space(rest_glyph).unwrap())
        );
    }

    #[test]
    fn center_rest_has_no_ledger_line() {
        let mut harness = Harness::new(vec![rest_measure("half", None)]);
        let column = harness.event_column(0, 0);
        let ColumnContent::Event(event) = &column.content else {
            panic!("not an event column");
        };
        let rest_glyph = event.rests[0].glyph;
        assert!(harness
            .scene
            .get_inlinked(rest_glyph, EntityKind::Glyph, Field::AffectedRest)
            .unwrap()
            .is_empty());
    }
}
