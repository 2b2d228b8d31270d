//! Columns: horizontal layout units bound to one time position and
//! spanning every staff of a system.
//!
//! A column owns the glyphs it places. Its width is measured from the
//! sprites of those glyphs after every positioning pass, relative to the
//! column's own time position, so `left_width` is how far the content
//! reaches left of the time position and `right_width` how far right.

use super::event_column::EventContent;
use crate::error::{Result, SynthError};
use crate::geometry::{Point, Quad, Rectangle, Transform};
use crate::scene::{Field, ObjectId, Scene};
use crate::semantic::Clef;
use crate::synth::LineSynthesizer;
use log::trace;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    /// System header with one clef per staff.
    Clefs,
    /// Noteheads, ledger lines and rests of one score event.
    Event,
    /// Closes a measure.
    Barlines,
}

/// Stafflines a column draws onto, with their space resolved once.
#[derive(Debug, Clone, Copy)]
pub(super) struct ColumnStaff {
    pub(super) stafflines: ObjectId,
    pub(super) space: ObjectId,
}

impl ColumnStaff {
    pub(super) fn transform(&self, scene: &Scene, pitch_position: i32, time_position: f64) -> Result<Transform> {
        Ok(scene
            .stafflines(self.stafflines)?
            .coordinates
            .get_transform(pitch_position, time_position))
    }
}

pub(super) enum ColumnContent {
    /// Glyph and the clef it draws, in glyph order.
    Clefs(Vec<(ObjectId, Clef)>),
    Event(EventContent),
    Barlines,
}

pub struct Column {
    pub(super) staves: Vec<ColumnStaff>,
    pub(super) glyphs: Vec<ObjectId>,
    rng_seed: u64,
    rng: StdRng,
    pub time_position: f64,
    pub width: f64,
    pub left_width: f64,
    pub right_width: f64,
    pub flex_grow: f64,
    pub flex_shrink: f64,
    /// Score measure the column belongs to; `None` for the header.
    pub(super) measure_index: Option<usize>,
    pub(super) content: ColumnContent,
}

impl Column {
    pub(super) fn new(scene: &Scene, staves: &[ObjectId], rng_seed: u64, content: ColumnContent) -> Result<Self> {
        let staves = staves
            .iter()
            .map(|&stafflines| {
                scene.stafflines(stafflines)?;
                Ok(ColumnStaff {
                    stafflines,
                    space: scene.require_linked(stafflines, Field::Space)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            staves,
            glyphs: Vec::new(),
            rng_seed,
            rng: StdRng::seed_from_u64(rng_seed),
            time_position: 0.0,
            width: 0.0,
            left_width: 0.0,
            right_width: 0.0,
            flex_grow: 1.0,
            flex_shrink: 1.0,
            measure_index: None,
            content,
        })
    }

    pub fn kind(&self) -> ColumnKind {
        match self.content {
            ColumnContent::Clefs(_) => ColumnKind::Clefs,
            ColumnContent::Event(_) => ColumnKind::Event,
            ColumnContent::Barlines => ColumnKind::Barlines,
        }
    }

    pub fn glyphs(&self) -> &[ObjectId] {
        &self.glyphs
    }

    /// Tracks a glyph whose space is already parented to one of the
    /// column's stafflines. Returns the index of those stafflines.
    pub(super) fn add_glyph(&mut self, scene: &Scene, glyph: ObjectId) -> Result<usize> {
        let staff = self.staff_of_glyph(scene, glyph)?;
        if !self.glyphs.contains(&glyph) {
            self.glyphs.push(glyph);
        }
        Ok(staff)
    }

    pub(super) fn staff_of_glyph(&self, scene: &Scene, glyph: ObjectId) -> Result<usize> {
        staff_index(scene, &self.staves, glyph)
    }

    /// Places every glyph for the current time position and re-measures
    /// the column. The local RNG restarts from the column seed, so
    /// repeated passes produce identical jitter.
    pub fn position_glyphs(&mut self, scene: &mut Scene, lines: &mut dyn LineSynthesizer) -> Result<()> {
        self.rng = StdRng::seed_from_u64(self.rng_seed);
        let Self {
            staves,
            glyphs,
            rng,
            time_position,
            content,
            ..
        } = self;
        match content {
            ColumnContent::Clefs(clefs) => {
                for (glyph, clef) in clefs.iter() {
                    let staff = staff_index(scene, staves, *glyph)?;
                    let t = staves[staff].transform(scene, clef.line_pitch_position(), *time_position)?;
                    scene.set_space_transform(scene.glyph_space(*glyph)?, t)?;
                }
            }
            ColumnContent::Barlines => {
                for &glyph in glyphs.iter() {
                    let staff = staff_index(scene, staves, glyph)?;
                    let t = staves[staff].transform(scene, 0, *time_position)?;
                    scene.set_space_transform(scene.glyph_space(glyph)?, t)?;
                }
            }
            ColumnContent::Event(event) => {
                event.position(scene, lines, staves, glyphs, rng, *time_position)?;
            }
        }
        self.recalculate_dimensions(scene)
    }

    pub(super) fn recalculate_dimensions(&mut self, scene: &Scene) -> Result<()> {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        for staff in &self.staves {
            let origin = staff.transform(scene, 0, self.time_position)?.apply_to(Point::ORIGIN);
            for &glyph in &self.glyphs {
                let space = scene.glyph_space(glyph)?;
                if scene.parent_space(space) != Some(staff.space) {
                    continue;
                }
                for (sprite, t) in scene.traverse_sprites(space, true)? {
                    let bitmap = &scene.sprite(sprite)?.bitmap;
                    let pixels = Rectangle::new(0.0, 0.0, bitmap.width as f64, bitmap.height as f64);
                    for corner in t.apply_to(Quad::from_rectangle(&pixels)).points() {
                        min_x = min_x.min(corner.x - origin.x);
                        max_x = max_x.max(corner.x - origin.x);
                    }
                }
            }
        }

        if min_x.is_finite() && max_x.is_finite() {
            self.left_width = -min_x;
            self.right_width = max_x;
        } else {
            self.left_width = 0.0;
            self.right_width = 0.0;
        }
        self.width = self.left_width + self.right_width;
        trace!(
            "{:?} column at {:.2}: left {:.2}, right {:.2}",
            self.kind(),
            self.time_position,
            self.left_width,
            self.right_width
        );
        Ok(())
    }

    /// Removes every glyph of the column from the scene, including the
    /// glyphs nested in their spaces.
    pub fn detach(self, scene: &mut Scene) -> Result<()> {
        for glyph in self.glyphs {
            if scene.contains(glyph) {
                scene.remove_glyph(glyph)?;
            }
        }
        Ok(())
    }
}

fn staff_index(scene: &Scene, staves: &[ColumnStaff], glyph: ObjectId) -> Result<usize> {
    let parent = scene.parent_space(scene.glyph_space(glyph)?);
    staves
        .iter()
        .position(|s| Some(s.space) == parent)
        .ok_or_else(|| SynthError::Layout(format!("glyph {glyph} is not attached to any stafflines of the column")))
}
