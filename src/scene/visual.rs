//! Visual scene entities: bitmaps, sprites, glyphs, stafflines, beam
//! coordinate systems, pages and systems.

use crate::geometry::{mm_to_px, px_to_mm, Point, Rectangle, Transform, Vector2};
use crate::semantic::{BeamValue, StemValue};
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

// ── Bitmaps and sprites ────────────────────────────────────────────

/// RGBA8 raster, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn filled(width: usize, height: usize, rgba: [u8; 4]) -> Self {
        let pixels = rgba.iter().copied().cycle().take(width * height * 4).collect();
        Self { width, height, pixels }
    }

    /// Pixel-space rectangle covered by the bitmap.
    pub fn pixels_bbox(&self) -> Rectangle {
        Rectangle::new(0.0, 0.0, self.width as f64, self.height as f64)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap({}x{})", self.width, self.height)
    }
}

/// A bitmap placed into a space.
///
/// The bitmap origin is given relative to the bitmap size, so `(0.5, 0.5)`
/// is its center. At that origin the sprite sits at `transform` applied to
/// the space origin.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub bitmap: Rc<Bitmap>,
    pub bitmap_origin: Point,
    pub dpi: f64,
    pub transform: Transform,
}

impl Sprite {
    pub const DEFAULT_DPI: f64 = 300.0;

    pub fn new(bitmap: Rc<Bitmap>, dpi: f64) -> Self {
        Self {
            bitmap,
            bitmap_origin: Point::new(0.5, 0.5),
            dpi,
            transform: Transform::identity(),
        }
    }

    /// A solid black sprite covering `rectangle` (millimeters, local space).
    pub fn rectangle(rectangle: &Rectangle, dpi: f64) -> Self {
        let width = mm_to_px(rectangle.width, dpi).round().max(1.0) as usize;
        let height = mm_to_px(rectangle.height, dpi).round().max(1.0) as usize;
        let bitmap = Rc::new(Bitmap::filled(width, height, [0, 0, 0, 255]));
        Self {
            transform: Transform::translate(rectangle.center().vector()),
            ..Self::new(bitmap, dpi)
        }
    }

    /// Maps bitmap pixel coordinates onto millimeters around the origin.
    pub fn pixels_to_scene(&self) -> Transform {
        let offset = Vector2::new(
            -self.bitmap_origin.x * self.bitmap.width as f64,
            -self.bitmap_origin.y * self.bitmap.height as f64,
        );
        Transform::translate(offset).then(&Transform::scale(px_to_mm(1.0, self.dpi)))
    }

    pub fn physical_width(&self) -> f64 {
        px_to_mm(self.bitmap.width as f64, self.dpi)
    }

    pub fn physical_height(&self) -> f64 {
        px_to_mm(self.bitmap.height as f64, self.dpi)
    }
}

// ── Glyphs ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GlyphType {
    Glyph,
    Notehead,
    Rest,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoteheadSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineKind {
    Stem,
    Beam { beam_number: u8 },
    BeamHook { beam_number: u8, hook: BeamValue },
    LedgerLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GlyphKind {
    /// Barlines, clefs and anything without extra semantics.
    Plain,
    /// Links to its notes through [`super::Field::Notes`].
    Notehead {
        up_stem_side: Option<NoteheadSide>,
        down_stem_side: Option<NoteheadSide>,
    },
    /// Links to its rest through [`super::Field::Rest`].
    Rest,
    /// Has start and end points in its own space.
    Line(LineKind),
}

impl GlyphKind {
    pub fn glyph_type(&self) -> GlyphType {
        match self {
            GlyphKind::Plain => GlyphType::Glyph,
            GlyphKind::Notehead { .. } => GlyphType::Notehead,
            GlyphKind::Rest => GlyphType::Rest,
            GlyphKind::Line(_) => GlyphType::Line,
        }
    }

    pub fn notehead() -> Self {
        GlyphKind::Notehead {
            up_stem_side: Some(NoteheadSide::Right),
            down_stem_side: Some(NoteheadSide::Left),
        }
    }
}

/// One renderable symbol. Its space and sprites are links.
#[derive(Debug, Clone)]
pub struct Glyph {
    pub glyph_class: String,
    pub kind: GlyphKind,
}

impl Glyph {
    pub fn glyph_type(&self) -> GlyphType {
        self.kind.glyph_type()
    }
}

// ── Stafflines ─────────────────────────────────────────────────────

/// Maps (pitch position, time position) onto the stafflines space.
pub trait StaffCoordinateSystem: fmt::Debug {
    fn get_transform(&self, pitch_position: i32, time_position: f64) -> Transform;
}

/// Straight, evenly spaced staff: time runs along X from the left edge,
/// each pitch position is half a staff space, the center line is `y = 0`.
#[derive(Debug, Clone, Copy)]
pub struct LinearStaffCoordinates {
    pub staff_space: f64,
}

impl StaffCoordinateSystem for LinearStaffCoordinates {
    fn get_transform(&self, pitch_position: i32, time_position: f64) -> Transform {
        Transform::translate(Vector2::new(
            time_position,
            self.staff_space * (-(pitch_position as f64) / 2.0),
        ))
    }
}

#[derive(Debug)]
pub struct Stafflines {
    pub width: f64,
    pub coordinates: Box<dyn StaffCoordinateSystem>,
}

// ── Beams ──────────────────────────────────────────────────────────

/// Linear function `y = k·x + q` in paper space describing the first beam
/// of a group; further beams are stacked `beam_spacing` apart towards the
/// noteheads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeamCoordinateSystem {
    pub k: f64,
    pub q: f64,
    pub beam_spacing: f64,
}

impl BeamCoordinateSystem {
    pub fn y(&self, x: f64, beam_number: u8, stem_value: StemValue) -> f64 {
        let mut level = f64::from(beam_number.saturating_sub(1));
        if stem_value == StemValue::Down {
            level = -level;
        }
        self.k * x + self.q + level * self.beam_spacing
    }

    pub fn point(&self, x: f64, beam_number: u8, stem_value: StemValue) -> Point {
        Point::new(x, self.y(x, beam_number, stem_value))
    }
}

// ── Pages and systems ──────────────────────────────────────────────

/// Region of the scene that gets rendered, in root-space millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewBox {
    pub rectangle: Rectangle,
}

/// A sheet of paper. Links to its space and its stafflines.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub view_box: ViewBox,
}

/// A run of measures laid out across every staff of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct System {
    pub first_measure_index: usize,
    pub measure_count: usize,
}

impl System {
    pub fn end_measure_index(&self) -> usize {
        self.first_measure_index + self.measure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_to_scene_centers_the_bitmap() {
        let sprite = Sprite::new(Rc::new(Bitmap::filled(300, 150, [0, 0, 0, 255])), 300.0);
        let t = sprite.pixels_to_scene();
        let top_left = t.apply_to(Point::ORIGIN);
        assert!((top_left.x + 12.7).abs() < 1e-9);
        assert!((top_left.y + 6.35).abs() < 1e-9);
        let center = t.apply_to(Point::new(150.0, 75.0));
        assert!(center.x.abs() < 1e-9 && center.y.abs() < 1e-9);
    }

    #[test]
    fn rectangle_sprite_is_centered_on_the_rectangle() {
        let sprite = Sprite::rectangle(&Rectangle::new(1.0, -0.5, 2.0, 1.0), 300.0);
        assert_eq!(sprite.bitmap.width, 24);
        assert_eq!(sprite.bitmap.height, 12);
        let c = sprite.transform.apply_to(Point::ORIGIN);
        assert!((c.x - 2.0).abs() < 1e-12 && c.y.abs() < 1e-12);
    }

    #[test]
    fn linear_staff_maps_pitch_positions_upwards() {
        let staff = LinearStaffCoordinates { staff_space: 2.0 };
        let p = staff.get_transform(4, 7.0).apply_to(Point::ORIGIN);
        assert_eq!((p.x, p.y), (7.0, -4.0));
        let p = staff.get_transform(-3, 0.0).apply_to(Point::ORIGIN);
        assert_eq!((p.x, p.y), (0.0, 3.0));
    }

    #[test]
    fn beam_levels_stack_towards_the_noteheads() {
        let beam = BeamCoordinateSystem { k: 0.5, q: -10.0, beam_spacing: 1.5 };
        assert_eq!(beam.y(2.0, 1, StemValue::Up), -9.0);
        assert_eq!(beam.y(2.0, 2, StemValue::Up), -7.5);
        assert_eq!(beam.y(2.0, 2, StemValue::Down), -10.5);
    }
}
