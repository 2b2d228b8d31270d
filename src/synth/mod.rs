//! Synthesizer interfaces and their implementations.
//!
//! Layout only talks to the traits defined here: it asks for a glyph of a
//! class, a line between two points or a staff at a position, and never
//! cares how the pixels were produced.

pub mod glyph_class;
mod library;
mod line;
mod page;
mod stafflines;
pub mod style;

pub use library::{GlyphLibrary, GlyphTemplate, LibraryGlyphSynthesizer};
pub use line::NaiveLineSynthesizer;
pub use page::{PageLayout, SimplePageSynthesizer};
pub use stafflines::NaiveStafflinesSynthesizer;
pub use style::{StyleDomain, Styler, WriterStyleDomain};

use crate::error::{Result, SynthError};
use crate::geometry::Point;
use crate::scene::{GlyphType, LineKind, ObjectId, Scene};
use std::collections::BTreeSet;

/// Produces glyphs by class.
pub trait GlyphSynthesizer {
    fn supported_glyphs(&self) -> BTreeSet<String>;

    /// Creates a glyph with its own unparented space. Fails for unsupported
    /// classes and when the produced glyph is not of the expected type.
    fn synthesize_glyph(
        &mut self,
        scene: &mut Scene,
        glyph_class: &str,
        expected: GlyphType,
    ) -> Result<ObjectId>;

    /// Reads the per-sample style choices.
    fn apply_style(&mut self, _styler: &Styler) -> Result<()> {
        Ok(())
    }
}

/// Produces line glyphs between two points.
pub trait LineSynthesizer {
    /// `start` and `end` are in the coordinates of the space the caller
    /// parents the returned glyph's space to.
    fn synthesize_line(
        &mut self,
        scene: &mut Scene,
        kind: LineKind,
        glyph_class: &str,
        start: Point,
        end: Point,
    ) -> Result<ObjectId>;
}

/// Produces stafflines and their coordinate system.
pub trait StafflinesSynthesizer {
    fn stafflines_height(&self) -> f64;

    /// `position` is the left end of the center line in `parent_space`.
    fn synthesize_stafflines(
        &mut self,
        scene: &mut Scene,
        parent_space: ObjectId,
        position: Point,
        width: f64,
    ) -> Result<ObjectId>;
}

/// Checks a freshly synthesized glyph against the request. A plain glyph
/// request accepts any glyph type.
pub fn verify_glyph(scene: &Scene, glyph: ObjectId, glyph_class: &str, expected: GlyphType) -> Result<()> {
    let g = scene.glyph(glyph)?;
    let actual = g.glyph_type();
    if expected != GlyphType::Glyph && actual != expected {
        return Err(SynthError::GlyphTypeMismatch {
            glyph_class: glyph_class.to_string(),
            expected,
            actual,
        });
    }
    if g.glyph_class != glyph_class {
        return Err(SynthError::UnsupportedGlyphClass(format!(
            "requested {glyph_class}, got {}",
            g.glyph_class
        )));
    }
    Ok(())
}
