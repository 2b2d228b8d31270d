use super::LineSynthesizer;
use crate::error::Result;
use crate::geometry::{Point, Rectangle, Transform};
use crate::scene::{GlyphKind, LineKind, ObjectId, Scene, Sprite};

/// Draws every line as a straight solid bar.
#[derive(Debug, Clone)]
pub struct NaiveLineSynthesizer {
    /// Thickness of the bar (mm).
    pub line_width: f64,
    pub dpi: f64,
}

impl Default for NaiveLineSynthesizer {
    fn default() -> Self {
        Self {
            line_width: 0.5,
            dpi: Sprite::DEFAULT_DPI,
        }
    }
}

impl LineSynthesizer for NaiveLineSynthesizer {
    fn synthesize_line(
        &mut self,
        scene: &mut Scene,
        kind: LineKind,
        glyph_class: &str,
        start: Point,
        end: Point,
    ) -> Result<ObjectId> {
        let delta = end - start;
        let length = delta.magnitude();

        // Horizontal bar centered on the glyph origin.
        let glyph = scene.create_glyph(glyph_class, GlyphKind::Line(kind))?;
        let bar = Rectangle::new(-length / 2.0, -self.line_width / 2.0, length, self.line_width);
        scene.add_glyph_sprite(glyph, Sprite::rectangle(&bar, self.dpi))?;
        scene.set_line_points(glyph, Point::new(-length / 2.0, 0.0), Point::new(length / 2.0, 0.0))?;

        // Rotate the bar onto the requested direction and move its middle
        // between the endpoints.
        let (cos, sin) = if length > 0.0 {
            (delta.x / length, delta.y / length)
        } else {
            (1.0, 0.0)
        };
        let middle = start + delta * 0.5;
        let placement = Transform::from_matrix([[cos, -sin, middle.x], [sin, cos, middle.y]]);
        scene.set_space_transform(scene.glyph_space(glyph)?, placement)?;
        Ok(glyph)
    }
}
