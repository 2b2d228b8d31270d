use super::StafflinesSynthesizer;
use crate::error::Result;
use crate::geometry::{px_to_mm, Point, Rectangle, Transform};
use crate::scene::{Field, LinearStaffCoordinates, ObjectId, Scene, Sprite, Stafflines};

/// Five straight, evenly spaced lines with handwritten-dataset proportions.
#[derive(Debug, Clone)]
pub struct NaiveStafflinesSynthesizer {
    pub staff_space: f64,
    pub line_width: f64,
}

impl Default for NaiveStafflinesSynthesizer {
    fn default() -> Self {
        Self {
            staff_space: px_to_mm(28.75, 300.0),
            line_width: px_to_mm(1.5, 300.0),
        }
    }
}

impl StafflinesSynthesizer for NaiveStafflinesSynthesizer {
    fn stafflines_height(&self) -> f64 {
        self.staff_space * 4.0
    }

    fn synthesize_stafflines(
        &mut self,
        scene: &mut Scene,
        parent_space: ObjectId,
        position: Point,
        width: f64,
    ) -> Result<ObjectId> {
        let space = scene.create_space(Some(parent_space), Transform::translate(position.vector()))?;
        for i in -2..=2 {
            let line = Rectangle::new(
                0.0,
                f64::from(i) * self.staff_space - self.line_width / 2.0,
                width,
                self.line_width,
            );
            scene.add_sprite(space, Sprite::rectangle(&line, Sprite::DEFAULT_DPI))?;
        }
        let stafflines = scene.insert(Stafflines {
            width,
            coordinates: Box::new(LinearStaffCoordinates {
                staff_space: self.staff_space,
            }),
        });
        scene.set_link(stafflines, Field::Space, Some(space))?;
        Ok(stafflines)
    }
}
