//! Hand-off to the bitmap renderer.
//!
//! Compositing pixels is left to whoever consumes the scene. What the
//! scene side owns is the geometry of that job: for every sprite, the
//! canvas window it paints over, the transform from sprite pixels into
//! that window and the resampling filter to warp with. [`RenderPlanner`]
//! computes exactly that and serializes it as a [`RenderPlan`].

use crate::error::Result;
use crate::geometry::{mm_to_px, Quad, Rectangle, Transform};
use crate::scene::{ObjectId, Scene, ViewBox};
use log::trace;
use serde::Serialize;

/// Turns the part of a scene inside a view box into some output.
pub trait Renderer {
    type Output;

    fn render(&mut self, scene: &Scene, view_box: &ViewBox) -> Result<Self::Output>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResampleFilter {
    /// Pixel-area averaging, for downscaling.
    Area,
    /// Bilinear, for upscaling.
    Linear,
}

/// One sprite to warp and composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpriteLayer {
    pub sprite: ObjectId,
    /// Canvas pixels the sprite may touch, snapped to whole pixels.
    pub window: Rectangle,
    /// Sprite pixels → window pixels.
    pub transform: Transform,
    pub filter: ResampleFilter,
}

/// Every visible sprite of a view box, in painting order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub dpi: f64,
    pub canvas_width: usize,
    pub canvas_height: usize,
    pub layers: Vec<SpriteLayer>,
}

impl RenderPlan {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderPlanner {
    pub dpi: f64,
}

impl RenderPlanner {
    pub fn new(dpi: f64) -> Self {
        Self { dpi }
    }
}

impl Renderer for RenderPlanner {
    type Output = RenderPlan;

    fn render(&mut self, scene: &Scene, view_box: &ViewBox) -> Result<RenderPlan> {
        let area = view_box.rectangle;
        let canvas_width = mm_to_px(area.width, self.dpi).ceil() as usize;
        let canvas_height = mm_to_px(area.height, self.dpi).ceil() as usize;
        let canvas = Rectangle::new(0.0, 0.0, canvas_width as f64, canvas_height as f64);

        let scene_to_canvas = Transform::translate(-area.top_left_corner().vector())
            .then(&Transform::scale(mm_to_px(1.0, self.dpi)));

        let mut layers = Vec::new();
        for (sprite, to_scene) in scene.traverse_sprites(scene.root_space(), false)? {
            let to_canvas = to_scene.then(&scene_to_canvas);
            // one extra pixel around the bitmap catches the resampling blur
            let pixels = scene.sprite(sprite)?.bitmap.pixels_bbox().dilate(1.0);
            let window = to_canvas
                .apply_to(Quad::from_rectangle(&pixels))
                .bbox()
                .snap_grow()
                .intersect_with(&canvas);
            if window.has_no_area() {
                trace!("Culled sprite {sprite}");
                continue;
            }
            let transform = to_canvas.then(&Transform::translate(-window.top_left_corner().vector()));
            let filter = if transform.determinant() < 1.0 {
                ResampleFilter::Area
            } else {
                ResampleFilter::Linear
            };
            layers.push(SpriteLayer {
                sprite,
                window,
                transform,
                filter,
            });
        }

        Ok(RenderPlan {
            dpi: self.dpi,
            canvas_width,
            canvas_height,
            layers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Vector2};
    use crate::scene::{Bitmap, Sprite};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn sprite_at(scene: &mut Scene, x: f64, y: f64, dpi: f64) -> ObjectId {
        let sprite = Sprite {
            transform: Transform::translate(Vector2::new(x, y)),
            ..Sprite::new(Rc::new(Bitmap::filled(24, 12, [0, 0, 0, 255])), dpi)
        };
        scene.add_sprite(scene.root_space(), sprite).unwrap()
    }

    fn view_box() -> ViewBox {
        ViewBox {
            rectangle: Rectangle::new(0.0, 0.0, 10.0, 10.0),
        }
    }

    #[test]
    fn window_covers_the_dilated_sprite() {
        let mut scene = Scene::new();
        let sprite = sprite_at(&mut scene, 5.0, 5.0, 300.0);
        let plan = RenderPlanner::new(300.0).render(&scene, &view_box()).unwrap();

        assert_eq!((plan.canvas_width, plan.canvas_height), (119, 119));
        assert_eq!(plan.layers.len(), 1);
        let layer = &plan.layers[0];
        assert_eq!(layer.sprite, sprite);
        assert_eq!(layer.window, Rectangle::new(46.0, 52.0, 27.0, 15.0));
        assert_eq!(layer.filter, ResampleFilter::Linear);

        // the sprite's top-left pixel lands just inside the window
        let corner = layer.transform.apply_to(Point::ORIGIN);
        assert!((corner.x - 1.055).abs() < 1e-3);
        assert!((corner.y - 1.055).abs() < 1e-3);
    }

    #[test]
    fn sprites_outside_the_canvas_are_culled() {
        let mut scene = Scene::new();
        sprite_at(&mut scene, 50.0, 5.0, 300.0);
        let kept = sprite_at(&mut scene, 9.9, 9.9, 300.0);
        let plan = RenderPlanner::new(300.0).render(&scene, &view_box()).unwrap();
        assert_eq!(plan.layers.len(), 1);
        assert_eq!(plan.layers[0].sprite, kept);
        // clipped by the canvas edge
        assert_eq!(plan.layers[0].window.right(), 119.0);
    }

    #[test]
    fn high_resolution_sprites_are_downscaled_by_area() {
        let mut scene = Scene::new();
        sprite_at(&mut scene, 5.0, 5.0, 600.0);
        let plan = RenderPlanner::new(300.0).render(&scene, &view_box()).unwrap();
        assert_eq!(plan.layers[0].filter, ResampleFilter::Area);
        assert!((plan.layers[0].transform.determinant() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn plan_serializes_to_json() {
        let mut scene = Scene::new();
        sprite_at(&mut scene, 5.0, 5.0, 300.0);
        let json = RenderPlanner::new(300.0)
            .render(&scene, &view_box())
            .unwrap()
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["canvas_width"], 119);
        assert_eq!(value["layers"][0]["filter"], "Linear");
    }
}
