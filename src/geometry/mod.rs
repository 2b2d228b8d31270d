//! Geometry kernel: vectors, points, axis-aligned rectangles, quads,
//! polygons and 2×3 affine transforms.
//!
//! All scene coordinates are millimeters with the Y axis pointing down.

mod shapes;
mod transform;
mod units;
mod vector;

pub use shapes::{Polygon, Quad, Rectangle};
pub use transform::{Transform, Transformable};
pub use units::{mm_to_px, px_to_mm, INCHES_IN_MILLIMETER, MILLIMETERS_IN_INCH};
pub use vector::{Point, Vector2};
