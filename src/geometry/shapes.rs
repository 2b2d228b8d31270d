use super::transform::{Transform, Transformable};
use super::vector::{Point, Vector2};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle with a top-left corner and non-negative extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    /// Panics when either extent is negative or not finite.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        assert!(
            width >= 0.0 && height >= 0.0,
            "rectangle extents must be non-negative, got {width} x {height}"
        );
        assert!(
            x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite(),
            "rectangle must be finite"
        );
        Self { x, y, width, height }
    }

    /// Rectangle spanning two opposite corners, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        Self::new(left, top, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn top_left_corner(&self) -> Point {
        Point::new(self.left(), self.top())
    }

    pub fn top_right_corner(&self) -> Point {
        Point::new(self.right(), self.top())
    }

    pub fn bottom_right_corner(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    pub fn bottom_left_corner(&self) -> Point {
        Point::new(self.left(), self.bottom())
    }

    pub fn bbox(&self) -> Rectangle {
        *self
    }

    /// Grows (or shrinks, for negative amounts) by `amount` on every side.
    /// Shrinking never produces negative extents.
    pub fn dilate(&self, amount: f64) -> Rectangle {
        let width = (self.width + 2.0 * amount).max(0.0);
        let height = (self.height + 2.0 * amount).max(0.0);
        let center = self.center();
        Rectangle::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    /// The overlapping area. Disjoint rectangles yield a zero-area
    /// rectangle clamped to the boundary of `other`.
    pub fn intersect_with(&self, other: &Rectangle) -> Rectangle {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right()).max(left);
        let bottom = self.bottom().min(other.bottom()).max(top);
        Rectangle::new(left, top, right - left, bottom - top)
    }

    /// Smallest rectangle covering both.
    pub fn union_with(&self, other: &Rectangle) -> Rectangle {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rectangle::new(left, top, right - left, bottom - top)
    }

    /// Snaps to the integer grid by growing outwards.
    pub fn snap_grow(&self) -> Rectangle {
        let left = self.left().floor();
        let top = self.top().floor();
        let right = self.right().ceil();
        let bottom = self.bottom().ceil();
        Rectangle::new(left, top, right - left, bottom - top)
    }

    /// Snaps to the integer grid by shrinking inwards.
    pub fn snap_shrink(&self) -> Rectangle {
        let left = self.left().ceil();
        let top = self.top().ceil();
        let right = self.right().floor().max(left);
        let bottom = self.bottom().floor().max(top);
        Rectangle::new(left, top, right - left, bottom - top)
    }

    pub fn has_no_area(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    pub fn translated(&self, offset: Vector2) -> Rectangle {
        Rectangle::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }
}

/// Four points enclosing a quadrangle, clockwise from the top-left corner.
/// This is what a rectangle becomes after an affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub a: Point,
    pub b: Point,
    pub c: Point,
    pub d: Point,
}

impl Quad {
    pub fn from_rectangle(r: &Rectangle) -> Self {
        Self {
            a: r.top_left_corner(),
            b: r.top_right_corner(),
            c: r.bottom_right_corner(),
            d: r.bottom_left_corner(),
        }
    }

    pub fn points(&self) -> [Point; 4] {
        [self.a, self.b, self.c, self.d]
    }

    pub fn bbox(&self) -> Rectangle {
        bbox_of(&self.points()).unwrap_or_else(|| Rectangle::new(self.a.x, self.a.y, 0.0, 0.0))
    }
}

impl Transformable for Quad {
    fn transformed_by(self, t: &Transform) -> Self {
        Quad {
            a: t.apply_to(self.a),
            b: t.apply_to(self.b),
            c: t.apply_to(self.c),
            d: t.apply_to(self.d),
        }
    }
}

/// An ordered list of points enclosing an area.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn from_rectangle(r: &Rectangle) -> Self {
        Self::from_quad(&Quad::from_rectangle(r))
    }

    pub fn from_quad(q: &Quad) -> Self {
        Self { points: q.points().to_vec() }
    }

    /// Bounding box of the points; `None` for an empty polygon.
    pub fn bbox(&self) -> Option<Rectangle> {
        bbox_of(&self.points)
    }
}

impl Transformable for Polygon {
    fn transformed_by(self, t: &Transform) -> Self {
        Polygon {
            points: self.points.into_iter().map(|p| t.apply_to(p)).collect(),
        }
    }
}

fn bbox_of(points: &[Point]) -> Option<Rectangle> {
    let first = points.first()?;
    let (mut left, mut top, mut right, mut bottom) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        left = left.min(p.x);
        top = top.min(p.y);
        right = right.max(p.x);
        bottom = bottom.max(p.y);
    }
    Some(Rectangle::new(left, top, right - left, bottom - top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    #[should_panic]
    fn negative_width_is_rejected() {
        Rectangle::new(0.0, 0.0, -1.0, 1.0);
    }

    #[test]
    fn dilate_grows_every_side() {
        let r = Rectangle::new(1.0, 2.0, 3.0, 4.0).dilate(1.0);
        assert_eq!(r, Rectangle::new(0.0, 1.0, 5.0, 6.0));
        let shrunk = Rectangle::new(0.0, 0.0, 1.0, 1.0).dilate(-2.0);
        assert!(shrunk.has_no_area());
    }

    #[test]
    fn snapping_grows_and_shrinks_to_integers() {
        let r = Rectangle::new(0.4, 1.6, 2.2, 1.0);
        assert_eq!(r.snap_grow(), Rectangle::new(0.0, 1.0, 3.0, 2.0));
        assert_eq!(r.snap_shrink(), Rectangle::new(1.0, 2.0, 1.0, 0.0));
    }

    #[test]
    fn disjoint_intersection_has_no_area() {
        let canvas = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let inside = Rectangle::new(8.0, -2.0, 5.0, 5.0).intersect_with(&canvas);
        assert_eq!(inside, Rectangle::new(8.0, 0.0, 2.0, 3.0));
        let outside = Rectangle::new(20.0, 20.0, 1.0, 1.0).intersect_with(&canvas);
        assert!(outside.has_no_area());
    }

    #[test]
    fn rotated_quad_bbox_covers_all_corners() {
        let r = Rectangle::new(-1.0, -1.0, 2.0, 2.0);
        let q = Transform::rotate_deg_cc(45.0).apply_to(Quad::from_rectangle(&r));
        let bbox = q.bbox();
        let half_diagonal = 2f64.sqrt();
        assert!((bbox.width - 2.0 * half_diagonal).abs() < 1e-9);
        assert!((bbox.left() + half_diagonal).abs() < 1e-9);
    }

    #[test]
    fn empty_polygon_has_no_bbox() {
        assert_eq!(Polygon::default().bbox(), None);
        let p = Polygon::new(vec![Point::new(3.0, 1.0), Point::new(-1.0, 4.0)]);
        assert_eq!(p.bbox(), Some(Rectangle::new(-1.0, 1.0, 4.0, 3.0)));
    }
}
