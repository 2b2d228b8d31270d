use super::vector::{Point, Vector2};
use serde::{Deserialize, Serialize};

/// 2D affine transform stored as a 2×3 matrix.
///
/// When attached to a scene space it maps from the local space to the
/// parent space. `[[a, b, c], [d, e, f]]` maps `(x, y)` to
/// `(a·x + b·y + c, d·x + e·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    matrix: [[f64; 3]; 2],
}

/// Anything a [`Transform`] can be applied to.
pub trait Transformable: Sized {
    fn transformed_by(self, transform: &Transform) -> Self;
}

impl Transform {
    /// Wraps a raw matrix. Panics on non-finite entries.
    pub fn from_matrix(matrix: [[f64; 3]; 2]) -> Self {
        assert!(
            matrix.iter().flatten().all(|v| v.is_finite()),
            "affine matrix must contain only finite values: {matrix:?}"
        );
        Self { matrix }
    }

    pub fn identity() -> Self {
        Self::from_matrix([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
    }

    pub fn translate(offset: Vector2) -> Self {
        Self::from_matrix([[1.0, 0.0, offset.x], [0.0, 1.0, offset.y]])
    }

    pub fn scale(factor: f64) -> Self {
        Self::from_matrix([[factor, 0.0, 0.0], [0.0, factor, 0.0]])
    }

    /// Counter-clockwise rotation (as seen on a Y-down page) around the origin.
    pub fn rotate_deg_cc(angle: f64) -> Self {
        let (sin, cos) = angle.to_radians().sin_cos();
        Self::from_matrix([[cos, sin, 0.0], [-sin, cos, 0.0]])
    }

    pub fn matrix(&self) -> [[f64; 3]; 2] {
        self.matrix
    }

    /// Determinant of the linear part, i.e. the area scale factor.
    pub fn determinant(&self) -> f64 {
        let [[a, b, _], [d, e, _]] = self.matrix;
        a * e - b * d
    }

    /// Chains transforms chronologically: first `self`, then `other`.
    pub fn then(&self, other: &Transform) -> Transform {
        other.compose(self)
    }

    /// The inverse transform, if the linear part is not singular.
    pub fn inverse(&self) -> Option<Transform> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON {
            return None;
        }
        let [[a, b, c], [d, e, f]] = self.matrix;
        let (ia, ib, id, ie) = (e / det, -b / det, -d / det, a / det);
        Some(Transform::from_matrix([
            [ia, ib, -(ia * c + ib * f)],
            [id, ie, -(id * c + ie * f)],
        ]))
    }

    pub fn apply_to<T: Transformable>(&self, value: T) -> T {
        value.transformed_by(self)
    }

    /// `self ∘ inner`: applies `inner` first.
    fn compose(&self, inner: &Transform) -> Transform {
        let m = &self.matrix;
        let o = &inner.matrix;
        let mut r = [[0.0; 3]; 2];
        for (row, out) in r.iter_mut().enumerate() {
            out[0] = m[row][0] * o[0][0] + m[row][1] * o[1][0];
            out[1] = m[row][0] * o[0][1] + m[row][1] * o[1][1];
            out[2] = m[row][0] * o[0][2] + m[row][1] * o[1][2] + m[row][2];
        }
        Transform::from_matrix(r)
    }

    fn map(&self, x: f64, y: f64) -> (f64, f64) {
        let [[a, b, c], [d, e, f]] = self.matrix;
        (a * x + b * y + c, d * x + e * y + f)
    }

    /// Element-wise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &Transform, tolerance: f64) -> bool {
        self.matrix
            .iter()
            .flatten()
            .zip(other.matrix.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transformable for Vector2 {
    fn transformed_by(self, t: &Transform) -> Self {
        let (x, y) = t.map(self.x, self.y);
        Vector2::new(x, y)
    }
}

impl Transformable for Point {
    fn transformed_by(self, t: &Transform) -> Self {
        let (x, y) = t.map(self.x, self.y);
        Point::new(x, y)
    }
}

impl Transformable for Transform {
    fn transformed_by(self, t: &Transform) -> Self {
        t.compose(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_point_eq(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn then_applies_left_transform_first() {
        let t = Transform::translate(Vector2::new(1.0, 0.0)).then(&Transform::scale(2.0));
        assert_point_eq(t.apply_to(Point::ORIGIN), Point::new(2.0, 0.0));

        let u = Transform::scale(2.0).then(&Transform::translate(Vector2::new(1.0, 0.0)));
        assert_point_eq(u.apply_to(Point::ORIGIN), Point::new(1.0, 0.0));
    }

    #[test]
    fn then_is_associative() {
        let a = Transform::rotate_deg_cc(30.0);
        let b = Transform::translate(Vector2::new(3.5, -1.25));
        let c = Transform::scale(0.4).then(&Transform::rotate_deg_cc(-75.0));

        let left = a.then(&b).then(&c);
        let right = a.then(&b.then(&c));
        assert!(left.approx_eq(&right, 1e-12), "{left:?} vs {right:?}");
    }

    #[test]
    fn rotation_turns_x_axis_upwards() {
        let p = Transform::rotate_deg_cc(90.0).apply_to(Point::new(1.0, 0.0));
        assert_point_eq(p, Point::new(0.0, -1.0));
    }

    #[test]
    fn determinant_tracks_scale() {
        assert!((Transform::scale(0.5).determinant() - 0.25).abs() < EPS);
        assert!((Transform::rotate_deg_cc(33.0).determinant() - 1.0).abs() < EPS);
    }

    #[test]
    fn inverse_round_trips_points() {
        let t = Transform::rotate_deg_cc(20.0)
            .then(&Transform::scale(3.0))
            .then(&Transform::translate(Vector2::new(-4.0, 9.0)));
        let inv = t.inverse().unwrap();
        let p = Point::new(1.5, -2.5);
        assert_point_eq(inv.apply_to(t.apply_to(p)), p);
        assert!(Transform::scale(0.0).inverse().is_none());
    }

    #[test]
    #[should_panic]
    fn non_finite_matrix_is_rejected() {
        Transform::from_matrix([[f64::NAN, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    }
}
