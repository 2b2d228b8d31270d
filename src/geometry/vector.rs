use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A 2D displacement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalize(&self) -> Vector2 {
        let m = self.magnitude();
        if m == 0.0 {
            return *self;
        }
        Vector2::new(self.x / m, self.y / m)
    }

    /// Rotates by 90 degrees counter-clockwise as seen on a Y-down page.
    pub fn rotate90deg_cc(&self) -> Vector2 {
        Vector2::new(self.y, -self.x)
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Vector2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;
    fn mul(self, rhs: f64) -> Vector2 {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector2 {
    type Output = Vector2;
    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

/// A 2D position. Differs from [`Vector2`] only in the arithmetic it allows.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_origin_vector(v: Vector2) -> Self {
        Self { x: v.x, y: v.y }
    }

    /// Vector from the origin to this point.
    pub fn vector(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (*other - *self).magnitude()
    }
}

impl Add<Vector2> for Point {
    type Output = Point;
    fn add(self, rhs: Vector2) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub<Vector2> for Point {
    type Output = Point;
    fn sub(self, rhs: Vector2) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Sub for Point {
    type Output = Vector2;
    fn sub(self, rhs: Point) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_by_ninety_degrees_is_perpendicular() {
        let v = Vector2::new(3.0, 4.0);
        let r = v.rotate90deg_cc();
        assert_eq!(v.x * r.x + v.y * r.y, 0.0);
        assert_eq!(r.magnitude(), 5.0);
    }

    #[test]
    fn point_difference_is_a_vector() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);
        assert_eq!(b - a, Vector2::new(3.0, 4.0));
        assert_eq!(a + (b - a), b);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn normalizing_zero_keeps_zero() {
        assert_eq!(Vector2::ZERO.normalize(), Vector2::ZERO);
        let n = Vector2::new(0.0, -2.0).normalize();
        assert_eq!(n, Vector2::new(0.0, -1.0));
    }
}
