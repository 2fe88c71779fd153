//! 2-D vector algebra for the layout simulation.
//!
//! `Vector` is an immutable `Copy` value type. All degenerate cases are
//! defined rather than fallible: dividing by zero and normalizing the zero
//! vector both yield the zero vector, because colocated points are a
//! legitimate transient state of the simulation and must never produce NaN.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An immutable 2-D vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
}

impl Vector {
    /// The zero vector.
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    /// Create a vector from components.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// A vector with both components uniformly sampled in `[-extent, extent]`.
    ///
    /// Used for initial random placement of points.
    pub fn random(extent: f32) -> Self {
        let mut rng = rand::rng();
        Self {
            x: rng.random_range(-extent..=extent),
            y: rng.random_range(-extent..=extent),
        }
    }

    /// Euclidean length.
    #[inline]
    pub fn magnitude(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Squared Euclidean length. Avoids the sqrt when only comparing.
    #[inline]
    pub fn magnitude_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// The perpendicular vector, rotated +90 degrees.
    #[inline]
    pub fn normal(self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }

    /// The unit vector in this direction. The zero vector normalizes to
    /// itself.
    #[inline]
    pub fn normalize(self) -> Self {
        self / self.magnitude()
    }
}

impl Add for Vector {
    type Output = Vector;

    #[inline]
    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector {
    #[inline]
    fn add_assign(&mut self, rhs: Vector) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector {
    type Output = Vector;

    #[inline]
    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vector {
    type Output = Vector;

    #[inline]
    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y)
    }
}

impl Mul<f32> for Vector {
    type Output = Vector;

    #[inline]
    fn mul(self, rhs: f32) -> Vector {
        Vector::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vector {
    type Output = Vector;

    /// Scalar division. Dividing by zero yields the zero vector.
    #[inline]
    fn div(self, rhs: f32) -> Vector {
        if rhs == 0.0 {
            Vector::ZERO
        } else {
            Vector::new(self.x / rhs, self.y / rhs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Vector::new(1.0, 2.0);
        let b = Vector::new(3.0, -1.0);

        assert_eq!(a + b, Vector::new(4.0, 1.0));
        assert_eq!(a - b, Vector::new(-2.0, 3.0));
        assert_eq!(a * 2.0, Vector::new(2.0, 4.0));
        assert_eq!(b / 2.0, Vector::new(1.5, -0.5));
        assert_eq!(-a, Vector::new(-1.0, -2.0));
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(Vector::new(3.0, 4.0).magnitude(), 5.0);
        assert_eq!(Vector::ZERO.magnitude(), 0.0);
        assert_eq!(Vector::new(3.0, 4.0).magnitude_squared(), 25.0);
    }

    #[test]
    fn test_normal_is_perpendicular() {
        let v = Vector::new(2.0, 1.0);
        let n = v.normal();

        assert_eq!(n, Vector::new(-1.0, 2.0));
        // Dot product with the original must be zero
        assert_eq!(v.x * n.x + v.y * n.y, 0.0);
    }

    #[test]
    fn test_normalize() {
        let v = Vector::new(3.0, 4.0).normalize();
        assert!((v.magnitude() - 1.0).abs() < 1e-6);
        assert!((v.x - 0.6).abs() < 1e-6);
        assert!((v.y - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_stays_zero() {
        // Normalizing or dividing the zero vector must not produce NaN
        let z = Vector::ZERO;
        assert_eq!(z.normalize(), Vector::ZERO);
        assert_eq!(z / 0.0, Vector::ZERO);
        assert_eq!(Vector::new(1.0, 1.0) / 0.0, Vector::ZERO);

        let n = z.normalize();
        assert!(!n.x.is_nan());
        assert!(!n.y.is_nan());
    }

    #[test]
    fn test_random_within_extent() {
        for _ in 0..100 {
            let v = Vector::random(5.0);
            assert!(v.x >= -5.0 && v.x <= 5.0);
            assert!(v.y >= -5.0 && v.y <= 5.0);
        }
    }
}
