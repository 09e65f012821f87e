//! Three component vector used for positions, euler rotations, scales and colors.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// A 3D vector of `f32` components.
///
/// All operations return a new value; only [`Vector3::set`] mutates in place.
/// Equality (`==`) is exact floating point comparison, use
/// [`Vector3::approx_eq`] when a tolerance is needed.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);
    pub const ONE: Vector3 = Vector3::new(1.0, 1.0, 1.0);
    pub const UP: Vector3 = Vector3::new(0.0, 1.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Vector with all three components set to `value`
    pub const fn splat(value: f32) -> Self {
        Self::new(value, value, value)
    }

    pub fn add(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn subtract(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn multiply_scalar(self, scalar: f32) -> Vector3 {
        Vector3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }

    pub fn dot(self, other: Vector3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Right-handed cross product
    pub fn cross(self, other: Vector3) -> Vector3 {
        Vector3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn magnitude(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction.
    ///
    /// A zero-length vector normalizes to the zero vector.
    pub fn normalize(self) -> Vector3 {
        let magnitude = self.magnitude();
        if magnitude == 0.0 {
            return Vector3::ZERO;
        }
        self.multiply_scalar(1.0 / magnitude)
    }

    pub fn distance(self, other: Vector3) -> f32 {
        self.subtract(other).magnitude()
    }

    /// Exact component-wise equality
    pub fn equals(self, other: Vector3) -> bool {
        self == other
    }

    /// Component-wise comparison within `epsilon`
    pub fn approx_eq(self, other: Vector3, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.z - other.z).abs() <= epsilon
    }

    pub fn set(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::add(self, rhs)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        self.subtract(rhs)
    }
}

impl Mul<f32> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: f32) -> Vector3 {
        self.multiply_scalar(rhs)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Vector3 {
        self.multiply_scalar(-1.0)
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(v: [f32; 3]) -> Self {
        Vector3::new(v[0], v[1], v[2])
    }
}

impl From<Vector3> for [f32; 3] {
    fn from(v: Vector3) -> Self {
        v.to_array()
    }
}

impl From<cgmath::Vector3<f32>> for Vector3 {
    fn from(v: cgmath::Vector3<f32>) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

impl From<Vector3> for cgmath::Vector3<f32> {
    fn from(v: Vector3) -> Self {
        cgmath::Vector3::new(v.x, v.y, v.z)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector3({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;
    use rand::Rng;

    #[test]
    fn test_basic_arithmetic() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(4.0, -5.0, 6.0);

        assert_eq!(a + b, Vector3::new(5.0, -3.0, 9.0));
        assert_eq!(a - b, Vector3::new(-3.0, 7.0, -3.0));
        assert_eq!(a.multiply_scalar(2.0), Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(-a, Vector3::new(-1.0, -2.0, -3.0));
        assert_eq!(a.dot(b), 4.0 - 10.0 + 18.0);
    }

    #[test]
    fn test_cross_follows_right_hand_rule() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(y), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(y.cross(x), Vector3::new(0.0, 0.0, -1.0));

        let a = Vector3::new(1.5, -2.0, 0.25);
        let b = Vector3::new(-3.0, 0.5, 4.0);
        let expected: Vector3 = cgmath::Vector3::from(a).cross(b.into()).into();
        assert!(a.cross(b).approx_eq(expected, 1e-6));
    }

    #[test]
    fn test_magnitude_and_distance() {
        let v = Vector3::new(3.0, 4.0, 12.0);
        assert_eq!(v.magnitude(), 13.0);
        assert_eq!(Vector3::ZERO.distance(v), 13.0);
        assert_eq!(v.distance(v), 0.0);
    }

    #[test]
    fn test_normalize_zero_vector_is_zero() {
        let n = Vector3::ZERO.normalize();
        assert_eq!(n, Vector3::ZERO);
        assert!(!n.x.is_nan() && !n.y.is_nan() && !n.z.is_nan());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let v = Vector3::new(
                rng.random_range(-100.0..100.0),
                rng.random_range(-100.0..100.0),
                rng.random_range(-100.0..100.0),
            );
            let once = v.normalize();
            let twice = once.normalize();
            assert!(once.approx_eq(twice, 1e-5), "{} vs {}", once, twice);
            if v.magnitude() > 1e-3 {
                assert!((once.magnitude() - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_equals_is_exact() {
        let a = Vector3::new(0.1, 0.2, 0.3);
        assert!(a.equals(Vector3::new(0.1, 0.2, 0.3)));
        assert!(!a.equals(Vector3::new(0.1, 0.2, 0.3 + 1e-6)));
        assert!(a.approx_eq(Vector3::new(0.1, 0.2, 0.3 + 1e-6), 1e-5));
    }

    #[test]
    fn test_set_mutates_in_place() {
        let mut v = Vector3::ZERO;
        v.set(1.0, 2.0, 3.0).set(4.0, 5.0, 6.0);
        assert_eq!(v, Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(v.to_string(), "Vector3(4, 5, 6)");
    }
}
