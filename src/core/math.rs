// Math utilities: rotations, rigid transforms and 2D cross products

use glam::Vec2;

/// 2D cross product of two vectors (returns the z component)
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a vector and a scalar: `v x s`
#[inline]
pub fn cross_vs(v: Vec2, s: f32) -> Vec2 {
    Vec2::new(s * v.y, -s * v.x)
}

/// Cross product of a scalar and a vector: `s x v`
#[inline]
pub fn cross_sv(s: f32, v: Vec2) -> Vec2 {
    Vec2::new(-s * v.y, s * v.x)
}

/// Check that both components of a vector are finite
#[inline]
pub fn is_finite_vec(v: Vec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

/// Rotation stored as a sine/cosine pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rot {
    pub s: f32,
    pub c: f32,
}

impl Rot {
    pub const IDENTITY: Self = Self { s: 0.0, c: 1.0 };

    /// Create a rotation from an angle in radians
    pub fn new(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self { s, c }
    }

    /// Angle in radians
    pub fn angle(&self) -> f32 {
        self.s.atan2(self.c)
    }

    /// Rotate a vector
    #[inline]
    pub fn apply(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Inverse-rotate a vector
    #[inline]
    pub fn apply_inv(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }

    /// `transpose(self) * other`
    pub fn mul_t(&self, other: Rot) -> Rot {
        Rot {
            s: self.c * other.s - self.s * other.c,
            c: self.c * other.c + self.s * other.s,
        }
    }
}

impl Default for Rot {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rigid transform: translation followed by rotation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub p: Vec2,
    pub q: Rot,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        p: Vec2::ZERO,
        q: Rot::IDENTITY,
    };

    pub fn new(p: Vec2, angle: f32) -> Self {
        Self { p, q: Rot::new(angle) }
    }

    /// Transform a point from local to world space
    #[inline]
    pub fn apply(&self, v: Vec2) -> Vec2 {
        self.q.apply(v) + self.p
    }

    /// Transform a point from world to local space
    #[inline]
    pub fn apply_inv(&self, v: Vec2) -> Vec2 {
        self.q.apply_inv(v - self.p)
    }

    /// `inverse(self) * other`, mapping other's local frame into self's local frame
    pub fn mul_t(&self, other: &Transform) -> Transform {
        Transform {
            p: self.q.apply_inv(other.p - self.p),
            q: self.q.mul_t(other.q),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_cross_products() {
        let a = Vec2::new(1.0, 0.0);
        let b = Vec2::new(0.0, 1.0);
        assert_eq!(cross(a, b), 1.0);
        assert_eq!(cross(b, a), -1.0);
        assert_eq!(cross_vs(a, 1.0), Vec2::new(0.0, -1.0));
        assert_eq!(cross_sv(1.0, a), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_rot_roundtrip() {
        let q = Rot::new(0.7);
        let v = Vec2::new(3.0, -2.0);
        let back = q.apply_inv(q.apply(v));
        assert_abs_diff_eq!(back.x, v.x, epsilon = 1e-5);
        assert_abs_diff_eq!(back.y, v.y, epsilon = 1e-5);
        assert_abs_diff_eq!(q.angle(), 0.7, epsilon = 1e-6);
    }

    #[test]
    fn test_quarter_turn() {
        let q = Rot::new(FRAC_PI_2);
        let v = q.apply(Vec2::X);
        assert_abs_diff_eq!(v.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(v.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_transform_mul_t() {
        let a = Transform::new(Vec2::new(1.0, 2.0), 0.3);
        let b = Transform::new(Vec2::new(-4.0, 0.5), -1.1);
        let rel = a.mul_t(&b);
        let p = Vec2::new(0.25, 0.75);
        // b-local -> world -> a-local must match rel applied directly
        let expected = a.apply_inv(b.apply(p));
        let got = rel.apply(p);
        assert_abs_diff_eq!(got.x, expected.x, epsilon = 1e-5);
        assert_abs_diff_eq!(got.y, expected.y, epsilon = 1e-5);
    }

    #[test]
    fn test_finite_check() {
        assert!(is_finite_vec(Vec2::new(1.0, 2.0)));
        assert!(!is_finite_vec(Vec2::new(f32::NAN, 2.0)));
        assert!(!is_finite_vec(Vec2::new(0.0, f32::INFINITY)));
    }
}
