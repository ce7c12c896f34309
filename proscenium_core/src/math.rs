// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal 3-D vector, unit quaternion, and RGBA color types.
//!
//! These cover the subset of math that the update core actually needs
//! (component arithmetic, quaternion rotation, blending, clamping) without
//! pulling in a full linear-algebra crate. 2-D types at the hit-test and
//! viewport boundary come from [`kurbo`].

use core::ops::{Add, Mul, Sub};

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A 3-component vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vector3 {
    /// The zero vector.
    pub const ZERO: Self = Self::splat(0.0);

    /// The all-ones vector.
    pub const ONE: Self = Self::splat(1.0);

    /// The center point in relative coordinates (0.5, 0.5, 0.5).
    ///
    /// Default value for both parent-origin and anchor-point.
    pub const CENTER: Self = Self::splat(0.5);

    /// Creates a vector from components.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Creates a vector with all components set to `v`.
    #[inline]
    #[must_use]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Component-wise product.
    #[inline]
    #[must_use]
    pub fn mul_elem(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }

    /// Linear interpolation from `a` to `b` by `t` (not clamped).
    #[inline]
    #[must_use]
    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        a + (b - a) * t
    }

    /// Is every component [finite](f32::is_finite)?
    #[inline]
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vector3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vector3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A rotation expressed as a unit quaternion.
///
/// Constructors produce normalized quaternions; composition via `Mul` keeps
/// them normalized up to float error. Blending renormalizes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    /// Vector part, x.
    pub x: f32,
    /// Vector part, y.
    pub y: f32,
    /// Vector part, z.
    pub z: f32,
    /// Scalar part.
    pub w: f32,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Creates a rotation of `radians` around `axis`.
    ///
    /// `axis` does not need to be normalized; a zero axis yields the
    /// identity rotation.
    #[must_use]
    pub fn from_axis_angle(axis: Vector3, radians: f32) -> Self {
        let len = (axis.x * axis.x + axis.y * axis.y + axis.z * axis.z).sqrt();
        if len == 0.0 {
            return Self::IDENTITY;
        }
        let half = radians * 0.5;
        let s = half.sin() / len;
        Self {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: half.cos(),
        }
    }

    /// Rotates a vector by this quaternion.
    #[must_use]
    pub fn rotate(self, v: Vector3) -> Vector3 {
        // v' = v + 2w(q × v) + 2(q × (q × v))
        let qv = Vector3::new(self.x, self.y, self.z);
        let uv = cross(qv, v);
        let uuv = cross(qv, uv);
        v + (uv * (2.0 * self.w)) + (uuv * 2.0)
    }

    /// Returns this quaternion scaled to unit length.
    ///
    /// A zero quaternion normalizes to the identity.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len =
            (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if len == 0.0 {
            return Self::IDENTITY;
        }
        let inv = 1.0 / len;
        Self {
            x: self.x * inv,
            y: self.y * inv,
            z: self.z * inv,
            w: self.w * inv,
        }
    }

    /// Normalized linear interpolation from `a` to `b` by `t`, taking the
    /// shorter arc.
    #[must_use]
    pub fn nlerp(a: Self, b: Self, t: f32) -> Self {
        let dot = a.x * b.x + a.y * b.y + a.z * b.z + a.w * b.w;
        let sign = if dot < 0.0 { -1.0 } else { 1.0 };
        Self {
            x: a.x + (b.x * sign - a.x) * t,
            y: a.y + (b.y * sign - a.y) * t,
            z: a.z + (b.z * sign - a.z) * t,
            w: a.w + (b.w * sign - a.w) * t,
        }
        .normalized()
    }

    /// Is every component [finite](f32::is_finite)?
    #[inline]
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Default for Quaternion {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Quaternion {
    type Output = Self;

    /// Hamilton product: `self * rhs` applies `rhs` first, then `self`.
    fn mul(self, rhs: Self) -> Self {
        Self {
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }
}

#[inline]
fn cross(a: Vector3, b: Vector3) -> Vector3 {
    Vector3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

/// An RGBA color with `f32` channels.
///
/// Local (per-node) colors are never clamped, so repeated relative deltas
/// can leave `[0, 1]`. World colors produced by composition are clamped via
/// [`clamped`](Self::clamped).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

impl Color {
    /// Opaque white, the default node color.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a color from channels.
    #[inline]
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Component-wise product.
    #[inline]
    #[must_use]
    pub fn mul_elem(self, rhs: Self) -> Self {
        Self::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b, self.a * rhs.a)
    }

    /// Returns the color with every channel clamped to `[0, 1]`.
    #[inline]
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
    }

    /// Linear interpolation from `a` to `b` by `t` (not clamped).
    #[inline]
    #[must_use]
    pub fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self::new(
            a.r + (b.r - a.r) * t,
            a.g + (b.g - a.g) * t,
            a.b + (b.b - a.b) * t,
            a.a + (b.a - a.a) * t,
        )
    }
}

impl Default for Color {
    #[inline]
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn vec_close(a: Vector3, b: Vector3) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS && (a.z - b.z).abs() < EPS
    }

    #[test]
    fn vector_arithmetic() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vector3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vector3::new(3.0, 3.0, 3.0));
        assert_eq!(a * 2.0, Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(a.mul_elem(b), Vector3::new(4.0, 10.0, 18.0));
    }

    #[test]
    fn vector_lerp_endpoints() {
        let a = Vector3::ZERO;
        let b = Vector3::new(10.0, -10.0, 4.0);
        assert_eq!(Vector3::lerp(a, b, 0.0), a);
        assert_eq!(Vector3::lerp(a, b, 1.0), b);
        assert_eq!(Vector3::lerp(a, b, 0.5), Vector3::new(5.0, -5.0, 2.0));
    }

    #[test]
    fn identity_rotation_is_noop() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert!(vec_close(Quaternion::IDENTITY.rotate(v), v));
    }

    #[test]
    fn quarter_turn_around_z() {
        let q = Quaternion::from_axis_angle(
            Vector3::new(0.0, 0.0, 1.0),
            core::f32::consts::FRAC_PI_2,
        );
        let v = q.rotate(Vector3::new(1.0, 0.0, 0.0));
        assert!(vec_close(v, Vector3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn composed_rotations_accumulate() {
        let axis = Vector3::new(0.0, 0.0, 1.0);
        let quarter = Quaternion::from_axis_angle(axis, core::f32::consts::FRAC_PI_2);
        let half = Quaternion::from_axis_angle(axis, core::f32::consts::PI);
        let composed = quarter * quarter;
        let v = Vector3::new(1.0, 0.0, 0.0);
        assert!(vec_close(composed.rotate(v), half.rotate(v)));
    }

    #[test]
    fn zero_axis_yields_identity() {
        let q = Quaternion::from_axis_angle(Vector3::ZERO, 1.0);
        assert_eq!(q, Quaternion::IDENTITY);
    }

    #[test]
    fn nlerp_endpoints() {
        let a = Quaternion::IDENTITY;
        let b = Quaternion::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), 1.0);
        let at_zero = Quaternion::nlerp(a, b, 0.0);
        let at_one = Quaternion::nlerp(a, b, 1.0);
        assert!((at_zero.w - a.w).abs() < EPS);
        assert!((at_one.w - b.w).abs() < EPS);
        assert!((at_one.y - b.y).abs() < EPS);
    }

    #[test]
    fn color_clamp_only_affects_out_of_range() {
        let c = Color::new(1.5, -0.25, 0.5, 2.0);
        assert_eq!(c.clamped(), Color::new(1.0, 0.0, 0.5, 1.0));
        let in_range = Color::new(0.25, 0.5, 0.75, 1.0);
        assert_eq!(in_range.clamped(), in_range);
    }

    #[test]
    fn color_multiply() {
        let a = Color::new(1.0, 0.5, 0.0, 0.8);
        let b = Color::new(0.5, 0.5, 1.0, 0.5);
        assert_eq!(a.mul_elem(b), Color::new(0.5, 0.25, 0.0, 0.4));
    }
}
