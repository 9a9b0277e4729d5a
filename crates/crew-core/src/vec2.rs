//! Planar vector type used for all world-space math.
//!
//! The map lives in "world pixels" — a flat 2-D plane with y growing
//! downward, matching the viewer's canvas space.  `f32` gives sub-pixel
//! precision across maps thousands of units wide while keeping agent state
//! compact.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A 2-D point or vector in world units.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` radians (0 = +x, counterclockwise
    /// in math terms; on-screen the y axis is flipped).
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        Self { x: angle.cos(), y: angle.sin() }
    }

    #[inline]
    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Squared distance — cheaper for radius comparisons.
    #[inline]
    pub fn distance_sq(self, other: Vec2) -> f32 {
        (other - self).length_sq()
    }

    #[inline]
    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unit-length copy, or `Vec2::ZERO` if the vector is (near) zero.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len <= f32::EPSILON {
            Vec2::ZERO
        } else {
            Vec2 { x: self.x / len, y: self.y / len }
        }
    }

    /// Copy scaled down to at most `max` length; shorter vectors pass through.
    pub fn clamp_length(self, max: f32) -> Vec2 {
        let len_sq = self.length_sq();
        if len_sq > max * max {
            let len = len_sq.sqrt();
            Vec2 { x: self.x / len * max, y: self.y / len * max }
        } else {
            self
        }
    }

    /// Linear interpolation from `self` to `other`; `t` is not clamped.
    #[inline]
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Heading angle in radians: `atan2(y, x)`.
    #[inline]
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2 { x: self.x * rhs, y: self.y * rhs }
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2 { x: -self.x, y: -self.y }
    }
}

impl std::fmt::Display for Vec2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}
