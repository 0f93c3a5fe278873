//! Planar geometry for docking placement.
//!
//! Structures live on a single 2D plane. Positions are meters, angles are
//! radians measured counter-clockwise from +X.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Tolerance used when comparing angles.
pub const ANGLE_TOLERANCE: f64 = 1e-6;

/// 2D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(&self, other: &Self) -> f64 {
        (*self - *other).length()
    }

    /// Rotate counter-clockwise about the origin.
    pub fn rotated(&self, angle: Angle) -> Self {
        let (sin, cos) = angle.0.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Rotation in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Angle(pub f64);

impl Angle {
    pub const ZERO: Self = Self(0.0);
    pub const EAST: Self = Self(0.0);
    pub const NORTH: Self = Self(FRAC_PI_2);
    pub const WEST: Self = Self(PI);
    pub const SOUTH: Self = Self(-FRAC_PI_2);

    pub fn from_degrees(degrees: f64) -> Self {
        Self(degrees.to_radians())
    }

    /// Wrap into `(-PI, PI]`.
    pub fn normalized(self) -> Self {
        let mut a = self.0 % TAU;
        if a <= -PI {
            a += TAU;
        } else if a > PI {
            a -= TAU;
        }
        Self(a)
    }

    pub fn inverse(self) -> Self {
        Self(-self.0)
    }

    /// The opposite facing.
    pub fn flipped(self) -> Self {
        Self(self.0 + PI).normalized()
    }

    /// Whether this angle points along one of the four axes.
    pub fn is_cardinal(self) -> bool {
        let quarter = self.0 / FRAC_PI_2;
        (quarter - quarter.round()).abs() * FRAC_PI_2 <= ANGLE_TOLERANCE
    }

    pub fn approx_eq(self, other: Self) -> bool {
        (self - other).normalized().0.abs() <= ANGLE_TOLERANCE
    }
}

impl std::ops::Add for Angle {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl std::ops::Sub for Angle {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

/// Rigid placement: rotate about the local origin, then translate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform2 {
    pub position: Vec2,
    pub rotation: Angle,
}

impl Transform2 {
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: Angle::ZERO,
    };

    pub fn new(position: Vec2, rotation: Angle) -> Self {
        Self { position, rotation }
    }

    pub fn at(x: f64, y: f64) -> Self {
        Self::new(Vec2::new(x, y), Angle::ZERO)
    }

    /// Local point to world point.
    pub fn apply(&self, local: Vec2) -> Vec2 {
        local.rotated(self.rotation) + self.position
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            position: (-self.position).rotated(rotation),
            rotation,
        }
    }

    /// `self` applied after `inner`.
    pub fn compose(&self, inner: &Self) -> Self {
        Self {
            position: self.apply(inner.position),
            rotation: (self.rotation + inner.rotation).normalized(),
        }
    }
}

/// Axis-aligned box
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box of the given size centered on the origin.
    pub fn centered(width: f64, height: f64) -> Self {
        Self {
            min: Vec2::new(-width / 2.0, -height / 2.0),
            max: Vec2::new(width / 2.0, height / 2.0),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Shrink every side by `amount`, never past the center.
    pub fn shrunk(&self, amount: f64) -> Self {
        let c = self.center();
        Self {
            min: Vec2::new((self.min.x + amount).min(c.x), (self.min.y + amount).min(c.y)),
            max: Vec2::new((self.max.x - amount).max(c.x), (self.max.y - amount).max(c.y)),
        }
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Place this local box in the world.
    pub fn transformed(&self, transform: &Transform2) -> OrientedBox {
        OrientedBox {
            corners: self.corners().map(|c| transform.apply(c)),
        }
    }

    /// World-space bounds of this local box under `transform`.
    pub fn world_bounds(&self, transform: &Transform2) -> Self {
        self.transformed(transform).bounds()
    }

    /// Strict overlap: boxes that only share an edge do not overlap.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// A rectangle in world space, possibly rotated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    /// Corners in winding order.
    pub corners: [Vec2; 4],
}

impl OrientedBox {
    pub fn bounds(&self) -> Aabb {
        let mut min = self.corners[0];
        let mut max = self.corners[0];
        for c in &self.corners[1..] {
            min.x = min.x.min(c.x);
            min.y = min.y.min(c.y);
            max.x = max.x.max(c.x);
            max.y = max.y.max(c.y);
        }
        Aabb::new(min, max)
    }

    fn axes(&self) -> [Vec2; 2] {
        let e0 = self.corners[1] - self.corners[0];
        let e1 = self.corners[3] - self.corners[0];
        [Vec2::new(-e0.y, e0.x), Vec2::new(-e1.y, e1.x)]
    }

    fn project(&self, axis: &Vec2) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for c in &self.corners {
            let p = c.dot(axis);
            lo = lo.min(p);
            hi = hi.max(p);
        }
        (lo, hi)
    }

    /// Separating-axis test. Touching edges do not count as overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        for axis in self.axes().iter().chain(other.axes().iter()) {
            if axis.length() == 0.0 {
                continue;
            }
            let (a_lo, a_hi) = self.project(axis);
            let (b_lo, b_hi) = other.project(axis);
            if a_hi <= b_lo || b_hi <= a_lo {
                return false;
            }
        }
        true
    }

    pub fn overlaps_aabb(&self, other: &Aabb) -> bool {
        self.overlaps(&other.transformed(&Transform2::IDENTITY))
    }
}
