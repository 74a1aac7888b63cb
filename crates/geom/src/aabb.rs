use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::Sphere;

/// Axis-aligned bounding box in world coordinates.
///
/// Invariants:
/// - `min` components are less than or equal to `max` components.
/// - A box with zero extent on any axis is degenerate and never intersects
///   anything (see [`Aabb::DUMMY`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Zero-volume placeholder used for non-collidable blocks.
    pub const DUMMY: Aabb = Aabb {
        min: DVec3::ZERO,
        max: DVec3::ZERO,
    };

    /// Constructs a box from two opposite corners in any order.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Builds a box centered at `center` with the given half extents.
    pub fn from_center_half_extents(center: DVec3, half: DVec3) -> Self {
        let half = half.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// The unit cube occupying block coordinates `(x, y, z)`.
    pub fn block(x: i32, y: i32, z: i32) -> Self {
        let min = DVec3::new(f64::from(x), f64::from(y), f64::from(z));
        Self {
            min,
            max: min + DVec3::ONE,
        }
    }

    /// Bounding volume around the segment `origin..origin + direction`,
    /// padded by `radius` on every side. Used for look-ahead entity sweeps.
    pub fn from_ray(origin: DVec3, direction: DVec3, radius: f64) -> Self {
        let end = origin + direction;
        let pad = DVec3::splat(radius.abs());
        Self {
            min: origin.min(end) - pad,
            max: origin.max(end) + pad,
        }
    }

    /// Whether this box has no volume and therefore never collides.
    pub fn is_dummy(&self) -> bool {
        let size = self.max - self.min;
        size.x <= 0.0 || size.y <= 0.0 || size.z <= 0.0
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> DVec3 {
        (self.max - self.min) * 0.5
    }

    pub fn volume(&self) -> f64 {
        let size = self.max - self.min;
        size.x * size.y * size.z
    }

    /// Inflates the box by `margin` on each axis (both sides).
    pub fn grow(&self, margin: DVec3) -> Self {
        let margin = margin.abs();
        Self {
            min: self.min - margin,
            max: self.max + margin,
        }
    }

    /// Inflates the box by a uniform margin in all directions.
    pub fn grow_uniform(&self, margin: f64) -> Self {
        self.grow(DVec3::splat(margin))
    }

    /// Translates a template box (defined relative to the origin) to `origin`.
    pub fn at(&self, origin: DVec3) -> Self {
        Self {
            min: self.min + origin,
            max: self.max + origin,
        }
    }

    /// Smallest box containing both boxes. Degenerate inputs are ignored.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_dummy() {
            return *other;
        }
        if other.is_dummy() {
            return *self;
        }
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Inclusive point containment.
    pub fn contains(&self, point: DVec3) -> bool {
        !self.is_dummy() && point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Closest point inside the box to `point`.
    pub fn closest_point(&self, point: DVec3) -> DVec3 {
        point.clamp(self.min, self.max)
    }

    /// Returns `true` if this box overlaps another (inclusive on faces).
    pub fn intersects(&self, other: &Self) -> bool {
        if self.is_dummy() || other.is_dummy() {
            return false;
        }
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y
            || self.max.z < other.min.z
            || self.min.z > other.max.z)
    }

    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        if self.is_dummy() {
            return false;
        }
        let closest = self.closest_point(sphere.center);
        closest.distance_squared(sphere.center) <= sphere.radius * sphere.radius
    }
}
