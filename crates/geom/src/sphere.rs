use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::Aabb;

/// Sphere collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: DVec3,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self {
            center,
            radius: radius.abs(),
        }
    }

    /// Sphere of `radius` around the origin, meant to be placed with [`Sphere::at`].
    pub fn template(radius: f64) -> Self {
        Self::new(DVec3::ZERO, radius)
    }

    pub fn at(&self, origin: DVec3) -> Self {
        Self {
            center: self.center + origin,
            radius: self.radius,
        }
    }

    pub fn contains(&self, point: DVec3) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }

    pub fn intersects(&self, other: &Self) -> bool {
        let r = self.radius + other.radius;
        self.center.distance_squared(other.center) <= r * r
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extents(self.center, DVec3::splat(self.radius))
    }
}
