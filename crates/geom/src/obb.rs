use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::{Aabb, Sphere};

const SAT_EPSILON: f64 = 1e-9;

/// Oriented bounding box: a center, three orthonormal axes and the half
/// extent along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obb {
    pub center: DVec3,
    pub axes: [DVec3; 3],
    pub extents: DVec3,
}

impl Obb {
    /// Rotates `aabb` about the world origin by `rotation`.
    ///
    /// Templates are usually centered on the origin, so this only spins the
    /// box in place before it is moved with [`Obb::at`].
    pub fn new(aabb: Aabb, rotation: DQuat) -> Self {
        Self {
            center: rotation * aabb.center(),
            axes: [rotation * DVec3::X, rotation * DVec3::Y, rotation * DVec3::Z],
            extents: aabb.half_extents(),
        }
    }

    pub fn at(&self, origin: DVec3) -> Self {
        Self {
            center: self.center + origin,
            ..*self
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.extents.x <= 0.0 || self.extents.y <= 0.0 || self.extents.z <= 0.0
    }

    /// Expresses a world-space point in the box's local frame.
    pub fn to_local(&self, point: DVec3) -> DVec3 {
        let d = point - self.center;
        DVec3::new(d.dot(self.axes[0]), d.dot(self.axes[1]), d.dot(self.axes[2]))
    }

    /// Expresses a world-space direction in the box's local frame.
    pub fn to_local_direction(&self, dir: DVec3) -> DVec3 {
        DVec3::new(dir.dot(self.axes[0]), dir.dot(self.axes[1]), dir.dot(self.axes[2]))
    }

    pub fn closest_point(&self, point: DVec3) -> DVec3 {
        let local = self.to_local(point).clamp(-self.extents, self.extents);
        self.center + self.axes[0] * local.x + self.axes[1] * local.y + self.axes[2] * local.z
    }

    pub fn contains(&self, point: DVec3) -> bool {
        let local = self.to_local(point).abs();
        local.cmple(self.extents).all()
    }

    /// Outer axis-aligned bounds of the rotated box.
    pub fn bounds(&self) -> Aabb {
        let half = self.axes[0].abs() * self.extents.x
            + self.axes[1].abs() * self.extents.y
            + self.axes[2].abs() * self.extents.z;
        Aabb::from_center_half_extents(self.center, half)
    }

    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        if self.is_dummy() {
            return false;
        }
        let closest = self.closest_point(sphere.center);
        closest.distance_squared(sphere.center) <= sphere.radius * sphere.radius
    }

    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        if aabb.is_dummy() {
            return false;
        }
        self.intersects(&Obb::from(*aabb))
    }

    /// Separating axis test over the 15 candidate axes.
    pub fn intersects(&self, other: &Self) -> bool {
        if self.is_dummy() || other.is_dummy() {
            return false;
        }
        let a = self.extents.to_array();
        let b = other.extents.to_array();

        let mut r = [[0.0f64; 3]; 3];
        let mut abs_r = [[0.0f64; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                r[i][j] = self.axes[i].dot(other.axes[j]);
                abs_r[i][j] = r[i][j].abs() + SAT_EPSILON;
            }
        }

        let d = other.center - self.center;
        let t = [d.dot(self.axes[0]), d.dot(self.axes[1]), d.dot(self.axes[2])];

        // Face axes of self.
        for i in 0..3 {
            let rb = b[0] * abs_r[i][0] + b[1] * abs_r[i][1] + b[2] * abs_r[i][2];
            if t[i].abs() > a[i] + rb {
                return false;
            }
        }

        // Face axes of other.
        for j in 0..3 {
            let ra = a[0] * abs_r[0][j] + a[1] * abs_r[1][j] + a[2] * abs_r[2][j];
            let tj = t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j];
            if tj.abs() > ra + b[j] {
                return false;
            }
        }

        // Edge cross products.
        for i in 0..3 {
            let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
            for j in 0..3 {
                let (j1, j2) = ((j + 1) % 3, (j + 2) % 3);
                let ra = a[i1] * abs_r[i2][j] + a[i2] * abs_r[i1][j];
                let rb = b[j1] * abs_r[i][j2] + b[j2] * abs_r[i][j1];
                let tl = t[i2] * r[i1][j] - t[i1] * r[i2][j];
                if tl.abs() > ra + rb {
                    return false;
                }
            }
        }
        true
    }
}

impl From<Aabb> for Obb {
    fn from(aabb: Aabb) -> Self {
        Self {
            center: aabb.center(),
            axes: [DVec3::X, DVec3::Y, DVec3::Z],
            extents: aabb.half_extents(),
        }
    }
}
