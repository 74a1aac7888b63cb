use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::{Aabb, Obb, Sphere};

/// A flat disk approximated by the intersection of a thin oriented box and a
/// sphere. Another shape touches the disk only when it touches both parts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    pub obb: Obb,
    pub sphere: Sphere,
}

impl Disk {
    pub fn new(obb: Obb, sphere: Sphere) -> Self {
        Self { obb, sphere }
    }

    pub fn at(&self, origin: DVec3) -> Self {
        Self {
            obb: self.obb.at(origin),
            sphere: self.sphere.at(origin),
        }
    }

    pub fn position(&self) -> DVec3 {
        self.sphere.center
    }

    pub fn contains(&self, point: DVec3) -> bool {
        self.obb.contains(point) && self.sphere.contains(point)
    }

    pub fn bounds(&self) -> Aabb {
        let a = self.obb.bounds();
        let b = self.sphere.bounds();
        Aabb {
            min: a.min.max(b.min),
            max: a.max.min(b.max),
        }
    }
}
