use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::{Aabb, Disk, Obb, Ray, Sphere};

/// Any shape an ability can present for a single tick's collision test.
///
/// `Dummy` stands in for degenerate volumes (e.g. a non-collidable block) and
/// never intersects anything, so callers can keep it in a collider list
/// without special casing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Collider {
    Aabb(Aabb),
    Obb(Obb),
    Sphere(Sphere),
    Disk(Disk),
    Ray(Ray),
    Dummy,
}

impl Collider {
    pub fn is_dummy(&self) -> bool {
        match self {
            Collider::Dummy => true,
            Collider::Aabb(a) => a.is_dummy(),
            Collider::Obb(o) => o.is_dummy(),
            Collider::Disk(d) => d.obb.is_dummy(),
            Collider::Sphere(_) | Collider::Ray(_) => false,
        }
    }

    /// Reference point of the shape: box/sphere center, ray origin.
    pub fn position(&self) -> DVec3 {
        match self {
            Collider::Aabb(a) => a.center(),
            Collider::Obb(o) => o.center,
            Collider::Sphere(s) => s.center,
            Collider::Disk(d) => d.position(),
            Collider::Ray(r) => r.origin,
            Collider::Dummy => DVec3::ZERO,
        }
    }

    /// Translates a template collider to `origin`.
    pub fn at(&self, origin: DVec3) -> Self {
        match self {
            Collider::Aabb(a) => Collider::Aabb(a.at(origin)),
            Collider::Obb(o) => Collider::Obb(o.at(origin)),
            Collider::Sphere(s) => Collider::Sphere(s.at(origin)),
            Collider::Disk(d) => Collider::Disk(d.at(origin)),
            Collider::Ray(r) => Collider::Ray(r.at(origin)),
            Collider::Dummy => Collider::Dummy,
        }
    }

    /// Outer axis-aligned bounds, used by the broad phase.
    pub fn bounds(&self) -> Aabb {
        match self {
            Collider::Aabb(a) => *a,
            Collider::Obb(o) => o.bounds(),
            Collider::Sphere(s) => s.bounds(),
            Collider::Disk(d) => d.bounds(),
            Collider::Ray(r) => r.bounds(),
            Collider::Dummy => Aabb::DUMMY,
        }
    }

    pub fn contains(&self, point: DVec3) -> bool {
        match self {
            Collider::Aabb(a) => a.contains(point),
            Collider::Obb(o) => o.contains(point),
            Collider::Sphere(s) => s.contains(point),
            Collider::Disk(d) => d.contains(point),
            Collider::Ray(r) => r.point_at(r.closest_parameter(point)).distance_squared(point) <= 1e-12,
            Collider::Dummy => false,
        }
    }

    /// Narrow-phase test for every supported shape pair.
    pub fn intersects(&self, other: &Collider) -> bool {
        use Collider as C;
        match (self, other) {
            (C::Dummy, _) | (_, C::Dummy) => false,
            (C::Disk(d), o) | (o, C::Disk(d)) => {
                C::Obb(d.obb).intersects(o) && C::Sphere(d.sphere).intersects(o)
            }
            (C::Aabb(a), C::Aabb(b)) => a.intersects(b),
            (C::Aabb(a), C::Sphere(s)) | (C::Sphere(s), C::Aabb(a)) => a.intersects_sphere(s),
            (C::Aabb(a), C::Obb(o)) | (C::Obb(o), C::Aabb(a)) => o.intersects_aabb(a),
            (C::Aabb(a), C::Ray(r)) | (C::Ray(r), C::Aabb(a)) => r.intersects_aabb(a),
            (C::Sphere(a), C::Sphere(b)) => a.intersects(b),
            (C::Sphere(s), C::Obb(o)) | (C::Obb(o), C::Sphere(s)) => o.intersects_sphere(s),
            (C::Sphere(s), C::Ray(r)) | (C::Ray(r), C::Sphere(s)) => r.intersects_sphere(s),
            (C::Obb(a), C::Obb(b)) => a.intersects(b),
            (C::Obb(o), C::Ray(r)) | (C::Ray(r), C::Obb(o)) => r.intersects_obb(o),
            (C::Ray(a), C::Ray(b)) => a.intersects_ray(b),
        }
    }
}

impl From<Aabb> for Collider {
    fn from(aabb: Aabb) -> Self {
        if aabb.is_dummy() {
            Collider::Dummy
        } else {
            Collider::Aabb(aabb)
        }
    }
}

impl From<Obb> for Collider {
    fn from(obb: Obb) -> Self {
        Collider::Obb(obb)
    }
}

impl From<Sphere> for Collider {
    fn from(sphere: Sphere) -> Self {
        Collider::Sphere(sphere)
    }
}

impl From<Disk> for Collider {
    fn from(disk: Disk) -> Self {
        Collider::Disk(disk)
    }
}

impl From<Ray> for Collider {
    fn from(ray: Ray) -> Self {
        Collider::Ray(ray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_aabb_becomes_dummy() {
        let c = Collider::from(Aabb::DUMMY);
        assert_eq!(c, Collider::Dummy);
        assert!(c.is_dummy());
        assert!(!c.intersects(&Collider::from(Sphere::new(DVec3::ZERO, 100.0))));
    }

    #[test]
    fn dispatch_is_symmetric() {
        let shapes = [
            Collider::from(Aabb::block(0, 0, 0)),
            Collider::from(Sphere::new(DVec3::new(0.5, 1.2, 0.5), 0.5)),
            Collider::from(Obb::from(Aabb::block(0, 1, 0))),
            Collider::from(Ray::new(DVec3::new(0.5, -3.0, 0.5), DVec3::new(0.0, 10.0, 0.0))),
        ];
        for a in &shapes {
            for b in &shapes {
                assert_eq!(a.intersects(b), b.intersects(a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn at_translates_every_shape() {
        let offset = DVec3::new(3.0, 0.0, 0.0);
        let c = Collider::from(Sphere::template(1.0)).at(offset);
        assert_eq!(c.position(), offset);
        let r = Collider::from(Ray::new(DVec3::ZERO, DVec3::X)).at(offset);
        assert_eq!(r.position(), offset);
    }
}
