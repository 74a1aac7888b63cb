use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::{Aabb, Obb, Sphere};

/// Two rays closer than this are considered touching.
pub const RAY_TOLERANCE: f64 = 1e-6;

/// A finite ray: `direction` carries both heading and reach, so the ray
/// covers `origin + t * direction` for `t` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self { origin, direction }
    }

    /// Ray of `range` along the normalized `heading`.
    pub fn with_range(origin: DVec3, heading: DVec3, range: f64) -> Self {
        Self::new(origin, heading.normalize_or_zero() * range)
    }

    pub fn end(&self) -> DVec3 {
        self.origin + self.direction
    }

    pub fn point_at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    pub fn at(&self, origin: DVec3) -> Self {
        Self {
            origin: self.origin + origin,
            direction: self.direction,
        }
    }

    /// Padded by [`RAY_TOLERANCE`] so axis-aligned rays keep a volume.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_ray(self.origin, self.direction, RAY_TOLERANCE)
    }

    /// Parameter in `[0, 1]` of the point on the ray closest to `point`.
    pub fn closest_parameter(&self, point: DVec3) -> f64 {
        let len_sq = self.direction.length_squared();
        if len_sq == 0.0 {
            return 0.0;
        }
        ((point - self.origin).dot(self.direction) / len_sq).clamp(0.0, 1.0)
    }

    /// Slab test. Returns the entry parameter when the ray hits the box.
    pub fn cast_aabb(&self, aabb: &Aabb) -> Option<f64> {
        slab_test(self.origin, self.direction, aabb.min, aabb.max)
    }

    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        !aabb.is_dummy() && self.cast_aabb(aabb).is_some()
    }

    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let closest = self.point_at(self.closest_parameter(sphere.center));
        closest.distance_squared(sphere.center) <= sphere.radius * sphere.radius
    }

    pub fn intersects_obb(&self, obb: &Obb) -> bool {
        if obb.is_dummy() {
            return false;
        }
        let origin = obb.to_local(self.origin);
        let direction = obb.to_local_direction(self.direction);
        slab_test(origin, direction, -obb.extents, obb.extents).is_some()
    }

    /// Closest approach between the two segments falls within [`RAY_TOLERANCE`].
    pub fn intersects_ray(&self, other: &Ray) -> bool {
        segment_distance_squared(self, other) <= RAY_TOLERANCE * RAY_TOLERANCE
    }
}

fn slab_test(origin: DVec3, dir: DVec3, min: DVec3, max: DVec3) -> Option<f64> {
    let mut t_min = 0.0f64;
    let mut t_max = 1.0f64;
    let o = origin.to_array();
    let d = dir.to_array();
    let lo = min.to_array();
    let hi = max.to_array();
    for axis in 0..3 {
        if d[axis].abs() < f64::EPSILON {
            if o[axis] < lo[axis] || o[axis] > hi[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d[axis];
        let mut t1 = (lo[axis] - o[axis]) * inv;
        let mut t2 = (hi[axis] - o[axis]) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }
    Some(t_min)
}

fn segment_distance_squared(a: &Ray, b: &Ray) -> f64 {
    let d1 = a.direction;
    let d2 = b.direction;
    let r = a.origin - b.origin;
    let len1 = d1.length_squared();
    let len2 = d2.length_squared();
    let f = d2.dot(r);

    let (s, t) = if len1 <= f64::EPSILON && len2 <= f64::EPSILON {
        (0.0, 0.0)
    } else if len1 <= f64::EPSILON {
        (0.0, (f / len2).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if len2 <= f64::EPSILON {
            ((-c / len1).clamp(0.0, 1.0), 0.0)
        } else {
            let bb = d1.dot(d2);
            let denom = len1 * len2 - bb * bb;
            let mut s = if denom > f64::EPSILON {
                ((bb * f - c * len2) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (bb * s + f) / len2;
            if t < 0.0 {
                t = 0.0;
                s = (-c / len1).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((bb - c) / len1).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    a.point_at(s).distance_squared(b.point_at(t))
}
