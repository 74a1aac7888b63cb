//! Geometry: collider shapes and pairwise intersection predicates.
//!
//! # Invariants
//! - All math is double precision (`glam::DVec3`).
//! - Intersection tests never allocate; they run in the per-tick hot path.
//! - Degenerate shapes never intersect anything.

mod aabb;
mod collider;
mod disk;
mod obb;
mod ray;
mod sphere;

pub use aabb::Aabb;
pub use collider::Collider;
pub use disk::Disk;
pub use obb::Obb;
pub use ray::{RAY_TOLERANCE, Ray};
pub use sphere::Sphere;
