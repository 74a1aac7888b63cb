//! Narrow interfaces to the game host.
//!
//! The core never owns world, block or entity representations. It reaches
//! them only through these traits, which a platform adapter implements.
//! All calls happen on the world's tick thread.

use bending_geom::Aabb;
use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::{BlockPos, BlockState, EntityId, UserId};

/// Read-only view of an entity at query time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    /// Feet position.
    pub position: DVec3,
    /// Normalized look direction.
    pub direction: DVec3,
    pub velocity: DVec3,
    pub width: f64,
    pub height: f64,
    pub eye_height: f64,
    pub projectile: bool,
}

impl EntitySnapshot {
    pub fn eye_location(&self) -> DVec3 {
        self.position + DVec3::new(0.0, self.eye_height, 0.0)
    }

    pub fn center(&self) -> DVec3 {
        self.position + DVec3::new(0.0, self.height * 0.5, 0.0)
    }

    pub fn bounds(&self) -> Aabb {
        let half = self.width * 0.5;
        Aabb::new(
            self.position - DVec3::new(half, 0.0, half),
            self.position + DVec3::new(half, self.height, half),
        )
    }

    /// Horizontal unit vector pointing to the entity's right.
    pub fn right_side(&self) -> DVec3 {
        let flat = DVec3::new(self.direction.x, 0.0, self.direction.z);
        DVec3::Y.cross(flat).normalize_or_zero() * -1.0
    }
}

/// Spatial lookups against the host world.
pub trait SpatialQuery {
    /// Entities whose bounds intersect `volume` and pass `filter`, in a
    /// stable order, truncated to `limit` when given.
    fn entities_in(
        &self,
        volume: &Aabb,
        filter: &dyn Fn(&EntitySnapshot) -> bool,
        limit: Option<usize>,
    ) -> Vec<EntitySnapshot>;

    fn entity(&self, id: EntityId) -> Option<EntitySnapshot>;

    fn block_at(&self, pos: BlockPos) -> BlockState;

    /// Region protection check. `false` is an unconditional deny and must
    /// not be cached by the core.
    fn is_build_allowed(&self, user: UserId, pos: BlockPos) -> bool;
}

/// Entity side effects.
pub trait EntityMutation {
    fn apply_velocity(&mut self, entity: EntityId, velocity: DVec3);

    fn apply_damage(&mut self, entity: EntityId, amount: f64, source: UserId);

    fn remove_entity(&mut self, entity: EntityId) -> bool;
}

/// Raw block reads and writes. The temporal block manager is the only core
/// component that writes through this.
pub trait BlockMutation {
    fn read(&self, pos: BlockPos) -> BlockState;

    /// Returns `false` if the host refused the write.
    fn write(&mut self, pos: BlockPos, state: BlockState) -> bool;
}

/// Permission lookups (e.g. `bending.ability.FireBlast`).
pub trait PermissionService {
    fn has_permission(&self, user: UserId, node: &str) -> bool;
}

/// Everything the core needs from one host world.
pub trait Host: SpatialQuery + EntityMutation + BlockMutation + PermissionService {}

impl<T> Host for T where T: SpatialQuery + EntityMutation + BlockMutation + PermissionService {}
