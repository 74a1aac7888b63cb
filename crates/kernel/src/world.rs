use std::collections::{BTreeMap, BTreeSet};

use bending_common::{
    BlockMutation, BlockPos, BlockState, EntityId, EntityMutation, EntitySnapshot,
    PermissionService, SpatialQuery, UserId,
};
use bending_geom::Aabb;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A record produced by every mutation of a [`MemoryWorld`].
///
/// Comparing two logs is the cheapest way to check that two runs of the same
/// input sequence did the same thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    BlockChanged {
        pos: BlockPos,
        old: BlockState,
        new: BlockState,
    },
    Spawned {
        id: EntityId,
        position: DVec3,
    },
    VelocityApplied {
        id: EntityId,
        velocity: DVec3,
    },
    Damaged {
        id: EntityId,
        amount: f64,
        source: UserId,
    },
    EntityRemoved {
        id: EntityId,
    },
    /// Entities moved by their velocity and the seed advanced.
    Stepped {
        tick: u64,
        seed: u64,
    },
}

/// Per-entity data stored in the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityData {
    pub snapshot: EntitySnapshot,
    pub health: f64,
}

/// Deterministic in-memory host used by tests, benches and the CLI.
///
/// Terrain is a flat stone plane up to `ground` with sparse explicit
/// overrides on top. Uses BTreeMap everywhere so iteration order, and with
/// it every query result, is identical across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryWorld {
    ground: Option<i32>,
    blocks: BTreeMap<BlockPos, BlockState>,
    entities: BTreeMap<EntityId, EntityData>,
    protected: BTreeSet<BlockPos>,
    denied_permissions: BTreeSet<(UserId, String)>,
    tick: u64,
    seed: u64,
    #[serde(skip)]
    event_log: Vec<WorldEvent>,
}

impl MemoryWorld {
    /// An empty world of air.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stone at and below `ground`, air above.
    pub fn flat(ground: i32) -> Self {
        Self {
            ground: Some(ground),
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Sets a block without going through the temp block layer. Meant for
    /// scenario setup.
    pub fn set_block(&mut self, pos: BlockPos, state: BlockState) {
        let old = self.read(pos);
        if state == self.terrain(pos) {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, state);
        }
        if old != state {
            self.event_log
                .push(WorldEvent::BlockChanged { pos, old, new: state });
        }
    }

    /// Generated block at `pos`, ignoring explicit overrides.
    fn terrain(&self, pos: BlockPos) -> BlockState {
        if self.ground.is_some_and(|g| pos.y <= g) {
            BlockState::Stone
        } else {
            BlockState::Air
        }
    }

    /// Marks a position as protected; builds there are denied.
    pub fn protect(&mut self, pos: BlockPos) {
        self.protected.insert(pos);
    }

    pub fn deny_permission(&mut self, user: UserId, node: impl Into<String>) {
        self.denied_permissions.insert((user, node.into()));
    }

    /// Spawns a player-sized entity at `position` looking along `direction`.
    pub fn spawn_player(&mut self, id: EntityId, position: DVec3, direction: DVec3) {
        self.spawn(
            EntitySnapshot {
                id,
                position,
                direction: direction.normalize_or_zero(),
                velocity: DVec3::ZERO,
                width: 0.6,
                height: 1.8,
                eye_height: 1.62,
                projectile: false,
            },
            20.0,
        );
    }

    pub fn spawn(&mut self, snapshot: EntitySnapshot, health: f64) {
        self.event_log.push(WorldEvent::Spawned {
            id: snapshot.id,
            position: snapshot.position,
        });
        self.entities
            .insert(snapshot.id, EntityData { snapshot, health });
    }

    pub fn entity_data(&self, id: EntityId) -> Option<&EntityData> {
        self.entities.get(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn health(&self, id: EntityId) -> Option<f64> {
        self.entities.get(&id).map(|e| e.health)
    }

    /// Moves and turns an entity, as a client movement packet would.
    pub fn set_pose(&mut self, id: EntityId, position: DVec3, direction: DVec3) -> bool {
        match self.entities.get_mut(&id) {
            Some(data) => {
                data.snapshot.position = position;
                data.snapshot.direction = direction.normalize_or_zero();
                true
            }
            None => false,
        }
    }

    /// Advances one tick: every entity moves by its velocity, which is then
    /// cleared.
    pub fn step(&mut self) {
        self.tick += 1;
        self.seed = splitmix64(self.seed);
        for data in self.entities.values_mut() {
            data.snapshot.position += data.snapshot.velocity;
            data.snapshot.velocity = DVec3::ZERO;
        }
        self.event_log.push(WorldEvent::Stepped {
            tick: self.tick,
            seed: self.seed,
        });
    }

    /// Deterministic hash of blocks, entities, tick and seed, in canonical
    /// (BTreeMap) order.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= u64::from(b);
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        mix(&mut h, &self.seed.to_le_bytes());
        for (pos, state) in &self.blocks {
            mix(&mut h, &pos.x.to_le_bytes());
            mix(&mut h, &pos.y.to_le_bytes());
            mix(&mut h, &pos.z.to_le_bytes());
            mix(&mut h, format!("{state:?}").as_bytes());
        }
        for (id, data) in &self.entities {
            mix(&mut h, id.0.as_bytes());
            for v in data.snapshot.position.to_array() {
                mix(&mut h, &v.to_le_bytes());
            }
            mix(&mut h, &data.health.to_le_bytes());
        }
        h
    }
}

impl SpatialQuery for MemoryWorld {
    fn entities_in(
        &self,
        volume: &Aabb,
        filter: &dyn Fn(&EntitySnapshot) -> bool,
        limit: Option<usize>,
    ) -> Vec<EntitySnapshot> {
        self.entities
            .values()
            .map(|d| d.snapshot)
            .filter(|s| s.bounds().intersects(volume) && filter(s))
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    fn entity(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.entities.get(&id).map(|d| d.snapshot)
    }

    fn block_at(&self, pos: BlockPos) -> BlockState {
        self.read(pos)
    }

    fn is_build_allowed(&self, _user: UserId, pos: BlockPos) -> bool {
        !self.protected.contains(&pos)
    }
}

impl EntityMutation for MemoryWorld {
    fn apply_velocity(&mut self, entity: EntityId, velocity: DVec3) {
        if let Some(data) = self.entities.get_mut(&entity) {
            data.snapshot.velocity = velocity;
            self.event_log.push(WorldEvent::VelocityApplied {
                id: entity,
                velocity,
            });
        }
    }

    fn apply_damage(&mut self, entity: EntityId, amount: f64, source: UserId) {
        if let Some(data) = self.entities.get_mut(&entity) {
            data.health = (data.health - amount).max(0.0);
            self.event_log.push(WorldEvent::Damaged {
                id: entity,
                amount,
                source,
            });
        }
    }

    fn remove_entity(&mut self, entity: EntityId) -> bool {
        let removed = self.entities.remove(&entity).is_some();
        if removed {
            self.event_log.push(WorldEvent::EntityRemoved { id: entity });
        }
        removed
    }
}

impl BlockMutation for MemoryWorld {
    fn read(&self, pos: BlockPos) -> BlockState {
        self.blocks
            .get(&pos)
            .copied()
            .unwrap_or_else(|| self.terrain(pos))
    }

    fn write(&mut self, pos: BlockPos, state: BlockState) -> bool {
        if self.protected.contains(&pos) {
            return false;
        }
        self.set_block(pos, state);
        true
    }
}

impl PermissionService for MemoryWorld {
    fn has_permission(&self, user: UserId, node: &str) -> bool {
        !self.denied_permissions.contains(&(user, node.to_string()))
    }
}

/// Splitmix64 step, used to advance the world seed each tick.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_terrain() {
        let w = MemoryWorld::flat(63);
        assert_eq!(w.read(BlockPos::new(5, 63, -2)), BlockState::Stone);
        assert_eq!(w.read(BlockPos::new(5, 64, -2)), BlockState::Air);
        assert_eq!(MemoryWorld::new().read(BlockPos::new(0, -100, 0)), BlockState::Air);
    }

    #[test]
    fn writes_are_logged_and_protected_blocks_refuse() {
        let mut w = MemoryWorld::flat(63);
        let pos = BlockPos::new(0, 63, 0);
        assert!(w.write(pos, BlockState::Air));
        assert_eq!(w.events().len(), 1);
        w.protect(pos);
        assert!(!w.write(pos, BlockState::Stone));
        assert!(!w.is_build_allowed(UserId::new(), pos));
        assert_eq!(w.read(pos), BlockState::Air);
    }

    #[test]
    fn entity_queries_are_ordered_and_limited() {
        let mut w = MemoryWorld::flat(63);
        for x in 0..5 {
            w.spawn_player(EntityId::new(), DVec3::new(f64::from(x), 64.0, 0.0), DVec3::Z);
        }
        let area = Aabb::new(DVec3::new(-1.0, 60.0, -1.0), DVec3::new(10.0, 70.0, 1.0));
        let all = w.entities_in(&area, &|_| true, None);
        assert_eq!(all.len(), 5);
        let ids: Vec<EntityId> = all.iter().map(|s| s.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        assert_eq!(w.entities_in(&area, &|_| true, Some(2)).len(), 2);
        assert!(w.entities_in(&area, &|s| s.position.x > 3.5, None).len() == 1);
    }

    #[test]
    fn velocity_and_damage() {
        let mut w = MemoryWorld::flat(63);
        let id = EntityId::new();
        w.spawn_player(id, DVec3::new(0.0, 64.0, 0.0), DVec3::Z);
        w.apply_velocity(id, DVec3::new(0.0, 1.0, 0.0));
        w.apply_damage(id, 4.0, UserId::new());
        w.step();
        assert_eq!(w.entity(id).unwrap().position.y, 65.0);
        assert_eq!(w.entity(id).unwrap().velocity, DVec3::ZERO);
        assert_eq!(w.health(id), Some(16.0));
        assert!(w.remove_entity(id));
        assert!(!w.remove_entity(id));
    }

    #[test]
    fn permissions_default_to_granted() {
        let mut w = MemoryWorld::new();
        let user = UserId::new();
        assert!(w.has_permission(user, "bending.ability.FireBlast"));
        w.deny_permission(user, "bending.ability.FireBlast");
        assert!(!w.has_permission(user, "bending.ability.FireBlast"));
    }

    #[test]
    fn state_hash_tracks_seed_and_blocks() {
        let mut a = MemoryWorld::flat(63).with_seed(42);
        let mut b = MemoryWorld::flat(63).with_seed(42);
        a.step();
        b.step();
        assert_eq!(a.state_hash(), b.state_hash());
        a.set_block(BlockPos::new(0, 64, 0), BlockState::Ice);
        assert_ne!(a.state_hash(), b.state_hash());
        a.set_block(BlockPos::new(0, 64, 0), BlockState::Air);
        assert_eq!(a.state_hash(), b.state_hash());
        assert_ne!(MemoryWorld::new().with_seed(1).seed(), MemoryWorld::new().with_seed(2).seed());
    }
}
