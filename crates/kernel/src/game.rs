use std::collections::BTreeMap;
use std::sync::Arc;

use bending_collision::CollisionRegistry;
use bending_common::{AbilityId, Host, Timestamp, UserId, WorldId};
use bending_temporal::TempBlockManager;

use crate::ability::{CooldownRequest, WorldAccess};
use crate::catalog::AbilityCatalog;
use crate::config::EngineConfig;
use crate::manager::{AbilityManager, TickReport};
use crate::user::{User, UserRegistry};

/// Simulation state of one world.
pub struct WorldSim<H> {
    pub host: H,
    pub manager: AbilityManager,
    pub temp_blocks: TempBlockManager,
}

impl<H: Host> WorldSim<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            manager: AbilityManager::new(),
            temp_blocks: TempBlockManager::new(),
        }
    }
}

/// Top-level engine: immutable catalog and rules, users, and one
/// [`WorldSim`] per loaded world.
pub struct Game<H> {
    catalog: Arc<AbilityCatalog>,
    collisions: Arc<CollisionRegistry>,
    config: EngineConfig,
    users: UserRegistry,
    worlds: BTreeMap<WorldId, WorldSim<H>>,
    now: Timestamp,
}

impl<H: Host> Game<H> {
    pub fn new(
        catalog: Arc<AbilityCatalog>,
        collisions: Arc<CollisionRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            collisions,
            config,
            users: UserRegistry::new(),
            worlds: BTreeMap::new(),
            now: Timestamp::ZERO,
        }
    }

    pub fn catalog(&self) -> &AbilityCatalog {
        &self.catalog
    }

    pub fn collisions(&self) -> &CollisionRegistry {
        &self.collisions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Moves the clock without ticking, e.g. for input between ticks.
    pub fn set_time(&mut self, now: Timestamp) {
        self.now = now;
    }

    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(id)
    }

    pub fn add_user(&mut self, user: User) {
        tracing::debug!(user = ?user.id(), world = ?user.world(), "user added");
        self.users.insert(user);
    }

    /// Destroys the user's instances in their world, then forgets them.
    pub fn remove_user(&mut self, id: UserId) -> Option<User> {
        let world = self.users.get(id)?.world();
        self.with_world(world, |manager, access| {
            manager.destroy_user_instances(id, access)
        });
        self.users.remove(id)
    }

    /// Binds an ability to a slot if the type may be bound and the user has
    /// its element.
    pub fn bind(&mut self, user: UserId, slot: usize, ability: AbilityId) -> bool {
        let Some(description) = self.catalog.get(ability) else {
            return false;
        };
        if !description.can_bind() {
            return false;
        }
        let element = description.element();
        match self.users.get_mut(user) {
            Some(u) if u.has_element(element) => u.bind(slot, Some(ability)),
            _ => false,
        }
    }

    pub fn add_world(&mut self, id: WorldId, host: H) {
        self.worlds.insert(id, WorldSim::new(host));
    }

    /// Unloads a world: destroys every instance and reverts every temporary
    /// block before handing the host back.
    pub fn remove_world(&mut self, id: WorldId) -> Option<H> {
        self.with_world(id, |manager, access| manager.destroy_all(access))?;
        let mut sim = self.worlds.remove(&id)?;
        sim.temp_blocks.revert_all(&mut sim.host);
        Some(sim.host)
    }

    pub fn world(&self, id: WorldId) -> Option<&WorldSim<H>> {
        self.worlds.get(&id)
    }

    pub fn world_mut(&mut self, id: WorldId) -> Option<&mut WorldSim<H>> {
        self.worlds.get_mut(&id)
    }

    pub fn world_ids(&self) -> impl Iterator<Item = WorldId> + '_ {
        self.worlds.keys().copied()
    }

    /// Runs `f` with the world's manager and a borrowed view of the rest of
    /// the world, then applies any cooldowns it queued.
    pub fn with_world<R>(
        &mut self,
        world: WorldId,
        f: impl FnOnce(&mut AbilityManager, &mut WorldAccess<'_>) -> R,
    ) -> Option<R> {
        let sim = self.worlds.get_mut(&world)?;
        let mut access = WorldAccess::new(
            self.now,
            &mut sim.host,
            &mut sim.temp_blocks,
            &self.users,
            &self.catalog,
        );
        let result = f(&mut sim.manager, &mut access);
        let cooldowns = std::mem::take(&mut access.cooldowns);
        apply_cooldowns(&mut self.users, cooldowns);
        Some(result)
    }

    /// One tick for every world, in world id order: update and collide
    /// instances, then revert due temporary blocks.
    pub fn tick(&mut self, now: Timestamp) -> BTreeMap<WorldId, TickReport> {
        self.now = now;
        let mut reports = BTreeMap::new();
        let mut cooldowns = Vec::new();
        for (id, sim) in &mut self.worlds {
            let mut access = WorldAccess::new(
                now,
                &mut sim.host,
                &mut sim.temp_blocks,
                &self.users,
                &self.catalog,
            );
            let mut report = sim.manager.tick(&mut access, &self.collisions);
            cooldowns.append(&mut access.cooldowns);
            report.reverted_blocks = sim.temp_blocks.tick(now, &mut sim.host).len();
            reports.insert(*id, report);
        }
        apply_cooldowns(&mut self.users, cooldowns);
        reports
    }

    /// Destroys everything and reverts all temporary blocks in every world.
    pub fn shutdown(&mut self) {
        let ids: Vec<WorldId> = self.worlds.keys().copied().collect();
        for id in ids {
            self.with_world(id, |manager, access| manager.destroy_all(access));
            if let Some(sim) = self.worlds.get_mut(&id) {
                sim.temp_blocks.revert_all(&mut sim.host);
            }
        }
        tracing::info!(worlds = self.worlds.len(), "game shut down");
    }
}

fn apply_cooldowns(users: &mut UserRegistry, cooldowns: Vec<CooldownRequest>) {
    for request in cooldowns {
        if let Some(user) = users.get_mut(request.user) {
            user.set_cooldown(request.ability, request.until);
        }
    }
}
