//! A one-user world for exercising abilities without the input layer.

use std::sync::Arc;

use bending_collision::CollisionRegistryBuilder;
use bending_common::{
    AbilityId, Activation, BlockMutation, BlockPos, BlockState, Element, EntityId, SpatialQuery,
    Timestamp, UserId, WorldId,
};
use bending_kernel::{
    AbilityCatalog, EngineConfig, Game, MemoryWorld, TickReport, User, WorldSim,
};
use glam::DVec3;

use crate::{AbilitiesConfig, default_collisions, register_defaults};

pub(crate) struct Arena {
    pub game: Game<MemoryWorld>,
    pub world: WorldId,
    pub user: UserId,
    pub entity: EntityId,
}

impl Arena {
    pub fn new() -> Self {
        Self::with_config(&AbilitiesConfig::default())
    }

    pub fn with_config(config: &AbilitiesConfig) -> Self {
        let catalog = register_defaults(AbilityCatalog::builder(), config)
            .build()
            .unwrap();
        let rules = CollisionRegistryBuilder::from_config(&default_collisions())
            .build(&catalog)
            .unwrap();
        let mut game = Game::new(Arc::new(catalog), Arc::new(rules), EngineConfig::default());
        let world = WorldId::new();
        let mut host = MemoryWorld::flat(63);
        let entity = EntityId::new();
        host.spawn_player(entity, DVec3::new(0.5, 64.0, 0.5), DVec3::Z);
        game.add_world(world, host);
        let user = User::new(UserId::new(), entity, world)
            .with_element(Element::Fire)
            .with_element(Element::Earth);
        let id = user.id();
        game.add_user(user);
        Self {
            game,
            world,
            user: id,
            entity,
        }
    }

    pub fn id(&self, name: &str) -> AbilityId {
        self.game.catalog().by_name(name).unwrap().id()
    }

    pub fn world_sim(&self) -> &WorldSim<MemoryWorld> {
        self.game.world(self.world).unwrap()
    }

    pub fn host(&self) -> &MemoryWorld {
        &self.world_sim().host
    }

    pub fn host_mut(&mut self) -> &mut MemoryWorld {
        &mut self.game.world_mut(self.world).unwrap().host
    }

    pub fn block(&self, pos: BlockPos) -> BlockState {
        self.host().read(pos)
    }

    /// Binds `name` to the first slot and selects it.
    pub fn select(&mut self, name: &str) {
        let ability = self.id(name);
        assert!(self.game.bind(self.user, 0, ability));
        self.game.user_mut(self.user).unwrap().select_slot(0);
    }

    pub fn set_sneaking(&mut self, sneaking: bool) {
        self.game.user_mut(self.user).unwrap().set_sneaking(sneaking);
    }

    pub fn look(&mut self, direction: DVec3) {
        let (entity, position) = (self.entity, self.host().entity(self.entity).unwrap().position);
        self.host_mut().set_pose(entity, position, direction);
    }

    /// Creates and activates an instance directly, skipping the
    /// controller's checks.
    pub fn activate(&mut self, name: &str, trigger: Activation) -> bool {
        let (ability, user) = (self.id(name), self.user);
        self.game
            .with_world(self.world, |manager, access| {
                let id = manager.reserve_id();
                let mut instance = access.catalog.get(ability).unwrap().create();
                let mut ctx = access.context(id, ability, user).unwrap();
                let activated = instance.activate(&mut ctx, trigger);
                if activated {
                    manager.add_ability(id, user, ability, instance);
                }
                activated
            })
            .unwrap()
    }

    pub fn trigger(&mut self, name: &str, trigger: Activation) -> bool {
        let (ability, user) = (self.id(name), self.user);
        self.game
            .with_world(self.world, |manager, access| {
                manager.forward_trigger(user, ability, trigger, access)
            })
            .unwrap()
    }

    pub fn tick(&mut self, now: u64) -> TickReport {
        let mut reports = self.game.tick(Timestamp(now));
        reports.remove(&self.world).unwrap()
    }

    pub fn is_live(&self, name: &str) -> bool {
        self.world_sim().manager.has_ability(self.user, self.id(name))
    }

    pub fn on_cooldown(&self, name: &str, at: u64) -> bool {
        self.game
            .user(self.user)
            .unwrap()
            .is_on_cooldown(self.id(name), Timestamp(at))
    }
}
