//! End-to-end runs through the controller with the built-in abilities.

use std::sync::Arc;
use std::time::Duration;

use bending_abilities::{
    AbilitiesConfig, EarthBlast, EarthPillar, FireBlast, FireJet, FireShield, default_collisions,
    register_defaults,
};
use bending_collision::{CollisionConfig, CollisionRegistryBuilder};
use bending_common::{
    Activation, BlockMutation, BlockPos, BlockState, Element, EntityId, InstanceId, Timestamp,
    UserId, WorldId,
};
use bending_input::ActivationController;
use bending_kernel::{
    Ability, AbilityCatalog, AbilityCatalogBuilder, AbilityContext, AbilityDescription,
    AbilityError, EngineConfig, Game, MemoryWorld, RemovalCause, TickReport, UpdateResult, User,
};
use glam::DVec3;
use uuid::Uuid;

const WORLD: WorldId = WorldId(Uuid::from_u128(0x10));

struct Scene {
    game: Game<MemoryWorld>,
    input: ActivationController,
}

impl Scene {
    fn new(collisions: &CollisionConfig) -> Self {
        Self::with_catalog(
            register_defaults(AbilityCatalog::builder(), &AbilitiesConfig::default()),
            collisions,
        )
    }

    fn with_catalog(builder: AbilityCatalogBuilder, collisions: &CollisionConfig) -> Self {
        let catalog = builder.build().unwrap();
        let rules = CollisionRegistryBuilder::from_config(collisions)
            .build(&catalog)
            .unwrap();
        let mut game = Game::new(Arc::new(catalog), Arc::new(rules), EngineConfig::default());
        game.add_world(WORLD, MemoryWorld::flat(63));
        Self {
            game,
            input: ActivationController::new(),
        }
    }

    /// Adds a fire and earth user standing at `position`, with `ability`
    /// bound to the selected slot.
    fn user(&mut self, n: u128, position: DVec3, direction: DVec3, ability: &str) -> UserId {
        let id = UserId(Uuid::from_u128(n));
        let entity = EntityId(Uuid::from_u128(0x100 + n));
        self.host_mut().spawn_player(entity, position, direction);
        self.game.add_user(
            User::new(id, entity, WORLD)
                .with_element(Element::Fire)
                .with_element(Element::Earth),
        );
        let ability = self.game.catalog().by_name(ability).unwrap().id();
        assert!(self.game.bind(id, 0, ability));
        id
    }

    fn host(&self) -> &MemoryWorld {
        &self.game.world(WORLD).unwrap().host
    }

    fn host_mut(&mut self) -> &mut MemoryWorld {
        &mut self.game.world_mut(WORLD).unwrap().host
    }

    fn entity(&self, user: UserId) -> EntityId {
        self.game.user(user).unwrap().entity()
    }

    fn tick(&mut self, now: u64) -> TickReport {
        let report = self.game.tick(Timestamp(now)).remove(&WORLD).unwrap();
        self.host_mut().step();
        report
    }

    fn live(&self, user: UserId, name: &str) -> bool {
        let ability = self.game.catalog().by_name(name).unwrap().id();
        self.game.world(WORLD).unwrap().manager.has_ability(user, ability)
    }
}

#[test]
fn shield_stops_an_incoming_blast() {
    let mut scene = Scene::new(&default_collisions());
    let attacker = scene.user(1, DVec3::new(0.5, 64.0, 0.5), DVec3::Z, FireBlast::NAME);
    let defender = scene.user(2, DVec3::new(0.5, 64.0, 10.5), -DVec3::Z, FireShield::NAME);

    assert!(scene.input.on_swing(&mut scene.game, defender));
    assert!(scene.input.on_swing(&mut scene.game, attacker));

    let mut removed = Vec::new();
    let mut collisions = Vec::new();
    for step in 1..=10 {
        let report = scene.tick(step * 50);
        removed.extend(report.removed);
        collisions.extend(report.collisions);
    }
    // Shield is instance 0, blast instance 1.
    assert_eq!(collisions, [(InstanceId(0), InstanceId(1))]);
    assert_eq!(removed, [(InstanceId(1), RemovalCause::Collided)]);
    assert!(scene.live(defender, FireShield::NAME));
    assert_eq!(scene.host().health(scene.entity(defender)), Some(20.0));
}

#[test]
fn custom_rule_makes_the_shield_break_too() {
    let yaml = r#"
pairs:
  - first: FireShield
    second: FireBlast
    remove_first: true
    remove_second: true
"#;
    let mut config = default_collisions();
    config.pairs.extend(serde_yaml::from_str::<CollisionConfig>(yaml).unwrap().pairs);
    let mut scene = Scene::new(&config);
    let attacker = scene.user(1, DVec3::new(0.5, 64.0, 0.5), DVec3::Z, FireBlast::NAME);
    let defender = scene.user(2, DVec3::new(0.5, 64.0, 10.5), -DVec3::Z, FireShield::NAME);

    assert!(scene.input.on_swing(&mut scene.game, defender));
    assert!(scene.input.on_swing(&mut scene.game, attacker));
    for step in 1..=10 {
        scene.tick(step * 50);
    }
    assert!(!scene.live(defender, FireShield::NAME));
    assert!(!scene.live(attacker, FireBlast::NAME));
    // Destroyed shields still pay their cooldown.
    let shield = scene.game.catalog().by_name(FireShield::NAME).unwrap().id();
    assert!(scene.game.user(defender).unwrap().is_on_cooldown(shield, Timestamp(1_000)));
}

#[test]
fn pillar_blocks_a_blast() {
    let mut scene = Scene::new(&default_collisions());
    let earth = scene.user(
        1,
        DVec3::new(0.5, 64.0, 6.5),
        DVec3::new(0.0, 63.9 - 65.62, -3.0),
        EarthPillar::NAME,
    );
    let fire = scene.user(2, DVec3::new(0.5, 64.0, 0.5), DVec3::Z, FireBlast::NAME);

    assert!(scene.input.on_swing(&mut scene.game, earth));
    assert!(scene.input.on_swing(&mut scene.game, fire));
    let report = scene.tick(50);
    assert_eq!(report.removed, [(InstanceId(1), RemovalCause::Collided)]);
    assert!(scene.live(earth, EarthPillar::NAME));
    assert_eq!(scene.host().read(BlockPos::new(0, 64, 3)), BlockState::Stone);
}

#[test]
fn earth_blast_selects_on_sneak_and_launches_on_swing() {
    let mut scene = Scene::new(&default_collisions());
    let user = scene.user(
        1,
        DVec3::new(0.5, 64.0, 0.5),
        DVec3::new(0.0, 63.9 - 65.62, 3.0),
        EarthBlast::NAME,
    );
    let source = BlockPos::new(0, 63, 3);

    assert!(scene.input.on_sneak(&mut scene.game, user, true));
    assert!(scene.game.world(WORLD).unwrap().temp_blocks.get(source).unwrap().is_locked());
    // A second sneak re-selects instead of starting another instance.
    assert!(scene.input.on_sneak(&mut scene.game, user, true));
    assert_eq!(scene.game.world(WORLD).unwrap().manager.len(), 1);

    scene.game.set_time(Timestamp(10));
    assert!(scene.input.on_swing(&mut scene.game, user));
    assert_eq!(scene.host().read(source), BlockState::Air);
    assert!(!scene.game.world(WORLD).unwrap().temp_blocks.get(source).unwrap().is_locked());
}

#[test]
fn swing_cancels_a_running_jet() {
    let mut scene = Scene::new(&default_collisions());
    let user = scene.user(1, DVec3::new(0.5, 64.0, 0.5), DVec3::Z, FireJet::NAME);

    assert!(scene.input.on_swing(&mut scene.game, user));
    assert!(scene.live(user, FireJet::NAME));
    scene.tick(50);
    assert!(scene.input.on_swing(&mut scene.game, user));
    assert!(!scene.live(user, FireJet::NAME));
    // The cancelled jet's cooldown blocks an immediate restart.
    assert!(!scene.input.on_swing(&mut scene.game, user));
}

/// Digs a hole and then changes its mind.
struct Fickle;

impl Ability for Fickle {
    fn activate(&mut self, ctx: &mut AbilityContext<'_>, _trigger: Activation) -> bool {
        ctx.add_cooldown(Duration::from_secs(5));
        let _ = ctx.override_block(BlockPos::new(0, 63, 0), BlockState::Air, Duration::ZERO);
        let _ = ctx.override_block(BlockPos::new(1, 63, 0), BlockState::Air, Duration::from_secs(1));
        false
    }

    fn update(&mut self, _ctx: &mut AbilityContext<'_>) -> Result<UpdateResult, AbilityError> {
        Ok(UpdateResult::Continue)
    }
}

#[test]
fn failed_activation_leaves_no_trace() {
    let builder = AbilityCatalog::builder().register(
        AbilityDescription::builder("Fickle")
            .element(Element::Earth)
            .activation(Activation::Attack)
            .factory(|| Box::new(Fickle)),
    );
    let mut scene = Scene::with_catalog(builder, &CollisionConfig::default());
    let user = scene.user(1, DVec3::new(0.5, 64.0, 0.5), DVec3::Z, "Fickle");
    let before = scene.host().state_hash();

    assert!(!scene.input.on_swing(&mut scene.game, user));
    let world = scene.game.world(WORLD).unwrap();
    assert!(world.manager.is_empty());
    assert!(world.temp_blocks.is_empty());
    assert_eq!(scene.host().read(BlockPos::new(0, 63, 0)), BlockState::Stone);
    assert_eq!(scene.host().state_hash(), before);
    let fickle = scene.game.catalog().by_name("Fickle").unwrap().id();
    assert!(!scene.game.user(user).unwrap().is_on_cooldown(fickle, Timestamp(1)));
}

/// One scripted fight: a jet, a shield, two blasts and a pillar.
fn skirmish() -> (Vec<TickReport>, u64) {
    let mut scene = Scene::new(&default_collisions());
    let a = scene.user(1, DVec3::new(0.5, 64.0, 0.5), DVec3::Z, FireBlast::NAME);
    let b = scene.user(2, DVec3::new(0.5, 64.0, 12.5), -DVec3::Z, FireShield::NAME);
    let c = scene.user(
        3,
        DVec3::new(4.5, 64.0, 4.5),
        DVec3::new(0.0, 63.9 - 65.62, 3.0),
        EarthBlast::NAME,
    );

    let mut reports = Vec::new();
    for step in 1..=60u64 {
        let now = step * 50;
        scene.game.set_time(Timestamp(now));
        match step {
            1 => {
                scene.input.on_swing(&mut scene.game, a);
                scene.input.on_sneak(&mut scene.game, c, true);
            }
            5 => {
                scene.input.on_swing(&mut scene.game, b);
            }
            8 => {
                scene.input.on_swing(&mut scene.game, c);
            }
            40 => {
                scene.input.on_swing(&mut scene.game, a);
            }
            _ => {}
        }
        reports.push(scene.tick(now));
    }
    (reports, scene.host().state_hash())
}

#[test]
fn identical_input_gives_identical_runs() {
    let (first, first_hash) = skirmish();
    let (second, second_hash) = skirmish();
    assert_eq!(first, second);
    assert_eq!(first_hash, second_hash);
    assert!(first.iter().any(|r| !r.removed.is_empty()));
}
