use std::sync::Arc;

use bending_abilities::{EarthBlast, FireBlast, FireShield};
use bending_common::{Element, EntityId, Timestamp, UserId, WorldId};
use bending_input::ActivationController;
use bending_kernel::{Game, MemoryWorld, TickReport, User};
use glam::DVec3;
use serde::Serialize;
use uuid::Uuid;

use crate::settings::Settings;

const WORLD: WorldId = WorldId(Uuid::from_u128(1));

/// Result of one scripted run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub ticks: u64,
    pub reports: Vec<TickReport>,
    pub state_hash: u64,
    pub world_events: usize,
}

impl RunSummary {
    pub fn collisions(&self) -> usize {
        self.reports.iter().map(|r| r.collisions.len()).sum()
    }

    pub fn removals(&self) -> usize {
        self.reports.iter().map(|r| r.removed.len()).sum()
    }
}

struct Fighters {
    pyro: UserId,
    warden: UserId,
    geo: UserId,
}

/// Runs a three-user skirmish: a fire blaster, a shield holder across from
/// them, and an earthbender hurling blocks from the side. The seed moves
/// the fighters apart and seeds the world.
pub fn run(settings: &Settings, ticks: u64, seed: u64) -> anyhow::Result<RunSummary> {
    let catalog = settings.catalog()?;
    let rules = settings.rules(&catalog)?;
    let mut game = Game::new(Arc::new(catalog), Arc::new(rules), settings.engine.clone());
    game.add_world(WORLD, MemoryWorld::flat(63).with_seed(seed));
    let spacing = 8.0 + (seed % 8) as f64;
    let fighters = Fighters {
        pyro: join(&mut game, 1, DVec3::new(0.5, 64.0, 0.5), DVec3::Z, FireBlast::NAME)?,
        warden: join(
            &mut game,
            2,
            DVec3::new(0.5, 64.0, 0.5 + spacing),
            -DVec3::Z,
            FireShield::NAME,
        )?,
        geo: join(
            &mut game,
            3,
            DVec3::new(3.5, 64.0, 0.5),
            DVec3::new(0.0, -1.72, 3.0),
            EarthBlast::NAME,
        )?,
    };

    let mut input = ActivationController::new();
    let tick_ms = settings.engine.tick_ms;
    let mut reports = Vec::with_capacity(ticks as usize);
    for step in 1..=ticks {
        let now = Timestamp(step * tick_ms);
        game.set_time(now);
        script(&mut input, &mut game, &fighters, step);
        input.prune(now);
        let report = game.tick(now).remove(&WORLD).unwrap_or_default();
        if !report.collisions.is_empty() || !report.removed.is_empty() {
            tracing::debug!(step, collisions = report.collisions.len(), removed = report.removed.len(), "tick");
        }
        reports.push(report);
        if let Some(sim) = game.world_mut(WORLD) {
            sim.host.step();
        }
    }
    game.shutdown();

    let host = game
        .world(WORLD)
        .map(|sim| &sim.host)
        .ok_or_else(|| anyhow::anyhow!("world unloaded during run"))?;
    Ok(RunSummary {
        seed,
        ticks,
        reports,
        state_hash: host.state_hash(),
        world_events: host.events().len(),
    })
}

fn join(
    game: &mut Game<MemoryWorld>,
    n: u128,
    position: DVec3,
    direction: DVec3,
    ability: &str,
) -> anyhow::Result<UserId> {
    let id = UserId(Uuid::from_u128(n));
    let entity = EntityId(Uuid::from_u128(0x100 + n));
    game.world_mut(WORLD)
        .ok_or_else(|| anyhow::anyhow!("world missing"))?
        .host
        .spawn_player(entity, position, direction);
    game.add_user(
        User::new(id, entity, WORLD)
            .with_element(Element::Fire)
            .with_element(Element::Earth),
    );
    let ability = game
        .catalog()
        .by_name(ability)
        .map(|d| d.id())
        .ok_or_else(|| anyhow::anyhow!("{ability} is not registered"))?;
    if !game.bind(id, 0, ability) {
        anyhow::bail!("could not bind {ability:?}");
    }
    Ok(id)
}

fn script(input: &mut ActivationController, game: &mut Game<MemoryWorld>, f: &Fighters, step: u64) {
    if step % 40 == 1 {
        input.on_swing(game, f.pyro);
    }
    if step % 20 == 3 {
        input.on_swing(game, f.warden);
    }
    match step % 30 {
        1 => {
            input.on_sneak(game, f.geo, true);
        }
        2 => {
            input.on_sneak(game, f.geo, false);
        }
        6 => {
            input.on_swing(game, f.geo);
        }
        _ => {}
    }
}
