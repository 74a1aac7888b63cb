//! Pulls a block out of the ground and hurls it.
//!
//! Sneaking selects a source block and locks it so no one else can take
//! it. Sneaking again picks a new source. An attack launches the source: the
//! block is hollowed out and a projectile flies along the user's look
//! direction.

use bending_common::{Activation, BlockPos, BlockState, EntityMutation};
use bending_geom::{Collider, Sphere};
use bending_kernel::{Ability, AbilityContext, AbilityError, UpdateResult};
use bending_temporal::TempBlockHandle;
use glam::DVec3;

use crate::config::{EarthBlastConfig, millis};
use crate::util;

enum Stage {
    Selected(TempBlockHandle),
    Launched {
        origin: DVec3,
        location: DVec3,
        direction: DVec3,
    },
}

pub struct EarthBlast {
    config: EarthBlastConfig,
    stage: Option<Stage>,
    collider: Collider,
}

impl EarthBlast {
    pub const NAME: &'static str = "EarthBlast";

    pub fn new(config: EarthBlastConfig) -> Self {
        Self {
            config,
            stage: None,
            collider: Collider::Dummy,
        }
    }

    pub fn source(&self) -> Option<BlockPos> {
        match &self.stage {
            Some(Stage::Selected(handle)) => Some(handle.pos()),
            _ => None,
        }
    }

    pub fn is_launched(&self) -> bool {
        matches!(self.stage, Some(Stage::Launched { .. }))
    }

    /// Finds and locks a source block in front of the user.
    fn select(&self, ctx: &mut AbilityContext<'_>) -> Option<TempBlockHandle> {
        let pos = util::target_block(ctx, self.config.select_range)?;
        let state = ctx.block(pos);
        if !state.is_earth() || !ctx.can_bend(pos) {
            return None;
        }
        let handle = ctx.override_block(pos, state, std::time::Duration::ZERO).ok()?;
        ctx.temp_blocks.lock(handle);
        Some(handle)
    }

    fn launch(&mut self, ctx: &mut AbilityContext<'_>, source: TempBlockHandle) -> bool {
        let Some(entity) = ctx.user_entity() else {
            return false;
        };
        // Flies from just above the hollowed source.
        let origin = source.pos().center() + DVec3::Y;
        let target = entity.eye_location() + entity.direction * self.config.range;
        let direction = (target - origin).normalize_or_zero();
        if direction == DVec3::ZERO {
            return false;
        }
        ctx.temp_blocks.unlock(source, ctx.now, &mut *ctx.host);
        if let Err(err) =
            ctx.override_block(source.pos(), BlockState::Air, millis(self.config.revert_ms))
        {
            tracing::debug!(instance = %ctx.instance, %err, "source taken before launch");
            return false;
        }
        self.stage = Some(Stage::Launched {
            origin,
            location: origin,
            direction,
        });
        self.collider = Sphere::new(origin, self.config.collision_radius).into();
        ctx.add_cooldown(millis(self.config.cooldown_ms));
        true
    }

    fn fly(
        &mut self,
        ctx: &mut AbilityContext<'_>,
        origin: DVec3,
        mut location: DVec3,
        direction: DVec3,
    ) -> UpdateResult {
        let from = location;
        let step = direction * self.config.speed;
        location += step;
        if location.distance_squared(origin) > self.config.range * self.config.range {
            return UpdateResult::Remove;
        }
        let pos = BlockPos::containing(location);
        if !ctx.block(pos).is_transparent_or_water() {
            return UpdateResult::Remove;
        }
        self.stage = Some(Stage::Launched {
            origin,
            location,
            direction,
        });
        self.collider = Sphere::new(location, self.config.collision_radius).into();
        match util::entities_swept(ctx, from, step, self.config.collision_radius).first() {
            Some(target) => {
                ctx.host
                    .apply_damage(target.id, self.config.damage, ctx.user.id());
                UpdateResult::Remove
            }
            None => UpdateResult::Continue,
        }
    }
}

impl Ability for EarthBlast {
    fn activate(&mut self, ctx: &mut AbilityContext<'_>, _trigger: Activation) -> bool {
        match self.select(ctx) {
            Some(handle) => {
                self.stage = Some(Stage::Selected(handle));
                true
            }
            None => false,
        }
    }

    fn update(&mut self, ctx: &mut AbilityContext<'_>) -> Result<UpdateResult, AbilityError> {
        match self.stage {
            Some(Stage::Selected(handle)) => {
                let Some(entity) = ctx.user_entity() else {
                    return Ok(UpdateResult::Remove);
                };
                let reach = 2.0 * self.config.select_range;
                let lost = !ctx.temp_blocks.is_live(handle)
                    || ctx.user.selected_ability() != Some(ctx.description.id())
                    || entity.eye_location().distance_squared(handle.pos().center()) > reach * reach;
                Ok(if lost { UpdateResult::Remove } else { UpdateResult::Continue })
            }
            Some(Stage::Launched {
                origin,
                location,
                direction,
            }) => Ok(self.fly(ctx, origin, location, direction)),
            None => Ok(UpdateResult::Remove),
        }
    }

    fn on_destroy(&mut self, ctx: &mut AbilityContext<'_>) {
        if let Some(Stage::Selected(handle)) = self.stage.take() {
            ctx.revert_block(handle);
        }
    }

    fn colliders(&self) -> &[Collider] {
        if self.is_launched() {
            std::slice::from_ref(&self.collider)
        } else {
            &[]
        }
    }

    fn on_trigger(&mut self, ctx: &mut AbilityContext<'_>, trigger: Activation) -> bool {
        let Some(Stage::Selected(current)) = self.stage else {
            return false;
        };
        match trigger {
            Activation::Attack => self.launch(ctx, current),
            Activation::Sneak => {
                if let Some(next) = self.select(ctx)
                    && next != current
                {
                    ctx.revert_block(current);
                    self.stage = Some(Stage::Selected(next));
                }
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Arena;
    use bending_common::EntityId;

    const SOURCE: BlockPos = BlockPos::new(0, 63, 3);

    fn arena() -> Arena {
        let mut arena = Arena::new();
        arena.select(EarthBlast::NAME);
        arena.look(DVec3::new(0.0, 63.9 - 65.62, 3.0));
        arena
    }

    #[test]
    fn selected_source_is_locked_against_others() {
        let mut arena = arena();
        assert!(arena.activate(EarthBlast::NAME, Activation::Sneak));
        let world = arena.world_sim();
        let record = world.temp_blocks.get(SOURCE).unwrap();
        assert!(record.is_locked());
        assert!(!world.temp_blocks.is_bendable(SOURCE));
        assert_eq!(arena.block(SOURCE), BlockState::Stone);
    }

    #[test]
    fn attack_launches_and_hits() {
        let mut arena = arena();
        let target = EntityId::new();
        arena.host_mut().spawn_player(target, DVec3::new(0.5, 64.0, 8.5), -DVec3::Z);
        assert!(arena.activate(EarthBlast::NAME, Activation::Sneak));
        arena.look(DVec3::Z);
        assert!(arena.trigger(EarthBlast::NAME, Activation::Attack));
        assert_eq!(arena.block(SOURCE), BlockState::Air);

        for step in 1..=10 {
            arena.tick(step * 50);
        }
        assert_eq!(arena.host().health(target), Some(17.75));
        assert!(!arena.is_live(EarthBlast::NAME));

        arena.tick(20_000);
        assert_eq!(arena.block(SOURCE), BlockState::Stone);
    }

    #[test]
    fn abandoned_source_is_restored() {
        let mut arena = arena();
        assert!(arena.activate(EarthBlast::NAME, Activation::Sneak));
        arena.select(crate::FireBlast::NAME);
        arena.tick(50);
        assert!(!arena.is_live(EarthBlast::NAME));
        assert!(arena.world_sim().temp_blocks.get(SOURCE).is_none());
        assert_eq!(arena.block(SOURCE), BlockState::Stone);
    }

    #[test]
    fn sneaking_again_moves_the_selection() {
        let mut arena = arena();
        assert!(arena.activate(EarthBlast::NAME, Activation::Sneak));
        arena.look(DVec3::new(0.0, 63.9 - 65.62, 2.0));
        assert!(arena.trigger(EarthBlast::NAME, Activation::Sneak));
        let world = arena.world_sim();
        assert!(world.temp_blocks.get(SOURCE).is_none());
        assert!(world.temp_blocks.get(BlockPos::new(0, 63, 2)).unwrap().is_locked());
    }
}
