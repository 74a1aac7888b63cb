//! Propels the user along their look direction for a short time.

use bending_common::{Activation, EntityMutation, Timestamp};
use bending_kernel::{Ability, AbilityContext, AbilityError, UpdateResult};
use glam::DVec3;

use crate::config::{FireJetConfig, millis};
use crate::util;

pub struct FireJet {
    config: FireJetConfig,
    ends_at: Timestamp,
}

impl FireJet {
    pub const NAME: &'static str = "FireJet";

    pub fn new(config: FireJetConfig) -> Self {
        Self {
            config,
            ends_at: Timestamp::ZERO,
        }
    }

    fn push(&self, ctx: &mut AbilityContext<'_>) -> bool {
        let Some(entity) = ctx.user_entity() else {
            return false;
        };
        let direction = entity.direction.normalize_or_zero();
        if direction == DVec3::ZERO || util::partially_submerged(ctx, &entity) {
            return false;
        }
        ctx.host
            .apply_velocity(entity.id, direction * self.config.speed);
        true
    }
}

impl Ability for FireJet {
    fn activate(&mut self, ctx: &mut AbilityContext<'_>, _trigger: Activation) -> bool {
        self.ends_at = ctx.now + millis(self.config.duration_ms);
        self.push(ctx)
    }

    fn update(&mut self, ctx: &mut AbilityContext<'_>) -> Result<UpdateResult, AbilityError> {
        if self.ends_at.has_passed(ctx.now) || !self.push(ctx) {
            return Ok(UpdateResult::Remove);
        }
        Ok(UpdateResult::Continue)
    }

    fn on_destroy(&mut self, ctx: &mut AbilityContext<'_>) {
        ctx.add_cooldown(millis(self.config.cooldown_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Arena;
    use bending_common::BlockPos;
    use bending_common::BlockState;
    use bending_kernel::WorldEvent;

    #[test]
    fn pushes_until_the_duration_ends() {
        let mut arena = Arena::new();
        assert!(arena.activate(FireJet::NAME, Activation::Attack));
        let pushes = |arena: &Arena| {
            arena
                .host()
                .events()
                .iter()
                .filter(|e| matches!(e, WorldEvent::VelocityApplied { .. }))
                .count()
        };
        assert_eq!(pushes(&arena), 1);

        for step in 1..=39 {
            arena.tick(step * 50);
        }
        assert_eq!(pushes(&arena), 40);
        assert!(arena.is_live(FireJet::NAME));

        arena.tick(2_000);
        assert!(!arena.is_live(FireJet::NAME));
        assert!(arena.on_cooldown(FireJet::NAME, 8_999));
    }

    #[test]
    fn refuses_under_water() {
        let mut arena = Arena::new();
        arena.host_mut().set_block(BlockPos::new(0, 64, 0), BlockState::Water);
        assert!(!arena.activate(FireJet::NAME, Activation::Attack));
    }
}
