//! A fast ball of fire that burns the first entity it touches.

use bending_common::{Activation, BlockPos, EntityMutation, SpatialQuery};
use bending_geom::{Collider, Sphere};
use bending_kernel::{Ability, AbilityContext, AbilityError, UpdateResult};
use glam::DVec3;

use crate::config::{FireBlastConfig, millis};
use crate::util;

pub struct FireBlast {
    config: FireBlastConfig,
    origin: DVec3,
    location: DVec3,
    direction: DVec3,
    collider: Collider,
}

impl FireBlast {
    pub const NAME: &'static str = "FireBlast";

    pub fn new(config: FireBlastConfig) -> Self {
        Self {
            config,
            origin: DVec3::ZERO,
            location: DVec3::ZERO,
            direction: DVec3::ZERO,
            collider: Collider::Dummy,
        }
    }

    pub fn location(&self) -> DVec3 {
        self.location
    }

    fn rebuild_collider(&mut self) {
        self.collider = Sphere::new(self.location, self.config.collision_radius).into();
    }
}

impl Ability for FireBlast {
    fn activate(&mut self, ctx: &mut AbilityContext<'_>, _trigger: Activation) -> bool {
        let Some(entity) = ctx.user_entity() else {
            return false;
        };
        self.direction = entity.direction.normalize_or_zero();
        if self.direction == DVec3::ZERO || util::partially_submerged(ctx, &entity) {
            return false;
        }
        self.origin = entity.eye_location() + self.direction;
        self.location = self.origin;
        self.rebuild_collider();
        ctx.add_cooldown(millis(self.config.cooldown_ms));
        true
    }

    fn update(&mut self, ctx: &mut AbilityContext<'_>) -> Result<UpdateResult, AbilityError> {
        let from = self.location;
        let step = self.direction * self.config.speed;
        self.location += step;
        if self.location.distance_squared(self.origin) > self.config.range * self.config.range {
            return Ok(UpdateResult::Remove);
        }
        let pos = BlockPos::containing(self.location);
        if !ctx.block(pos).is_transparent() || !ctx.host.is_build_allowed(ctx.user.id(), pos) {
            return Ok(UpdateResult::Remove);
        }
        self.rebuild_collider();

        let hits = util::entities_swept(ctx, from, step, self.config.collision_radius);
        let Some(target) = hits.first() else {
            return Ok(UpdateResult::Continue);
        };
        ctx.host
            .apply_damage(target.id, self.config.damage, ctx.user.id());
        tracing::debug!(instance = %ctx.instance, target = ?target.id, "fire blast hit");
        Ok(UpdateResult::Remove)
    }

    fn colliders(&self) -> &[Collider] {
        std::slice::from_ref(&self.collider)
    }
}
