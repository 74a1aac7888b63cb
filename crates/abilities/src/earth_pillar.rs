//! Raises a column of earth out of the ground, pushing whatever stands on
//! it.

use bending_common::{
    Activation, BlockFace, BlockPos, BlockState, EntityMutation, SpatialQuery, Timestamp,
};
use bending_geom::{Aabb, Collider};
use bending_kernel::{Ability, AbilityContext, AbilityError, UpdateResult};
use glam::DVec3;

use crate::config::{EarthPillarConfig, millis};
use crate::util;

/// How far the push volume reaches past the top of the column.
const PUSH_REACH: f64 = 0.65;

pub struct EarthPillar {
    config: EarthPillarConfig,
    origin: BlockPos,
    length: i32,
    distance: i32,
    risen: i32,
    next_rise: Timestamp,
    collider: Collider,
}

impl EarthPillar {
    pub const NAME: &'static str = "EarthPillar";

    const DIRECTION: BlockFace = BlockFace::Up;

    pub fn new(config: EarthPillarConfig) -> Self {
        Self {
            config,
            origin: BlockPos::new(0, 0, 0),
            length: 0,
            distance: 0,
            risen: 0,
            next_rise: Timestamp::ZERO,
            collider: Collider::Dummy,
        }
    }

    /// Blocks the column extends below `origin`, stopping at the first one
    /// that is not movable earth.
    fn validate_length(&self, ctx: &AbilityContext<'_>, max: i32) -> i32 {
        (0..max)
            .find(|&i| {
                let pos = self.origin.relative(Self::DIRECTION.opposite(), i);
                !ctx.can_bend(pos) || !ctx.block(pos).is_earth()
            })
            .unwrap_or(max)
    }

    /// Free space above `origin` the user may build in.
    fn validate_distance(&self, ctx: &AbilityContext<'_>, max: i32) -> i32 {
        (0..max)
            .find(|&i| {
                let pos = self.origin.relative(Self::DIRECTION, i + 1);
                !ctx.host.is_build_allowed(ctx.user.id(), pos)
            })
            .unwrap_or(max)
    }

    fn push_volume(&self) -> Aabb {
        let top = self.origin.relative(Self::DIRECTION, self.risen + 1);
        let bottom = top.relative(Self::DIRECTION.opposite(), self.length - 1);
        let column = top.bounds().union(&bottom.bounds());
        Aabb::new(column.min, column.max + Self::DIRECTION.direction() * PUSH_REACH)
    }

    fn push_entities(&self, ctx: &mut AbilityContext<'_>) {
        let length = f64::from(self.length);
        let factor = 0.75 * (length - 0.4 * f64::from(self.risen)) / length;
        let volume = self.push_volume();
        for entity in ctx.host.entities_in(&volume, &|_| true, None) {
            let velocity = DVec3::new(entity.velocity.x, factor, entity.velocity.z);
            ctx.host.apply_velocity(entity.id, velocity);
        }
    }

    /// Shifts the whole column one block towards `top`. Returns `false`
    /// when the column can rise no further.
    fn rise(&self, ctx: &mut AbilityContext<'_>, top: BlockPos) -> bool {
        let state = ctx.block(top);
        if state.is_lava() || !state.is_transparent_or_water() {
            return false;
        }
        let down = Self::DIRECTION.opposite();
        let revert = millis(self.config.revert_ms);
        for i in 0..self.length {
            let forward = top.relative(down, i);
            let backward = forward.relative(down, 1);
            let below = ctx.block(backward);
            if !below.is_earth() {
                let _ = ctx.override_block(forward, BlockState::Air, revert);
                return false;
            }
            if let Err(err) = ctx.override_block(forward, below.solid_type(), revert) {
                tracing::debug!(instance = %ctx.instance, %err, "pillar blocked");
                return false;
            }
        }
        let base = top.relative(down, self.length);
        ctx.override_block(base, BlockState::Air, revert)
            .is_ok()
    }
}

impl Ability for EarthPillar {
    fn activate(&mut self, ctx: &mut AbilityContext<'_>, _trigger: Activation) -> bool {
        let Some(origin) = util::target_block(ctx, self.config.select_range) else {
            return false;
        };
        self.origin = origin;
        let height = i32::try_from(self.config.height).unwrap_or(i32::MAX);
        let length = self.validate_length(ctx, height);
        if length < 1 {
            return false;
        }
        let distance = self.validate_distance(ctx, height);
        if distance < 1 {
            return false;
        }
        self.length = length;
        self.distance = distance.min(length);
        self.next_rise = ctx.now;
        self.collider = Collider::Aabb(self.push_volume());
        ctx.add_cooldown(millis(self.config.cooldown_ms));
        tracing::debug!(instance = %ctx.instance, ?origin, length, distance = self.distance, "pillar raised");
        true
    }

    fn update(&mut self, ctx: &mut AbilityContext<'_>) -> Result<UpdateResult, AbilityError> {
        if self.risen >= self.distance {
            return Ok(UpdateResult::Remove);
        }
        self.collider = Collider::Aabb(self.push_volume());
        self.push_entities(ctx);

        if !self.next_rise.has_passed(ctx.now) {
            return Ok(UpdateResult::Continue);
        }
        self.next_rise = ctx.now + millis(self.config.interval_ms);
        self.risen += 1;
        let top = self.origin.relative(Self::DIRECTION, self.risen);
        if self.rise(ctx, top) {
            Ok(UpdateResult::Continue)
        } else {
            Ok(UpdateResult::Remove)
        }
    }

    fn colliders(&self) -> &[Collider] {
        std::slice::from_ref(&self.collider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AbilitiesConfig;
    use crate::testing::Arena;

    fn arena(height: u32) -> Arena {
        let mut config = AbilitiesConfig::default();
        config.earth_pillar.height = height;
        let mut arena = Arena::with_config(&config);
        arena.look(DVec3::new(0.0, 63.9 - 65.62, 3.0));
        arena
    }

    fn column(arena: &Arena) -> Vec<BlockState> {
        (61..=66)
            .map(|y| arena.block(BlockPos::new(0, y, 3)))
            .collect()
    }

    #[test]
    fn column_rises_one_block_per_interval() {
        let mut arena = arena(3);
        assert!(arena.activate(EarthPillar::NAME, Activation::Attack));

        arena.tick(50);
        use BlockState::{Air, Stone};
        assert_eq!(column(&arena), [Air, Stone, Stone, Stone, Air, Air]);
        arena.tick(100);
        assert_eq!(column(&arena), [Air, Stone, Stone, Stone, Air, Air]);
        for now in [200, 350] {
            arena.tick(now);
        }
        assert_eq!(column(&arena), [Air, Air, Air, Stone, Stone, Stone]);
        arena.tick(400);
        assert!(!arena.is_live(EarthPillar::NAME));

        arena.tick(20_000);
        assert_eq!(column(&arena), [Stone, Stone, Stone, Air, Air, Air]);
    }

    #[test]
    fn protected_space_limits_the_rise() {
        let mut arena = arena(3);
        arena.host_mut().protect(BlockPos::new(0, 65, 3));
        assert!(arena.activate(EarthPillar::NAME, Activation::Attack));
        for now in [50, 200, 350, 500] {
            arena.tick(now);
        }
        assert!(!arena.is_live(EarthPillar::NAME));
        assert_eq!(arena.block(BlockPos::new(0, 64, 3)), BlockState::Stone);
        assert_eq!(arena.block(BlockPos::new(0, 65, 3)), BlockState::Air);
    }

    #[test]
    fn needs_earth_under_the_target() {
        let mut arena = arena(3);
        arena.host_mut().set_block(BlockPos::new(0, 63, 3), BlockState::Bedrock);
        assert!(!arena.activate(EarthPillar::NAME, Activation::Attack));
    }
}
