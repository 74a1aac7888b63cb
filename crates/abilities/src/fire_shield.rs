//! A wall of fire in front of the user, or a sphere around them while they
//! sneak.

use std::collections::BTreeMap;
use std::time::Duration;

use bending_common::{AbilityId, Activation, EntityId, EntityMutation, EntitySnapshot, Timestamp};
use bending_geom::{Aabb, Collider, Disk, Obb, Sphere};
use bending_kernel::{Ability, AbilityContext, AbilityError, Collision, UpdateResult};
use glam::{DQuat, DVec3};

use crate::config::{FireShieldConfig, millis};
use crate::util;

/// Abilities the disk slows down but does not destroy.
const DISK_PASSTHROUGH: [&str; 2] = ["EarthBlast", "WaterManipulation"];

/// Minimum time between two burns of the same entity.
const BURN_INTERVAL: Duration = Duration::from_millis(500);

pub struct FireShield {
    config: FireShieldConfig,
    sphere: bool,
    expires_at: Timestamp,
    collider: Collider,
    burned: BTreeMap<EntityId, Timestamp>,
    passthrough: Vec<AbilityId>,
}

impl FireShield {
    pub const NAME: &'static str = "FireShield";

    pub fn new(config: FireShieldConfig) -> Self {
        Self {
            config,
            sphere: false,
            expires_at: Timestamp::ZERO,
            collider: Collider::Dummy,
            burned: BTreeMap::new(),
            passthrough: Vec::new(),
        }
    }

    pub fn is_sphere(&self) -> bool {
        self.sphere
    }

    fn shape(&self, entity: &EntitySnapshot) -> Collider {
        if self.sphere {
            return Sphere::new(entity.center(), self.config.shield_radius).into();
        }
        let direction = entity.direction.normalize_or_zero();
        if direction == DVec3::ZERO {
            return Collider::Dummy;
        }
        let r = self.config.disk_radius;
        let location = entity.eye_location() + direction * self.config.disk_range;
        let rotation = DQuat::from_rotation_arc(DVec3::Z, direction);
        let plate = Obb::new(Aabb::new(DVec3::new(-r, -r, -1.0), DVec3::new(r, r, 1.0)), rotation);
        Disk::new(plate, Sphere::template(r)).at(location).into()
    }

    fn on_entity_hit(&mut self, ctx: &mut AbilityContext<'_>, entity: &EntitySnapshot) {
        if self.sphere && entity.projectile {
            ctx.host.remove_entity(entity.id);
            return;
        }
        if self
            .burned
            .get(&entity.id)
            .is_some_and(|until| !until.has_passed(ctx.now))
        {
            return;
        }
        ctx.host
            .apply_damage(entity.id, self.config.damage, ctx.user.id());
        self.burned.insert(entity.id, ctx.now + BURN_INTERVAL);
    }
}

impl Ability for FireShield {
    fn activate(&mut self, ctx: &mut AbilityContext<'_>, trigger: Activation) -> bool {
        let Some(entity) = ctx.user_entity() else {
            return false;
        };
        if entity.direction.normalize_or_zero() == DVec3::ZERO
            || util::partially_submerged(ctx, &entity)
        {
            return false;
        }
        self.sphere = trigger == Activation::Sneak;
        let duration = if self.sphere {
            self.config.shield_duration_ms
        } else {
            self.config.disk_duration_ms
        };
        self.expires_at = ctx.now + millis(duration);
        self.passthrough = DISK_PASSTHROUGH
            .iter()
            .filter_map(|name| ctx.catalog.by_name(name).map(|d| d.id()))
            .collect();
        self.collider = self.shape(&entity);
        true
    }

    fn update(&mut self, ctx: &mut AbilityContext<'_>) -> Result<UpdateResult, AbilityError> {
        if self.expires_at.has_passed(ctx.now)
            || ctx.user.selected_ability() != Some(ctx.description.id())
            || (self.sphere && !ctx.user.is_sneaking())
        {
            return Ok(UpdateResult::Remove);
        }
        let Some(entity) = ctx.user_entity() else {
            return Ok(UpdateResult::Remove);
        };
        if util::partially_submerged(ctx, &entity) {
            return Ok(UpdateResult::Remove);
        }
        self.collider = self.shape(&entity);
        self.burned.retain(|_, until| !until.has_passed(ctx.now));
        for hit in util::entities_hit(ctx, &self.collider) {
            self.on_entity_hit(ctx, &hit);
        }
        Ok(UpdateResult::Continue)
    }

    fn on_destroy(&mut self, ctx: &mut AbilityContext<'_>) {
        let cooldown = if self.sphere {
            self.config.shield_cooldown_ms
        } else {
            self.config.disk_cooldown_ms
        };
        ctx.add_cooldown(millis(cooldown));
    }

    fn colliders(&self) -> &[Collider] {
        std::slice::from_ref(&self.collider)
    }

    fn on_collision(&mut self, collision: &mut Collision) {
        if !self.sphere && collision.remove_other && self.passthrough.contains(&collision.other_ability)
        {
            collision.remove_other = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Arena;
    use bending_common::{InstanceId, SpatialQuery};

    fn notice(other_ability: AbilityId) -> Collision {
        Collision {
            ability: AbilityId(1),
            instance: InstanceId(0),
            other_ability,
            other_instance: InstanceId(1),
            remove_self: false,
            remove_other: true,
        }
    }

    #[test]
    fn disk_lets_heavy_projectiles_through() {
        let mut shield = FireShield::new(FireShieldConfig::default());
        shield.passthrough = vec![AbilityId(4)];

        let mut earth = notice(AbilityId(4));
        shield.on_collision(&mut earth);
        assert!(!earth.remove_other);

        let mut fire = notice(AbilityId(0));
        shield.on_collision(&mut fire);
        assert!(fire.remove_other);

        shield.sphere = true;
        let mut earth = notice(AbilityId(4));
        shield.on_collision(&mut earth);
        assert!(earth.remove_other);
    }

    #[test]
    fn disk_burns_each_entity_once_per_interval() {
        let mut arena = Arena::new();
        arena.select(FireShield::NAME);
        let target = EntityId::new();
        arena.host_mut().spawn_player(target, DVec3::new(0.5, 64.0, 2.0), -DVec3::Z);

        assert!(arena.activate(FireShield::NAME, Activation::Attack));
        for step in 1..=10 {
            arena.tick(step * 50);
        }
        assert_eq!(arena.host().health(target), Some(19.5));
        arena.tick(550);
        assert_eq!(arena.host().health(target), Some(19.0));

        arena.tick(1_000);
        assert!(!arena.is_live(FireShield::NAME));
        assert!(arena.on_cooldown(FireShield::NAME, 1_999));
        assert!(!arena.on_cooldown(FireShield::NAME, 2_000));
    }

    #[test]
    fn sphere_needs_sneaking_and_eats_projectiles() {
        let mut arena = Arena::new();
        arena.select(FireShield::NAME);
        arena.set_sneaking(true);
        let arrow = EntityId::new();
        arena.host_mut().spawn(
            EntitySnapshot {
                id: arrow,
                position: DVec3::new(2.0, 64.5, 0.5),
                direction: -DVec3::X,
                velocity: -DVec3::X,
                width: 0.5,
                height: 0.5,
                eye_height: 0.25,
                projectile: true,
            },
            1.0,
        );

        assert!(arena.activate(FireShield::NAME, Activation::Sneak));
        arena.tick(50);
        assert!(arena.host().entity(arrow).is_none());
        assert!(arena.is_live(FireShield::NAME));

        arena.set_sneaking(false);
        arena.tick(100);
        assert!(!arena.is_live(FireShield::NAME));
        assert!(arena.on_cooldown(FireShield::NAME, 2_099));
    }

    #[test]
    fn disk_without_a_look_direction_has_no_shape() {
        let shield = FireShield::new(FireShieldConfig::default());
        let mut entity = EntitySnapshot {
            id: EntityId::new(),
            position: DVec3::new(0.5, 64.0, 0.5),
            direction: DVec3::ZERO,
            velocity: DVec3::ZERO,
            width: 0.6,
            height: 1.8,
            eye_height: 1.62,
            projectile: false,
        };
        assert_eq!(shield.shape(&entity), Collider::Dummy);

        entity.direction = DVec3::new(0.0, 0.0, 4.0);
        let disk = shield.shape(&entity);
        assert!(!disk.is_dummy());
        assert!(disk.position().is_finite());
    }

    #[test]
    fn switching_slots_drops_the_shield() {
        let mut arena = Arena::new();
        arena.select(FireShield::NAME);
        assert!(arena.activate(FireShield::NAME, Activation::Attack));
        arena.select(crate::FireBlast::NAME);
        arena.tick(50);
        assert!(!arena.is_live(FireShield::NAME));
    }
}
