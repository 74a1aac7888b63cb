use bending_common::{BlockPos, EntitySnapshot, SpatialQuery};
use bending_geom::{Aabb, Collider, Ray};
use bending_kernel::AbilityContext;
use glam::DVec3;

const RAY_STEP: f64 = 0.1;

/// First non-transparent block along the user's line of sight, within
/// `range` of their eyes.
pub(crate) fn target_block(ctx: &AbilityContext<'_>, range: f64) -> Option<BlockPos> {
    let entity = ctx.user_entity()?;
    let eye = entity.eye_location();
    let direction = entity.direction.normalize_or_zero();
    if direction == DVec3::ZERO {
        return None;
    }
    let steps = (range / RAY_STEP).ceil() as u32;
    let mut last = None;
    for i in 1..=steps {
        let pos = BlockPos::containing(eye + direction * (f64::from(i) * RAY_STEP));
        if last == Some(pos) {
            continue;
        }
        last = Some(pos);
        if !ctx.block(pos).is_transparent() {
            return Some(pos);
        }
    }
    None
}

/// Entities other than the user whose bounds touch `collider`, in host
/// order.
pub(crate) fn entities_hit(ctx: &AbilityContext<'_>, collider: &Collider) -> Vec<EntitySnapshot> {
    let own = ctx.user.entity();
    let filter =
        |e: &EntitySnapshot| e.id != own && collider.intersects(&Collider::Aabb(e.bounds()));
    ctx.host.entities_in(&collider.bounds(), &filter, None)
}

/// Entities other than the user touched by a ball of `radius` moving from
/// `from` by `step` this tick, nearest first. Catches targets a fast
/// projectile would otherwise skip between two ticks.
pub(crate) fn entities_swept(
    ctx: &AbilityContext<'_>,
    from: DVec3,
    step: DVec3,
    radius: f64,
) -> Vec<EntitySnapshot> {
    let own = ctx.user.entity();
    let path = Ray::new(from, step);
    let hit = |e: &EntitySnapshot| path.cast_aabb(&e.bounds().grow_uniform(radius));
    let filter = |e: &EntitySnapshot| e.id != own && hit(e).is_some();
    let mut hits = ctx
        .host
        .entities_in(&Aabb::from_ray(from, step, radius), &filter, None);
    hits.sort_by(|a, b| {
        let (ta, tb) = (hit(a).unwrap_or(1.0), hit(b).unwrap_or(1.0));
        ta.total_cmp(&tb)
    });
    hits
}

/// Whether the user's feet or eyes are inside water or lava.
pub(crate) fn partially_submerged(ctx: &AbilityContext<'_>, entity: &EntitySnapshot) -> bool {
    [entity.position, entity.eye_location()]
        .into_iter()
        .map(|p| ctx.block(BlockPos::containing(p)))
        .any(|state| state.is_water() || state.is_lava())
}
