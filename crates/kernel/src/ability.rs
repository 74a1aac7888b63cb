use std::time::Duration;

use bending_common::{
    AbilityId, Activation, BlockPos, BlockState, EntitySnapshot, Host, InstanceId, Owner,
    SpatialQuery, Timestamp, UserId,
};
use bending_geom::Collider;
use bending_temporal::{TempBlockError, TempBlockHandle, TempBlockManager, TempBlockRequest};
use glam::DVec3;

use crate::catalog::AbilityCatalog;
use crate::description::AbilityDescription;
use crate::user::{User, UserRegistry};

/// Outcome of one update step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    Continue,
    Remove,
}

/// Transient failure inside an instance. The manager logs it and removes
/// the instance; other instances keep running.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AbilityError {
    #[error("{0}")]
    Failed(String),
    #[error("owner {0:?} is not registered")]
    MissingUser(UserId),
    #[error("ability {0:?} is not in the catalog")]
    UnknownAbility(AbilityId),
    #[error("panicked: {0}")]
    Panicked(String),
    #[error(transparent)]
    TempBlock(#[from] TempBlockError),
}

/// One collision as seen from `instance`'s side.
///
/// Hooks may flip the removal flags; the change applies to this collision
/// only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    pub ability: AbilityId,
    pub instance: InstanceId,
    pub other_ability: AbilityId,
    pub other_instance: InstanceId,
    pub remove_self: bool,
    pub remove_other: bool,
}

impl Collision {
    /// The same collision seen from the other side.
    pub fn mirror(&self) -> Collision {
        Collision {
            ability: self.other_ability,
            instance: self.other_instance,
            other_ability: self.ability,
            other_instance: self.instance,
            remove_self: self.remove_other,
            remove_other: self.remove_self,
        }
    }
}

/// A cooldown set by an instance, applied to the user after the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownRequest {
    pub user: UserId,
    pub ability: AbilityId,
    pub until: Timestamp,
}

/// Behavior of one ability type.
///
/// Instances are created by the type's factory, activated once, and then
/// updated once per tick until `update` returns `Remove` or a collision
/// removes them.
pub trait Ability: Send {
    /// Returns `true` to be registered. A `false` result must leave the
    /// world untouched; temp blocks created here are reverted regardless.
    fn activate(&mut self, ctx: &mut AbilityContext<'_>, trigger: Activation) -> bool;

    fn update(&mut self, ctx: &mut AbilityContext<'_>) -> Result<UpdateResult, AbilityError>;

    /// Runs exactly once when the instance is removed, for any reason.
    fn on_destroy(&mut self, _ctx: &mut AbilityContext<'_>) {}

    /// Colliders for the current tick. Empty means the instance takes no
    /// part in the collision pass.
    fn colliders(&self) -> &[Collider] {
        &[]
    }

    fn on_collision(&mut self, _collision: &mut Collision) {}

    /// Input forwarded to a live instance. Returns `true` if consumed.
    fn on_trigger(&mut self, _ctx: &mut AbilityContext<'_>, _trigger: Activation) -> bool {
        false
    }

    fn on_user_move(&mut self, _ctx: &mut AbilityContext<'_>, _velocity: DVec3) {}
}

/// Borrowed view of one world for the duration of a tick or input event.
pub struct WorldAccess<'a> {
    pub now: Timestamp,
    pub host: &'a mut dyn Host,
    pub temp_blocks: &'a mut TempBlockManager,
    pub users: &'a UserRegistry,
    pub catalog: &'a AbilityCatalog,
    pub cooldowns: Vec<CooldownRequest>,
}

impl<'a> WorldAccess<'a> {
    pub fn new(
        now: Timestamp,
        host: &'a mut dyn Host,
        temp_blocks: &'a mut TempBlockManager,
        users: &'a UserRegistry,
        catalog: &'a AbilityCatalog,
    ) -> Self {
        Self {
            now,
            host,
            temp_blocks,
            users,
            catalog,
            cooldowns: Vec::new(),
        }
    }

    /// Context for one instance. Fails if the owner or type is gone.
    pub fn context(
        &mut self,
        instance: InstanceId,
        ability: AbilityId,
        user: UserId,
    ) -> Result<AbilityContext<'_>, AbilityError> {
        let description = self
            .catalog
            .get(ability)
            .ok_or(AbilityError::UnknownAbility(ability))?;
        let owner = self.users.get(user).ok_or(AbilityError::MissingUser(user))?;
        Ok(AbilityContext {
            now: self.now,
            instance,
            description,
            catalog: self.catalog,
            user: owner,
            host: &mut *self.host,
            temp_blocks: &mut *self.temp_blocks,
            cooldowns: &mut self.cooldowns,
        })
    }
}

/// Everything an instance may touch during one call.
pub struct AbilityContext<'a> {
    pub now: Timestamp,
    pub instance: InstanceId,
    pub description: &'a AbilityDescription,
    pub catalog: &'a AbilityCatalog,
    pub user: &'a User,
    pub host: &'a mut dyn Host,
    pub temp_blocks: &'a mut TempBlockManager,
    cooldowns: &'a mut Vec<CooldownRequest>,
}

impl AbilityContext<'_> {
    /// Owner tag for temp blocks created by this instance.
    pub fn owner(&self) -> Owner {
        Owner::Instance(self.instance)
    }

    /// Snapshot of the user's entity, if it is still in the world.
    pub fn user_entity(&self) -> Option<EntitySnapshot> {
        self.host.entity(self.user.entity())
    }

    pub fn add_cooldown(&mut self, duration: Duration) {
        if duration.is_zero() || self.description.bypasses_cooldown() {
            return;
        }
        self.cooldowns.push(CooldownRequest {
            user: self.user.id(),
            ability: self.description.id(),
            until: self.now + duration,
        });
    }

    /// Whether this instance may use the block as a source or target.
    pub fn can_bend(&self, pos: BlockPos) -> bool {
        self.temp_blocks.is_bendable_for(pos, self.owner())
            && self.host.is_build_allowed(self.user.id(), pos)
    }

    /// The block as this tick sees it, overrides included.
    pub fn block(&self, pos: BlockPos) -> BlockState {
        self.temp_blocks.last_valid_data(pos, &*self.host)
    }

    /// Temporarily overrides a block on behalf of this instance.
    pub fn override_block(
        &mut self,
        pos: BlockPos,
        state: BlockState,
        duration: Duration,
    ) -> Result<TempBlockHandle, TempBlockError> {
        let request = TempBlockRequest::new(state, self.owner()).duration(duration);
        self.temp_blocks
            .override_block(pos, request, self.now, &mut *self.host)
    }

    pub fn revert_block(&mut self, handle: TempBlockHandle) -> bool {
        self.temp_blocks.revert(handle, &mut *self.host)
    }
}
