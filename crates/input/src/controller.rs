use std::collections::{BTreeMap, BTreeSet};
use std::panic::{AssertUnwindSafe, catch_unwind};

use bending_common::{AbilityId, Activation, Host, Owner, PermissionService, Timestamp, UserId};
use bending_kernel::Game;
use glam::DVec3;

/// Entry point for user input.
///
/// Holds the per-user swing-ignore deadlines; everything else lives in the
/// [`Game`].
#[derive(Debug, Clone, Default)]
pub struct ActivationController {
    ignore_swing: BTreeMap<UserId, Timestamp>,
}

impl ActivationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates the user's selected ability with `trigger`.
    pub fn activate<H: Host>(&mut self, game: &mut Game<H>, user: UserId, trigger: Activation) -> bool {
        let Some(ability) = game.user(user).and_then(|u| u.selected_ability()) else {
            return false;
        };
        self.activate_ability(game, user, ability, trigger)
    }

    /// Validates and starts one instance of `ability` for `user`.
    ///
    /// The type must accept `trigger`, the user must have its element and
    /// permission and be off cooldown, and single-instance types must not
    /// already be running. The instance is registered only if its own
    /// `activate` succeeds; otherwise every temp block it created is
    /// reverted, blocks it took over go back to their previous owner, and
    /// its cooldowns are dropped.
    pub fn activate_ability<H: Host>(
        &mut self,
        game: &mut Game<H>,
        user: UserId,
        ability: AbilityId,
        trigger: Activation,
    ) -> bool {
        let now = game.now();
        let max_instances = game.config().max_instances;
        let Some(owner) = game.user(user) else {
            return false;
        };
        let Some(description) = game.catalog().get(ability) else {
            return false;
        };
        if !description.is_activated_by(trigger) || !owner.has_element(description.element()) {
            return false;
        }
        if !description.bypasses_cooldown() && owner.is_on_cooldown(ability, now) {
            tracing::debug!(?user, ability = description.name(), "activation blocked by cooldown");
            return false;
        }
        let world = owner.world();
        let single_instance = description.is_single_instance();
        let permission = description.permission();

        game.with_world(world, |manager, access| {
            if !access.host.has_permission(user, &permission) {
                return false;
            }
            if single_instance && manager.has_ability(user, ability) {
                return false;
            }
            if manager.len() >= max_instances {
                tracing::warn!(instances = manager.len(), "instance limit reached, activation refused");
                return false;
            }
            let Some(description) = access.catalog.get(ability) else {
                return false;
            };
            let mut instance = description.create();
            let id = manager.reserve_id();
            let queued_cooldowns = access.cooldowns.len();
            access.temp_blocks.begin_journal();

            let activated = match access.context(id, ability, user) {
                Ok(mut ctx) => catch_unwind(AssertUnwindSafe(|| instance.activate(&mut ctx, trigger)))
                    .unwrap_or_else(|_| {
                        tracing::warn!(instance = %id, "ability panicked during activation");
                        false
                    }),
                Err(err) => {
                    tracing::warn!(instance = %id, %err, "activation context unavailable");
                    false
                }
            };

            if activated {
                access.temp_blocks.commit_journal();
                manager.add_ability(id, user, ability, instance);
            } else {
                access.cooldowns.truncate(queued_cooldowns);
                let reverted = access
                    .temp_blocks
                    .rollback_journal(Owner::Instance(id), &mut *access.host);
                if reverted > 0 {
                    tracing::debug!(instance = %id, reverted, "failed activation rolled back");
                }
            }
            activated
        })
        .unwrap_or(false)
    }

    /// Left click. Ignored inside the window armed by an interact. Otherwise
    /// removes the user's swing-cancelled toggles; if none were running the
    /// swing is offered to live instances of the selected ability and
    /// finally starts a new one.
    pub fn on_swing<H: Host>(&mut self, game: &mut Game<H>, user: UserId) -> bool {
        let now = game.now();
        if self.is_ignoring_swing(user, now) {
            return false;
        }
        self.ignore_swing.remove(&user);
        let Some(owner) = game.user(user) else {
            return false;
        };
        let world = owner.world();
        let selected = owner.selected_ability();

        let removed = game
            .with_world(world, |manager, access| {
                let toggles: BTreeSet<AbilityId> = manager
                    .instances()
                    .filter(|(_, u, a)| {
                        *u == user && access.catalog.get(*a).is_some_and(|d| d.cancels_on_swing())
                    })
                    .map(|(_, _, a)| a)
                    .collect();
                toggles
                    .into_iter()
                    .map(|a| manager.destroy_user_instances_of_type(user, a, access))
                    .sum::<usize>()
            })
            .unwrap_or(0);
        if removed > 0 {
            return true;
        }

        if let Some(ability) = selected
            && self.forward(game, user, ability, Activation::Attack)
        {
            return true;
        }
        self.activate(game, user, Activation::Attack)
    }

    /// Sneak pressed or released.
    pub fn on_sneak<H: Host>(&mut self, game: &mut Game<H>, user: UserId, sneaking: bool) -> bool {
        let Some(owner) = game.user_mut(user) else {
            return false;
        };
        owner.set_sneaking(sneaking);
        let selected = owner.selected_ability();
        let trigger = if sneaking {
            Activation::Sneak
        } else {
            Activation::SneakRelease
        };
        if let Some(ability) = selected
            && self.forward(game, user, ability, trigger)
        {
            return true;
        }
        self.activate(game, user, trigger)
    }

    /// Right click. Arms the swing-ignore window, since clients send a swing
    /// right after most interacts.
    pub fn on_interact<H: Host>(&mut self, game: &mut Game<H>, user: UserId, trigger: Activation) -> bool {
        if !trigger.is_interact() {
            return false;
        }
        self.ignore_next_swing(user, game.now() + game.config().swing_ignore());
        self.activate(game, user, trigger)
    }

    /// Forwards the horizontal part of the user's movement to their live
    /// instances.
    pub fn on_move<H: Host>(&mut self, game: &mut Game<H>, user: UserId, velocity: DVec3) {
        let Some(world) = game.user(user).map(|u| u.world()) else {
            return;
        };
        let horizontal = DVec3::new(velocity.x, 0.0, velocity.z);
        game.with_world(world, |manager, access| {
            manager.forward_move(user, horizontal, access);
        });
    }

    /// The user landed from a fall.
    pub fn on_fall<H: Host>(&mut self, game: &mut Game<H>, user: UserId) -> bool {
        self.activate(game, user, Activation::Fall)
    }

    /// Destroys the user's instances, forgets the user and their ignore
    /// window.
    pub fn on_logout<H: Host>(&mut self, game: &mut Game<H>, user: UserId) {
        self.ignore_swing.remove(&user);
        if game.remove_user(user).is_some() {
            tracing::debug!(?user, "user logged out");
        }
    }

    /// Swings before `until` are ignored.
    pub fn ignore_next_swing(&mut self, user: UserId, until: Timestamp) {
        self.ignore_swing.insert(user, until);
    }

    pub fn is_ignoring_swing(&self, user: UserId, now: Timestamp) -> bool {
        self.ignore_swing
            .get(&user)
            .is_some_and(|until| !until.has_passed(now))
    }

    /// Drops ignore windows that have elapsed.
    pub fn prune(&mut self, now: Timestamp) {
        self.ignore_swing.retain(|_, until| !until.has_passed(now));
    }

    fn forward<H: Host>(&self, game: &mut Game<H>, user: UserId, ability: AbilityId, trigger: Activation) -> bool {
        let Some(world) = game.user(user).map(|u| u.world()) else {
            return false;
        };
        game.with_world(world, |manager, access| {
            manager.forward_trigger(user, ability, trigger, access)
        })
        .unwrap_or(false)
    }
}
