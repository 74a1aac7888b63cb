use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use bending_collision::CollisionRegistry;
use bending_common::{AbilityId, Activation, InstanceId, Owner, UserId};
use bending_geom::Collider;
use glam::DVec3;
use serde::Serialize;

use crate::ability::{Ability, AbilityError, Collision, UpdateResult, WorldAccess};

/// Why an instance left the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalCause {
    /// `update` returned `Remove`.
    Completed,
    /// A collision rule removed it.
    Collided,
    /// `update` or a hook failed or panicked.
    Faulted,
    /// Destroyed from outside: exclusivity, logout, world unload.
    Forced,
}

/// What one tick did, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub updated: usize,
    pub collisions: Vec<(InstanceId, InstanceId)>,
    pub removed: Vec<(InstanceId, RemovalCause)>,
    pub reverted_blocks: usize,
}

struct Entry {
    id: InstanceId,
    user: UserId,
    ability: AbilityId,
    instance: Box<dyn Ability>,
}

/// Registry and scheduler of the live ability instances of one world.
#[derive(Default)]
pub struct AbilityManager {
    entries: Vec<Entry>,
    next_id: u64,
}

impl AbilityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Allocates the id the next instance will be registered under.
    pub fn reserve_id(&mut self) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Registers an activated instance. It is first updated on the next tick.
    pub fn add_ability(
        &mut self,
        id: InstanceId,
        user: UserId,
        ability: AbilityId,
        instance: Box<dyn Ability>,
    ) {
        tracing::debug!(instance = %id, ?ability, ?user, "ability added");
        self.entries.push(Entry {
            id,
            user,
            ability,
            instance,
        });
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn has_ability(&self, user: UserId, ability: AbilityId) -> bool {
        self.entries
            .iter()
            .any(|e| e.user == user && e.ability == ability)
    }

    pub fn user_instance_ids(&self, user: UserId) -> Vec<InstanceId> {
        self.entries
            .iter()
            .filter(|e| e.user == user)
            .map(|e| e.id)
            .collect()
    }

    /// `(instance, user, ability)` for every live instance, in insertion order.
    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, UserId, AbilityId)> + '_ {
        self.entries.iter().map(|e| (e.id, e.user, e.ability))
    }

    /// Advances every instance once, resolves collisions, then removes
    /// finished instances.
    pub fn tick(&mut self, access: &mut WorldAccess<'_>, rules: &CollisionRegistry) -> TickReport {
        let _span =
            tracing::info_span!("ability_tick", now = %access.now, instances = self.entries.len())
                .entered();
        let mut report = TickReport::default();
        let mut removals: BTreeMap<InstanceId, RemovalCause> = BTreeMap::new();

        for entry in &mut self.entries {
            report.updated += 1;
            match run_update(entry, access) {
                Ok(UpdateResult::Continue) => {}
                Ok(UpdateResult::Remove) => {
                    removals.insert(entry.id, RemovalCause::Completed);
                }
                Err(err) => {
                    tracing::warn!(instance = %entry.id, ability = ?entry.ability, %err, "ability update failed");
                    removals.insert(entry.id, RemovalCause::Faulted);
                }
            }
        }

        self.collision_pass(rules, &mut removals, &mut report);
        self.finalize(&removals, access, &mut report);
        report
    }

    fn collision_pass(
        &mut self,
        rules: &CollisionRegistry,
        removals: &mut BTreeMap<InstanceId, RemovalCause>,
        report: &mut TickReport,
    ) {
        // Instances already queued for removal still take part.
        let candidates: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.instance.colliders().is_empty())
            .map(|(i, _)| i)
            .collect();

        for (n, &i) in candidates.iter().enumerate() {
            for &j in &candidates[n + 1..] {
                let (left, right) = self.entries.split_at_mut(j);
                let (first, second) = (&mut left[i], &mut right[0]);
                let Some(rule) = rules.rule_for(first.ability, second.ability) else {
                    continue;
                };
                if first.user == second.user && !rule.allow_same_user {
                    continue;
                }
                if !colliders_touch(first.instance.colliders(), second.instance.colliders()) {
                    continue;
                }

                let (remove_self, remove_other) = rule.removal_for(first.ability);
                let mut notice = Collision {
                    ability: first.ability,
                    instance: first.id,
                    other_ability: second.ability,
                    other_instance: second.id,
                    remove_self,
                    remove_other,
                };
                report.collisions.push((first.id, second.id));
                tracing::debug!(first = %first.id, second = %second.id, remove_self, remove_other, "collision");

                if let Err(err) = deliver(first, &mut notice) {
                    tracing::warn!(instance = %first.id, %err, "collision hook failed");
                    removals.entry(first.id).or_insert(RemovalCause::Faulted);
                }
                let mut mirrored = notice.mirror();
                if let Err(err) = deliver(second, &mut mirrored) {
                    tracing::warn!(instance = %second.id, %err, "collision hook failed");
                    removals.entry(second.id).or_insert(RemovalCause::Faulted);
                }
                if mirrored.remove_other {
                    removals.entry(first.id).or_insert(RemovalCause::Collided);
                }
                if mirrored.remove_self {
                    removals.entry(second.id).or_insert(RemovalCause::Collided);
                }
            }
        }
    }

    fn finalize(
        &mut self,
        removals: &BTreeMap<InstanceId, RemovalCause>,
        access: &mut WorldAccess<'_>,
        report: &mut TickReport,
    ) {
        if removals.is_empty() {
            return;
        }
        let entries = std::mem::take(&mut self.entries);
        for entry in entries {
            match removals.get(&entry.id) {
                Some(&cause) => {
                    report.removed.push((entry.id, cause));
                    destroy(entry, cause, access);
                }
                None => self.entries.push(entry),
            }
        }
    }

    /// Removes one instance. Returns `false` if it was not registered.
    pub fn destroy_instance(&mut self, id: InstanceId, access: &mut WorldAccess<'_>) -> bool {
        self.destroy_where(access, |e| e.id == id) > 0
    }

    /// Removes every instance of `ability` owned by `user`.
    pub fn destroy_user_instances_of_type(
        &mut self,
        user: UserId,
        ability: AbilityId,
        access: &mut WorldAccess<'_>,
    ) -> usize {
        self.destroy_where(access, |e| e.user == user && e.ability == ability)
    }

    pub fn destroy_user_instances(&mut self, user: UserId, access: &mut WorldAccess<'_>) -> usize {
        self.destroy_where(access, |e| e.user == user)
    }

    pub fn destroy_all(&mut self, access: &mut WorldAccess<'_>) -> usize {
        self.destroy_where(access, |_| true)
    }

    fn destroy_where(
        &mut self,
        access: &mut WorldAccess<'_>,
        predicate: impl Fn(&Entry) -> bool,
    ) -> usize {
        let entries = std::mem::take(&mut self.entries);
        let mut count = 0;
        for entry in entries {
            if predicate(&entry) {
                destroy(entry, RemovalCause::Forced, access);
                count += 1;
            } else {
                self.entries.push(entry);
            }
        }
        count
    }

    /// Offers an input to the user's live instances of `ability`, oldest
    /// first. Stops at the first instance that consumes it.
    pub fn forward_trigger(
        &mut self,
        user: UserId,
        ability: AbilityId,
        trigger: Activation,
        access: &mut WorldAccess<'_>,
    ) -> bool {
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.user == user && e.ability == ability)
        {
            let Ok(mut ctx) = access.context(entry.id, entry.ability, entry.user) else {
                continue;
            };
            let consumed = catch_unwind(AssertUnwindSafe(|| entry.instance.on_trigger(&mut ctx, trigger)));
            match consumed {
                Ok(true) => return true,
                Ok(false) => {}
                Err(payload) => {
                    tracing::warn!(instance = %entry.id, panic = %panic_message(payload.as_ref()), "trigger hook panicked");
                }
            }
        }
        false
    }

    /// Tells every live instance of `user` that the user moved.
    pub fn forward_move(&mut self, user: UserId, velocity: DVec3, access: &mut WorldAccess<'_>) {
        for entry in self.entries.iter_mut().filter(|e| e.user == user) {
            let Ok(mut ctx) = access.context(entry.id, entry.ability, entry.user) else {
                continue;
            };
            if let Err(payload) =
                catch_unwind(AssertUnwindSafe(|| entry.instance.on_user_move(&mut ctx, velocity)))
            {
                tracing::warn!(instance = %entry.id, panic = %panic_message(payload.as_ref()), "move hook panicked");
            }
        }
    }
}

fn run_update(entry: &mut Entry, access: &mut WorldAccess<'_>) -> Result<UpdateResult, AbilityError> {
    let mut ctx = access.context(entry.id, entry.ability, entry.user)?;
    catch_unwind(AssertUnwindSafe(|| entry.instance.update(&mut ctx)))
        .unwrap_or_else(|payload| Err(AbilityError::Panicked(panic_message(payload.as_ref()))))
}

fn deliver(entry: &mut Entry, notice: &mut Collision) -> Result<(), AbilityError> {
    catch_unwind(AssertUnwindSafe(|| entry.instance.on_collision(notice)))
        .map_err(|payload| AbilityError::Panicked(panic_message(payload.as_ref())))
}

/// Runs the destroy hook and releases the instance's temp block locks.
fn destroy(mut entry: Entry, cause: RemovalCause, access: &mut WorldAccess<'_>) {
    match access.context(entry.id, entry.ability, entry.user) {
        Ok(mut ctx) => {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| entry.instance.on_destroy(&mut ctx))) {
                tracing::warn!(instance = %entry.id, panic = %panic_message(payload.as_ref()), "destroy hook panicked");
            }
        }
        Err(err) => {
            tracing::warn!(instance = %entry.id, %err, "destroy hook skipped");
        }
    }
    let released = access
        .temp_blocks
        .release_owner(Owner::Instance(entry.id), access.now, &mut *access.host);
    tracing::debug!(instance = %entry.id, ?cause, released, "ability removed");
}

/// Broad phase on bounds, then narrow phase; stops at the first hit.
fn colliders_touch(a: &[Collider], b: &[Collider]) -> bool {
    let union = |colliders: &[Collider]| {
        colliders
            .iter()
            .fold(bending_geom::Aabb::DUMMY, |acc, c| acc.union(&c.bounds()))
    };
    if !union(a).intersects(&union(b)) {
        return false;
    }
    a.iter().any(|ca| {
        let bounds = ca.bounds();
        b.iter()
            .any(|cb| bounds.intersects(&cb.bounds()) && ca.intersects(cb))
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
