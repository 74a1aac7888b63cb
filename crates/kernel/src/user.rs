use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use bending_common::{AbilityId, Element, EntityId, Timestamp, UserId, WorldId};

/// Number of bind slots on a user's hotbar.
pub const SLOT_COUNT: usize = 9;

/// A bending-capable player or mob.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: UserId,
    entity: EntityId,
    world: WorldId,
    slots: [Option<AbilityId>; SLOT_COUNT],
    selected: usize,
    elements: BTreeSet<Element>,
    cooldowns: BTreeMap<AbilityId, Timestamp>,
    sneaking: bool,
}

impl User {
    pub fn new(id: UserId, entity: EntityId, world: WorldId) -> Self {
        Self {
            id,
            entity,
            world,
            slots: [None; SLOT_COUNT],
            selected: 0,
            elements: BTreeSet::new(),
            cooldowns: BTreeMap::new(),
            sneaking: false,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn world(&self) -> WorldId {
        self.world
    }

    pub fn set_world(&mut self, world: WorldId) {
        self.world = world;
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.insert(element);
        self
    }

    pub fn add_element(&mut self, element: Element) -> bool {
        self.elements.insert(element)
    }

    pub fn remove_element(&mut self, element: Element) -> bool {
        self.elements.remove(&element)
    }

    pub fn has_element(&self, element: Element) -> bool {
        self.elements.contains(&element)
    }

    /// Binds `ability` to a zero-based slot. Out-of-range slots are ignored.
    pub fn bind(&mut self, slot: usize, ability: Option<AbilityId>) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry) => {
                *entry = ability;
                true
            }
            None => false,
        }
    }

    pub fn slot(&self, slot: usize) -> Option<AbilityId> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn select_slot(&mut self, slot: usize) -> bool {
        if slot < SLOT_COUNT {
            self.selected = slot;
            true
        } else {
            false
        }
    }

    pub fn selected_slot(&self) -> usize {
        self.selected
    }

    pub fn selected_ability(&self) -> Option<AbilityId> {
        self.slots[self.selected]
    }

    /// Sets a cooldown deadline, keeping the later one if a cooldown is
    /// already running.
    pub fn set_cooldown(&mut self, ability: AbilityId, until: Timestamp) {
        let entry = self.cooldowns.entry(ability).or_insert(until);
        if until > *entry {
            *entry = until;
        }
    }

    pub fn is_on_cooldown(&self, ability: AbilityId, now: Timestamp) -> bool {
        self.cooldowns
            .get(&ability)
            .is_some_and(|until| !until.has_passed(now))
    }

    pub fn cooldown_remaining(&self, ability: AbilityId, now: Timestamp) -> Duration {
        self.cooldowns
            .get(&ability)
            .map_or(Duration::ZERO, |until| until.saturating_since(now))
    }

    pub fn clear_expired_cooldowns(&mut self, now: Timestamp) {
        self.cooldowns.retain(|_, until| !until.has_passed(now));
    }

    pub fn is_sneaking(&self) -> bool {
        self.sneaking
    }

    pub fn set_sneaking(&mut self, sneaking: bool) {
        self.sneaking = sneaking;
    }
}

/// All registered users, keyed by id for deterministic iteration.
#[derive(Debug, Clone, Default)]
pub struct UserRegistry {
    users: BTreeMap<UserId, User>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user: User) -> Option<User> {
        self.users.insert(user.id(), user)
    }

    pub fn remove(&mut self, id: UserId) -> Option<User> {
        self.users.remove(&id)
    }

    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn get_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    pub fn by_entity(&self, entity: EntityId) -> Option<&User> {
        self.users.values().find(|u| u.entity() == entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new(UserId::new(), EntityId::new(), WorldId::new())
    }

    #[test]
    fn slots_and_selection() {
        let mut u = user();
        assert!(u.bind(2, Some(AbilityId(4))));
        assert!(!u.bind(SLOT_COUNT, Some(AbilityId(1))));
        assert_eq!(u.selected_ability(), None);
        assert!(u.select_slot(2));
        assert_eq!(u.selected_ability(), Some(AbilityId(4)));
        assert!(!u.select_slot(12));
        assert_eq!(u.selected_slot(), 2);
    }

    #[test]
    fn cooldown_keeps_later_deadline() {
        let mut u = user();
        let a = AbilityId(0);
        u.set_cooldown(a, Timestamp(1_000));
        u.set_cooldown(a, Timestamp(500));
        assert!(u.is_on_cooldown(a, Timestamp(999)));
        assert!(!u.is_on_cooldown(a, Timestamp(1_000)));
        assert_eq!(u.cooldown_remaining(a, Timestamp(400)), Duration::from_millis(600));
        u.clear_expired_cooldowns(Timestamp(1_000));
        assert_eq!(u.cooldown_remaining(a, Timestamp(0)), Duration::ZERO);
    }

    #[test]
    fn registry_lookup_by_entity() {
        let mut users = UserRegistry::new();
        let u = user().with_element(Element::Fire);
        let (id, entity) = (u.id(), u.entity());
        users.insert(u);
        assert_eq!(users.by_entity(entity).map(User::id), Some(id));
        assert!(users.get(id).unwrap().has_element(Element::Fire));
        assert!(users.remove(id).is_some());
        assert!(users.is_empty());
    }
}
