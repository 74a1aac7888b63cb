use std::hash::{Hash, Hasher};

use bending_common::AbilityId;
use serde::Serialize;

/// An unordered rule between two ability types.
///
/// `remove_first` applies to `first`, `remove_second` to `second`. Equality
/// and hashing use the canonical key only, so `(a, b)` and `(b, a)` are the
/// same pair.
#[derive(Debug, Clone, Serialize)]
pub struct CollisionPair {
    pub first: AbilityId,
    pub second: AbilityId,
    pub remove_first: bool,
    pub remove_second: bool,
    /// Instances of the same user may collide under this rule.
    pub allow_same_user: bool,
    key: String,
}

impl CollisionPair {
    pub fn new(
        first: (AbilityId, &str),
        second: (AbilityId, &str),
        remove_first: bool,
        remove_second: bool,
    ) -> Self {
        Self {
            first: first.0,
            second: second.0,
            remove_first,
            remove_second,
            allow_same_user: false,
            key: canonical_key(first.1, second.1),
        }
    }

    /// `"{larger}-{smaller}"` of the two type names.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn involves(&self, ability: AbilityId) -> bool {
        self.first == ability || self.second == ability
    }

    /// Whether a collision under this rule removes an instance of `ability`.
    pub fn removes(&self, ability: AbilityId) -> bool {
        if ability == self.first {
            self.remove_first
        } else if ability == self.second {
            self.remove_second
        } else {
            false
        }
    }

    /// Removal flags seen from `ability`'s side: `(remove_self, remove_other)`.
    pub fn removal_for(&self, ability: AbilityId) -> (bool, bool) {
        if ability == self.first {
            (self.remove_first, self.remove_second)
        } else {
            (self.remove_second, self.remove_first)
        }
    }

    pub(crate) fn ids(&self) -> (AbilityId, AbilityId) {
        ordered(self.first, self.second)
    }
}

impl PartialEq for CollisionPair {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CollisionPair {}

impl Hash for CollisionPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

pub(crate) fn canonical_key(a: &str, b: &str) -> String {
    if a >= b {
        format!("{a}-{b}")
    } else {
        format!("{b}-{a}")
    }
}

pub(crate) fn ordered(a: AbilityId, b: AbilityId) -> (AbilityId, AbilityId) {
    if a <= b { (a, b) } else { (b, a) }
}
