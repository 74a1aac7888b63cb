use std::collections::BTreeMap;

use bending_common::AbilityId;

use crate::pair::{CollisionPair, ordered};

/// Immutable rule table, keyed by the unordered pair of ability types.
#[derive(Debug, Clone, Default)]
pub struct CollisionRegistry {
    rules: BTreeMap<(AbilityId, AbilityId), CollisionPair>,
}

impl CollisionRegistry {
    /// A registry where nothing collides.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_pairs(pairs: impl IntoIterator<Item = CollisionPair>) -> Self {
        let mut rules = BTreeMap::new();
        for pair in pairs {
            rules.entry(pair.ids()).or_insert(pair);
        }
        Self { rules }
    }

    /// The rule for two ability types, in either order. `None` means
    /// instances of these types pass through each other.
    pub fn rule_for(&self, a: AbilityId, b: AbilityId) -> Option<&CollisionPair> {
        self.rules.get(&ordered(a, b))
    }

    /// Whether `ability` takes part in any rule.
    pub fn is_collidable(&self, ability: AbilityId) -> bool {
        self.rules.values().any(|p| p.involves(ability))
    }

    /// All rules in canonical key order.
    pub fn pairs(&self) -> Vec<&CollisionPair> {
        let mut pairs: Vec<&CollisionPair> = self.rules.values().collect();
        pairs.sort_by(|a, b| a.key().cmp(b.key()));
        pairs
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
