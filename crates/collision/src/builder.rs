use std::collections::BTreeMap;

use bending_common::AbilityId;

use crate::config::CollisionConfig;
use crate::pair::CollisionPair;
use crate::registry::CollisionRegistry;
use crate::AbilityLookup;

/// Malformed collision configuration. Any of these fails the whole build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("empty ability name in {0}")]
    EmptyName(&'static str),
    #[error("ability '{name}' appears in layers {first} and {second}")]
    DuplicateLayerMember {
        name: String,
        first: usize,
        second: usize,
    },
}

#[derive(Debug, Clone)]
struct PendingPair {
    first: String,
    second: String,
    remove_first: bool,
    remove_second: bool,
    allow_same_user: bool,
}

#[derive(Debug, Clone)]
struct PendingLayer {
    abilities: Vec<String>,
    self_cancelling: bool,
}

/// Builds a [`CollisionRegistry`] from layers and explicit pairs.
///
/// Layers are added lowest first. For every lower/higher layer combination
/// the lower ability is removed and the higher one survives. A
/// self-cancelling layer also pairs each member with every member of the
/// same layer, itself included, removing both. Explicit pairs take
/// precedence over layer-derived pairs of the same identity; within each
/// kind the first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct CollisionRegistryBuilder {
    layers: Vec<PendingLayer>,
    pairs: Vec<PendingPair>,
}

impl CollisionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CollisionConfig) -> Self {
        let mut builder = Self::new();
        for layer in &config.layers {
            builder = builder.layer_with(layer.abilities.as_slice(), layer.self_cancelling);
        }
        for pair in &config.pairs {
            builder.pairs.push(PendingPair {
                first: pair.first.clone(),
                second: pair.second.clone(),
                remove_first: pair.remove_first,
                remove_second: pair.remove_second,
                allow_same_user: pair.allow_same_user,
            });
        }
        builder
    }

    /// Adds a self-cancelling layer above every layer added so far.
    pub fn layer<S: AsRef<str>>(self, abilities: &[S]) -> Self {
        self.layer_with(abilities, true)
    }

    pub fn layer_with<S: AsRef<str>>(mut self, abilities: &[S], self_cancelling: bool) -> Self {
        self.layers.push(PendingLayer {
            abilities: abilities.iter().map(|s| s.as_ref().to_string()).collect(),
            self_cancelling,
        });
        self
    }

    pub fn add(mut self, first: &str, second: &str, remove_first: bool, remove_second: bool) -> Self {
        self.pairs.push(PendingPair {
            first: first.to_string(),
            second: second.to_string(),
            remove_first,
            remove_second,
            allow_same_user: false,
        });
        self
    }

    /// Adds one explicit pair for every combination of `firsts` and `seconds`.
    pub fn add_all<S: AsRef<str>>(
        mut self,
        firsts: &[S],
        seconds: &[S],
        remove_first: bool,
        remove_second: bool,
    ) -> Self {
        for first in firsts {
            for second in seconds {
                self = self.add(first.as_ref(), second.as_ref(), remove_first, remove_second);
            }
        }
        self
    }

    /// Lets instances of one user collide under the explicit pair(s) between
    /// `first` and `second`.
    pub fn allow_same_user(mut self, first: &str, second: &str) -> Self {
        for pair in &mut self.pairs {
            let forward = pair.first == first && pair.second == second;
            let backward = pair.first == second && pair.second == first;
            if forward || backward {
                pair.allow_same_user = true;
            }
        }
        self
    }

    pub fn build(&self, lookup: &impl AbilityLookup) -> Result<CollisionRegistry, ConfigError> {
        self.validate()?;

        let resolve = |name: &str| -> Option<(AbilityId, String)> {
            match lookup.ability_id(name.trim()) {
                Some(id) => Some((id, name.trim().to_string())),
                None => {
                    tracing::warn!(ability = name, "unknown ability in collision config, dropped");
                    None
                }
            }
        };

        let mut pairs = Vec::new();
        for pending in &self.pairs {
            let (Some(first), Some(second)) = (resolve(pending.first.as_str()), resolve(pending.second.as_str()))
            else {
                continue;
            };
            let mut pair = CollisionPair::new(
                (first.0, &first.1),
                (second.0, &second.1),
                pending.remove_first,
                pending.remove_second,
            );
            pair.allow_same_user = pending.allow_same_user;
            pairs.push(pair);
        }

        let layers: Vec<Vec<(AbilityId, String)>> = self
            .layers
            .iter()
            .map(|layer| layer.abilities.iter().filter_map(|n| resolve(n.as_str())).collect())
            .collect();
        for (index, members) in layers.iter().enumerate() {
            if self.layers[index].self_cancelling {
                for (i, a) in members.iter().enumerate() {
                    for b in &members[i..] {
                        pairs.push(CollisionPair::new((a.0, &a.1), (b.0, &b.1), true, true));
                    }
                }
            }
            for higher in &layers[index + 1..] {
                for a in members {
                    for b in higher {
                        pairs.push(CollisionPair::new((a.0, &a.1), (b.0, &b.1), true, false));
                    }
                }
            }
        }

        let registry = CollisionRegistry::from_pairs(pairs);
        tracing::debug!(rules = registry.len(), layers = self.layers.len(), "collision registry built");
        Ok(registry)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        for (index, layer) in self.layers.iter().enumerate() {
            for name in &layer.abilities {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ConfigError::EmptyName("layer"));
                }
                match seen.get(name) {
                    Some(&first) if first != index => {
                        return Err(ConfigError::DuplicateLayerMember {
                            name: name.to_string(),
                            first,
                            second: index,
                        });
                    }
                    Some(_) => {}
                    None => {
                        seen.insert(name, index);
                    }
                }
            }
        }
        for pair in &self.pairs {
            if pair.first.trim().is_empty() || pair.second.trim().is_empty() {
                return Err(ConfigError::EmptyName("pair"));
            }
        }
        Ok(())
    }
}
