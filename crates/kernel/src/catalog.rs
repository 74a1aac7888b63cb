use std::collections::BTreeMap;

use bending_collision::AbilityLookup;
use bending_common::AbilityId;

use crate::description::{AbilityDescription, AbilityDescriptionBuilder, CatalogError};

/// Immutable registry of ability types. Ids are dense and follow
/// registration order.
#[derive(Debug, Clone, Default)]
pub struct AbilityCatalog {
    descriptions: Vec<AbilityDescription>,
    by_name: BTreeMap<String, AbilityId>,
}

impl AbilityCatalog {
    pub fn builder() -> AbilityCatalogBuilder {
        AbilityCatalogBuilder::default()
    }

    pub fn get(&self, id: AbilityId) -> Option<&AbilityDescription> {
        self.descriptions.get(id.0 as usize)
    }

    pub fn by_name(&self, name: &str) -> Option<&AbilityDescription> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AbilityDescription> {
        self.descriptions.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

impl AbilityLookup for AbilityCatalog {
    fn ability_id(&self, name: &str) -> Option<AbilityId> {
        self.by_name.get(name).copied()
    }

    fn ability_name(&self, id: AbilityId) -> Option<&str> {
        self.get(id).map(AbilityDescription::name)
    }
}

#[derive(Default)]
pub struct AbilityCatalogBuilder {
    pending: Vec<AbilityDescriptionBuilder>,
}

impl AbilityCatalogBuilder {
    pub fn register(mut self, description: AbilityDescriptionBuilder) -> Self {
        self.pending.push(description);
        self
    }

    pub fn build(self) -> Result<AbilityCatalog, CatalogError> {
        let mut catalog = AbilityCatalog::default();
        for (index, pending) in self.pending.into_iter().enumerate() {
            if catalog.by_name.contains_key(pending.name().trim()) {
                return Err(CatalogError::DuplicateName(pending.name().trim().to_string()));
            }
            let id = AbilityId(index as u32);
            let description = pending.build(id)?;
            catalog.by_name.insert(description.name().to_string(), id);
            catalog.descriptions.push(description);
        }
        tracing::debug!(abilities = catalog.len(), "ability catalog built");
        Ok(catalog)
    }
}
