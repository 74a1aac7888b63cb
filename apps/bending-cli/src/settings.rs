use std::path::Path;

use anyhow::Context;
use bending_abilities::{AbilitiesConfig, default_collisions, register_defaults};
use bending_collision::{CollisionConfig, CollisionRegistry, CollisionRegistryBuilder};
use bending_kernel::{AbilityCatalog, EngineConfig};
use serde::{Deserialize, Serialize};

/// Everything the CLI can be configured with, read from one YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub collisions: CollisionConfig,
    pub abilities: AbilitiesConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            collisions: default_collisions(),
            abilities: AbilitiesConfig::default(),
        }
    }
}

impl Settings {
    /// Loads `path`, or the built-in defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        tracing::info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn catalog(&self) -> anyhow::Result<AbilityCatalog> {
        register_defaults(AbilityCatalog::builder(), &self.abilities)
            .build()
            .context("building ability catalog")
    }

    pub fn rules(&self, catalog: &AbilityCatalog) -> anyhow::Result<CollisionRegistry> {
        CollisionRegistryBuilder::from_config(&self.collisions)
            .build(catalog)
            .context("building collision rules")
    }
}
