//! Collision rules: which ability types interact and which side survives.
//!
//! # Invariants
//! - Rules are symmetric: `rule_for(a, b)` and `rule_for(b, a)` return the
//!   same pair.
//! - At most one rule exists per unordered pair of ability types.
//! - The registry is immutable once built and can be shared freely.

pub mod builder;
pub mod config;
pub mod pair;
pub mod registry;

pub use builder::{CollisionRegistryBuilder, ConfigError};
pub use config::{CollisionConfig, LayerConfig, PairConfig};
pub use pair::CollisionPair;
pub use registry::CollisionRegistry;

use bending_common::AbilityId;

/// Name resolution for ability types. Implemented by the ability catalog.
pub trait AbilityLookup {
    fn ability_id(&self, name: &str) -> Option<AbilityId>;

    fn ability_name(&self, id: AbilityId) -> Option<&str>;
}
