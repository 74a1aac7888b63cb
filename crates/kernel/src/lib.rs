//! Bending kernel: ability catalog, users, the per-world ability manager and
//! the game loop that drives it.
//!
//! # Invariants
//! - Every registered instance is updated exactly once per tick, in
//!   insertion order.
//! - An instance's destroy hook runs exactly once, and its temporary block
//!   locks are released when it goes.
//! - A fault in one instance removes that instance only.
//! - Catalog and collision rules are immutable after construction.

pub mod ability;
pub mod catalog;
pub mod config;
pub mod description;
pub mod game;
pub mod manager;
pub mod user;
pub mod world;

pub use ability::{
    Ability, AbilityContext, AbilityError, Collision, CooldownRequest, UpdateResult, WorldAccess,
};
pub use catalog::{AbilityCatalog, AbilityCatalogBuilder};
pub use config::EngineConfig;
pub use description::{AbilityDescription, AbilityDescriptionBuilder, AbilityFactory, CatalogError};
pub use game::{Game, WorldSim};
pub use manager::{AbilityManager, RemovalCause, TickReport};
pub use user::{User, UserRegistry, SLOT_COUNT};
pub use world::{MemoryWorld, WorldEvent};
