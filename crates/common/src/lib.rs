//! Shared vocabulary of the bending core: identifiers, block positions and
//! states, the simulation clock, activation triggers and the narrow host
//! interfaces the core calls into.
//!
//! # Invariants
//! - Everything here is plain data or a trait; no simulation state lives in
//!   this crate.

pub mod activation;
pub mod block;
pub mod host;
pub mod time;
pub mod types;

pub use activation::Activation;
pub use block::{BlockFace, BlockPos, BlockState};
pub use host::{BlockMutation, EntityMutation, EntitySnapshot, Host, PermissionService, SpatialQuery};
pub use time::{TICK, Timestamp};
pub use types::{AbilityId, Element, EntityId, InstanceId, Owner, UserId, WorldId};
