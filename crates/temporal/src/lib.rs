//! Temporal world state: temporary block overrides that always revert.
//!
//! # Invariants
//! - At most one record per block position.
//! - A locked record rejects overrides from any other owner.
//! - Every record reverts exactly once: on expiry, on unlock after expiry,
//!   or on explicit revert.
//! - Expiry is driven by a deadline index polled from the tick, never by a
//!   background timer.

mod manager;
mod record;

pub use manager::TempBlockManager;
pub use record::{TempBlockError, TempBlockHandle, TempBlockRecord, TempBlockRequest};
