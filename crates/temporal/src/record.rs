use std::time::Duration;

use bending_common::{BlockPos, BlockState, Owner, Timestamp};

/// Errors from override requests. Both variants mean "cannot act here": the
/// caller skips the block or picks another target, nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TempBlockError {
    #[error("block at {pos:?} is locked by {holder:?}")]
    Rejected { pos: BlockPos, holder: Owner },
    #[error("host refused to write block at {0:?}")]
    WriteRefused(BlockPos),
}

/// Reference to one live override. Handles go stale once the record is
/// reverted or taken over by another owner; stale handles are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempBlockHandle {
    pub(crate) pos: BlockPos,
    pub(crate) id: u64,
}

impl TempBlockHandle {
    pub fn pos(&self) -> BlockPos {
        self.pos
    }
}

/// Parameters of an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempBlockRequest {
    pub state: BlockState,
    /// Zero means the override never expires on its own.
    pub duration: Duration,
    pub owner: Owner,
    /// Whether other abilities may use the overridden block as a source.
    pub bendable: bool,
}

impl TempBlockRequest {
    pub fn new(state: BlockState, owner: Owner) -> Self {
        Self {
            state,
            duration: Duration::ZERO,
            owner,
            bendable: true,
        }
    }

    pub fn air(owner: Owner) -> Self {
        Self::new(BlockState::Air, owner)
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn bendable(mut self, bendable: bool) -> Self {
        self.bendable = bendable;
        self
    }
}

/// A temporary override of one block position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempBlockRecord {
    pub(crate) id: u64,
    pub(crate) pos: BlockPos,
    pub(crate) original: BlockState,
    pub(crate) state: BlockState,
    pub(crate) expires_at: Option<Timestamp>,
    pub(crate) locked: bool,
    /// Deadline passed while locked; revert as soon as the lock drops.
    pub(crate) expired: bool,
    pub(crate) owner: Owner,
    pub(crate) bendable: bool,
    /// Bumped on every reschedule so older deadline entries are ignored.
    pub(crate) revision: u64,
}

impl TempBlockRecord {
    pub fn handle(&self) -> TempBlockHandle {
        TempBlockHandle {
            pos: self.pos,
            id: self.id,
        }
    }

    pub fn pos(&self) -> BlockPos {
        self.pos
    }

    pub fn original(&self) -> BlockState {
        self.original
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn is_bendable(&self) -> bool {
        self.bendable
    }

    pub(crate) fn is_due(&self, now: Timestamp) -> bool {
        self.expired || self.expires_at.is_some_and(|t| t.has_passed(now))
    }
}
