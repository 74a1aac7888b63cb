use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use bending_common::{BlockMutation, BlockPos, BlockState, Owner, Timestamp};
use bending_geom::Aabb;

use crate::record::{TempBlockError, TempBlockHandle, TempBlockRecord, TempBlockRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Deadline {
    at: Timestamp,
    pos: BlockPos,
    id: u64,
    revision: u64,
}

/// Owns every temporary block override of one world.
///
/// All mutation goes through `&mut self` on the world's tick thread, so the
/// manager never needs interior locking.
#[derive(Debug, Default)]
pub struct TempBlockManager {
    records: BTreeMap<BlockPos, TempBlockRecord>,
    deadlines: BinaryHeap<Reverse<Deadline>>,
    next_id: u64,
    /// Records displaced by takeovers since [`TempBlockManager::begin_journal`].
    journal: Option<BTreeMap<BlockPos, TempBlockRecord>>,
}

impl TempBlockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, pos: BlockPos) -> Option<&TempBlockRecord> {
        self.records.get(&pos)
    }

    pub fn handle_at(&self, pos: BlockPos) -> Option<TempBlockHandle> {
        self.records.get(&pos).map(TempBlockRecord::handle)
    }

    pub fn is_live(&self, handle: TempBlockHandle) -> bool {
        self.record(handle).is_some()
    }

    /// Records in position order.
    pub fn records(&self) -> impl Iterator<Item = &TempBlockRecord> {
        self.records.values()
    }

    /// Records whose block intersects `volume`.
    pub fn records_in<'a>(&'a self, volume: &'a Aabb) -> impl Iterator<Item = &'a TempBlockRecord> {
        self.records
            .values()
            .filter(move |r| r.pos.bounds().intersects(volume))
    }

    /// Earliest pending deadline, stale entries included.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.deadlines.peek().map(|Reverse(d)| d.at)
    }

    /// Overrides the block at `pos`.
    ///
    /// A new record remembers the block it replaced. Overriding an existing
    /// record keeps the original state so the final revert restores the world
    /// as it was before the first override. The same owner may override its
    /// own locked record; anyone else is rejected.
    pub fn override_block<B: BlockMutation + ?Sized>(
        &mut self,
        pos: BlockPos,
        request: TempBlockRequest,
        now: Timestamp,
        blocks: &mut B,
    ) -> Result<TempBlockHandle, TempBlockError> {
        let existing = self.records.get(&pos);
        if let Some(record) = existing
            && record.locked
            && record.owner != request.owner
        {
            tracing::debug!(?pos, holder = ?record.owner, "override rejected, block locked");
            return Err(TempBlockError::Rejected {
                pos,
                holder: record.owner,
            });
        }
        let original = match existing {
            Some(record) => record.original,
            None => blocks.read(pos),
        };
        if !blocks.write(pos, request.state) {
            return Err(TempBlockError::WriteRefused(pos));
        }

        if let (Some(journal), Some(record)) = (self.journal.as_mut(), existing)
            && record.owner != request.owner
        {
            journal.entry(pos).or_insert_with(|| record.clone());
        }

        let fresh_id = self.next_id;
        let record = self.records.entry(pos).or_insert_with(|| TempBlockRecord {
            id: fresh_id,
            pos,
            original,
            state: request.state,
            expires_at: None,
            locked: false,
            expired: false,
            owner: request.owner,
            bendable: request.bendable,
            revision: 0,
        });
        if record.id == fresh_id || record.owner != request.owner {
            // New record, or an unlocked record taken over by another owner.
            // Old handles must not reach the new owner's override.
            record.id = fresh_id;
            record.locked = false;
            self.next_id += 1;
        }
        record.state = request.state;
        record.owner = request.owner;
        record.bendable = request.bendable;
        record.expired = false;
        record.revision += 1;
        record.expires_at = if request.duration.is_zero() {
            None
        } else {
            Some(now + request.duration)
        };
        if let Some(at) = record.expires_at {
            self.deadlines.push(Reverse(Deadline {
                at,
                pos,
                id: record.id,
                revision: record.revision,
            }));
        }
        tracing::debug!(?pos, state = ?request.state, owner = ?request.owner, expires_at = ?record.expires_at, "block overridden");
        Ok(record.handle())
    }

    /// Prevents other owners from overriding or bending the block.
    pub fn lock(&mut self, handle: TempBlockHandle) -> bool {
        match self.record_mut(handle) {
            Some(record) => {
                record.locked = true;
                true
            }
            None => false,
        }
    }

    /// Releases a lock. If the record's deadline already passed it reverts
    /// now. Returns `false` for stale handles.
    pub fn unlock<B: BlockMutation + ?Sized>(
        &mut self,
        handle: TempBlockHandle,
        now: Timestamp,
        blocks: &mut B,
    ) -> bool {
        let Some(record) = self.record_mut(handle) else {
            return false;
        };
        record.locked = false;
        if record.is_due(now) {
            self.revert_at(handle.pos, blocks);
        }
        true
    }

    /// Restores the original block. Idempotent: a second call, or a call
    /// with a stale handle, does nothing and returns `false`.
    pub fn revert<B: BlockMutation + ?Sized>(
        &mut self,
        handle: TempBlockHandle,
        blocks: &mut B,
    ) -> bool {
        if self.record(handle).is_none() {
            return false;
        }
        self.revert_at(handle.pos, blocks)
    }

    /// Whether any ability may use the block at `pos` as a source.
    pub fn is_bendable(&self, pos: BlockPos) -> bool {
        self.records
            .get(&pos)
            .is_none_or(|r| !r.locked && r.bendable)
    }

    /// Whether `owner` may use the block at `pos`. Owners may always use
    /// their own overrides.
    pub fn is_bendable_for(&self, pos: BlockPos, owner: Owner) -> bool {
        self.records.get(&pos).is_none_or(|r| {
            if r.owner == owner {
                true
            } else {
                !r.locked && r.bendable
            }
        })
    }

    /// The current override state if one exists, otherwise the live block.
    pub fn last_valid_data<B: BlockMutation + ?Sized>(&self, pos: BlockPos, blocks: &B) -> BlockState {
        self.records
            .get(&pos)
            .map_or_else(|| blocks.read(pos), |r| r.state)
    }

    /// The block as it was before any override.
    pub fn original_data<B: BlockMutation + ?Sized>(&self, pos: BlockPos, blocks: &B) -> BlockState {
        self.records
            .get(&pos)
            .map_or_else(|| blocks.read(pos), |r| r.original)
    }

    /// Reverts every unlocked record whose deadline is at or before `now`.
    /// Locked records are flagged and revert when unlocked. Returns the
    /// reverted positions in deadline order.
    pub fn tick<B: BlockMutation + ?Sized>(
        &mut self,
        now: Timestamp,
        blocks: &mut B,
    ) -> Vec<BlockPos> {
        let mut reverted = Vec::new();
        while let Some(Reverse(deadline)) = self.deadlines.peek().copied() {
            if deadline.at > now {
                break;
            }
            self.deadlines.pop();
            let Some(record) = self.records.get_mut(&deadline.pos) else {
                continue;
            };
            if record.id != deadline.id || record.revision != deadline.revision {
                continue;
            }
            if record.locked {
                record.expired = true;
                continue;
            }
            if self.revert_at(deadline.pos, blocks) {
                reverted.push(deadline.pos);
            }
        }
        reverted
    }

    /// Drops every lock held by `owner`, reverting records that already
    /// expired. Used when an ability instance is destroyed.
    pub fn release_owner<B: BlockMutation + ?Sized>(
        &mut self,
        owner: Owner,
        now: Timestamp,
        blocks: &mut B,
    ) -> usize {
        let handles: Vec<TempBlockHandle> = self
            .records
            .values()
            .filter(|r| r.owner == owner && r.locked)
            .map(TempBlockRecord::handle)
            .collect();
        for handle in &handles {
            self.unlock(*handle, now, blocks);
        }
        handles.len()
    }

    /// Reverts every record owned by `owner`, locked or not.
    pub fn revert_owned_by<B: BlockMutation + ?Sized>(
        &mut self,
        owner: Owner,
        blocks: &mut B,
    ) -> usize {
        let positions: Vec<BlockPos> = self
            .records
            .values()
            .filter(|r| r.owner == owner)
            .map(|r| r.pos)
            .collect();
        positions
            .into_iter()
            .filter(|pos| self.revert_at(*pos, blocks))
            .count()
    }

    /// Starts recording the records that later overrides take over, so a
    /// failed activation can put them back.
    pub fn begin_journal(&mut self) {
        self.journal = Some(BTreeMap::new());
    }

    /// Forgets the journal; takeovers since [`Self::begin_journal`] stand.
    pub fn commit_journal(&mut self) {
        self.journal = None;
    }

    /// Undoes everything `owner` did since [`Self::begin_journal`]: records
    /// it took over return to their previous owner with their state and
    /// deadline, and records it created are reverted. Returns the number of
    /// positions touched.
    pub fn rollback_journal<B: BlockMutation + ?Sized>(&mut self, owner: Owner, blocks: &mut B) -> usize {
        let displaced = self.journal.take().unwrap_or_default();
        let mut touched = 0;
        for (pos, previous) in displaced {
            if self.records.get(&pos).is_some_and(|r| r.owner != owner) {
                continue;
            }
            if !blocks.write(pos, previous.state) {
                tracing::warn!(?pos, "host refused block restore");
                continue;
            }
            if let Some(at) = previous.expires_at {
                self.deadlines.push(Reverse(Deadline {
                    at,
                    pos,
                    id: previous.id,
                    revision: previous.revision,
                }));
            }
            tracing::debug!(?pos, owner = ?previous.owner, "takeover rolled back");
            self.records.insert(pos, previous);
            touched += 1;
        }
        touched + self.revert_owned_by(owner, blocks)
    }

    /// Reverts everything. Used on world unload and shutdown.
    pub fn revert_all<B: BlockMutation + ?Sized>(&mut self, blocks: &mut B) -> usize {
        let records = std::mem::take(&mut self.records);
        self.deadlines.clear();
        let count = records.len();
        for record in records.into_values() {
            write_original(&record, blocks);
        }
        tracing::debug!(count, "reverted all temporary blocks");
        count
    }

    fn record(&self, handle: TempBlockHandle) -> Option<&TempBlockRecord> {
        self.records
            .get(&handle.pos)
            .filter(|r| r.id == handle.id)
    }

    fn record_mut(&mut self, handle: TempBlockHandle) -> Option<&mut TempBlockRecord> {
        self.records
            .get_mut(&handle.pos)
            .filter(|r| r.id == handle.id)
    }

    fn revert_at<B: BlockMutation + ?Sized>(&mut self, pos: BlockPos, blocks: &mut B) -> bool {
        match self.records.remove(&pos) {
            Some(record) => {
                write_original(&record, blocks);
                true
            }
            None => false,
        }
    }
}

fn write_original<B: BlockMutation + ?Sized>(record: &TempBlockRecord, blocks: &mut B) {
    if blocks.write(record.pos, record.original) {
        tracing::debug!(pos = ?record.pos, state = ?record.original, "block reverted");
    } else {
        tracing::warn!(pos = ?record.pos, "host refused block revert");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bending_common::{InstanceId, UserId};
    use std::time::Duration;

    #[derive(Default)]
    struct Blocks {
        states: BTreeMap<BlockPos, BlockState>,
        writes: usize,
    }

    impl BlockMutation for Blocks {
        fn read(&self, pos: BlockPos) -> BlockState {
            self.states.get(&pos).copied().unwrap_or(BlockState::Stone)
        }

        fn write(&mut self, pos: BlockPos, state: BlockState) -> bool {
            self.writes += 1;
            self.states.insert(pos, state);
            true
        }
    }

    const POS: BlockPos = BlockPos::new(0, 64, 0);

    fn owner(n: u64) -> Owner {
        Owner::Instance(InstanceId(n))
    }

    fn air_for(ms: u64, who: Owner) -> TempBlockRequest {
        TempBlockRequest::air(who).duration(Duration::from_millis(ms))
    }

    #[test]
    fn expiry_reverts_exactly_once() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        temp.override_block(POS, air_for(500, owner(1)), Timestamp(0), &mut blocks)
            .unwrap();
        assert_eq!(blocks.read(POS), BlockState::Air);

        assert!(temp.tick(Timestamp(499), &mut blocks).is_empty());
        assert_eq!(temp.tick(Timestamp(500), &mut blocks), vec![POS]);
        assert_eq!(blocks.read(POS), BlockState::Stone);
        let writes = blocks.writes;
        assert!(temp.tick(Timestamp(10_000), &mut blocks).is_empty());
        assert_eq!(blocks.writes, writes);
        assert!(temp.is_empty());
    }

    #[test]
    fn locked_block_rejects_other_owner() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        let handle = temp
            .override_block(POS, air_for(500, owner(1)), Timestamp(0), &mut blocks)
            .unwrap();
        temp.lock(handle);

        let err = temp
            .override_block(POS, air_for(500, owner(2)), Timestamp(10), &mut blocks)
            .unwrap_err();
        assert_eq!(
            err,
            TempBlockError::Rejected {
                pos: POS,
                holder: owner(1)
            }
        );

        let same = TempBlockRequest::new(BlockState::Ice, owner(1)).duration(Duration::from_millis(500));
        let again = temp
            .override_block(POS, same, Timestamp(10), &mut blocks)
            .unwrap();
        assert_eq!(again, handle);
        assert!(temp.get(POS).unwrap().is_locked());
        assert_eq!(blocks.read(POS), BlockState::Ice);
        assert_eq!(temp.get(POS).unwrap().original(), BlockState::Stone);
    }

    #[test]
    fn locked_record_waits_for_unlock() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        let handle = temp
            .override_block(POS, air_for(500, owner(1)), Timestamp(0), &mut blocks)
            .unwrap();
        temp.lock(handle);

        assert!(!temp.is_bendable_for(POS, owner(2)));
        assert!(temp.is_bendable_for(POS, owner(1)));
        assert!(temp.tick(Timestamp(600), &mut blocks).is_empty());
        assert_eq!(blocks.read(POS), BlockState::Air);

        assert!(temp.unlock(handle, Timestamp(650), &mut blocks));
        assert_eq!(blocks.read(POS), BlockState::Stone);
        assert!(temp.is_bendable_for(POS, owner(2)));
    }

    #[test]
    fn unlock_before_deadline_keeps_override() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        let handle = temp
            .override_block(POS, air_for(500, owner(1)), Timestamp(0), &mut blocks)
            .unwrap();
        temp.lock(handle);
        temp.unlock(handle, Timestamp(100), &mut blocks);
        assert_eq!(blocks.read(POS), BlockState::Air);
        assert_eq!(temp.tick(Timestamp(500), &mut blocks), vec![POS]);
    }

    #[test]
    fn revert_is_idempotent() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        let handle = temp
            .override_block(POS, air_for(0, owner(1)), Timestamp(0), &mut blocks)
            .unwrap();
        assert!(temp.revert(handle, &mut blocks));
        let writes = blocks.writes;
        assert!(!temp.revert(handle, &mut blocks));
        assert_eq!(blocks.writes, writes);
        assert_eq!(blocks.read(POS), BlockState::Stone);
    }

    #[test]
    fn reschedule_keeps_single_live_deadline() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        temp.override_block(POS, air_for(100, owner(1)), Timestamp(0), &mut blocks)
            .unwrap();
        temp.override_block(POS, air_for(1_000, owner(1)), Timestamp(50), &mut blocks)
            .unwrap();

        assert!(temp.tick(Timestamp(200), &mut blocks).is_empty());
        assert_eq!(blocks.read(POS), BlockState::Air);
        assert_eq!(temp.tick(Timestamp(1_050), &mut blocks), vec![POS]);
        assert_eq!(blocks.read(POS), BlockState::Stone);
    }

    #[test]
    fn zero_duration_needs_manual_revert() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        temp.override_block(POS, air_for(0, owner(1)), Timestamp(0), &mut blocks)
            .unwrap();
        assert!(temp.tick(Timestamp(u64::MAX), &mut blocks).is_empty());
        assert_eq!(temp.revert_owned_by(owner(1), &mut blocks), 1);
        assert_eq!(blocks.read(POS), BlockState::Stone);
    }

    #[test]
    fn takeover_invalidates_old_handle() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        let first = temp
            .override_block(POS, air_for(0, owner(1)), Timestamp(0), &mut blocks)
            .unwrap();
        let second = temp
            .override_block(POS, air_for(0, owner(2)), Timestamp(0), &mut blocks)
            .unwrap();
        assert_ne!(first, second);
        assert!(!temp.revert(first, &mut blocks));
        assert_eq!(temp.get(POS).unwrap().owner(), owner(2));
        assert!(temp.revert(second, &mut blocks));
        assert_eq!(blocks.read(POS), BlockState::Stone);
    }

    #[test]
    fn rollback_returns_taken_over_records() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        let held = temp
            .override_block(POS, air_for(10_000, Owner::System), Timestamp(0), &mut blocks)
            .unwrap();
        let fresh_pos = POS.offset(0, 1, 0);

        temp.begin_journal();
        let ice = TempBlockRequest::new(BlockState::Ice, owner(7)).duration(Duration::from_millis(50));
        temp.override_block(POS, ice, Timestamp(10), &mut blocks).unwrap();
        temp.override_block(fresh_pos, air_for(0, owner(7)), Timestamp(10), &mut blocks)
            .unwrap();
        assert!(!temp.is_live(held));
        assert_eq!(temp.rollback_journal(owner(7), &mut blocks), 2);

        assert!(temp.is_live(held));
        assert_eq!(temp.get(POS).unwrap().owner(), Owner::System);
        assert_eq!(blocks.read(POS), BlockState::Air);
        assert_eq!(blocks.read(fresh_pos), BlockState::Stone);
        assert!(temp.get(fresh_pos).is_none());
        // The restored record keeps its own deadline, not the failed one's.
        assert!(temp.tick(Timestamp(100), &mut blocks).is_empty());
        assert_eq!(temp.tick(Timestamp(10_000), &mut blocks), vec![POS]);
        assert_eq!(blocks.read(POS), BlockState::Stone);
    }

    #[test]
    fn committed_takeover_stands() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        temp.override_block(POS, air_for(10_000, Owner::System), Timestamp(0), &mut blocks)
            .unwrap();
        temp.begin_journal();
        temp.override_block(POS, air_for(0, owner(7)), Timestamp(10), &mut blocks)
            .unwrap();
        temp.commit_journal();
        assert_eq!(temp.rollback_journal(owner(8), &mut blocks), 0);
        assert_eq!(temp.get(POS).unwrap().owner(), owner(7));
    }

    #[test]
    fn release_owner_unlocks_and_reverts_expired() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        let expired = temp
            .override_block(POS, air_for(100, owner(1)), Timestamp(0), &mut blocks)
            .unwrap();
        let pending_pos = POS.offset(1, 0, 0);
        let pending = temp
            .override_block(pending_pos, air_for(1_000, owner(1)), Timestamp(0), &mut blocks)
            .unwrap();
        temp.lock(expired);
        temp.lock(pending);
        temp.tick(Timestamp(200), &mut blocks);

        assert_eq!(temp.release_owner(owner(1), Timestamp(200), &mut blocks), 2);
        assert_eq!(blocks.read(POS), BlockState::Stone);
        assert_eq!(blocks.read(pending_pos), BlockState::Air);
        assert!(temp.is_bendable(pending_pos));
    }

    #[test]
    fn non_bendable_override_is_still_usable_by_owner() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        let request = TempBlockRequest::new(BlockState::Stone, Owner::User(UserId::new())).bendable(false);
        let me = request.owner;
        temp.override_block(POS, request, Timestamp(0), &mut blocks).unwrap();
        assert!(!temp.is_bendable(POS));
        assert!(temp.is_bendable_for(POS, me));
        assert!(!temp.is_bendable_for(POS, owner(9)));
    }

    #[test]
    fn last_valid_and_original_data() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        temp.override_block(POS, air_for(0, owner(1)), Timestamp(0), &mut blocks)
            .unwrap();
        assert_eq!(temp.last_valid_data(POS, &blocks), BlockState::Air);
        assert_eq!(temp.original_data(POS, &blocks), BlockState::Stone);
        let elsewhere = POS.offset(0, 5, 0);
        assert_eq!(temp.last_valid_data(elsewhere, &blocks), BlockState::Stone);
        assert_eq!(temp.records_in(&POS.bounds()).count(), 1);
    }

    #[test]
    fn revert_all_restores_everything() {
        let mut blocks = Blocks::default();
        let mut temp = TempBlockManager::new();
        for dx in 0..4 {
            let h = temp
                .override_block(POS.offset(dx, 0, 0), air_for(1_000, owner(1)), Timestamp(0), &mut blocks)
                .unwrap();
            temp.lock(h);
        }
        assert_eq!(temp.revert_all(&mut blocks), 4);
        assert!(temp.is_empty());
        assert!(temp.next_deadline().is_none());
        assert!((0..4).all(|dx| blocks.read(POS.offset(dx, 0, 0)) == BlockState::Stone));
    }
}
