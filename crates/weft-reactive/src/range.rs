//! Range tracking for observed containers
//!
//! Between two flushes a container records what changed as a sorted list
//! of hunks. A hunk covers `[low, low + inserted)` in current coordinates
//! and stands for `erased` items that occupied that spot before the batch.
//! Overlapping or adjacent edits fold into one hunk, so any edit sequence
//! condenses to disjoint hunks that, applied in increasing order to the
//! pre-batch list, reproduce the post-batch list.
//!
//! When bookkeeping disagrees with the container size the state resets to a
//! single full-range insertion and consumers rebuild from scratch.

use std::fmt;

/// Retries allowed before a conflicting edit forces a reset
pub const DEFAULT_RANGE_RETRIES: usize = 3;

/// Kind of change a range describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeKind {
    Insert,
    Erase,
    Modify,
}

/// Half-open index range `[low, high)` with a change kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModificationRange {
    pub low: usize,
    pub high: usize,
    pub kind: RangeKind,
}

impl ModificationRange {
    pub fn new(low: usize, high: usize, kind: RangeKind) -> Self {
        debug_assert!(low <= high, "range [{low}, {high}) is inverted");
        Self { low, high, kind }
    }

    pub fn insert(low: usize, high: usize) -> Self {
        Self::new(low, high, RangeKind::Insert)
    }

    pub fn erase(low: usize, high: usize) -> Self {
        Self::new(low, high, RangeKind::Erase)
    }

    pub fn modify(low: usize, high: usize) -> Self {
        Self::new(low, high, RangeKind::Modify)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.high - self.low
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.high == self.low
    }
}

/// Outcome of recording one edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Edit folded into the pending hunks
    Final,
    /// Conflicting hunks were fused; record the edit again
    Retry,
    /// Bookkeeping gave up; consumers must rebuild everything
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hunk {
    low: usize,
    erased: usize,
    inserted: usize,
}

impl Hunk {
    #[inline]
    fn end(&self) -> usize {
        self.low + self.inserted
    }

    fn kind(&self) -> RangeKind {
        match self.erased.cmp(&self.inserted) {
            std::cmp::Ordering::Greater => RangeKind::Erase,
            std::cmp::Ordering::Less => RangeKind::Insert,
            std::cmp::Ordering::Equal => RangeKind::Modify,
        }
    }
}

/// Pending changes of one container since the last flush
#[derive(Clone, PartialEq, Eq)]
pub struct RangeState {
    hunks: Vec<Hunk>,
    data_size: usize,
    full_rebuild: bool,
    full_extent: usize,
    epoch: u64,
    resets: u64,
}

impl RangeState {
    /// Clean state for a container of `size` items
    pub fn new(size: usize) -> Self {
        Self {
            hunks: Vec::new(),
            data_size: size,
            full_rebuild: false,
            full_extent: 0,
            epoch: 0,
            resets: 0,
        }
    }

    /// Container size when the batch began
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// Size the container should have after the recorded edits
    pub fn expected_size(&self) -> usize {
        if self.full_rebuild {
            return self.full_extent;
        }
        let inserted: usize = self.hunks.iter().map(|h| h.inserted).sum();
        let erased: usize = self.hunks.iter().map(|h| h.erased).sum();
        (self.data_size + inserted).saturating_sub(erased)
    }

    /// Whether consumers must rebuild instead of patching
    pub fn is_full_rebuild(&self) -> bool {
        self.full_rebuild
    }

    /// Whether nothing changed since the last flush
    pub fn is_clean(&self) -> bool {
        !self.full_rebuild && self.hunks.is_empty()
    }

    /// Incremented every time the state is cleared after a flush
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// How many times bookkeeping fell back to a full rebuild
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    /// Ranges to apply, in order, to the pre-batch list.
    ///
    /// Each hunk yields a `Modify` range for the positions it both erased
    /// and inserted, followed by the `Erase` or `Insert` remainder. Indices
    /// account for every range before them.
    pub fn ranges(&self) -> Vec<ModificationRange> {
        if self.full_rebuild {
            return vec![ModificationRange::insert(0, self.full_extent)];
        }
        let mut out = Vec::with_capacity(self.hunks.len());
        for hunk in &self.hunks {
            let common = hunk.erased.min(hunk.inserted);
            if common > 0 {
                out.push(ModificationRange::modify(hunk.low, hunk.low + common));
            }
            let start = hunk.low + common;
            match hunk.kind() {
                RangeKind::Erase => out.push(ModificationRange::erase(start, hunk.low + hunk.erased)),
                RangeKind::Insert => out.push(ModificationRange::insert(start, hunk.end())),
                RangeKind::Modify => {}
            }
        }
        out
    }

    /// Fold one edit into the pending hunks.
    ///
    /// `current_size` is the container size after the edit. Indices in
    /// `edit` are in the coordinates the container had just before it.
    pub fn insert_modification_range(
        &mut self,
        current_size: usize,
        edit: ModificationRange,
    ) -> InsertResult {
        if self.full_rebuild {
            self.full_extent = current_size;
            return InsertResult::Final;
        }

        let (at, removed, added) = match edit.kind {
            RangeKind::Insert => (edit.low, 0, edit.len()),
            RangeKind::Erase => (edit.low, edit.len(), 0),
            RangeKind::Modify => (edit.low, edit.len(), edit.len()),
        };

        let before = self.expected_size();
        if at + removed > before || before + added - removed != current_size {
            self.reset(current_size);
            return InsertResult::Reset;
        }
        if removed == 0 && added == 0 {
            return InsertResult::Final;
        }

        // hunks touching the closed window [at, at + removed]
        let first = self.hunks.partition_point(|h| h.end() < at);
        let last = first
            + self.hunks[first..]
                .iter()
                .take_while(|h| h.low <= at + removed)
                .count();
        let touched = &self.hunks[first..last];

        if touched.len() > 1 {
            let kind = touched[0].kind();
            if touched.iter().any(|h| h.kind() != kind) {
                self.fuse(first, last);
                return InsertResult::Retry;
            }
        }

        let merged = if touched.is_empty() {
            Hunk {
                low: at,
                erased: removed,
                inserted: added,
            }
        } else {
            let low = at.min(touched[0].low);
            let high = (at + removed).max(touched[touched.len() - 1].end());
            let span = high - low;
            let inserted: usize = touched.iter().map(|h| h.inserted).sum();
            let erased: usize = touched.iter().map(|h| h.erased).sum();
            Hunk {
                low,
                erased: span - inserted + erased,
                inserted: span - removed + added,
            }
        };

        for hunk in &mut self.hunks[last..] {
            hunk.low = hunk.low + added - removed;
        }
        self.hunks.drain(first..last);
        if merged.erased > 0 || merged.inserted > 0 {
            self.hunks.insert(first, merged);
        }
        InsertResult::Final
    }

    /// Record an edit, retrying at most `max_retries` times before resetting
    pub fn reconcile(
        &mut self,
        current_size: usize,
        edit: ModificationRange,
        max_retries: usize,
    ) -> InsertResult {
        let mut retries = 0;
        loop {
            match self.insert_modification_range(current_size, edit) {
                InsertResult::Retry if retries < max_retries => retries += 1,
                InsertResult::Retry => {
                    self.reset(current_size);
                    return InsertResult::Reset;
                }
                outcome => return outcome,
            }
        }
    }

    /// Replace the hunks `[first, last)` by one hunk spanning all of them
    fn fuse(&mut self, first: usize, last: usize) {
        let group = &self.hunks[first..last];
        let low = group[0].low;
        let span = group[group.len() - 1].end() - low;
        let inserted: usize = group.iter().map(|h| h.inserted).sum();
        let erased: usize = group.iter().map(|h| h.erased).sum();
        let fused = Hunk {
            low,
            erased: erased + span - inserted,
            inserted: span,
        };
        self.hunks.drain(first..last);
        self.hunks.insert(first, fused);
    }

    /// Give up on fine-grained tracking until the next clear
    pub fn reset(&mut self, current_size: usize) {
        self.hunks.clear();
        self.full_rebuild = true;
        self.full_extent = current_size;
        self.resets += 1;
        tracing::debug!(
            "Range state reset to full rebuild of {} items (reset #{})",
            current_size,
            self.resets
        );
    }

    /// Start a new batch after consumers have applied the ranges
    pub fn clear(&mut self, current_size: usize) {
        self.hunks.clear();
        self.full_rebuild = false;
        self.full_extent = 0;
        self.data_size = current_size;
        self.epoch += 1;
    }
}

impl fmt::Debug for RangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeState")
            .field("ranges", &self.ranges())
            .field("data_size", &self.data_size)
            .field("full_rebuild", &self.full_rebuild)
            .field("epoch", &self.epoch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_insert() {
        let mut state = RangeState::new(3);
        assert_eq!(
            state.insert_modification_range(4, ModificationRange::insert(1, 2)),
            InsertResult::Final
        );
        assert_eq!(state.ranges(), vec![ModificationRange::insert(1, 2)]);
    }

    #[test]
    fn test_adjacent_inserts_merge() {
        let mut state = RangeState::new(0);
        for i in 0..3 {
            state.insert_modification_range(i + 1, ModificationRange::insert(i, i + 1));
        }
        assert_eq!(state.ranges(), vec![ModificationRange::insert(0, 3)]);
    }

    #[test]
    fn test_erase_of_pending_insert_cancels() {
        let mut state = RangeState::new(2);
        state.insert_modification_range(3, ModificationRange::insert(1, 2));
        state.insert_modification_range(2, ModificationRange::erase(1, 2));
        assert!(state.ranges().is_empty());
        assert!(state.is_clean());
    }

    #[test]
    fn test_modify_inside_insert_is_absorbed() {
        let mut state = RangeState::new(2);
        state.insert_modification_range(5, ModificationRange::insert(2, 5));
        state.insert_modification_range(5, ModificationRange::modify(3, 4));
        assert_eq!(state.ranges(), vec![ModificationRange::insert(2, 5)]);
    }

    #[test]
    fn test_erase_spanning_insert_and_old_items() {
        // old: [o0 o1 o2 o3 o4 o5]; insert two at 2, then erase [3, 6)
        let mut state = RangeState::new(6);
        state.insert_modification_range(8, ModificationRange::insert(2, 4));
        state.insert_modification_range(5, ModificationRange::erase(3, 6));
        assert_eq!(
            state.ranges(),
            vec![ModificationRange::modify(2, 3), ModificationRange::erase(3, 4)]
        );
    }

    #[test]
    fn test_later_hunks_shift() {
        let mut state = RangeState::new(10);
        state.insert_modification_range(11, ModificationRange::insert(8, 9));
        state.insert_modification_range(9, ModificationRange::erase(0, 2));
        assert_eq!(
            state.ranges(),
            vec![ModificationRange::erase(0, 2), ModificationRange::insert(6, 7)]
        );
    }

    #[test]
    fn test_mixed_kinds_retry_then_final() {
        let mut state = RangeState::new(10);
        state.insert_modification_range(11, ModificationRange::insert(2, 3));
        state.insert_modification_range(10, ModificationRange::erase(5, 6));
        // erase [3, 5) touches the insert hunk and the erase hunk
        assert_eq!(
            state.insert_modification_range(8, ModificationRange::erase(3, 5)),
            InsertResult::Retry
        );
        assert_eq!(
            state.insert_modification_range(8, ModificationRange::erase(3, 5)),
            InsertResult::Final
        );
        assert_eq!(state.expected_size(), 8);
    }

    #[test]
    fn test_reconcile_without_retries_resets() {
        let mut state = RangeState::new(10);
        state.insert_modification_range(11, ModificationRange::insert(2, 3));
        state.insert_modification_range(10, ModificationRange::erase(5, 6));
        assert_eq!(
            state.reconcile(8, ModificationRange::erase(3, 5), 0),
            InsertResult::Reset
        );
        assert!(state.is_full_rebuild());
        assert_eq!(state.reset_count(), 1);
        assert_eq!(state.ranges(), vec![ModificationRange::insert(0, 8)]);
    }

    #[test]
    fn test_reconcile_with_budget_succeeds() {
        let mut state = RangeState::new(10);
        state.insert_modification_range(11, ModificationRange::insert(2, 3));
        state.insert_modification_range(10, ModificationRange::erase(5, 6));
        assert_eq!(
            state.reconcile(8, ModificationRange::erase(3, 5), DEFAULT_RANGE_RETRIES),
            InsertResult::Final
        );
        assert_eq!(state.reset_count(), 0);
    }

    #[test]
    fn test_size_mismatch_resets() {
        let mut state = RangeState::new(3);
        assert_eq!(
            state.insert_modification_range(10, ModificationRange::insert(0, 1)),
            InsertResult::Reset
        );
        // further edits keep the full range current
        state.insert_modification_range(11, ModificationRange::insert(0, 1));
        assert_eq!(state.ranges(), vec![ModificationRange::insert(0, 11)]);
    }

    #[test]
    fn test_clear_starts_new_epoch() {
        let mut state = RangeState::new(1);
        state.reset(4);
        let epoch = state.epoch();
        state.clear(4);
        assert!(state.is_clean());
        assert_eq!(state.epoch(), epoch + 1);
        assert_eq!(state.data_size(), 4);
    }
}
