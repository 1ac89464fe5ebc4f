//! Single-slot "latest value wins" snapshot channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hl_sim::{SnapshotSink, TickSnapshot};

#[derive(Debug, Default)]
struct Slot {
    value: Option<Arc<TickSnapshot>>,
    published: u64,
    taken: u64,
}

/// Holds the most recent snapshot. Publishing overwrites any unread value
/// and never waits on readers beyond a pointer swap.
#[derive(Debug, Clone, Default)]
pub struct LatestSlot {
    inner: Arc<Mutex<Slot>>,
}

impl LatestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish(&self, snapshot: Arc<TickSnapshot>) {
        let mut slot = self.lock();
        slot.value = Some(snapshot);
        slot.published += 1;
    }

    /// Latest snapshot, whether or not it was read before.
    pub fn latest(&self) -> Option<Arc<TickSnapshot>> {
        self.lock().value.clone()
    }

    /// Latest snapshot if one arrived since the previous `take`.
    pub fn take(&self) -> Option<Arc<TickSnapshot>> {
        let mut slot = self.lock();
        if slot.published == slot.taken {
            return None;
        }
        slot.taken = slot.published;
        slot.value.clone()
    }

    /// Number of snapshots published so far.
    pub fn published(&self) -> u64 {
        self.lock().published
    }

    /// Snapshots overwritten without being taken.
    pub fn dropped(&self) -> u64 {
        let slot = self.lock();
        slot.published.saturating_sub(slot.taken).saturating_sub(1)
    }
}

impl SnapshotSink for LatestSlot {
    fn publish(&self, snapshot: Arc<TickSnapshot>) {
        LatestSlot::publish(self, snapshot);
    }
}
