//! Append-only in-memory event store.
//!
//! A single mutex serializes identifier assignment, timestamping, and the
//! append, so the counter and the record become visible together. Reads copy
//! out under the same lock; callers never see internal storage.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::event::{NewEvent, StoredEvent};

#[derive(Debug, Default)]
struct Inner {
    seq: i64,
    events: Vec<StoredEvent>,
}

/// Owner of all event identity and receipt time.
///
/// Events are never evicted; capacity is bounded by process memory.
#[derive(Debug, Default)]
pub struct EventStore {
    inner: Mutex<Inner>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation completes without panicking once the guard is held, so a
    // poisoned lock still guards a consistent `Inner`.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Assign the next identifier and the current UTC time, append, and return
    /// the stored record.
    pub fn add(&self, ev: NewEvent) -> StoredEvent {
        let mut inner = self.lock();

        // received_at never goes backwards, even if the wall clock does.
        let now = Utc::now();
        let received_at = match inner.events.last() {
            Some(prev) if prev.received_at > now => prev.received_at,
            _ => now,
        };

        inner.seq += 1;
        let stored = StoredEvent {
            id: inner.seq,
            kind: ev.kind,
            payload: ev.payload,
            received_at,
        };
        inner.events.push(stored.clone());
        drop(inner);

        tracing::debug!(id = stored.id, kind = %stored.kind, "event stored");
        stored
    }

    /// Up to `limit` most recent events, newest first.
    ///
    /// `limit <= 0` or a limit larger than the store returns everything.
    pub fn list(&self, limit: i64) -> Vec<StoredEvent> {
        let inner = self.lock();
        let total = inner.events.len();
        let take = match usize::try_from(limit) {
            Ok(n) if n > 0 && n < total => n,
            _ => total,
        };
        inner.events.iter().rev().take(take).cloned().collect()
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
