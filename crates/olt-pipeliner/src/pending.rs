//! Time-bounded cache of unconfirmed group requests.
//!
//! Every entry moves through a terminal settlement exactly once:
//!
//! ```text
//! Pending ──(matching group event)──> Resolved
//!    │
//!    ├──(TTL elapses)──────────────> Expired
//!    │
//!    └──(same key re-requested)────> superseded, dropped silently
//! ```
//!
//! All three transitions go through one mutex-guarded map with
//! check-and-remove semantics, so concurrent resolution and expiry agree
//! on a single outcome per entry. Superseding is the only cancellation
//! mechanism: the overwritten objective gets no callback, the newer
//! request's outcome is authoritative.

use olt_flow::{GroupKey, NextObjective};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

struct PendingEntry {
    token: u64,
    deadline: Instant,
    objective: NextObjective,
}

/// Pending-group cache keyed by correlation key.
pub struct PendingGroupCache {
    ttl: Duration,
    tokens: AtomicU64,
    entries: Mutex<HashMap<GroupKey, PendingEntry>>,
}

impl PendingGroupCache {
    /// Creates a cache whose entries expire `ttl` after insertion.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tokens: AtomicU64::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<GroupKey, PendingEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts an entry, superseding any unresolved entry under the same
    /// key (the superseded objective is dropped without a callback).
    ///
    /// Returns a token identifying this insertion for
    /// [`remove_if_current`](Self::remove_if_current).
    pub fn insert(&self, key: GroupKey, objective: NextObjective) -> u64 {
        let token = self.tokens.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = PendingEntry {
            token,
            deadline: Instant::now() + self.ttl,
            objective,
        };
        self.locked().insert(key, entry);
        token
    }

    /// Removes and returns the entry for `key`, if present.
    ///
    /// This is the Resolved transition; a key with no entry (already
    /// settled, or never requested) returns `None`.
    pub fn resolve(&self, key: &GroupKey) -> Option<NextObjective> {
        self.locked().remove(key).map(|e| e.objective)
    }

    /// Removes the entry for `key` only if it still belongs to the
    /// insertion identified by `token`.
    ///
    /// A later insertion under the same key is left untouched, so a
    /// failure-cleanup path can never evict a superseding request.
    pub fn remove_if_current(&self, key: &GroupKey, token: u64) -> Option<NextObjective> {
        let mut entries = self.locked();
        match entries.get(key) {
            Some(entry) if entry.token == token => entries.remove(key).map(|e| e.objective),
            _ => None,
        }
    }

    /// Removes and returns every entry whose deadline is at or before
    /// `now` (the Expired transition).
    pub fn expire(&self, now: Instant) -> Vec<(GroupKey, NextObjective)> {
        let mut entries = self.locked();
        let expired: Vec<GroupKey> = entries
            .iter()
            .filter(|(_, e)| e.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|k| entries.remove(&k).map(|e| (k, e.objective)))
            .collect()
    }

    /// Returns true if an entry for `key` is pending.
    pub fn contains(&self, key: &GroupKey) -> bool {
        self.locked().contains_key(key)
    }

    /// Returns the number of pending entries.
    pub fn len(&self) -> usize {
        self.locked().len()
    }

    /// Returns true if no entries are pending.
    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }
}
