//! Time-windowed overlay caches keyed by position key.
//!
//! Entries are replaced wholesale on every write and never mutated in place.
//! An entry is valid while `updated_at + window > now`; at the boundary it has expired.

use super::{PENDING_POSITION_VALID_DURATION_MS, UPDATED_POSITION_VALID_DURATION_MS};
use crate::domain::{Amount, PendingChanges, PositionKey, TimeMs};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A value with the time it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped<V> {
    pub value: Arc<V>,
    pub updated_at: TimeMs,
}

/// Map whose entries silently expire after a fixed window.
#[derive(Debug, Clone)]
pub struct ExpiringMap<V> {
    entries: HashMap<PositionKey, Stamped<V>>,
    window_ms: i64,
}

impl<V> ExpiringMap<V> {
    pub fn new(window_ms: i64) -> Self {
        Self {
            entries: HashMap::new(),
            window_ms,
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Replace the entry for `key`, dropping anything already expired.
    pub fn insert(&mut self, key: PositionKey, value: V, now: TimeMs) {
        self.prune(now);
        self.entries.insert(
            key,
            Stamped {
                value: Arc::new(value),
                updated_at: now,
            },
        );
    }

    fn is_valid(&self, stamped: &Stamped<V>, now: TimeMs) -> bool {
        stamped.updated_at.plus_ms(self.window_ms) > now
    }

    /// The entry for `key` if it is still inside its window.
    pub fn get_valid(&self, key: &PositionKey, now: TimeMs) -> Option<&Stamped<V>> {
        self.entries
            .get(key)
            .filter(|stamped| self.is_valid(stamped, now))
    }

    pub fn prune(&mut self, now: TimeMs) {
        let window_ms = self.window_ms;
        self.entries
            .retain(|_, stamped| stamped.updated_at.plus_ms(window_ms) > now);
    }

    pub fn remove(&mut self, key: &PositionKey) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries still valid at `now`.
    pub fn valid_len(&self, now: TimeMs) -> usize {
        self.entries
            .values()
            .filter(|stamped| self.is_valid(stamped, now))
            .count()
    }
}

/// Optimistic state registered when a transaction is submitted.
///
/// `changes == None` is a bare marker (written on order cancellation): it
/// replaces any earlier expectation and never flags the position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    pub changes: Option<PendingChanges>,
}

/// Field snapshot confirmed by a live event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedEntry {
    pub size: Amount,
    pub collateral: Amount,
    pub average_price: Amount,
    pub entry_funding_rate: Amount,
    pub reserve_amount: Amount,
    pub realised_pnl: Amount,
}

/// The two session-scoped overlays.
#[derive(Debug, Clone)]
pub struct OverlayCaches {
    pub pending: ExpiringMap<PendingEntry>,
    pub updated: ExpiringMap<UpdatedEntry>,
}

impl OverlayCaches {
    pub fn new() -> Self {
        Self {
            pending: ExpiringMap::new(PENDING_POSITION_VALID_DURATION_MS),
            updated: ExpiringMap::new(UPDATED_POSITION_VALID_DURATION_MS),
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.updated.clear();
    }
}

impl Default for OverlayCaches {
    fn default() -> Self {
        Self::new()
    }
}
