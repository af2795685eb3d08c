//! Overlays pending and event-sourced state onto freshly decoded positions.

use super::overlay::{OverlayCaches, PendingEntry, UpdatedEntry};
use super::{apply_metrics, decode_positions, DisplayOptions, PositionQuery};
use crate::domain::{Address, Position, PositionKey, TimeMs, TokenRegistry, B256, U256};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Result of one reconciliation pass.
///
/// `positions` is in query order and omits closed positions without pending
/// changes; `positions_map` holds every decoded slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub positions: Vec<Position>,
    pub positions_map: BTreeMap<PositionKey, Position>,
}

impl PositionSnapshot {
    pub fn get(&self, key: &PositionKey) -> Option<&Position> {
        self.positions_map.get(key)
    }

    /// Linear scan for the position a vault event refers to.
    pub fn find_by_contract_key(&self, contract_key: &B256) -> Option<&Position> {
        self.positions_map
            .values()
            .find(|p| p.contract_key.as_ref() == Some(contract_key))
    }
}

/// Stateless reconciliation pass parameterized by display options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    options: DisplayOptions,
}

impl Reconciler {
    pub fn new(options: DisplayOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> DisplayOptions {
        self.options
    }

    /// Decode, overlay, derive and filter.
    ///
    /// A valid updated entry replaces size, collateral, average price and entry
    /// funding rate before metrics are computed. A valid pending entry is
    /// checked after metrics against the resulting size and collateral.
    pub fn reconcile(
        &self,
        query: &PositionQuery,
        raw: Option<&[U256]>,
        registry: &TokenRegistry,
        account: Option<&Address>,
        overlays: &OverlayCaches,
        now: TimeMs,
    ) -> PositionSnapshot {
        let mut snapshot = PositionSnapshot::default();

        for mut position in decode_positions(query, raw, registry, account) {
            if let Some(updated) = overlays.updated.get_valid(&position.key, now) {
                debug!(key = %position.key, "Applying event-sourced position update");
                apply_updated(&mut position, &updated.value);
            }

            apply_metrics(&mut position, self.options);

            let pending = overlays
                .pending
                .get_valid(&position.key, now)
                .map(|stamped| stamped.value.as_ref());
            apply_pending_changes(&mut position, pending);

            if position.is_open() || position.has_pending_changes {
                snapshot.positions.push(position.clone());
            }
            snapshot.positions_map.insert(position.key.clone(), position);
        }

        snapshot
    }
}

fn apply_updated(position: &mut Position, updated: &UpdatedEntry) {
    position.size = updated.size;
    position.collateral = updated.collateral;
    position.average_price = updated.average_price;
    position.entry_funding_rate = updated.entry_funding_rate;
}

/// Flag a position whose expected post-transaction state has not been observed yet.
pub fn apply_pending_changes(position: &mut Position, entry: Option<&PendingEntry>) {
    let Some(changes) = entry.and_then(|e| e.changes.as_ref()) else {
        return;
    };

    if let Some(size) = changes.size {
        if position.size == size {
            return;
        }
    }

    if changes.expecting_collateral_change && Some(position.collateral) != changes.collateral_snapshot {
        return;
    }

    position.has_pending_changes = true;
    position.pending_changes = Some(changes.clone());
}
