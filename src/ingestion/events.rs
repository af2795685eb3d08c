//! Applies live position events to the overlay caches.

use crate::domain::{
    direction_label, Address, Amount, CancelEvent, PendingChanges, PositionChangeEvent,
    PositionEvent, PositionKey, PositionStateEvent, TimeMs, TokenRegistry,
};
use crate::engine::{
    Notification, NotificationLevel, NotificationLog, OverlayCaches, PendingEntry,
    PositionSnapshot, UpdatedEntry, USD_DECIMALS,
};
use tracing::debug;

/// What the session currently knows, borrowed for one event.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub account: Option<&'a Address>,
    pub snapshot: &'a PositionSnapshot,
    pub registry: &'a TokenRegistry,
    pub now: TimeMs,
}

/// Effect of one event on session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// An updated-position overlay was written for this key.
    Updated(PositionKey),
    /// A cancellation marker was written for this key.
    Cancelled {
        key: PositionKey,
        notification: Option<Notification>,
    },
    /// Only a notification (possibly deduplicated away).
    Notified(Option<Notification>),
    /// No known position carries the event's contract key.
    Unmatched,
    /// The event belongs to a different account than the active one.
    ForeignAccount,
    /// The payload cannot be mapped to a position.
    Malformed(&'static str),
}

impl EventOutcome {
    pub fn mutated_overlays(&self) -> bool {
        matches!(
            self,
            EventOutcome::Updated(_) | EventOutcome::Cancelled { .. }
        )
    }
}

/// Route one event to the overlays and notification log.
pub fn apply_event(
    event: &PositionEvent,
    ctx: &EventContext<'_>,
    overlays: &mut OverlayCaches,
    notifications: &mut NotificationLog,
) -> EventOutcome {
    match event {
        PositionEvent::UpdatePosition(e) => on_position_state(e, false, ctx, overlays),
        PositionEvent::ClosePosition(e) => on_position_state(e, true, ctx, overlays),
        PositionEvent::IncreasePosition(e) => on_position_change(e, true, ctx, notifications),
        PositionEvent::DecreasePosition(e) => on_position_change(e, false, ctx, notifications),
        PositionEvent::CancelIncreasePosition(e) => {
            on_cancel(e, true, ctx, overlays, notifications)
        }
        PositionEvent::CancelDecreasePosition(e) => {
            on_cancel(e, false, ctx, overlays, notifications)
        }
    }
}

fn on_position_state(
    event: &PositionStateEvent,
    closed: bool,
    ctx: &EventContext<'_>,
    overlays: &mut OverlayCaches,
) -> EventOutcome {
    let Some(position) = ctx.snapshot.find_by_contract_key(&event.key) else {
        debug!(contract_key = %event.key, "Position event matches no known position");
        return EventOutcome::Unmatched;
    };

    let entry = if closed {
        UpdatedEntry {
            size: Amount::ZERO,
            collateral: Amount::ZERO,
            average_price: Amount::ZERO,
            entry_funding_rate: Amount::ZERO,
            reserve_amount: event.reserve_amount,
            realised_pnl: event.realised_pnl,
        }
    } else {
        UpdatedEntry {
            size: event.size,
            collateral: event.collateral,
            average_price: event.average_price,
            entry_funding_rate: event.entry_funding_rate,
            reserve_amount: event.reserve_amount,
            realised_pnl: event.realised_pnl,
        }
    };

    let key = position.key.clone();
    overlays.updated.insert(key.clone(), entry, ctx.now);
    EventOutcome::Updated(key)
}

fn is_foreign(account: &Address, ctx: &EventContext<'_>) -> bool {
    ctx.account != Some(account)
}

fn symbol(ctx: &EventContext<'_>, token: &Address) -> String {
    ctx.registry
        .display_symbol(token)
        .unwrap_or_else(|| token.to_string())
}

fn on_position_change(
    event: &PositionChangeEvent,
    increase: bool,
    ctx: &EventContext<'_>,
    notifications: &mut NotificationLog,
) -> EventOutcome {
    if is_foreign(&event.account, ctx) {
        return EventOutcome::ForeignAccount;
    }

    let market = format!(
        "{} {}",
        symbol(ctx, &event.index_token),
        direction_label(event.is_long)
    );
    let message = match (increase, event.size_delta.is_zero()) {
        (true, true) => format!(
            "Deposited {} USD into {}.",
            event.collateral_delta.format_units(USD_DECIMALS, 2, true),
            market
        ),
        (true, false) => format!(
            "Increased {}, +{} USD.",
            market,
            event.size_delta.format_units(USD_DECIMALS, 2, true)
        ),
        (false, true) => format!(
            "Withdrew {} USD from {}.",
            event.collateral_delta.format_units(USD_DECIMALS, 2, true),
            market
        ),
        (false, false) => format!(
            "Decreased {}, -{} USD.",
            market,
            event.size_delta.format_units(USD_DECIMALS, 2, true)
        ),
    };

    EventOutcome::Notified(notifications.push(
        NotificationLevel::Success,
        message,
        event.tx_hash,
        ctx.now,
    ))
}

fn on_cancel(
    event: &CancelEvent,
    increase: bool,
    ctx: &EventContext<'_>,
    overlays: &mut OverlayCaches,
    notifications: &mut NotificationLog,
) -> EventOutcome {
    if is_foreign(&event.account, ctx) {
        return EventOutcome::ForeignAccount;
    }

    // Increases swap into the collateral token; decreases swap out of it.
    let collateral_token = if increase {
        event.path.last()
    } else {
        event.path.first()
    };
    let Some(collateral_token) = collateral_token else {
        return EventOutcome::Malformed("cancel event with empty path");
    };

    let message = format!(
        "Could not {} {} {} within the allowed slippage, you can adjust the allowed slippage in the settings on the top right of the page.",
        if increase { "increase" } else { "decrease" },
        symbol(ctx, &event.index_token),
        direction_label(event.is_long)
    );
    let notification = notifications.push(NotificationLevel::Error, message, event.tx_hash, ctx.now);

    let key = PositionKey::new(collateral_token, &event.index_token, event.is_long);
    overlays
        .pending
        .insert(key.clone(), PendingEntry { changes: None }, ctx.now);

    EventOutcome::Cancelled { key, notification }
}

/// Pending registration submitted by the transaction flow.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRegistration {
    pub key: PositionKey,
    #[serde(default)]
    pub size: Option<Amount>,
    #[serde(default)]
    pub collateral_snapshot: Option<Amount>,
}

impl PendingRegistration {
    pub fn into_entry(self) -> (PositionKey, PendingEntry) {
        let changes = PendingChanges {
            size: self.size,
            expecting_collateral_change: self.collateral_snapshot.is_some(),
            collateral_snapshot: self.collateral_snapshot,
        };
        (
            self.key,
            PendingEntry {
                changes: Some(changes),
            },
        )
    }
}

/// Record a locally submitted transaction's expected outcome.
pub fn register_pending(registration: PendingRegistration, overlays: &mut OverlayCaches, now: TimeMs) {
    let (key, entry) = registration.into_entry();
    debug!(key = %key, "Registering pending position change");
    overlays.pending.insert(key, entry, now);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_with_snapshot_expects_collateral_change() {
        let reg = PendingRegistration {
            key: PositionKey::new(&Address::ZERO, &Address::ZERO, true),
            size: None,
            collateral_snapshot: Some(Amount::from_u64(5)),
        };
        let (_, entry) = reg.into_entry();
        let changes = entry.changes.unwrap();
        assert!(changes.expecting_collateral_change);
        assert_eq!(changes.collateral_snapshot, Some(Amount::from_u64(5)));
    }

    #[test]
    fn test_registration_size_only() {
        let reg = PendingRegistration {
            key: PositionKey::new(&Address::ZERO, &Address::ZERO, true),
            size: Some(Amount::ZERO),
            collateral_snapshot: None,
        };
        let (_, entry) = reg.into_entry();
        let changes = entry.changes.unwrap();
        assert!(!changes.expecting_collateral_change);
        assert_eq!(changes.size, Some(Amount::ZERO));
    }

    #[test]
    fn test_outcome_mutation_flag() {
        assert!(EventOutcome::Updated(PositionKey::new(&Address::ZERO, &Address::ZERO, true)).mutated_overlays());
        assert!(!EventOutcome::ForeignAccount.mutated_overlays());
        assert!(!EventOutcome::Notified(None).mutated_overlays());
    }
}
