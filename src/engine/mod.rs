//! Pure computation engine: query construction, decoding, metrics and reconciliation.
//!
//! Nothing in here performs I/O or reads the clock; callers pass `now` in.

use crate::domain::Amount;

pub mod decoder;
pub mod metrics;
pub mod notifier;
pub mod overlay;
pub mod query;
pub mod reconciler;

pub use decoder::{decode_positions, RawPositionFields};
pub use metrics::{apply_metrics, leverage, DisplayOptions, LeverageInput, PnlAfterFees};
pub use notifier::{
    notification_key, Notification, NotificationLevel, NotificationLog,
    DEFAULT_NOTIFICATION_RETENTION,
};
pub use overlay::{ExpiringMap, OverlayCaches, PendingEntry, UpdatedEntry};
pub use query::PositionQuery;
pub use reconciler::{apply_pending_changes, PositionSnapshot, Reconciler};

/// USD amounts are scaled by 10^30.
pub const USD_DECIMALS: u32 = 30;
pub const BASIS_POINTS_DIVISOR: u64 = 10_000;
pub const MARGIN_FEE_BASIS_POINTS: u64 = 10;
pub const FUNDING_RATE_PRECISION: u64 = 1_000_000;
/// `size / |collateralAfterFee|` above this flags low collateral.
pub const MAX_RAW_LEVERAGE: u64 = 50;
/// Fields per slot in the reader's flat position array.
pub const POSITION_PROPS_LENGTH: usize = 9;

/// Pending (optimistic) entries stay valid for 10 minutes.
pub const PENDING_POSITION_VALID_DURATION_MS: i64 = 600 * 1000;
/// Event-sourced updates stay valid for 1 minute.
pub const UPDATED_POSITION_VALID_DURATION_MS: i64 = 60 * 1000;

pub(crate) fn bps_divisor() -> Amount {
    Amount::from_u64(BASIS_POINTS_DIVISOR)
}
