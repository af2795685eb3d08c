//! Domain types for the position reconciler.
//!
//! This module provides:
//! - Lossless 256-bit fixed-point amounts with display conversion
//! - Token registry snapshots
//! - Position identity (session key and contract key) and the position record
//! - Live event payloads
//! - Time primitives and clocks

pub mod amount;
pub mod event;
pub mod position;
pub mod primitives;
pub mod token;

pub use alloy_primitives::{Address, B256, U256};
pub use amount::{Amount, AmountParseError};
pub use event::{CancelEvent, PositionChangeEvent, PositionEvent, PositionStateEvent};
pub use position::{contract_key, PendingChanges, Position, PositionKey, PositionKeyError};
pub use primitives::{direction_label, Clock, ManualClock, SystemClock, TimeMs};
pub use token::{Token, TokenPrices, TokenRegistry};
