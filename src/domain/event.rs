//! Live position events emitted by the vault and the position router.

use super::Amount;
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// One decoded on-chain event.
///
/// JSON form is internally tagged by `type`, e.g.
/// `{"type": "UpdatePosition", "key": "0x..", "size": "..", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PositionEvent {
    UpdatePosition(PositionStateEvent),
    ClosePosition(PositionStateEvent),
    IncreasePosition(PositionChangeEvent),
    DecreasePosition(PositionChangeEvent),
    CancelIncreasePosition(CancelEvent),
    CancelDecreasePosition(CancelEvent),
}

impl PositionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PositionEvent::UpdatePosition(_) => "UpdatePosition",
            PositionEvent::ClosePosition(_) => "ClosePosition",
            PositionEvent::IncreasePosition(_) => "IncreasePosition",
            PositionEvent::DecreasePosition(_) => "DecreasePosition",
            PositionEvent::CancelIncreasePosition(_) => "CancelIncreasePosition",
            PositionEvent::CancelDecreasePosition(_) => "CancelDecreasePosition",
        }
    }

    pub fn tx_hash(&self) -> Option<&B256> {
        match self {
            PositionEvent::UpdatePosition(e) | PositionEvent::ClosePosition(e) => e.tx_hash.as_ref(),
            PositionEvent::IncreasePosition(e) | PositionEvent::DecreasePosition(e) => {
                e.tx_hash.as_ref()
            }
            PositionEvent::CancelIncreasePosition(e) | PositionEvent::CancelDecreasePosition(e) => {
                e.tx_hash.as_ref()
            }
        }
    }
}

/// Vault `UpdatePosition` / `ClosePosition`: full field snapshot keyed by contract key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionStateEvent {
    pub key: B256,
    pub size: Amount,
    pub collateral: Amount,
    pub average_price: Amount,
    pub entry_funding_rate: Amount,
    #[serde(default)]
    pub reserve_amount: Amount,
    #[serde(default)]
    pub realised_pnl: Amount,
    #[serde(default)]
    pub mark_price: Option<Amount>,
    #[serde(default)]
    pub tx_hash: Option<B256>,
}

/// Vault `IncreasePosition` / `DecreasePosition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionChangeEvent {
    pub key: B256,
    pub account: Address,
    pub collateral_token: Address,
    pub index_token: Address,
    pub collateral_delta: Amount,
    pub size_delta: Amount,
    pub is_long: bool,
    #[serde(default)]
    pub price: Amount,
    #[serde(default)]
    pub fee: Amount,
    #[serde(default)]
    pub tx_hash: Option<B256>,
}

/// Position router `CancelIncreasePosition` / `CancelDecreasePosition`.
///
/// `path` is the swap path: for increases the last element is the collateral
/// token, for decreases the first element is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelEvent {
    pub account: Address,
    pub path: Vec<Address>,
    pub index_token: Address,
    #[serde(default)]
    pub size_delta: Amount,
    pub is_long: bool,
    #[serde(default)]
    pub acceptable_price: Amount,
    #[serde(default)]
    pub execution_fee: Amount,
    #[serde(default)]
    pub tx_hash: Option<B256>,
}
