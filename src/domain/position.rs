//! Position entity, identity keys and pending-change descriptors.

use super::Amount;
use alloy_primitives::{keccak256, Address, B256};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Session-stable position identifier derived from (collateral, index, direction).
///
/// Always holds checksummed addresses; parsing normalizes whatever case the
/// caller used.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PositionKey(String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid position key '{0}': expected <collateral>:<index>:<true|false>")]
pub struct PositionKeyError(String);

impl PositionKey {
    /// Build the key for a slot. Callers pass on-chain addresses (native token
    /// already substituted for the zero address).
    pub fn new(collateral_token: &Address, index_token: &Address, is_long: bool) -> Self {
        PositionKey(format!("{}:{}:{}", collateral_token, index_token, is_long))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PositionKey {
    type Err = PositionKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PositionKeyError(s.to_string());
        let mut parts = s.split(':');
        let (Some(collateral), Some(index), Some(is_long), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let collateral_token = Address::from_str(collateral).map_err(|_| invalid())?;
        let index_token = Address::from_str(index).map_err(|_| invalid())?;
        let is_long = bool::from_str(is_long).map_err(|_| invalid())?;
        Ok(PositionKey::new(&collateral_token, &index_token, is_long))
    }
}

impl<'de> Deserialize<'de> for PositionKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Key the vault uses for a position: keccak256 over the packed
/// `account ‖ collateral ‖ index ‖ isLong` (bool as one byte).
pub fn contract_key(
    account: &Address,
    collateral_token: &Address,
    index_token: &Address,
    is_long: bool,
) -> B256 {
    let mut packed = Vec::with_capacity(61);
    packed.extend_from_slice(account.as_slice());
    packed.extend_from_slice(collateral_token.as_slice());
    packed.extend_from_slice(index_token.as_slice());
    packed.push(u8::from(is_long));
    keccak256(&packed)
}

/// What the submitting flow expects the position to look like once its
/// transaction lands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChanges {
    /// Expected size after execution.
    #[serde(default)]
    pub size: Option<Amount>,
    #[serde(default)]
    pub expecting_collateral_change: bool,
    /// Collateral at submission time; any different value confirms the change.
    #[serde(default)]
    pub collateral_snapshot: Option<Amount>,
}

/// A decoded, derived and reconciled position.
///
/// Derived fields that need positive collateral are `None` when collateral is
/// zero; `leverage` is `None` whenever the adjusted collateral base is not positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub key: PositionKey,
    pub contract_key: Option<B256>,
    pub collateral_token: Address,
    pub index_token: Address,
    pub collateral_symbol: Option<String>,
    pub index_symbol: Option<String>,
    pub is_long: bool,

    // Raw record fields (possibly replaced by a live event overlay).
    pub size: Amount,
    pub collateral: Amount,
    pub average_price: Amount,
    pub entry_funding_rate: Amount,
    pub cumulative_funding_rate: Option<Amount>,
    pub has_realised_profit: bool,
    pub realised_pnl: Amount,
    pub last_increased_time: u64,
    pub has_profit: bool,
    pub delta: Amount,
    pub mark_price: Option<Amount>,

    // Fees.
    pub funding_fee: Amount,
    pub collateral_after_fee: Amount,
    pub closing_fee: Amount,
    pub position_fee: Amount,
    pub total_fees: Amount,

    // PnL.
    pub pending_delta: Amount,
    pub delta_percentage: Option<Amount>,
    pub delta_str: Option<String>,
    pub delta_percentage_str: Option<String>,
    pub delta_before_fees_str: Option<String>,
    pub delta_before_fees_percentage_str: Option<String>,
    pub has_profit_after_fees: Option<bool>,
    pub pending_delta_after_fees: Option<Amount>,
    pub delta_percentage_after_fees: Option<Amount>,
    pub delta_after_fees_str: Option<String>,
    pub delta_after_fees_percentage_str: Option<String>,
    pub net_value: Option<Amount>,

    // Health.
    pub leverage: Option<Amount>,
    pub leverage_str: Option<String>,
    pub has_low_collateral: bool,

    // Overlay state.
    pub has_pending_changes: bool,
    pub pending_changes: Option<PendingChanges>,
}

impl Position {
    /// A position with only identity set and every amount zeroed.
    pub fn empty(
        key: PositionKey,
        collateral_token: Address,
        index_token: Address,
        is_long: bool,
    ) -> Self {
        Self {
            key,
            contract_key: None,
            collateral_token,
            index_token,
            collateral_symbol: None,
            index_symbol: None,
            is_long,
            size: Amount::ZERO,
            collateral: Amount::ZERO,
            average_price: Amount::ZERO,
            entry_funding_rate: Amount::ZERO,
            cumulative_funding_rate: None,
            has_realised_profit: false,
            realised_pnl: Amount::ZERO,
            last_increased_time: 0,
            has_profit: false,
            delta: Amount::ZERO,
            mark_price: None,
            funding_fee: Amount::ZERO,
            collateral_after_fee: Amount::ZERO,
            closing_fee: Amount::ZERO,
            position_fee: Amount::ZERO,
            total_fees: Amount::ZERO,
            pending_delta: Amount::ZERO,
            delta_percentage: None,
            delta_str: None,
            delta_percentage_str: None,
            delta_before_fees_str: None,
            delta_before_fees_percentage_str: None,
            has_profit_after_fees: None,
            pending_delta_after_fees: None,
            delta_percentage_after_fees: None,
            delta_after_fees_str: None,
            delta_after_fees_percentage_str: None,
            net_value: None,
            leverage: None,
            leverage_str: None,
            has_low_collateral: false,
            has_pending_changes: false,
            pending_changes: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.size.is_positive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ACCOUNT: Address = address!("1111111111111111111111111111111111111111");
    const WETH: Address = address!("82af49447d8a07e3bd95bd0d56f35241523fbab1");
    const USDC: Address = address!("ff970a61a04b1ca14834a43f5de4533ebddb5cc8");

    #[test]
    fn test_position_key_is_deterministic_and_direction_aware() {
        let a = PositionKey::new(&WETH, &WETH, true);
        let b = PositionKey::new(&WETH, &WETH, true);
        let c = PositionKey::new(&WETH, &WETH, false);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().ends_with(":true"));
    }

    #[test]
    fn test_contract_key_matches_packed_keccak() {
        let mut packed = Vec::new();
        packed.extend_from_slice(ACCOUNT.as_slice());
        packed.extend_from_slice(USDC.as_slice());
        packed.extend_from_slice(WETH.as_slice());
        packed.push(0u8);
        assert_eq!(contract_key(&ACCOUNT, &USDC, &WETH, false), keccak256(&packed));
    }

    #[test]
    fn test_contract_key_scoped_to_account() {
        let other = address!("2222222222222222222222222222222222222222");
        assert_ne!(
            contract_key(&ACCOUNT, &WETH, &WETH, true),
            contract_key(&other, &WETH, &WETH, true)
        );
    }

    #[test]
    fn test_position_key_serializes_as_string() {
        let key = PositionKey::new(&USDC, &WETH, false);
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json, serde_json::Value::String(key.as_str().to_string()));
    }

    #[test]
    fn test_position_key_parse_normalizes_case() {
        let key = PositionKey::new(&USDC, &WETH, false);
        let lowercase = key.as_str().to_lowercase();
        assert_ne!(lowercase, key.as_str());
        assert_eq!(lowercase.parse::<PositionKey>().unwrap(), key);

        let from_json: PositionKey = serde_json::from_value(serde_json::json!(lowercase)).unwrap();
        assert_eq!(from_json, key);
    }

    #[test]
    fn test_position_key_parse_rejects_malformed() {
        for raw in [
            "k",
            "0x82af49447d8a07e3bd95bd0d56f35241523fbab1:true",
            "0x82af49447d8a07e3bd95bd0d56f35241523fbab1:0xzz:true",
            "0x82af49447d8a07e3bd95bd0d56f35241523fbab1:0x82af49447d8a07e3bd95bd0d56f35241523fbab1:yes",
        ] {
            assert!(raw.parse::<PositionKey>().is_err(), "{}", raw);
        }
        assert!(serde_json::from_str::<PositionKey>("\"k\"").is_err());
    }
}
