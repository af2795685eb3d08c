//! Decodes the reader's flat `uint256[]` into position records.

use super::{PositionQuery, POSITION_PROPS_LENGTH};
use crate::domain::{contract_key, Address, Amount, Position, PositionKey, TokenRegistry, U256};
use tracing::warn;

/// One fixed-width slot of the reader's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPositionFields {
    pub size: U256,
    pub collateral: U256,
    pub average_price: U256,
    pub entry_funding_rate: U256,
    pub has_realised_profit: bool,
    pub realised_pnl: U256,
    pub last_increased_time: u64,
    pub has_profit: bool,
    pub delta: U256,
}

impl RawPositionFields {
    /// Read slot `slot` out of the flat array; `None` if the array is too short.
    pub fn read(raw: &[U256], slot: usize) -> Option<Self> {
        let offset = slot.checked_mul(POSITION_PROPS_LENGTH)?;
        let f = raw.get(offset..offset + POSITION_PROPS_LENGTH)?;
        Some(Self {
            size: f[0],
            collateral: f[1],
            average_price: f[2],
            entry_funding_rate: f[3],
            has_realised_profit: f[4] == U256::from(1u64),
            realised_pnl: f[5],
            last_increased_time: u64::try_from(f[6]).unwrap_or(u64::MAX),
            has_profit: f[7] == U256::from(1u64),
            delta: f[8],
        })
    }

    /// Flatten back into reader layout.
    pub fn to_words(&self) -> [U256; POSITION_PROPS_LENGTH] {
        [
            self.size,
            self.collateral,
            self.average_price,
            self.entry_funding_rate,
            U256::from(u64::from(self.has_realised_profit)),
            self.realised_pnl,
            U256::from(self.last_increased_time),
            U256::from(u64::from(self.has_profit)),
            self.delta,
        ]
    }
}

/// Decode every slot of `query` from `raw`.
///
/// `None` means the batched read has not completed yet and yields no positions.
/// Live token metadata supplies `cumulative_funding_rate` (collateral token)
/// and `mark_price` (index token: min price for longs, max price for shorts).
/// `contract_key` is set only when `account` is known.
pub fn decode_positions(
    query: &PositionQuery,
    raw: Option<&[U256]>,
    registry: &TokenRegistry,
    account: Option<&Address>,
) -> Vec<Position> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let expected = query.len() * POSITION_PROPS_LENGTH;
    if raw.len() < expected {
        warn!(
            expected,
            actual = raw.len(),
            "Position read shorter than query, decoding complete slots only"
        );
    }

    let mut positions = Vec::with_capacity(query.len());
    for (i, (collateral_token, index_token, is_long)) in query.slots().enumerate() {
        let Some(fields) = RawPositionFields::read(raw, i) else {
            break;
        };

        let key = PositionKey::new(&collateral_token, &index_token, is_long);
        let mut position = Position::empty(key, collateral_token, index_token, is_long);

        position.contract_key =
            account.map(|a| contract_key(a, &collateral_token, &index_token, is_long));
        position.collateral_symbol = registry.display_symbol(&collateral_token);
        position.index_symbol = registry.display_symbol(&index_token);

        position.size = Amount::from_raw(fields.size);
        position.collateral = Amount::from_raw(fields.collateral);
        position.average_price = Amount::from_raw(fields.average_price);
        position.entry_funding_rate = Amount::from_raw(fields.entry_funding_rate);
        position.has_realised_profit = fields.has_realised_profit;
        position.realised_pnl = Amount::from_raw(fields.realised_pnl);
        position.last_increased_time = fields.last_increased_time;
        position.has_profit = fields.has_profit;
        position.delta = Amount::from_raw(fields.delta);

        position.cumulative_funding_rate = registry
            .token_info(&collateral_token)
            .and_then(|t| t.cumulative_funding_rate);
        position.mark_price = registry.token_info(&index_token).and_then(|t| {
            if is_long {
                t.min_price
            } else {
                t.max_price
            }
        });

        positions.push(position);
    }

    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Token;
    use alloy_primitives::address;

    const ACCOUNT: Address = address!("1111111111111111111111111111111111111111");
    const WETH: Address = address!("82af49447d8a07e3bd95bd0d56f35241523fbab1");
    const USDC: Address = address!("ff970a61a04b1ca14834a43f5de4533ebddb5cc8");

    fn registry() -> TokenRegistry {
        TokenRegistry::new(
            vec![
                Token {
                    address: Address::ZERO,
                    symbol: "ETH".to_string(),
                    decimals: 18,
                    is_stable: false,
                    is_wrapped: false,
                    is_native: true,
                    min_price: Some(Amount::from_u64(1990)),
                    max_price: Some(Amount::from_u64(2010)),
                    cumulative_funding_rate: Some(Amount::from_u64(700)),
                },
                Token {
                    address: USDC,
                    symbol: "USDC".to_string(),
                    decimals: 6,
                    is_stable: true,
                    is_wrapped: false,
                    is_native: false,
                    min_price: Some(Amount::from_u64(1)),
                    max_price: Some(Amount::from_u64(1)),
                    cumulative_funding_rate: Some(Amount::from_u64(900)),
                },
            ],
            WETH,
            "ETH".to_string(),
        )
    }

    fn record(size: u64, collateral: u64) -> RawPositionFields {
        RawPositionFields {
            size: U256::from(size),
            collateral: U256::from(collateral),
            average_price: U256::from(2000u64),
            entry_funding_rate: U256::from(500u64),
            has_realised_profit: true,
            realised_pnl: U256::from(3u64),
            last_increased_time: 1_700_000_000,
            has_profit: false,
            delta: U256::from(4u64),
        }
    }

    #[test]
    fn test_absent_raw_yields_empty() {
        let reg = registry();
        let query = PositionQuery::build(&reg);
        assert!(decode_positions(&query, None, &reg, Some(&ACCOUNT)).is_empty());
    }

    #[test]
    fn test_fields_and_live_metadata_attached() {
        let reg = registry();
        let query = PositionQuery::build(&reg);
        let mut raw = Vec::new();
        raw.extend(record(100, 10).to_words());
        raw.extend(record(200, 20).to_words());

        let positions = decode_positions(&query, Some(&raw), &reg, Some(&ACCOUNT));
        assert_eq!(positions.len(), 2);

        let long = &positions[0];
        assert!(long.is_long);
        assert_eq!(long.size, Amount::from_u64(100));
        assert_eq!(long.mark_price, Some(Amount::from_u64(1990)));
        assert_eq!(long.cumulative_funding_rate, Some(Amount::from_u64(700)));
        assert_eq!(long.index_symbol.as_deref(), Some("ETH"));
        assert!(long.has_realised_profit);
        assert!(!long.has_profit);
        assert_eq!(long.last_increased_time, 1_700_000_000);
        assert_eq!(
            long.contract_key,
            Some(contract_key(&ACCOUNT, &WETH, &WETH, true))
        );

        let short = &positions[1];
        assert!(!short.is_long);
        assert_eq!(short.collateral_token, USDC);
        assert_eq!(short.mark_price, Some(Amount::from_u64(2010)));
        assert_eq!(short.cumulative_funding_rate, Some(Amount::from_u64(900)));
    }

    #[test]
    fn test_no_account_no_contract_key() {
        let reg = registry();
        let query = PositionQuery::build(&reg);
        let raw: Vec<U256> = [record(1, 1).to_words(), record(1, 1).to_words()].concat();
        let positions = decode_positions(&query, Some(&raw), &reg, None);
        assert!(positions.iter().all(|p| p.contract_key.is_none()));
    }

    #[test]
    fn test_short_raw_decodes_complete_slots_only() {
        let reg = registry();
        let query = PositionQuery::build(&reg);
        let mut raw: Vec<U256> = record(1, 1).to_words().to_vec();
        raw.push(U256::from(5u64));
        let positions = decode_positions(&query, Some(&raw), &reg, None);
        assert_eq!(positions.len(), 1);
    }
}
