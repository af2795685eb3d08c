#![allow(dead_code)]

use alloy_primitives::address;
use perpsync::domain::{Address, Amount, Token, TokenRegistry, U256};
use perpsync::engine::{PositionQuery, RawPositionFields, POSITION_PROPS_LENGTH};
use perpsync::PositionKey;

pub const ACCOUNT: Address = address!("1111111111111111111111111111111111111111");
pub const OTHER_ACCOUNT: Address = address!("2222222222222222222222222222222222222222");

pub const WETH: Address = address!("82af49447d8a07e3bd95bd0d56f35241523fbab1");
pub const WBTC: Address = address!("2f2a2543b76a4166549f7aab2e75bef0aefc5b0f");
pub const USDC: Address = address!("ff970a61a04b1ca14834a43f5de4533ebddb5cc8");
pub const DAI: Address = address!("da10009cbd5d07dd0cecc66161fc93d7c9000da1");

/// `value` whole USD at 10^30 scale.
pub fn usd(value: u64) -> Amount {
    Amount::from_u64(value) * Amount::exp10(30)
}

fn token(address: Address, symbol: &str, decimals: u8) -> Token {
    Token {
        address,
        symbol: symbol.to_string(),
        decimals,
        is_stable: false,
        is_wrapped: false,
        is_native: false,
        min_price: None,
        max_price: None,
        cumulative_funding_rate: None,
    }
}

/// ETH (native, zero address), WETH (wrapped), WBTC, USDC and DAI.
pub fn registry() -> TokenRegistry {
    let mut eth = token(Address::ZERO, "ETH", 18);
    eth.is_native = true;
    eth.min_price = Some(usd(2_000));
    eth.max_price = Some(usd(2_010));
    eth.cumulative_funding_rate = Some(Amount::from_u64(1_000));

    let mut weth = token(WETH, "WETH", 18);
    weth.is_wrapped = true;

    let mut wbtc = token(WBTC, "WBTC", 8);
    wbtc.min_price = Some(usd(30_000));
    wbtc.max_price = Some(usd(30_100));
    wbtc.cumulative_funding_rate = Some(Amount::from_u64(500));

    let mut usdc = token(USDC, "USDC", 6);
    usdc.is_stable = true;
    usdc.min_price = Some(usd(1));
    usdc.max_price = Some(usd(1));
    usdc.cumulative_funding_rate = Some(Amount::from_u64(2_000));

    let mut dai = token(DAI, "DAI", 18);
    dai.is_stable = true;

    TokenRegistry::new(vec![eth, weth, wbtc, usdc, dai], WETH, "ETH".to_string())
}

pub fn query() -> PositionQuery {
    PositionQuery::build(&registry())
}

pub fn eth_long_key() -> PositionKey {
    PositionKey::new(&WETH, &WETH, true)
}

pub fn btc_short_key() -> PositionKey {
    PositionKey::new(&USDC, &WBTC, false)
}

pub fn empty_fields() -> RawPositionFields {
    RawPositionFields {
        size: U256::ZERO,
        collateral: U256::ZERO,
        average_price: U256::ZERO,
        entry_funding_rate: U256::ZERO,
        has_realised_profit: false,
        realised_pnl: U256::ZERO,
        last_increased_time: 0,
        has_profit: false,
        delta: U256::ZERO,
    }
}

/// Open position with `size` and `collateral` in whole USD, entered at `average_price`.
pub fn open_fields(size: u64, collateral: u64, average_price: u64) -> RawPositionFields {
    RawPositionFields {
        size: usd(size).unsigned_abs(),
        collateral: usd(collateral).unsigned_abs(),
        average_price: usd(average_price).unsigned_abs(),
        entry_funding_rate: U256::from(1_000u64),
        last_increased_time: 1_700_000_000,
        ..empty_fields()
    }
}

/// Flat reader array for `query` with the given slots filled, everything else zero.
pub fn raw_with(query: &PositionQuery, filled: &[(PositionKey, RawPositionFields)]) -> Vec<U256> {
    let keys = query.keys();
    let mut raw = Vec::with_capacity(keys.len() * POSITION_PROPS_LENGTH);
    for key in &keys {
        let fields = filled
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, f)| *f)
            .unwrap_or_else(empty_fields);
        raw.extend_from_slice(&fields.to_words());
    }
    raw
}
