use crate::domain::{Address, PositionKey, TokenRegistry};
use serde::{Deserialize, Serialize};

/// Ordered slots to read from the reader contract.
///
/// Index `i` across the three sequences defines one slot. The raw result is
/// mapped back by position, so slot order must never change for a given registry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionQuery {
    pub collateral_tokens: Vec<Address>,
    pub index_tokens: Vec<Address>,
    pub is_long: Vec<bool>,
}

impl PositionQuery {
    /// Build the query for a registry snapshot.
    ///
    /// Long slots first (collateral = index, in token-list order), then short
    /// slots with an outer loop over stable tokens and an inner loop over index tokens.
    pub fn build(registry: &TokenRegistry) -> Self {
        let mut query = PositionQuery::default();

        for token in registry.tokens.iter().filter(|t| t.is_index_candidate()) {
            let address = registry.contract_address(token);
            query.push(address, address, true);
        }

        for stable in registry.tokens.iter().filter(|t| t.is_stable) {
            for index in registry.tokens.iter().filter(|t| t.is_index_candidate()) {
                query.push(stable.address, registry.contract_address(index), false);
            }
        }

        query
    }

    fn push(&mut self, collateral_token: Address, index_token: Address, is_long: bool) {
        self.collateral_tokens.push(collateral_token);
        self.index_tokens.push(index_token);
        self.is_long.push(is_long);
    }

    pub fn len(&self) -> usize {
        self.collateral_tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collateral_tokens.is_empty()
    }

    /// `(collateral, index, is_long)` for slot `i`.
    pub fn slot(&self, i: usize) -> Option<(Address, Address, bool)> {
        Some((
            *self.collateral_tokens.get(i)?,
            *self.index_tokens.get(i)?,
            *self.is_long.get(i)?,
        ))
    }

    pub fn slots(&self) -> impl Iterator<Item = (Address, Address, bool)> + '_ {
        (0..self.len()).filter_map(move |i| self.slot(i))
    }

    pub fn keys(&self) -> Vec<PositionKey> {
        self.slots()
            .map(|(collateral, index, is_long)| PositionKey::new(&collateral, &index, is_long))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Token;
    use alloy_primitives::address;
    use std::collections::HashSet;

    const WETH: Address = address!("82af49447d8a07e3bd95bd0d56f35241523fbab1");
    const WBTC: Address = address!("2f2a2543b76a4166549f7aab2e75bef0aefc5b0f");
    const USDC: Address = address!("ff970a61a04b1ca14834a43f5de4533ebddb5cc8");

    fn token(address: Address, symbol: &str, stable: bool, wrapped: bool) -> Token {
        Token {
            address,
            symbol: symbol.to_string(),
            decimals: 18,
            is_stable: stable,
            is_wrapped: wrapped,
            is_native: address == Address::ZERO,
            min_price: None,
            max_price: None,
            cumulative_funding_rate: None,
        }
    }

    #[test]
    fn test_empty_registry_yields_empty_query() {
        let query = PositionQuery::build(&TokenRegistry::empty(WETH));
        assert!(query.is_empty());
        assert_eq!(query.slot(0), None);
    }

    #[test]
    fn test_native_token_substituted() {
        let registry = TokenRegistry::new(
            vec![
                token(Address::ZERO, "ETH", false, false),
                token(WETH, "WETH", false, true),
                token(USDC, "USDC", true, false),
            ],
            WETH,
            "ETH".to_string(),
        );
        let query = PositionQuery::build(&registry);
        assert_eq!(query.slot(0), Some((WETH, WETH, true)));
        assert_eq!(query.slot(1), Some((USDC, WETH, false)));
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn test_keys_unique() {
        let registry = TokenRegistry::new(
            vec![
                token(Address::ZERO, "ETH", false, false),
                token(WBTC, "BTC", false, false),
                token(USDC, "USDC", true, false),
            ],
            WETH,
            "ETH".to_string(),
        );
        let keys = PositionQuery::build(&registry).keys();
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }
}
