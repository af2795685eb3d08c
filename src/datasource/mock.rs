//! Mock data source for testing without network calls.

use super::{DataSourceError, PositionDataSource};
use crate::domain::{Address, TokenPrices, U256};
use crate::engine::PositionQuery;
use async_trait::async_trait;
use std::collections::HashMap;

/// Mock data source that returns predefined test data.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    positions: HashMap<Address, Vec<U256>>,
    prices: Vec<TokenPrices>,
    error: Option<DataSourceError>,
}

impl MockDataSource {
    /// Create a new mock data source with empty data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw reader array returned for an account.
    pub fn with_positions(mut self, account: Address, raw: Vec<U256>) -> Self {
        self.positions.insert(account, raw);
        self
    }

    /// Add live values for a token.
    pub fn with_prices(mut self, prices: TokenPrices) -> Self {
        self.prices.push(prices);
        self
    }

    /// Make every call fail with `error`.
    pub fn with_error(mut self, error: DataSourceError) -> Self {
        self.error = Some(error);
        self
    }
}

#[async_trait]
impl PositionDataSource for MockDataSource {
    async fn fetch_positions(
        &self,
        query: &PositionQuery,
        account: &Address,
    ) -> Result<Vec<U256>, DataSourceError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        // Unknown accounts read as all-zero slots, like an empty on-chain position.
        Ok(self
            .positions
            .get(account)
            .cloned()
            .unwrap_or_else(|| vec![U256::ZERO; query.len() * crate::engine::POSITION_PROPS_LENGTH]))
    }

    async fn fetch_token_prices(
        &self,
        tokens: &[Address],
    ) -> Result<Vec<TokenPrices>, DataSourceError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        Ok(self
            .prices
            .iter()
            .filter(|p| tokens.contains(&p.address))
            .cloned()
            .collect())
    }
}
