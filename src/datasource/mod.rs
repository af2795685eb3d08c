//! Data source abstraction for the batched position read and live token values.

use crate::domain::{Address, TokenPrices, U256};
use crate::engine::PositionQuery;
use async_trait::async_trait;
use std::fmt;

pub mod abi;
pub mod mock;
pub mod rpc;

pub use mock::MockDataSource;
pub use rpc::RpcDataSource;

/// Source of raw position arrays and token prices.
///
/// Implementations must handle retry/backoff and rate limiting.
#[async_trait]
pub trait PositionDataSource: Send + Sync + fmt::Debug {
    /// Read every slot of `query` for `account` in one call.
    ///
    /// # Returns
    /// The reader's flat array: 9 words per slot, in query order.
    async fn fetch_positions(
        &self,
        query: &PositionQuery,
        account: &Address,
    ) -> Result<Vec<U256>, DataSourceError>;

    /// Fetch min/max price and cumulative funding rate for each token.
    ///
    /// Values that cannot be read are returned as `None` rather than failing the batch.
    async fn fetch_token_prices(
        &self,
        tokens: &[Address],
    ) -> Result<Vec<TokenPrices>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// JSON-RPC error object returned by the node
    RpcError { code: i64, message: String },
    /// Parsing error (invalid JSON or malformed ABI payload)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
    /// Other error
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::RpcError { code, message } => {
                write!(f, "RPC error {}: {}", code, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

impl From<alloy_sol_types::Error> for DataSourceError {
    fn from(err: alloy_sol_types::Error) -> Self {
        DataSourceError::ParseError(err.to_string())
    }
}
