//! JSON-RPC client reading the reader and vault contracts via `eth_call`.

use super::abi::{self, VaultField};
use super::{DataSourceError, PositionDataSource};
use crate::domain::{Address, Amount, TokenPrices, U256};
use crate::engine::PositionQuery;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Data source backed by a node's JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcDataSource {
    client: Client,
    rpc_url: String,
    reader: Address,
    vault: Address,
}

impl RpcDataSource {
    pub fn new(rpc_url: String, reader: Address, vault: Address) -> Self {
        Self {
            client: Client::new(),
            rpc_url,
            reader,
            vault,
        }
    }

    async fn post_rpc(&self, payload: Value) -> Result<Value, DataSourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&self.rpc_url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }

    /// Issue one `eth_call` per entry as a single JSON-RPC batch.
    ///
    /// Results come back in request order; a per-call error is kept in place.
    async fn eth_call_batch(
        &self,
        calls: &[(Address, Vec<u8>)],
    ) -> Result<Vec<Result<Vec<u8>, DataSourceError>>, DataSourceError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let payload = Value::Array(
            calls
                .iter()
                .enumerate()
                .map(|(id, (to, data))| eth_call_request(id, to, data))
                .collect(),
        );
        let response = self.post_rpc(payload).await?;
        let replies = response
            .as_array()
            .ok_or_else(|| DataSourceError::ParseError("Expected batch array response".to_string()))?;

        let mut results: Vec<Result<Vec<u8>, DataSourceError>> = (0..calls.len())
            .map(|_| Err(DataSourceError::Other("Missing batch reply".to_string())))
            .collect();
        for reply in replies {
            let Some(id) = reply.get("id").and_then(Value::as_u64) else {
                warn!("Dropping batch reply without numeric id");
                continue;
            };
            if let Some(slot) = usize::try_from(id).ok().and_then(|i| results.get_mut(i)) {
                *slot = parse_call_result(reply);
            }
        }
        Ok(results)
    }

    async fn eth_call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, DataSourceError> {
        let response = self.post_rpc(eth_call_request(1, to, data)).await?;
        parse_call_result(&response)
    }
}

fn eth_call_request(id: usize, to: &Address, data: &[u8]) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "eth_call",
        "params": [
            { "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]
    })
}

fn parse_call_result(reply: &Value) -> Result<Vec<u8>, DataSourceError> {
    if let Some(error) = reply.get("error") {
        return Err(DataSourceError::RpcError {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    let result = reply
        .get("result")
        .and_then(Value::as_str)
        .ok_or_else(|| DataSourceError::ParseError("Missing result field".to_string()))?;
    let stripped = result.strip_prefix("0x").unwrap_or(result);
    hex::decode(stripped).map_err(|e| DataSourceError::ParseError(format!("Invalid hex: {}", e)))
}

fn optional_amount(
    result: Option<Result<Vec<u8>, DataSourceError>>,
    token: &Address,
    field: VaultField,
) -> Option<Amount> {
    match result? {
        Ok(bytes) => match field.decode(&bytes) {
            Ok(value) => Some(Amount::from_raw(value)),
            Err(e) => {
                warn!(token = %token, field = field.name(), error = %e, "Undecodable vault value");
                None
            }
        },
        Err(e) => {
            warn!(token = %token, field = field.name(), error = %e, "Vault call failed");
            None
        }
    }
}

#[async_trait]
impl PositionDataSource for RpcDataSource {
    async fn fetch_positions(
        &self,
        query: &PositionQuery,
        account: &Address,
    ) -> Result<Vec<U256>, DataSourceError> {
        debug!(account = %account, slots = query.len(), "Fetching positions");

        let data = abi::encode_get_positions(&self.vault, account, query);
        let bytes = self.eth_call(&self.reader, &data).await?;
        Ok(abi::decode_get_positions(&bytes)?)
    }

    async fn fetch_token_prices(
        &self,
        tokens: &[Address],
    ) -> Result<Vec<TokenPrices>, DataSourceError> {
        debug!(tokens = tokens.len(), "Fetching token prices");

        let calls: Vec<(Address, Vec<u8>)> = tokens
            .iter()
            .flat_map(|token| {
                VaultField::ALL.map(|field| (self.vault, field.encode(*token)))
            })
            .collect();

        let mut results = self.eth_call_batch(&calls).await?.into_iter();
        let prices = tokens
            .iter()
            .map(|token| TokenPrices {
                address: *token,
                min_price: optional_amount(results.next(), token, VaultField::MinPrice),
                max_price: optional_amount(results.next(), token, VaultField::MaxPrice),
                cumulative_funding_rate: optional_amount(
                    results.next(),
                    token,
                    VaultField::CumulativeFundingRate,
                ),
            })
            .collect();
        Ok(prices)
    }
}
