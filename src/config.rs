use crate::domain::{Address, Token, TokenRegistry};
use crate::engine::DisplayOptions;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rpc_url: String,
    pub reader_address: Address,
    pub vault_address: Address,
    pub native_token_address: Address,
    pub native_token_symbol: String,
    pub account: Option<Address>,
    pub chain_id: u64,
    pub tokens: Vec<Token>,
    pub poll_interval_ms: u64,
    pub display: DisplayOptions,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let rpc_url = env_map
            .get("RPC_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("RPC_URL".to_string()))?;

        let reader_address = required_address(&env_map, "READER_ADDRESS")?;
        let vault_address = required_address(&env_map, "VAULT_ADDRESS")?;
        let native_token_address = required_address(&env_map, "NATIVE_TOKEN_ADDRESS")?;

        let native_token_symbol = env_map
            .get("NATIVE_TOKEN_SYMBOL")
            .cloned()
            .unwrap_or_else(|| "ETH".to_string());

        let account = match env_map.get("ACCOUNT").map(|s| s.trim()) {
            Some(s) if !s.is_empty() => Some(parse_address("ACCOUNT", s)?),
            _ => None,
        };

        let chain_id = env_map
            .get("CHAIN_ID")
            .map(|s| s.as_str())
            .unwrap_or("42161")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("CHAIN_ID".to_string(), "must be a valid u64".to_string())
            })?;

        let tokens_file = env_map
            .get("TOKENS_FILE")
            .ok_or_else(|| ConfigError::MissingEnv("TOKENS_FILE".to_string()))?;
        let tokens = load_tokens(tokens_file)?;

        let poll_interval_ms = env_map
            .get("POLL_INTERVAL_MS")
            .map(|s| s.as_str())
            .unwrap_or("5000")
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "POLL_INTERVAL_MS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let display = DisplayOptions {
            show_pnl_after_fees: parse_bool(&env_map, "SHOW_PNL_AFTER_FEES", true)?,
            include_delta: parse_bool(&env_map, "INCLUDE_DELTA_IN_LEVERAGE", false)?,
        };

        Ok(Config {
            port,
            rpc_url,
            reader_address,
            vault_address,
            native_token_address,
            native_token_symbol,
            account,
            chain_id,
            tokens,
            poll_interval_ms,
            display,
        })
    }

    /// Registry snapshot for the configured chain, without live prices.
    pub fn token_registry(&self) -> TokenRegistry {
        TokenRegistry::new(
            self.tokens.clone(),
            self.native_token_address,
            self.native_token_symbol.clone(),
        )
    }
}

fn parse_address(key: &str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim()).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), "must be a 0x-prefixed 20-byte address".to_string())
    })
}

fn required_address(env_map: &HashMap<String, String>, key: &str) -> Result<Address, ConfigError> {
    let value = env_map
        .get(key)
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))?;
    parse_address(key, value)
}

fn parse_bool(env_map: &HashMap<String, String>, key: &str, default: bool) -> Result<bool, ConfigError> {
    match env_map.get(key).map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(s) => match s.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::InvalidValue(
                key.to_string(),
                format!("must be true or false, got {}", other),
            )),
        },
    }
}

fn load_tokens(file_path: &str) -> Result<Vec<Token>, ConfigError> {
    let content = std::fs::read_to_string(file_path).map_err(|_| {
        ConfigError::InvalidValue(
            "TOKENS_FILE".to_string(),
            "file not found or unreadable".to_string(),
        )
    })?;
    serde_json::from_str(&content).map_err(|e| {
        ConfigError::InvalidValue("TOKENS_FILE".to_string(), format!("invalid token list: {}", e))
    })
}
