//! Token registry snapshot supplied by the host.

use super::Amount;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// A whitelisted token with its live prices.
///
/// The native token is listed with the zero address; its wrapped counterpart
/// carries `is_wrapped` and the real contract address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub is_stable: bool,
    #[serde(default)]
    pub is_wrapped: bool,
    #[serde(default)]
    pub is_native: bool,
    #[serde(default)]
    pub min_price: Option<Amount>,
    #[serde(default)]
    pub max_price: Option<Amount>,
    #[serde(default)]
    pub cumulative_funding_rate: Option<Amount>,
}

impl Token {
    /// Non-stable, non-wrapped tokens can be traded as an index token.
    pub fn is_index_candidate(&self) -> bool {
        !self.is_stable && !self.is_wrapped
    }
}

/// Live values for one token, as read from the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrices {
    pub address: Address,
    pub min_price: Option<Amount>,
    pub max_price: Option<Amount>,
    pub cumulative_funding_rate: Option<Amount>,
}

/// Ordered token list plus the chain's native token details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRegistry {
    pub tokens: Vec<Token>,
    pub native_token_address: Address,
    pub native_token_symbol: String,
}

impl TokenRegistry {
    pub fn new(tokens: Vec<Token>, native_token_address: Address, native_token_symbol: String) -> Self {
        Self {
            tokens,
            native_token_address,
            native_token_symbol,
        }
    }

    pub fn empty(native_token_address: Address) -> Self {
        Self::new(Vec::new(), native_token_address, "ETH".to_string())
    }

    /// Address used on-chain for a token: the zero address maps to the native token.
    pub fn contract_address(&self, token: &Token) -> Address {
        if token.address == Address::ZERO {
            self.native_token_address
        } else {
            token.address
        }
    }

    pub fn get(&self, address: &Address) -> Option<&Token> {
        self.tokens.iter().find(|t| &t.address == address)
    }

    /// Resolve a token for valuation.
    ///
    /// The native token address resolves to the zero-address entry, which is
    /// where the native token's prices live.
    pub fn token_info(&self, address: &Address) -> Option<&Token> {
        if *address == self.native_token_address {
            if let Some(native) = self.get(&Address::ZERO) {
                return Some(native);
            }
        }
        self.get(address)
    }

    /// Symbol shown to users; the wrapped native token displays as the native symbol.
    pub fn display_symbol(&self, address: &Address) -> Option<String> {
        self.token_info(address).map(|t| {
            if t.is_wrapped {
                self.native_token_symbol.clone()
            } else {
                t.symbol.clone()
            }
        })
    }

    /// Return a new registry with live values replaced for the given tokens.
    ///
    /// Prices for the native token address also update the zero-address entry.
    pub fn with_prices(&self, prices: &[TokenPrices]) -> Self {
        let mut next = self.clone();
        for token in next.tokens.iter_mut() {
            let on_chain = if token.address == Address::ZERO {
                self.native_token_address
            } else {
                token.address
            };
            if let Some(update) = prices.iter().find(|p| p.address == on_chain) {
                token.min_price = update.min_price;
                token.max_price = update.max_price;
                token.cumulative_funding_rate = update.cumulative_funding_rate;
            }
        }
        next
    }

    /// Distinct on-chain addresses of all tokens, in list order.
    pub fn contract_addresses(&self) -> Vec<Address> {
        let mut out: Vec<Address> = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            let address = self.contract_address(token);
            if !out.contains(&address) {
                out.push(address);
            }
        }
        out
    }
}
