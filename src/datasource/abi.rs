//! Reader and vault contract bindings.

use crate::domain::{Address, U256};
use crate::engine::PositionQuery;
use alloy_sol_types::{sol, SolCall};

sol! {
    /// GMX v1 Reader, batched position reads
    interface IReader {
        function getPositions(
            address vault,
            address account,
            address[] memory collateralTokens,
            address[] memory indexTokens,
            bool[] memory isLong
        ) external view returns (uint256[] memory);
    }

    /// GMX v1 Vault price and funding getters
    interface IVault {
        function getMinPrice(address token) external view returns (uint256);
        function getMaxPrice(address token) external view returns (uint256);
        function cumulativeFundingRates(address token) external view returns (uint256);
    }
}

/// Calldata for `Reader.getPositions` over every slot of `query`.
pub fn encode_get_positions(vault: &Address, account: &Address, query: &PositionQuery) -> Vec<u8> {
    IReader::getPositionsCall {
        vault: *vault,
        account: *account,
        collateralTokens: query.collateral_tokens.clone(),
        indexTokens: query.index_tokens.clone(),
        isLong: query.is_long.clone(),
    }
    .abi_encode()
}

pub fn decode_get_positions(data: &[u8]) -> Result<Vec<U256>, alloy_sol_types::Error> {
    IReader::getPositionsCall::abi_decode_returns(data)
}

/// Per-token values read from the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultField {
    MinPrice,
    MaxPrice,
    CumulativeFundingRate,
}

impl VaultField {
    pub const ALL: [VaultField; 3] = [
        VaultField::MinPrice,
        VaultField::MaxPrice,
        VaultField::CumulativeFundingRate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VaultField::MinPrice => "minPrice",
            VaultField::MaxPrice => "maxPrice",
            VaultField::CumulativeFundingRate => "cumulativeFundingRate",
        }
    }

    pub fn encode(self, token: Address) -> Vec<u8> {
        match self {
            VaultField::MinPrice => IVault::getMinPriceCall { token }.abi_encode(),
            VaultField::MaxPrice => IVault::getMaxPriceCall { token }.abi_encode(),
            VaultField::CumulativeFundingRate => {
                IVault::cumulativeFundingRatesCall { token }.abi_encode()
            }
        }
    }

    pub fn decode(self, data: &[u8]) -> Result<U256, alloy_sol_types::Error> {
        match self {
            VaultField::MinPrice => IVault::getMinPriceCall::abi_decode_returns(data),
            VaultField::MaxPrice => IVault::getMaxPriceCall::abi_decode_returns(data),
            VaultField::CumulativeFundingRate => {
                IVault::cumulativeFundingRatesCall::abi_decode_returns(data)
            }
        }
    }
}
