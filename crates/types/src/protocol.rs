// Path: crates/types/src/protocol.rs
//! Behavioral primitives, the protocols that evidence them, and the supported chains.

use crate::error::AggregationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ethereum mainnet.
pub const CHAIN_ETHEREUM: u64 = 1;
/// Optimism.
pub const CHAIN_OPTIMISM: u64 = 10;
/// Polygon PoS.
pub const CHAIN_POLYGON: u64 = 137;
/// Base.
pub const CHAIN_BASE: u64 = 8453;
/// Arbitrum One.
pub const CHAIN_ARBITRUM: u64 = 42161;
/// Avalanche C-Chain.
pub const CHAIN_AVALANCHE: u64 = 43114;

/// Every chain in the static matrix, ascending.
pub const SUPPORTED_CHAINS: [u64; 6] = [
    CHAIN_ETHEREUM,
    CHAIN_OPTIMISM,
    CHAIN_POLYGON,
    CHAIN_BASE,
    CHAIN_ARBITRUM,
    CHAIN_AVALANCHE,
];

/// Returns true when the chain is part of the static matrix.
pub fn is_supported_chain(chain_id: u64) -> bool {
    SUPPORTED_CHAINS.contains(&chain_id)
}

/// A behavioral primitive the engine counts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    /// Borrowing and liquidations.
    Lending,
    /// Swaps and liquidity provision.
    Dex,
    /// Staking and vault deposits.
    Yield,
    /// Governance voting.
    Governance,
}

impl Primitive {
    /// All primitives in output order.
    pub const ALL: [Primitive; 4] = [
        Primitive::Lending,
        Primitive::Dex,
        Primitive::Yield,
        Primitive::Governance,
    ];

    /// The lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lending => "lending",
            Self::Dex => "dex",
            Self::Yield => "yield",
            Self::Governance => "governance",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol with a fixed, versioned set of event definitions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Aave V3 pool.
    AaveV3,
    /// Aave V2 lending pool.
    AaveV2,
    /// Compound V3 (Comet USDC market).
    CompoundV3,
    /// Compound V2 cTokens.
    CompoundV2,
    /// Uniswap V3 pools.
    UniswapV3,
    /// Uniswap V2 pairs.
    UniswapV2,
    /// QuickSwap pairs (Uniswap V2 fork on Polygon).
    Quickswap,
    /// Pangolin pairs (Uniswap V2 fork on Avalanche).
    Pangolin,
    /// Aave safety module staking.
    AaveStaking,
    /// Yearn V2 vaults.
    YearnV2,
    /// Lido stETH submissions.
    Lido,
    /// Aave governance V2.
    AaveGovernance,
    /// Compound Governor Bravo.
    CompoundGovernor,
}

impl Protocol {
    /// All protocols in matrix order. Adapter execution follows this order.
    pub const ALL: [Protocol; 13] = [
        Protocol::AaveV3,
        Protocol::AaveV2,
        Protocol::CompoundV3,
        Protocol::CompoundV2,
        Protocol::UniswapV3,
        Protocol::UniswapV2,
        Protocol::Quickswap,
        Protocol::Pangolin,
        Protocol::AaveStaking,
        Protocol::YearnV2,
        Protocol::Lido,
        Protocol::AaveGovernance,
        Protocol::CompoundGovernor,
    ];

    /// The snake_case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AaveV3 => "aave_v3",
            Self::AaveV2 => "aave_v2",
            Self::CompoundV3 => "compound_v3",
            Self::CompoundV2 => "compound_v2",
            Self::UniswapV3 => "uniswap_v3",
            Self::UniswapV2 => "uniswap_v2",
            Self::Quickswap => "quickswap",
            Self::Pangolin => "pangolin",
            Self::AaveStaking => "aave_staking",
            Self::YearnV2 => "yearn_v2",
            Self::Lido => "lido",
            Self::AaveGovernance => "aave_governance",
            Self::CompoundGovernor => "compound_governor",
        }
    }

    /// The primitive this protocol's events evidence.
    pub fn primitive(&self) -> Primitive {
        match self {
            Self::AaveV3 | Self::AaveV2 | Self::CompoundV3 | Self::CompoundV2 => Primitive::Lending,
            Self::UniswapV3 | Self::UniswapV2 | Self::Quickswap | Self::Pangolin => Primitive::Dex,
            Self::AaveStaking | Self::YearnV2 | Self::Lido => Primitive::Yield,
            Self::AaveGovernance | Self::CompoundGovernor => Primitive::Governance,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AggregationError::UnsupportedProtocol(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_names_round_trip() {
        for p in Protocol::ALL {
            assert_eq!(p.as_str().parse::<Protocol>().unwrap(), p);
        }
        assert_eq!(
            "sushiswap".parse::<Protocol>(),
            Err(AggregationError::UnsupportedProtocol("sushiswap".into()))
        );
    }

    #[test]
    fn test_supported_chains_sorted() {
        let mut sorted = SUPPORTED_CHAINS;
        sorted.sort_unstable();
        assert_eq!(sorted, SUPPORTED_CHAINS);
        assert!(is_supported_chain(8453));
        assert!(!is_supported_chain(56));
    }
}
