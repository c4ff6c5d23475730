// Path: crates/engine/src/matrix.rs
//! The static protocol deployment matrix.
//!
//! Each row is `(protocol, chain, contract name, address)`. A protocol applies to
//! a chain exactly when it has a row for that chain; resolution never guesses.

use plight_types::address::Address;
use plight_types::error::AggregationError;
use plight_types::protocol::{
    Primitive, Protocol, CHAIN_ARBITRUM, CHAIN_AVALANCHE, CHAIN_BASE, CHAIN_ETHEREUM,
    CHAIN_OPTIMISM, CHAIN_POLYGON,
};

/// One deployed contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    /// The protocol the contract belongs to.
    pub protocol: Protocol,
    /// The chain it is deployed on.
    pub chain_id: u64,
    /// The contract's role within the protocol (`pool`, `factory`, ...).
    pub contract: &'static str,
    /// The checksummed deployment address.
    pub address: &'static str,
}

const fn row(
    protocol: Protocol,
    chain_id: u64,
    contract: &'static str,
    address: &'static str,
) -> Deployment {
    Deployment {
        protocol,
        chain_id,
        contract,
        address,
    }
}

/// Every known deployment.
pub const DEPLOYMENTS: &[Deployment] = &[
    // Lending
    row(Protocol::AaveV3, CHAIN_ETHEREUM, "pool", "0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"),
    row(Protocol::AaveV3, CHAIN_OPTIMISM, "pool", "0x794a61358D6845594F94dc1DB02A252b5b4814aD"),
    row(Protocol::AaveV3, CHAIN_POLYGON, "pool", "0x794a61358D6845594F94dc1DB02A252b5b4814aD"),
    row(Protocol::AaveV3, CHAIN_BASE, "pool", "0xA238Dd80C259a72e81d7e4664a9801593F98d1c5"),
    row(Protocol::AaveV3, CHAIN_ARBITRUM, "pool", "0x794a61358D6845594F94dc1DB02A252b5b4814aD"),
    row(Protocol::AaveV3, CHAIN_AVALANCHE, "pool", "0x794a61358D6845594F94dc1DB02A252b5b4814aD"),
    row(Protocol::AaveV2, CHAIN_ETHEREUM, "lending_pool", "0x7d2768dE32b0b80b7a3454c06BdAc94A69DDc7A9"),
    row(Protocol::CompoundV3, CHAIN_ETHEREUM, "comet_usdc", "0xc3d688B66703497DAA19211EEdff47f25384cdc3"),
    row(Protocol::CompoundV2, CHAIN_ETHEREUM, "comptroller", "0x3d9819210A31b4961b30EF54bE2aeD79B9c9Cd3B"),
    // DEX
    row(Protocol::UniswapV3, CHAIN_ETHEREUM, "factory", "0x1F98431c8aD98523631AE4a59f267346ea31F984"),
    row(Protocol::UniswapV3, CHAIN_OPTIMISM, "factory", "0x1F98431c8aD98523631AE4a59f267346ea31F984"),
    row(Protocol::UniswapV3, CHAIN_ARBITRUM, "factory", "0x1F98431c8aD98523631AE4a59f267346ea31F984"),
    row(Protocol::UniswapV2, CHAIN_ETHEREUM, "factory", "0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f"),
    row(Protocol::Quickswap, CHAIN_POLYGON, "factory", "0x5757371414417b8C6CAad45bAeF941aBc7d3Ab32"),
    row(Protocol::Pangolin, CHAIN_AVALANCHE, "factory", "0xefa94DE7a4656D787667C749f7E1223D71E9FD88"),
    // Yield
    row(Protocol::AaveStaking, CHAIN_ETHEREUM, "stkaave", "0x4da27a545c0c5B758a6BA100e3a049001de870f5"),
    row(Protocol::YearnV2, CHAIN_ETHEREUM, "registry", "0x50c1a2eA0a861A967D9d0FFE2AE4012c2E053804"),
    row(Protocol::Lido, CHAIN_ETHEREUM, "steth", "0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84"),
    // Governance
    row(Protocol::AaveGovernance, CHAIN_ETHEREUM, "governance_v2", "0xEC568fffba86c094cf06b22134B23074DFE2252c"),
    row(Protocol::CompoundGovernor, CHAIN_ETHEREUM, "governor_bravo", "0xc0Da02939E1441F497fd74F78cE7Decb17B66529"),
];

/// True when `protocol` belongs to `primitive` and is deployed on `chain_id`.
pub fn is_applicable(primitive: Primitive, protocol: Protocol, chain_id: u64) -> bool {
    protocol.primitive() == primitive
        && DEPLOYMENTS
            .iter()
            .any(|d| d.protocol == protocol && d.chain_id == chain_id)
}

/// The protocols of `primitive` deployed on `chain_id`, in [`Protocol::ALL`] order.
pub fn applicable(primitive: Primitive, chain_id: u64) -> Vec<Protocol> {
    Protocol::ALL
        .into_iter()
        .filter(|p| is_applicable(primitive, *p, chain_id))
        .collect()
}

/// The chains `protocol` is deployed on, ascending.
pub fn deployed_chains(protocol: Protocol) -> Vec<u64> {
    let mut chains: Vec<u64> = DEPLOYMENTS
        .iter()
        .filter(|d| d.protocol == protocol)
        .map(|d| d.chain_id)
        .collect();
    chains.sort_unstable();
    chains.dedup();
    chains
}

/// Resolves a contract address.
///
/// Fails with `UnsupportedProtocol` when the protocol does not belong to the
/// primitive or has no such contract, and with `UnsupportedChain` when the
/// protocol is not deployed on the chain.
pub fn resolve(
    protocol: Protocol,
    primitive: Primitive,
    chain_id: u64,
    contract: &str,
) -> Result<Address, AggregationError> {
    if protocol.primitive() != primitive {
        return Err(AggregationError::UnsupportedProtocol(format!(
            "{protocol} does not support primitive {primitive}"
        )));
    }
    let mut on_chain = DEPLOYMENTS
        .iter()
        .filter(|d| d.protocol == protocol && d.chain_id == chain_id)
        .peekable();
    if on_chain.peek().is_none() {
        return Err(AggregationError::UnsupportedChain(chain_id));
    }
    let row = on_chain.find(|d| d.contract == contract).ok_or_else(|| {
        AggregationError::UnsupportedProtocol(format!(
            "contract {contract} not found for {protocol} on chain {chain_id}"
        ))
    })?;
    row.address.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_row_parses() {
        for d in DEPLOYMENTS {
            assert!(d.address.parse::<Address>().is_ok(), "{d:?}");
        }
    }

    #[test]
    fn test_applicability_follows_deployments() {
        assert_eq!(
            applicable(Primitive::Lending, CHAIN_ETHEREUM),
            vec![
                Protocol::AaveV3,
                Protocol::AaveV2,
                Protocol::CompoundV3,
                Protocol::CompoundV2
            ]
        );
        assert_eq!(applicable(Primitive::Lending, CHAIN_BASE), vec![Protocol::AaveV3]);
        assert_eq!(applicable(Primitive::Dex, CHAIN_POLYGON), vec![Protocol::Quickswap]);
        assert_eq!(
            applicable(Primitive::Dex, CHAIN_ARBITRUM),
            vec![Protocol::UniswapV3]
        );
        assert!(applicable(Primitive::Dex, CHAIN_BASE).is_empty());
        assert!(applicable(Primitive::Governance, CHAIN_OPTIMISM).is_empty());
        assert!(applicable(Primitive::Lending, 999).is_empty());
    }

    #[test]
    fn test_deployed_chains() {
        assert_eq!(
            deployed_chains(Protocol::AaveV3),
            vec![1, 10, 137, 8453, 42161, 43114]
        );
        assert_eq!(deployed_chains(Protocol::Lido), vec![1]);
    }

    #[test]
    fn test_resolution_fails_closed() {
        assert_eq!(
            resolve(Protocol::AaveV3, Primitive::Lending, CHAIN_ETHEREUM, "pool")
                .unwrap()
                .to_string(),
            "0x87870bca3f3fd6335c3f4ce8392d69350b4fa4e2"
        );
        assert_eq!(
            resolve(Protocol::Lido, Primitive::Yield, CHAIN_POLYGON, "steth"),
            Err(AggregationError::UnsupportedChain(CHAIN_POLYGON))
        );
        assert!(matches!(
            resolve(Protocol::Lido, Primitive::Lending, CHAIN_ETHEREUM, "steth"),
            Err(AggregationError::UnsupportedProtocol(_))
        ));
        assert!(matches!(
            resolve(Protocol::AaveV3, Primitive::Lending, CHAIN_ETHEREUM, "oracle"),
            Err(AggregationError::UnsupportedProtocol(_))
        ));
    }
}
