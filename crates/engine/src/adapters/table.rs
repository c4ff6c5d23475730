// Path: crates/engine/src/adapters/table.rs
//! Event definitions for every supported protocol.

use super::{AdapterSpec, Counter, EventSpec, SubjectMatch};
use plight_types::protocol::Protocol;

const AAVE_V3_BORROW: &str = "Borrow(address,address,address,uint256,uint8,uint256,uint16)";
const AAVE_V2_BORROW: &str = "Borrow(address,address,address,uint256,uint256,uint256,uint16)";
const AAVE_LIQUIDATION_CALL: &str =
    "LiquidationCall(address,address,address,uint256,uint256,address,bool)";

const AAVE_V3_EVENTS: &[EventSpec] = &[
    EventSpec {
        name: "Borrow",
        signature: AAVE_V3_BORROW,
        // onBehalfOf
        subject: &[SubjectMatch::Topic(2)],
        counter: Counter::Borrow,
    },
    EventSpec {
        name: "LiquidationCall",
        signature: AAVE_LIQUIDATION_CALL,
        // user
        subject: &[SubjectMatch::Topic(3)],
        counter: Counter::Liquidation,
    },
];

const AAVE_V2_EVENTS: &[EventSpec] = &[
    EventSpec {
        name: "Borrow",
        signature: AAVE_V2_BORROW,
        subject: &[SubjectMatch::Topic(2)],
        counter: Counter::Borrow,
    },
    EventSpec {
        name: "LiquidationCall",
        signature: AAVE_LIQUIDATION_CALL,
        subject: &[SubjectMatch::Topic(3)],
        counter: Counter::Liquidation,
    },
];

const COMPOUND_V3_EVENTS: &[EventSpec] = &[EventSpec {
    name: "AbsorbDebt",
    signature: "AbsorbDebt(address,address,uint256,uint256)",
    // borrower
    subject: &[SubjectMatch::Topic(2)],
    counter: Counter::Liquidation,
}];

const COMPOUND_V2_EVENTS: &[EventSpec] = &[EventSpec {
    name: "LiquidateBorrow",
    signature: "LiquidateBorrow(address,address,uint256,address,uint256)",
    // No indexed arguments; the borrower is the second data word.
    subject: &[SubjectMatch::DataWord(1)],
    counter: Counter::Liquidation,
}];

const UNISWAP_V3_EVENTS: &[EventSpec] = &[
    EventSpec {
        name: "Swap",
        signature: "Swap(address,address,int256,int256,uint160,uint128,int24)",
        // sender, recipient
        subject: &[SubjectMatch::Topic(1), SubjectMatch::Topic(2)],
        counter: Counter::Swap,
    },
    EventSpec {
        name: "Mint",
        signature: "Mint(address,address,int24,int24,uint128,uint256,uint256)",
        // owner
        subject: &[SubjectMatch::Topic(1)],
        counter: Counter::LiquidityAdd,
    },
];

// Shared by every Uniswap V2 fork.
const UNISWAP_V2_EVENTS: &[EventSpec] = &[
    EventSpec {
        name: "Swap",
        signature: "Swap(address,uint256,uint256,uint256,uint256,address)",
        subject: &[SubjectMatch::Topic(1), SubjectMatch::Topic(2)],
        counter: Counter::Swap,
    },
    EventSpec {
        name: "Mint",
        signature: "Mint(address,uint256,uint256)",
        subject: &[SubjectMatch::Topic(1)],
        counter: Counter::LiquidityAdd,
    },
];

const AAVE_STAKING_EVENTS: &[EventSpec] = &[EventSpec {
    name: "Staked",
    signature: "Staked(address,address,uint256)",
    // from, onBehalfOf
    subject: &[SubjectMatch::Topic(1), SubjectMatch::Topic(2)],
    counter: Counter::Deposit,
}];

const YEARN_V2_EVENTS: &[EventSpec] = &[EventSpec {
    name: "Deposit",
    signature: "Deposit(address,uint256,uint256)",
    // recipient
    subject: &[SubjectMatch::Topic(1)],
    counter: Counter::Deposit,
}];

const LIDO_EVENTS: &[EventSpec] = &[EventSpec {
    name: "Submitted",
    signature: "Submitted(address,uint256,address)",
    // sender
    subject: &[SubjectMatch::Topic(1)],
    counter: Counter::Deposit,
}];

const AAVE_GOVERNANCE_EVENTS: &[EventSpec] = &[EventSpec {
    name: "VoteEmitted",
    signature: "VoteEmitted(uint256,address,bool,uint256)",
    // voter
    subject: &[SubjectMatch::Topic(1)],
    counter: Counter::Vote,
}];

const COMPOUND_GOVERNOR_EVENTS: &[EventSpec] = &[EventSpec {
    name: "VoteCast",
    signature: "VoteCast(address,uint256,uint8,uint256,string)",
    subject: &[SubjectMatch::Topic(1)],
    counter: Counter::Vote,
}];

/// One entry per protocol, in [`Protocol::ALL`] order.
pub const ADAPTERS: &[AdapterSpec] = &[
    AdapterSpec {
        protocol: Protocol::AaveV3,
        contract: "pool",
        scoped: true,
        events: AAVE_V3_EVENTS,
    },
    AdapterSpec {
        protocol: Protocol::AaveV2,
        contract: "lending_pool",
        scoped: true,
        events: AAVE_V2_EVENTS,
    },
    AdapterSpec {
        protocol: Protocol::CompoundV3,
        contract: "comet_usdc",
        scoped: true,
        events: COMPOUND_V3_EVENTS,
    },
    // LiquidateBorrow is emitted by each cToken market, not the comptroller.
    AdapterSpec {
        protocol: Protocol::CompoundV2,
        contract: "comptroller",
        scoped: false,
        events: COMPOUND_V2_EVENTS,
    },
    // Pool and pair events come from contracts created by the factory.
    AdapterSpec {
        protocol: Protocol::UniswapV3,
        contract: "factory",
        scoped: false,
        events: UNISWAP_V3_EVENTS,
    },
    AdapterSpec {
        protocol: Protocol::UniswapV2,
        contract: "factory",
        scoped: false,
        events: UNISWAP_V2_EVENTS,
    },
    AdapterSpec {
        protocol: Protocol::Quickswap,
        contract: "factory",
        scoped: false,
        events: UNISWAP_V2_EVENTS,
    },
    AdapterSpec {
        protocol: Protocol::Pangolin,
        contract: "factory",
        scoped: false,
        events: UNISWAP_V2_EVENTS,
    },
    AdapterSpec {
        protocol: Protocol::AaveStaking,
        contract: "stkaave",
        scoped: true,
        events: AAVE_STAKING_EVENTS,
    },
    // Vaults are listed in the registry; each vault emits its own Deposit.
    AdapterSpec {
        protocol: Protocol::YearnV2,
        contract: "registry",
        scoped: false,
        events: YEARN_V2_EVENTS,
    },
    AdapterSpec {
        protocol: Protocol::Lido,
        contract: "steth",
        scoped: true,
        events: LIDO_EVENTS,
    },
    AdapterSpec {
        protocol: Protocol::AaveGovernance,
        contract: "governance_v2",
        scoped: true,
        events: AAVE_GOVERNANCE_EVENTS,
    },
    AdapterSpec {
        protocol: Protocol::CompoundGovernor,
        contract: "governor_bravo",
        scoped: true,
        events: COMPOUND_GOVERNOR_EVENTS,
    },
];
