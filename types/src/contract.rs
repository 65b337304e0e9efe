//! Staking-contract call model.
//!
//! Every state-changing action the client can publish is a [`StakingCall`]
//! addressed to a [`Contract`]. Preallocation-backed stakers route the same
//! calls through their preallocation contract, which forwards them to the
//! escrow using its own balance.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use crate::address::StakingAddress;
use crate::amount::TokenAmount;
use crate::params::GasSchedule;
use crate::period::Period;

/// A deployed contract the client talks to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "contract", content = "address", rename_all = "snake_case")]
pub enum Contract {
    StakingEscrow,
    PolicyManager,
    Token,
    Preallocation(StakingAddress),
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StakingEscrow => f.write_str("StakingEscrow"),
            Self::PolicyManager => f.write_str("PolicyManager"),
            Self::Token => f.write_str("Token"),
            Self::Preallocation(addr) => write!(f, "Preallocation({})", addr.short()),
        }
    }
}

/// A state-changing staking action with its arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum StakingCall {
    Deposit {
        value: TokenAmount,
        periods: u64,
    },
    DivideStake {
        index: u32,
        target_value: TokenAmount,
        extra_periods: u64,
    },
    ProlongStake {
        index: u32,
        periods: u64,
    },
    SetWindDown {
        enabled: bool,
    },
    /// `worker: None` detaches the current worker.
    BondWorker {
        worker: Option<StakingAddress>,
    },
    SetReStake {
        enabled: bool,
    },
    LockReStake {
        until: Period,
    },
    WithdrawStakingReward {
        amount: TokenAmount,
    },
    WithdrawPolicyReward {
        to: StakingAddress,
    },
    WithdrawTokens {
        amount: TokenAmount,
    },
}

impl StakingCall {
    /// Contract method name, which differs for calls routed through a
    /// preallocation contract.
    pub fn method(&self, via_preallocation: bool) -> &'static str {
        match (self, via_preallocation) {
            (Self::Deposit { .. }, false) => "deposit",
            (Self::Deposit { .. }, true) => "depositAsStaker",
            (Self::DivideStake { .. }, _) => "divideStake",
            (Self::ProlongStake { .. }, _) => "prolongStake",
            (Self::SetWindDown { .. }, _) => "setWindDown",
            (Self::BondWorker { .. }, _) => "bondWorker",
            (Self::SetReStake { .. }, _) => "setReStake",
            (Self::LockReStake { .. }, _) => "lockReStake",
            (Self::WithdrawStakingReward { .. }, false) => "withdraw",
            (Self::WithdrawStakingReward { .. }, true) => "withdrawAsStaker",
            (Self::WithdrawPolicyReward { .. }, false) => "withdraw",
            (Self::WithdrawPolicyReward { .. }, true) => "withdrawPolicyReward",
            (Self::WithdrawTokens { .. }, _) => "withdrawTokens",
        }
    }

    /// Contract that receives this call for a directly-signing staker.
    pub fn direct_contract(&self) -> Contract {
        match self {
            Self::WithdrawPolicyReward { .. } => Contract::PolicyManager,
            _ => Contract::StakingEscrow,
        }
    }

    /// Positional JSON arguments as the ledger's ABI encoder expects them.
    pub fn args(&self) -> serde_json::Value {
        match self {
            Self::Deposit { value, periods } => json!([value.raw().to_string(), periods]),
            Self::DivideStake {
                index,
                target_value,
                extra_periods,
            } => json!([index, target_value.raw().to_string(), extra_periods]),
            Self::ProlongStake { index, periods } => json!([index, periods]),
            Self::SetWindDown { enabled } => json!([enabled]),
            Self::BondWorker { worker } => {
                let worker = worker.clone().unwrap_or_else(StakingAddress::null);
                json!([worker.as_str()])
            }
            Self::SetReStake { enabled } => json!([enabled]),
            Self::LockReStake { until } => json!([until.index()]),
            Self::WithdrawStakingReward { amount } => json!([amount.raw().to_string()]),
            Self::WithdrawPolicyReward { to } => json!([to.as_str()]),
            Self::WithdrawTokens { amount } => json!([amount.raw().to_string()]),
        }
    }

    /// Token value moved by this call, if any.
    pub fn value(&self) -> Option<TokenAmount> {
        match self {
            Self::Deposit { value, .. } => Some(*value),
            Self::DivideStake { target_value, .. } => Some(*target_value),
            Self::WithdrawStakingReward { amount } | Self::WithdrawTokens { amount } => {
                Some(*amount)
            }
            _ => None,
        }
    }

    pub fn estimated_gas(&self, gas: &GasSchedule) -> u64 {
        match self {
            Self::Deposit { .. } => gas.deposit,
            Self::DivideStake { .. } => gas.divide_stake,
            Self::ProlongStake { .. } => gas.prolong_stake,
            Self::SetWindDown { .. } => gas.set_wind_down,
            Self::BondWorker { .. } => gas.bond_worker,
            Self::SetReStake { .. } => gas.set_restake,
            Self::LockReStake { .. } => gas.lock_restake,
            Self::WithdrawStakingReward { .. } => gas.withdraw_staking_reward,
            Self::WithdrawPolicyReward { .. } => gas.withdraw_policy_reward,
            Self::WithdrawTokens { .. } => gas.withdraw_tokens,
        }
    }
}

/// A [`StakingCall`] bound to the contract that will execute it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract: Contract,
    pub call: StakingCall,
}

impl ContractCall {
    pub fn new(contract: Contract, call: StakingCall) -> Self {
        Self { contract, call }
    }

    pub fn via_preallocation(&self) -> bool {
        matches!(self.contract, Contract::Preallocation(_))
    }

    pub fn method(&self) -> &'static str {
        self.call.method(self.via_preallocation())
    }
}
