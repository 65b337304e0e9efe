//! Stake records and stakeholder identity.

use serde::{Deserialize, Serialize};

use crate::address::StakingAddress;
use crate::amount::TokenAmount;
use crate::period::Period;

/// A value-locked record owned by a staking address for a bounded period range.
///
/// `index` is the ordinal within the staker's stake list on the contract. It is
/// assigned once at creation and never reused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub staker: StakingAddress,
    /// Worker bonded to the staker, `None` when unbonded.
    pub worker: Option<StakingAddress>,
    pub index: u32,
    pub value: TokenAmount,
    pub start_period: Period,
    pub end_period: Period,
    pub restaking: bool,
    pub restake_lock_until: Option<Period>,
}

impl Stake {
    /// Lock duration in periods.
    pub fn duration(&self) -> u64 {
        self.end_period.since(self.start_period)
    }

    /// Whether the stake still locks tokens at `current`.
    pub fn is_active(&self, current: Period) -> bool {
        self.end_period > current
    }

    pub fn remaining_periods(&self, current: Period) -> u64 {
        self.end_period.since(current)
    }

    /// Structural invariants every stake read from the ledger must satisfy
    /// at `current`. Stakes are never deleted: an expired stake may reach
    /// its terminal zero-value state.
    pub fn is_well_formed(&self, current: Period) -> bool {
        self.end_period > self.start_period && (!self.value.is_zero() || !self.is_active(current))
    }
}

/// The worker currently bonded to a staker and the period the bond began.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerBinding {
    pub worker: StakingAddress,
    pub bonded_since: Period,
}

impl WorkerBinding {
    /// Whether the bond has lasted long enough to be replaced or detached.
    pub fn cooldown_elapsed(&self, current: Period, min_periods: u64) -> bool {
        current.since(self.bonded_since) >= min_periods
    }
}

/// Re-staking flag and optional lock, held per staker on the contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestakeState {
    pub enabled: bool,
    /// While `current < lock_until`, re-staking cannot be disabled.
    pub lock_until: Option<Period>,
}

impl RestakeState {
    pub fn is_locked(&self, current: Period) -> bool {
        matches!(self.lock_until, Some(lock) if current < lock)
    }
}

/// Whether the staking address is a signable account or a preallocation contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HolderKind {
    Direct,
    Preallocation { beneficiary: StakingAddress },
}

/// Identity of a staker.
///
/// For preallocation-backed stakers `staking_address` is the preallocation
/// contract and every transaction is signed by the beneficiary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeHolder {
    pub staking_address: StakingAddress,
    pub kind: HolderKind,
}

impl StakeHolder {
    pub fn direct(staking_address: StakingAddress) -> Self {
        Self {
            staking_address,
            kind: HolderKind::Direct,
        }
    }

    pub fn preallocation(contract: StakingAddress, beneficiary: StakingAddress) -> Self {
        Self {
            staking_address: contract,
            kind: HolderKind::Preallocation { beneficiary },
        }
    }

    pub fn is_preallocation(&self) -> bool {
        matches!(self.kind, HolderKind::Preallocation { .. })
    }

    pub fn beneficiary(&self) -> Option<&StakingAddress> {
        match &self.kind {
            HolderKind::Direct => None,
            HolderKind::Preallocation { beneficiary } => Some(beneficiary),
        }
    }

    /// The account that signs this holder's transactions.
    pub fn signer(&self) -> &StakingAddress {
        self.beneficiary().unwrap_or(&self.staking_address)
    }
}
