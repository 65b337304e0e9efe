//! Validation errors raised while staging a plan.

use stakeline_cache::CacheError;
use stakeline_periods::PeriodError;
use stakeline_types::{Period, StakingAddress, TokenAmount};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("value must be non-zero")]
    ZeroValue,

    #[error("insufficient balance: need {needed}, available {available}")]
    InsufficientBalance {
        needed: TokenAmount,
        available: TokenAmount,
    },

    #[error("duration of {requested} periods is below the minimum of {minimum}")]
    DurationTooShort { requested: u64, minimum: u64 },

    #[error("stake {0} not found")]
    StakeNotFound(u32),

    #[error("stake {index} expired at period {end_period}")]
    StakeExpired { index: u32, end_period: Period },

    #[error("target value {target} must be above zero and below the stake value {stake_value}")]
    InvalidTargetValue {
        target: TokenAmount,
        stake_value: TokenAmount,
    },

    #[error("extension must be at least one period")]
    NonPositiveExtension,

    #[error("worker {worker} bonded since {bonded_since} cannot be changed before period {available_at}")]
    WorkerAlreadyBonded {
        worker: StakingAddress,
        bonded_since: Period,
        available_at: Period,
    },

    #[error("worker {0} is already bonded")]
    WorkerUnchanged(StakingAddress),

    #[error("no worker is bonded")]
    NoWorkerBonded,

    #[error("re-staking is locked until period {lock_until} (current {current})")]
    ReStakeLocked { lock_until: Period, current: Period },

    #[error("invalid re-stake lock {lock_until} at period {current}")]
    InvalidLockPeriod { lock_until: Period, current: Period },

    #[error("rewards of a preallocation can only be withdrawn to {required}, not {requested}")]
    InvalidWithdrawAddress {
        requested: StakingAddress,
        required: StakingAddress,
    },

    #[error("{0} is not a preallocation contract")]
    NotPreallocation(StakingAddress),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("plan encoding failed: {0}")]
    Encoding(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Period(#[from] PeriodError),
}

impl StageError {
    /// Errors that clear after a re-sync, as opposed to rejected requests.
    pub fn needs_sync(&self) -> bool {
        matches!(
            self,
            Self::Cache(CacheError::StaleCache { .. } | CacheError::NotSynced(_))
        )
    }
}
