use stakeline_ledger_client::LedgerError;
use stakeline_types::{Period, StakingAddress};
use thiserror::Error;

/// Why a cached snapshot cannot be staged against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// A submission touched the staker since the last sync.
    Invalidated,
    /// The ledger moved to a later period after the sync.
    PeriodAdvanced { synced: Period, current: Period },
    /// The plan was staged from an older snapshot than the cached one.
    Superseded { staged: u64, current: u64 },
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalidated => write!(f, "invalidated by a submission"),
            Self::PeriodAdvanced { synced, current } => {
                write!(f, "synced in period {synced}, now {current}")
            }
            Self::Superseded { staged, current } => {
                write!(f, "staged from sync #{staged}, cache holds sync #{current}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("no snapshot for {0}; sync required")]
    NotSynced(StakingAddress),

    #[error("stale snapshot for {address} ({reason}); sync required")]
    StaleCache {
        address: StakingAddress,
        reason: StaleReason,
    },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
