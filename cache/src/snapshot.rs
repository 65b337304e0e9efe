use serde::Serialize;
use stakeline_ledger_client::HolderState;
use stakeline_types::{Stake, Timestamp};

/// Whether a snapshot still reflects the last known on-chain state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Freshness {
    Fresh,
    Invalidated,
}

/// An immutable, atomically replaced copy of one staker's on-chain state.
#[derive(Clone, Debug, Serialize)]
pub struct HolderSnapshot {
    pub state: HolderState,
    /// Wall-clock time of the sync.
    pub synced_at: Timestamp,
    /// Monotonic per-cache sync counter.
    pub generation: u64,
}

impl HolderSnapshot {
    pub fn stakes(&self) -> &[Stake] {
        &self.state.stakes
    }
}
