//! Stake ledger cache.
//!
//! Holds the last-synced [`HolderSnapshot`] per staking address. Reads never
//! refresh implicitly: a snapshot is either `Fresh` or `Invalidated`, and
//! callers ask for a fresh one explicitly through
//! [`StakeLedgerCache::fresh_snapshot`].
//!
//! The cache also owns the per-address operation locks that serialize
//! sync / stage / submit for one staker.

pub mod cache;
pub mod error;
pub mod locks;
pub mod snapshot;

pub use cache::StakeLedgerCache;
pub use error::{CacheError, StaleReason};
pub use locks::{AddressGuard, AddressLocks};
pub use snapshot::{Freshness, HolderSnapshot};
