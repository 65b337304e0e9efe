use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use stakeline_ledger_client::{LedgerClient, StakingReader};
use stakeline_types::{Period, Stake, StakeHolder, StakingAddress, Timestamp};

use crate::error::{CacheError, StaleReason};
use crate::locks::{AddressGuard, AddressLocks};
use crate::snapshot::{Freshness, HolderSnapshot};

struct Entry {
    snapshot: Arc<HolderSnapshot>,
    freshness: Freshness,
}

/// Last-synced stake state per staking address.
///
/// Snapshots are replaced whole under the write lock, so a reader sees
/// either the previous or the new snapshot and never a mix.
pub struct StakeLedgerCache<L: LedgerClient + ?Sized> {
    ledger: Arc<L>,
    entries: RwLock<HashMap<StakingAddress, Entry>>,
    generation: AtomicU64,
    locks: AddressLocks,
}

impl<L: LedgerClient + ?Sized> StakeLedgerCache<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self {
            ledger,
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            locks: AddressLocks::new(),
        }
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Serialize operations on `address`. Hold the guard across
    /// sync, stage and submit.
    pub async fn lock(&self, address: &StakingAddress) -> AddressGuard {
        self.locks.lock(address).await
    }

    /// Fetch the holder's records from the ledger and replace the snapshot.
    ///
    /// On a ledger error the previous snapshot is left untouched.
    pub async fn sync(
        &self,
        holder: &StakeHolder,
        now: Timestamp,
    ) -> Result<Arc<HolderSnapshot>, CacheError> {
        let address = &holder.staking_address;
        let state = StakingReader::new(self.ledger.as_ref())
            .fetch_holder_state(holder)
            .await
            .map_err(|e| {
                tracing::warn!(address = %address, error = %e, "sync failed");
                CacheError::from(e)
            })?;

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = Arc::new(HolderSnapshot {
            state,
            synced_at: now,
            generation,
        });
        tracing::debug!(
            address = %address,
            period = %snapshot.state.period,
            stakes = snapshot.state.stakes.len(),
            generation,
            "holder synced"
        );

        self.entries.write().insert(
            address.clone(),
            Entry {
                snapshot: snapshot.clone(),
                freshness: Freshness::Fresh,
            },
        );
        Ok(snapshot)
    }

    /// Stakes from the last sync, ordered by index. Never refreshes.
    pub fn list(&self, address: &StakingAddress) -> Result<Vec<Stake>, CacheError> {
        let (snapshot, _) = self.snapshot(address)?;
        Ok(snapshot.state.stakes.clone())
    }

    pub fn snapshot(
        &self,
        address: &StakingAddress,
    ) -> Result<(Arc<HolderSnapshot>, Freshness), CacheError> {
        self.entries
            .read()
            .get(address)
            .map(|e| (e.snapshot.clone(), e.freshness))
            .ok_or_else(|| CacheError::NotSynced(address.clone()))
    }

    /// The snapshot, provided it is neither invalidated nor from an
    /// earlier period than `current`.
    pub fn fresh_snapshot(
        &self,
        address: &StakingAddress,
        current: Period,
    ) -> Result<Arc<HolderSnapshot>, CacheError> {
        let (snapshot, freshness) = self.snapshot(address)?;
        if freshness == Freshness::Invalidated {
            return Err(CacheError::StaleCache {
                address: address.clone(),
                reason: StaleReason::Invalidated,
            });
        }
        if snapshot.state.period < current {
            return Err(CacheError::StaleCache {
                address: address.clone(),
                reason: StaleReason::PeriodAdvanced {
                    synced: snapshot.state.period,
                    current,
                },
            });
        }
        Ok(snapshot)
    }

    /// Mark the snapshot stale. Returns false if nothing was cached.
    pub fn invalidate(&self, address: &StakingAddress) -> bool {
        match self.entries.write().get_mut(address) {
            Some(entry) => {
                entry.freshness = Freshness::Invalidated;
                tracing::debug!(address = %address, "snapshot invalidated");
                true
            }
            None => false,
        }
    }
}
