//! Per-address operation locks.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use stakeline_types::StakingAddress;

/// Hands out one async mutex per staking address.
///
/// Locks for different addresses are independent, so I/O for distinct
/// stakers proceeds concurrently. Idle entries are dropped whenever a lock
/// is requested, so the map only holds addresses that are locked or being
/// waited on.
#[derive(Default)]
pub struct AddressLocks {
    locks: Mutex<HashMap<StakingAddress, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one logical operation on a staker.
#[derive(Debug)]
pub struct AddressGuard {
    address: StakingAddress,
    _guard: OwnedMutexGuard<()>,
}

impl AddressGuard {
    pub fn address(&self) -> &StakingAddress {
        &self.address
    }
}

impl AddressLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `address`.
    pub async fn lock(&self, address: &StakingAddress) -> AddressGuard {
        let mutex = {
            let mut locks = self.locks.lock();
            // Held guards and pending waiters each own a clone of the Arc.
            locks.retain(|addr, m| addr == address || Arc::strong_count(m) > 1);
            locks
                .entry(address.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = mutex.lock_owned().await;
        tracing::trace!(address = %address, "address lock acquired");
        AddressGuard {
            address: address.clone(),
            _guard: guard,
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn addr(n: u8) -> StakingAddress {
        StakingAddress::from_bytes([n; 20])
    }

    const WAIT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn same_address_is_exclusive() {
        let locks = AddressLocks::new();
        let guard = locks.lock(&addr(1)).await;
        assert!(timeout(WAIT, locks.lock(&addr(1))).await.is_err());
        drop(guard);
        assert!(timeout(WAIT, locks.lock(&addr(1))).await.is_ok());
    }

    #[tokio::test]
    async fn different_addresses_are_independent() {
        let locks = AddressLocks::new();
        let _a = locks.lock(&addr(1)).await;
        let b = timeout(WAIT, locks.lock(&addr(2))).await.unwrap();
        assert_eq!(b.address(), &addr(2));
    }

    #[tokio::test]
    async fn released_addresses_are_pruned() {
        let locks = AddressLocks::new();
        let held = locks.lock(&addr(1)).await;
        drop(locks.lock(&addr(2)).await);
        drop(locks.lock(&addr(3)).await);
        // addr(1) is still held; addr(2) was released and pruned.
        assert_eq!(locks.tracked(), 2);
        drop(held);
        drop(locks.lock(&addr(4)).await);
        assert_eq!(locks.tracked(), 1);
    }
}
