use async_trait::async_trait;
use stakeline_types::{SignedTransaction, StakingAddress, UnsignedTransaction};

use crate::error::LedgerError;

/// Wallet/signing boundary.
///
/// `sign` may wait without bound for a user to confirm on a device; callers
/// must not wrap it in a timeout that would drop an approval in flight.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign `tx` on behalf of `account`.
    async fn sign(
        &self,
        tx: UnsignedTransaction,
        account: &StakingAddress,
    ) -> Result<SignedTransaction, LedgerError>;

    /// Accounts this signer holds keys for.
    fn accounts(&self) -> Vec<StakingAddress>;
}
