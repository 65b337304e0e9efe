use async_trait::async_trait;
use stakeline_types::{Contract, Period, SignedTransaction, TransactionReceipt, TxHash};

use crate::error::LedgerError;

/// Read/write gateway to the staking contracts.
///
/// ## Contract
///
/// - `submit` broadcasts and returns as soon as the ledger accepted the
///   transaction into its pool; inclusion is observed through `receipt`.
/// - Implementations never retry internally.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Read-only contract call.
    async fn call(
        &self,
        contract: &Contract,
        method: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, LedgerError>;

    /// Broadcast a signed transaction.
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash, LedgerError>;

    /// Inclusion receipt, `None` while the transaction is still pending.
    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<TransactionReceipt>, LedgerError>;

    /// The period the ledger's latest block falls in.
    async fn current_period(&self) -> Result<Period, LedgerError>;
}
