use std::sync::Arc;
use std::time::Duration;

use stakeline_engine::{PlannedOperation, TransactionPlan};
use stakeline_ledger_client::{LedgerClient, LedgerError, Signer};
use stakeline_types::{ReceiptStatus, TransactionReceipt, TxHash};

use crate::report::{OperationOutcome, OperationReceipt, SequenceReport};

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Publishes plans through a ledger client and a signer.
pub struct Sequencer<L: LedgerClient + ?Sized> {
    ledger: Arc<L>,
    signer: Arc<dyn Signer>,
    poll_interval: Duration,
}

impl<L: LedgerClient + ?Sized> Sequencer<L> {
    pub fn new(ledger: Arc<L>, signer: Arc<dyn Signer>) -> Self {
        Self {
            ledger,
            signer,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Submit every operation of `plan` in order.
    ///
    /// Each operation is confirmed before the next is signed. `timeout`
    /// bounds each confirmation wait, not signing. The first failure marks
    /// every later operation `NotAttempted`.
    pub async fn submit(&self, plan: TransactionPlan, timeout: Duration) -> SequenceReport {
        let holder = plan.holder().clone();
        let (plan_id, operations) = plan.into_operations();
        tracing::info!(
            plan = %plan_id.short(),
            address = %holder,
            operations = operations.len(),
            "submitting plan"
        );

        let mut receipts = Vec::with_capacity(operations.len());
        let mut stopped = false;
        for (index, op) in operations.iter().enumerate() {
            let outcome = if stopped {
                OperationOutcome::NotAttempted
            } else {
                let outcome = self.run_operation(op, timeout).await;
                stopped = !outcome.is_confirmed();
                outcome
            };
            receipts.push(OperationReceipt {
                index,
                method: op.method(),
                outcome,
            });
        }

        let report = SequenceReport {
            plan: plan_id,
            holder,
            receipts,
        };
        if report.is_complete() {
            tracing::info!(plan = %plan_id.short(), "plan confirmed");
        } else {
            tracing::warn!(
                plan = %plan_id.short(),
                confirmed = report.confirmed_count(),
                total = report.receipts.len(),
                "plan stopped before completion"
            );
        }
        report
    }

    async fn run_operation(&self, op: &PlannedOperation, timeout: Duration) -> OperationOutcome {
        let method = op.method();

        let signed = match self.signer.sign(op.to_unsigned(), &op.signer).await {
            Ok(signed) => signed,
            Err(e) => {
                tracing::warn!(method, error = %e, "signing failed");
                return OperationOutcome::Failed {
                    tx_hash: None,
                    reason: e.to_string(),
                };
            }
        };

        let tx_hash = match self.ledger.submit(&signed).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(method, error = %e, "broadcast failed");
                return OperationOutcome::Failed {
                    tx_hash: None,
                    reason: e.to_string(),
                };
            }
        };
        tracing::debug!(method, tx = %tx_hash, "broadcast");

        match tokio::time::timeout(timeout, self.wait_for_receipt(&tx_hash)).await {
            Err(_) => {
                tracing::warn!(method, tx = %tx_hash, "confirmation timed out");
                OperationOutcome::TimedOut { tx_hash }
            }
            Ok(Err(e)) => OperationOutcome::Failed {
                tx_hash: Some(tx_hash),
                reason: e.to_string(),
            },
            Ok(Ok(receipt)) => match &receipt.status {
                ReceiptStatus::Success => {
                    tracing::info!(method, tx = %tx_hash, block = receipt.block_number, "confirmed");
                    OperationOutcome::Confirmed { receipt }
                }
                ReceiptStatus::Reverted { reason } => {
                    tracing::warn!(method, tx = %tx_hash, reason = %reason, "reverted");
                    OperationOutcome::Failed {
                        tx_hash: Some(tx_hash),
                        reason: format!("reverted: {reason}"),
                    }
                }
            },
        }
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<TransactionReceipt, LedgerError> {
        loop {
            if let Some(receipt) = self.ledger.receipt(tx_hash).await? {
                return Ok(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
