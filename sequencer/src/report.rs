//! Per-operation submission results.

use serde::Serialize;

use stakeline_engine::PlanId;
use stakeline_types::{StakingAddress, TransactionReceipt, TxHash};

use crate::error::SequencerError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationOutcome {
    Confirmed { receipt: TransactionReceipt },
    /// Signing, broadcast, receipt lookup or execution failed. `tx_hash` is
    /// set once the transaction was broadcast.
    Failed {
        tx_hash: Option<TxHash>,
        reason: String,
    },
    /// Broadcast but not confirmed within the timeout. It may still land.
    TimedOut { tx_hash: TxHash },
    NotAttempted,
}

impl OperationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Failed { reason, .. } => Some(reason.clone()),
            Self::TimedOut { tx_hash } => Some(format!("confirmation of {tx_hash} timed out")),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OperationReceipt {
    pub index: usize,
    pub method: &'static str,
    pub outcome: OperationOutcome,
}

/// Outcome of publishing one plan: one entry per planned operation, in
/// plan order.
#[derive(Clone, Debug, Serialize)]
pub struct SequenceReport {
    pub plan: PlanId,
    pub holder: StakingAddress,
    pub receipts: Vec<OperationReceipt>,
}

impl SequenceReport {
    pub fn confirmed_count(&self) -> usize {
        self.receipts
            .iter()
            .take_while(|r| r.outcome.is_confirmed())
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.receipts.iter().all(|r| r.outcome.is_confirmed())
    }

    /// The operation the sequence stopped at.
    pub fn stopped_at(&self) -> Option<&OperationReceipt> {
        self.receipts.iter().find(|r| !r.outcome.is_confirmed())
    }

    /// Transactions broadcast to the ledger, confirmed or not.
    pub fn broadcast_hashes(&self) -> Vec<TxHash> {
        self.receipts
            .iter()
            .filter_map(|r| match &r.outcome {
                OperationOutcome::Confirmed { receipt } => Some(receipt.tx_hash),
                OperationOutcome::TimedOut { tx_hash } => Some(*tx_hash),
                OperationOutcome::Failed { tx_hash, .. } => *tx_hash,
                OperationOutcome::NotAttempted => None,
            })
            .collect()
    }

    pub fn into_result(self) -> Result<Vec<TransactionReceipt>, SequencerError> {
        let confirmed = self.confirmed_count();
        if let Some(stop) = self.stopped_at() {
            let reason = stop
                .outcome
                .failure_reason()
                .unwrap_or_else(|| "not attempted".to_string());
            return Err(if confirmed == 0 {
                SequencerError::SubmissionFailed {
                    index: stop.index,
                    reason,
                }
            } else {
                SequencerError::PartialSequenceFailure {
                    confirmed,
                    failed_index: stop.index,
                    reason,
                }
            });
        }
        Ok(self
            .receipts
            .into_iter()
            .filter_map(|r| match r.outcome {
                OperationOutcome::Confirmed { receipt } => Some(receipt),
                _ => None,
            })
            .collect())
    }
}
