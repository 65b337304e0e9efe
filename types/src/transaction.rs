//! Transactions as they cross the wallet and ledger boundaries.

use serde::{Deserialize, Serialize};

use crate::address::StakingAddress;
use crate::contract::ContractCall;
use crate::hash::TxHash;
use crate::keys::{PublicKey, Signature};

/// A contract call ready to be signed by `from`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub from: StakingAddress,
    pub call: ContractCall,
    pub gas_limit: u64,
}

/// An [`UnsignedTransaction`] with the signer's public key and signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: UnsignedTransaction,
    pub public_key: PublicKey,
    pub signature: Signature,
}

/// Execution result reported by the ledger once a transaction is included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReceiptStatus {
    Success,
    Reverted { reason: String },
}

/// Inclusion receipt for a broadcast transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    #[serde(flatten)]
    pub status: ReceiptStatus,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}
