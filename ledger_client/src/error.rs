use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("ledger RPC error: {0}")]
    Rpc(String),

    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("signer cannot sign for {requested}")]
    SignerMismatch { requested: String },
}
