use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("key error: {0}")]
    Key(String),

    #[error("keystore I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid keystore: {0}")]
    InvalidKeystore(String),
}
