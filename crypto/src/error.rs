use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to encode transaction for signing: {0}")]
    Encoding(String),
}
