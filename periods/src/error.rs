use stakeline_types::Timestamp;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("timestamp {timestamp} precedes the period epoch {epoch}")]
    InvalidTimestamp { timestamp: Timestamp, epoch: Timestamp },

    #[error("period length must be non-zero")]
    ZeroPeriodLength,

    #[error("arithmetic overflow in period computation")]
    Overflow,
}
