use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    /// The first failing operation was also the first of the plan.
    #[error("operation {index} failed, nothing was confirmed: {reason}")]
    SubmissionFailed { index: usize, reason: String },

    #[error("{confirmed} operation(s) confirmed, then operation {failed_index} failed: {reason}")]
    PartialSequenceFailure {
        confirmed: usize,
        failed_index: usize,
        reason: String,
    },
}
