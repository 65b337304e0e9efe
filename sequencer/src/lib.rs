//! Transaction sequencer.
//!
//! Publishes the operations of a [`TransactionPlan`](stakeline_engine::TransactionPlan)
//! one at a time: sign, broadcast, wait for the receipt, then move on. The
//! first failure stops the sequence. Nothing is retried or rolled back.

pub mod error;
pub mod report;
pub mod sequencer;

pub use error::SequencerError;
pub use report::{OperationOutcome, OperationReceipt, SequenceReport};
pub use sequencer::{Sequencer, DEFAULT_POLL_INTERVAL};
