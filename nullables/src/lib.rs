//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the client (ledger, signer, clock) sits
//! behind a trait. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod ledger;
pub mod signer;

pub use clock::NullClock;
pub use ledger::{NullLedger, SimStake};
pub use signer::NullSigner;
