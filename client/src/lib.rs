//! Stakeline client.
//!
//! [`StakerClient`] wires the stake ledger cache, lifecycle engine and
//! transaction sequencer together. All work on one staker goes through a
//! [`HolderSession`], which holds that staker's operation lock for its
//! whole lifetime.

pub mod client;
pub mod error;
pub mod session;
pub mod spans;

pub use client::{ClientConfig, StakerClient};
pub use error::ClientError;
pub use session::HolderSession;
