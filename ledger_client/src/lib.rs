//! Ledger client boundary.
//!
//! The rest of the workspace depends only on the two traits defined here:
//! - [`LedgerClient`]: contract reads, transaction broadcast, receipt lookup
//!   and the ledger's current period.
//! - [`Signer`]: the wallet boundary; signing may block on out-of-band
//!   confirmation (hardware wallets).
//!
//! [`StakingReader`] turns raw contract reads into a typed [`HolderState`],
//! and [`HttpLedgerClient`] implements [`LedgerClient`] over JSON-RPC.

pub mod client;
pub mod error;
pub mod http;
pub mod reader;
pub mod signer;

pub use client::LedgerClient;
pub use error::LedgerError;
pub use http::HttpLedgerClient;
pub use reader::{HolderState, StakingReader};
pub use signer::Signer;
