//! Key custody for Stakeline.
//!
//! - [`keystore`]: Argon2id + AES-256-GCM encrypted Ed25519 key files
//! - [`KeystoreSigner`]: a software [`Signer`](stakeline_ledger_client::Signer)
//!   backed by a decrypted keystore

pub mod error;
pub mod keystore;
pub mod signer;

pub use error::WalletError;
pub use keystore::{KdfParams, KeystoreFile};
pub use signer::KeystoreSigner;
