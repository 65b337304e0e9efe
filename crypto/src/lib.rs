//! Cryptographic primitives for Stakeline.
//!
//! - **Ed25519** for transaction signing and verification
//! - **Blake2b** for plan ids and address derivation
//! - Address derivation: last 20 bytes of Blake2b-256(public key)

pub mod address;
pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;
pub mod transaction;

pub use address::derive_address;
pub use error::CryptoError;
pub use hash::{blake2b_256, blake2b_256_multi};
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
pub use transaction::{signing_bytes, sign_transaction, verify_transaction};
