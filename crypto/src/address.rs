//! Account address derivation from public keys.
//!
//! Address = `0x` + hex(last 20 bytes of Blake2b-256(public_key)).

use stakeline_types::{PublicKey, StakingAddress};

use crate::hash::blake2b_256;

/// Derive the account address controlled by `public_key`.
pub fn derive_address(public_key: &PublicKey) -> StakingAddress {
    let digest = blake2b_256(public_key.as_bytes());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    StakingAddress::from_bytes(bytes)
}
