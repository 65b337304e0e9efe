//! Transaction signing over the canonical bincode encoding.

use stakeline_types::{KeyPair, SignedTransaction, UnsignedTransaction};

use crate::address::derive_address;
use crate::error::CryptoError;
use crate::sign::{sign_message, verify_signature};

/// Canonical bytes a signer commits to.
pub fn signing_bytes(tx: &UnsignedTransaction) -> Result<Vec<u8>, CryptoError> {
    bincode::serialize(tx).map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// Sign `tx` with `keys`.
pub fn sign_transaction(
    tx: UnsignedTransaction,
    keys: &KeyPair,
) -> Result<SignedTransaction, CryptoError> {
    let bytes = signing_bytes(&tx)?;
    let signature = sign_message(&bytes, &keys.private);
    Ok(SignedTransaction {
        transaction: tx,
        public_key: keys.public.clone(),
        signature,
    })
}

/// Check the signature and that the key actually controls `from`.
pub fn verify_transaction(signed: &SignedTransaction) -> bool {
    if derive_address(&signed.public_key) != signed.transaction.from {
        return false;
    }
    match signing_bytes(&signed.transaction) {
        Ok(bytes) => verify_signature(&bytes, &signed.signature, &signed.public_key),
        Err(_) => false,
    }
}
