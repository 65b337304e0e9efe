use async_trait::async_trait;
use std::path::Path;

use stakeline_crypto::{derive_address, sign_transaction};
use stakeline_ledger_client::{LedgerError, Signer};
use stakeline_types::{KeyPair, SignedTransaction, StakingAddress, UnsignedTransaction};

use crate::error::WalletError;
use crate::keystore::KeystoreFile;

/// Signs with one decrypted Ed25519 key held in memory.
pub struct KeystoreSigner {
    keys: KeyPair,
    address: StakingAddress,
}

impl KeystoreSigner {
    pub fn new(keys: KeyPair) -> Self {
        let address = derive_address(&keys.public);
        Self { keys, address }
    }

    /// Load and decrypt a keystore file.
    pub fn open(path: &Path, password: &str) -> Result<Self, WalletError> {
        let keystore = KeystoreFile::load(path)?;
        Ok(Self::new(keystore.decrypt(password)?))
    }

    pub fn address(&self) -> &StakingAddress {
        &self.address
    }
}

#[async_trait]
impl Signer for KeystoreSigner {
    async fn sign(
        &self,
        tx: UnsignedTransaction,
        account: &StakingAddress,
    ) -> Result<SignedTransaction, LedgerError> {
        if account != &self.address || tx.from != self.address {
            return Err(LedgerError::SignerMismatch {
                requested: account.to_string(),
            });
        }
        sign_transaction(tx, &self.keys).map_err(|e| LedgerError::Signing(e.to_string()))
    }

    fn accounts(&self) -> Vec<StakingAddress> {
        vec![self.address.clone()]
    }
}
