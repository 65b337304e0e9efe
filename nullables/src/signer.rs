//! Nullable signer: a software key that never prompts.

use async_trait::async_trait;

use stakeline_crypto::{derive_address, keypair_from_seed, sign_transaction};
use stakeline_ledger_client::{LedgerError, Signer};
use stakeline_types::{KeyPair, SignedTransaction, StakingAddress, UnsignedTransaction};

/// Signs with a key derived from a fixed seed.
pub struct NullSigner {
    keys: KeyPair,
    address: StakingAddress,
}

impl NullSigner {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let keys = keypair_from_seed(&seed);
        let address = derive_address(&keys.public);
        Self { keys, address }
    }

    pub fn address(&self) -> StakingAddress {
        self.address.clone()
    }
}

#[async_trait]
impl Signer for NullSigner {
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
