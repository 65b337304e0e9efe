//! Argon2id encrypted keystore for Ed25519 private keys.
//!
//! Encrypts a 32-byte Ed25519 secret key with a user-chosen password:
//! 1. Argon2id derives a 32-byte encryption key from the password + random salt
//! 2. AES-256-GCM encrypts the secret key with a random nonce
//! 3. The result is stored as a JSON file with all parameters for future decryption
//!
//! The file also records the staking address the key controls, so a wrong
//! keystore is caught before any password prompt.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use zeroize::Zeroizing;

use stakeline_crypto::{derive_address, keypair_from_private};
use stakeline_types::{KeyPair, PrivateKey, StakingAddress};

use crate::error::WalletError;

const KEYSTORE_VERSION: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;
/// Salt length in bytes.
const SALT_LEN: usize = 32;
/// AES-GCM nonce length in bytes (96 bits).
const NONCE_LEN: usize = 12;

const CIPHER: &str = "aes-256-gcm";
const KDF: &str = "argon2id";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeystoreFile {
    pub version: u32,
    pub address: StakingAddress,
    pub crypto: KeystoreCrypto,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeystoreCrypto {
    pub cipher: String,
    pub kdf: String,
    pub kdf_params: KdfParams,
    /// Hex-encoded salt.
    pub salt: String,
    /// Hex-encoded nonce.
    pub nonce: String,
    /// Hex-encoded ciphertext.
    pub ciphertext: String,
}

/// Argon2id cost parameters, stored with the file so decryption uses the
/// cost the key was encrypted with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// KiB of memory.
    pub memory: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MB memory, 3 iterations, 1 lane.
    fn default() -> Self {
        Self {
            memory: 65_536,
            iterations: 3,
            parallelism: 1,
        }
    }
}

impl KeystoreFile {
    /// Encrypt `keys` under `password`.
    pub fn encrypt(keys: &KeyPair, password: &str, kdf: KdfParams) -> Result<Self, WalletError> {
        let mut rng = rand::thread_rng();
        let mut salt = [0u8; SALT_LEN];
        rng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce_bytes);

        let derived = derive_key(password, &salt, &kdf)?;
        let cipher = Aes256Gcm::new_from_slice(&derived[..])
            .map_err(|e| WalletError::Key(format!("AES key init failed: {e}")))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), keys.private.0.as_ref())
            .map_err(|e| WalletError::Key(format!("encryption failed: {e}")))?;

        Ok(Self {
            version: KEYSTORE_VERSION,
            address: derive_address(&keys.public),
            crypto: KeystoreCrypto {
                cipher: CIPHER.to_string(),
                kdf: KDF.to_string(),
                kdf_params: kdf,
                salt: hex::encode(salt),
                nonce: hex::encode(nonce_bytes),
                ciphertext: hex::encode(ciphertext),
            },
        })
    }

    /// Decrypt the key pair and check it controls `self.address`.
    pub fn decrypt(&self, password: &str) -> Result<KeyPair, WalletError> {
        if self.version != KEYSTORE_VERSION {
            return Err(WalletError::InvalidKeystore(format!(
                "unsupported keystore version: {}",
                self.version
            )));
        }
        if self.crypto.cipher != CIPHER || self.crypto.kdf != KDF {
            return Err(WalletError::InvalidKeystore(format!(
                "unsupported scheme {}/{}",
                self.crypto.kdf, self.crypto.cipher
            )));
        }

        let salt = decode_field("salt", &self.crypto.salt)?;
        let nonce_bytes = decode_field("nonce", &self.crypto.nonce)?;
        let ciphertext = decode_field("ciphertext", &self.crypto.ciphertext)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(WalletError::InvalidKeystore(format!(
                "invalid nonce length: expected {NONCE_LEN}, got {}",
                nonce_bytes.len()
            )));
        }

        let derived = derive_key(password, &salt, &self.crypto.kdf_params)?;
        let cipher = Aes256Gcm::new_from_slice(&derived[..])
            .map_err(|e| WalletError::Key(format!("AES key init failed: {e}")))?;
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
                .map_err(|_| {
                    WalletError::Key("decryption failed: wrong password or corrupted data".into())
                })?,
        );

        let secret: [u8; 32] = plaintext.as_slice().try_into().map_err(|_| {
            WalletError::InvalidKeystore(format!(
                "decrypted key has wrong length: expected 32, got {}",
                plaintext.len()
            ))
        })?;
        let keys = keypair_from_private(PrivateKey(secret));
        if derive_address(&keys.public) != self.address {
            return Err(WalletError::InvalidKeystore(format!(
                "key does not control {}",
                self.address
            )));
        }
        Ok(keys)
    }

    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| WalletError::InvalidKeystore(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| WalletError::InvalidKeystore(format!("invalid keystore JSON: {e}")))
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, WalletError> {
    hex::decode(value).map_err(|e| WalletError::InvalidKeystore(format!("invalid {name} hex: {e}")))
}

/// Derive a 32-byte key from a password and salt using Argon2id.
fn derive_key(
    password: &str,
    salt: &[u8],
    kdf: &KdfParams,
) -> Result<Zeroizing<[u8; 32]>, WalletError> {
    let params = Params::new(
        kdf.memory,
        kdf.iterations,
        kdf.parallelism,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|e| WalletError::Key(format!("Argon2 params error: {e}")))?;

    let mut output = Zeroizing::new([0u8; 32]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password.as_bytes(), salt, &mut output[..])
        .map_err(|e| WalletError::Key(format!("Argon2 hashing failed: {e}")))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeline_crypto::keypair_from_seed;

    /// Cheap parameters so the suite stays fast.
    const FAST: KdfParams = KdfParams {
        memory: 1_024,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let keys = keypair_from_seed(&[42u8; 32]);
        let keystore = KeystoreFile::encrypt(&keys, "test-password-123", FAST).unwrap();
        let decrypted = keystore.decrypt("test-password-123").unwrap();
        assert_eq!(decrypted.public, keys.public);
        assert_eq!(keystore.address, derive_address(&keys.public));
    }

    #[test]
    fn wrong_password_fails() {
        let keystore =
            KeystoreFile::encrypt(&keypair_from_seed(&[42u8; 32]), "correct-password", FAST)
                .unwrap();
        assert!(matches!(
            keystore.decrypt("wrong-password"),
            Err(WalletError::Key(_))
        ));
    }

    #[test]
    fn default_kdf_is_recorded() {
        let keystore =
            KeystoreFile::encrypt(&keypair_from_seed(&[0u8; 32]), "pass", KdfParams::default())
                .unwrap();
        assert_eq!(keystore.crypto.kdf_params.memory, 65_536);
        assert_eq!(keystore.crypto.kdf_params.iterations, 3);
        assert_eq!(keystore.crypto.cipher, "aes-256-gcm");
    }

    #[test]
    fn tampered_address_rejected() {
        let mut keystore =
            KeystoreFile::encrypt(&keypair_from_seed(&[3u8; 32]), "pass", FAST).unwrap();
        keystore.address = StakingAddress::from_bytes([1; 20]);
        assert!(matches!(
            keystore.decrypt("pass"),
            Err(WalletError::InvalidKeystore(_))
        ));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let keys = keypair_from_seed(&[99u8; 32]);
        let keystore = KeystoreFile::encrypt(&keys, "file-test", FAST).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.json");
        keystore.save(&path).unwrap();
        let loaded = KeystoreFile::load(&path).unwrap();
        assert_eq!(loaded.decrypt("file-test").unwrap().public, keys.public);
    }

    #[test]
    fn load_nonexistent_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = KeystoreFile::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(WalletError::Io(_))));
    }

    #[test]
    fn unsupported_version_rejected() {
        let mut keystore =
            KeystoreFile::encrypt(&keypair_from_seed(&[0u8; 32]), "pass", FAST).unwrap();
        keystore.version = 99;
        assert!(matches!(
            keystore.decrypt("pass"),
            Err(WalletError::InvalidKeystore(_))
        ));
    }
}
