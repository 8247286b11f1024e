//! Profile encryption.
//!
//! Every call to [`CipherVault::encrypt`] draws a fresh AES-256 key and a
//! fresh 96-bit nonce, seals the JSON-serialized profile with AES-256-GCM,
//! and returns `{iv, ciphertext, key}` as one bundle.
//!
//! The bundle carries its own key. Anyone who can read the content store can
//! therefore open it. This mirrors the deployed record format and is kept so
//! that existing blobs stay readable; separating key custody (envelope
//! encryption under a KMS-held key) is a follow-up that changes the bundle
//! format.

use crate::VaultError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use haven_types::BiometricProfile;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Bundle format version.
pub const BUNDLE_VERSION: u32 = 1;
/// Cipher identifier written into every bundle.
pub const BUNDLE_CIPHER: &str = "aes-256-gcm";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// A sealed profile, serialized as JSON for storage.
///
/// All binary fields are lowercase hex.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBundle {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_cipher")]
    pub cipher: String,
    #[serde(default)]
    pub iv: String,
    #[serde(default, alias = "encrypted")]
    pub ciphertext: String,
    #[serde(default)]
    pub key: String,
}

fn default_version() -> u32 {
    BUNDLE_VERSION
}

fn default_cipher() -> String {
    BUNDLE_CIPHER.to_string()
}

impl EncryptedBundle {
    /// Serialize for the content store.
    pub fn to_bytes(&self) -> Result<Vec<u8>, VaultError> {
        serde_json::to_vec(self).map_err(|e| VaultError::Encryption(e.to_string()))
    }

    /// Parse bytes fetched from the content store.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        serde_json::from_slice(bytes)
            .map_err(|e| VaultError::Decryption(format!("malformed bundle: {e}")))
    }
}

/// Seals and opens [`BiometricProfile`]s. Stateless; each bundle is scoped
/// to the single record it was produced for.
#[derive(Clone, Copy, Debug, Default)]
pub struct CipherVault;

impl CipherVault {
    pub fn new() -> Self {
        Self
    }

    pub fn encrypt(&self, profile: &BiometricProfile) -> Result<EncryptedBundle, VaultError> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec(profile).map_err(|e| VaultError::Encryption(e.to_string()))?,
        );

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        let mut rng = rand::rngs::OsRng;
        rng.fill_bytes(&mut key[..]);
        rng.fill_bytes(&mut nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| VaultError::Encryption(format!("AES key init failed: {e}")))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        Ok(EncryptedBundle {
            version: BUNDLE_VERSION,
            cipher: BUNDLE_CIPHER.to_string(),
            iv: hex::encode(nonce_bytes),
            ciphertext: hex::encode(ciphertext),
            key: hex::encode(&key[..]),
        })
    }

    pub fn decrypt(&self, bundle: &EncryptedBundle) -> Result<BiometricProfile, VaultError> {
        if bundle.version != BUNDLE_VERSION {
            return Err(VaultError::Decryption(format!(
                "unsupported bundle version: {}",
                bundle.version
            )));
        }
        if bundle.cipher != BUNDLE_CIPHER {
            return Err(VaultError::Decryption(format!(
                "unsupported cipher: {}",
                bundle.cipher
            )));
        }
        if bundle.key.is_empty() || bundle.iv.is_empty() {
            return Err(VaultError::Decryption("bundle is missing key or iv".into()));
        }

        let key = Zeroizing::new(decode_field("key", &bundle.key, Some(KEY_LEN))?);
        let nonce_bytes = decode_field("iv", &bundle.iv, Some(NONCE_LEN))?;
        let ciphertext = decode_field("ciphertext", &bundle.ciphertext, None)?;

        let cipher = Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|e| VaultError::Decryption(format!("AES key init failed: {e}")))?;
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
                .map_err(|_| VaultError::Decryption("authentication check failed".into()))?,
        );

        // serde_json quotes offending values, which here are decrypted
        // profile fields; report the position only.
        serde_json::from_slice(&plaintext).map_err(|e| {
            VaultError::Decryption(format!(
                "plaintext is not a profile (line {}, column {})",
                e.line(),
                e.column()
            ))
        })
    }
}

fn decode_field(name: &str, value: &str, len: Option<usize>) -> Result<Vec<u8>, VaultError> {
    let bytes = hex::decode(value)
        .map_err(|e| VaultError::Decryption(format!("invalid {name} hex: {e}")))?;
    match len {
        Some(expected) if bytes.len() != expected => Err(VaultError::Decryption(format!(
            "invalid {name} length: expected {expected}, got {}",
            bytes.len()
        ))),
        _ => Ok(bytes),
    }
}
