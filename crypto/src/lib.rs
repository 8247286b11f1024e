//! Cryptographic core of the Haven registry protocol.
//!
//! - **Quantizer**: deterministic reduction of embeddings to bounded integers
//!   (storage policy for dedup, circuit policy for the proof input)
//! - **Poseidon** (circom parameters, BN254) for the fuzzy digest and the
//!   blinding commitment, so both are reproducible inside a proof circuit
//! - **AES-256-GCM** for sealing biometric profiles
//! - **Blake2b** for content addressing of stored blobs

pub mod commitment;
pub mod error;
pub mod fuzzy_hash;
pub mod hash;
pub mod quantize;
pub mod vault;

pub use commitment::{commit, generate_salt};
pub use error::{HashError, QuantizeError, VaultError};
pub use fuzzy_hash::{fuzzy_digest, poseidon_hash, POSEIDON_MAX_ARITY};
pub use hash::{blake2b_256, blake2b_256_multi, content_address, matches_content_address};
pub use quantize::Quantizer;
pub use vault::{CipherVault, EncryptedBundle};
