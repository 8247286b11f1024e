//! Fundamental types for the Haven registry protocol.
//!
//! This crate defines the data shared by every other crate in the workspace:
//! embeddings and their quantized forms, field-element digests and
//! commitments, content addresses, registry records, the plaintext profile,
//! and the caller identities the ledger authorizes.

pub mod actor;
pub mod address;
pub mod digest;
pub mod embedding;
pub mod error;
pub mod profile;
pub mod record;
pub mod salt;
pub mod time;

pub use actor::{Actor, Role};
pub use address::ContentAddress;
pub use digest::{Commitment, FuzzyDigest};
pub use embedding::{EmbeddingVector, QuantizationPolicy, QuantizedVector};
pub use error::TypeError;
pub use profile::{BiometricProfile, IdentityMetadata};
pub use record::{NewRecord, RecordId, RegistryRecord};
pub use salt::Salt;
pub use time::{Clock, SystemClock, Timestamp};
