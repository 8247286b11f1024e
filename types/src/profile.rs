//! The plaintext payload sealed inside an encrypted bundle.

use crate::{EmbeddingVector, Salt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form identity metadata supplied at registration.
///
/// The well-known fields are typed; anything else the registering party
/// sends is kept verbatim in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nationality: String,
    #[serde(default, alias = "dob")]
    pub date_of_birth: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl IdentityMetadata {
    pub fn new(
        name: impl Into<String>,
        nationality: impl Into<String>,
        date_of_birth: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            nationality: nationality.into(),
            date_of_birth: date_of_birth.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// `{embedding, salt, metadata}` plus the suspect flag mirrored from the
/// ledger when an officer re-seals the profile.
///
/// Exists in the clear only transiently, inside a single flow.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricProfile {
    pub embedding: EmbeddingVector,
    pub salt: Salt,
    pub metadata: IdentityMetadata,
    #[serde(default)]
    pub is_suspect: bool,
}

impl BiometricProfile {
    pub fn new(embedding: EmbeddingVector, salt: Salt, metadata: IdentityMetadata) -> Self {
        Self {
            embedding,
            salt,
            metadata,
            is_suspect: false,
        }
    }
}

impl fmt::Debug for BiometricProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BiometricProfile")
            .field("embedding", &self.embedding)
            .field("salt", &self.salt)
            .field("is_suspect", &self.is_suspect)
            .finish_non_exhaustive()
    }
}
