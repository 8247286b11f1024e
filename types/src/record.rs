//! Registry records as held by the commitment ledger.

use crate::{Commitment, ContentAddress, FuzzyDigest, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential record identifier, assigned by the ledger at commit time.
///
/// Identifiers start at 1; 0 is never assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fields the core submits when appending a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub fuzzy_digest: FuzzyDigest,
    pub content_address: ContentAddress,
    pub commitment: Commitment,
}

/// A committed registry entry.
///
/// Only `is_suspect` and `content_address` change after creation, and only
/// through the ledger's officer-gated suspect-marking call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    pub id: RecordId,
    pub fuzzy_digest: FuzzyDigest,
    pub content_address: ContentAddress,
    pub commitment: Commitment,
    pub is_suspect: bool,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_ledger_field_names() {
        let record = RegistryRecord {
            id: RecordId::new(3),
            fuzzy_digest: FuzzyDigest::ZERO,
            content_address: ContentAddress::new("b2-aa"),
            commitment: Commitment::ZERO,
            is_suspect: false,
            timestamp: Timestamp::new(10),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["contentAddress"], "b2-aa");
        assert_eq!(value["isSuspect"], false);
        assert!(value.get("fuzzyDigest").is_some());
    }
}
