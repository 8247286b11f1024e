//! Flow-level error taxonomy.
//!
//! Every collaborator failure is mapped into exactly one [`FlowError`] by the
//! explicit conversion functions below. Messages carry identifiers and
//! reasons, never plaintext profile data.

use crate::extractor::ExtractionError;
use crate::journal::JournalError;
use haven_crypto::{HashError, QuantizeError, VaultError};
use haven_ledger::LedgerError;
use haven_proof::ProofError;
use haven_store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("no face detected in the supplied image")]
    NoFaceDetected,

    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("fuzzy digest already registered")]
    DuplicateDigest,

    #[error("encryption failed: {0}")]
    EncryptionError(String),

    #[error("decryption failed: {0}")]
    DecryptionError(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("ledger rejected caller: {0}")]
    LedgerUnauthorized(String),

    #[error("ledger write conflict: {0}")]
    LedgerWriteConflict(String),

    #[error("proof generation failed: {0}")]
    ProofGenerationError(String),

    #[error("proof verification failed: {0}")]
    ProofVerificationFailed(String),

    #[error("stored profile does not reproduce the ledger commitment for record {0}")]
    IntegrityViolation(String),

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Fieldless view of [`FlowError`] for callers that branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoFaceDetected,
    InvalidEmbedding,
    DuplicateDigest,
    EncryptionError,
    DecryptionError,
    StorageUnavailable,
    NotFound,
    LedgerUnauthorized,
    LedgerWriteConflict,
    ProofGenerationError,
    ProofVerificationFailed,
    IntegrityViolation,
    Timeout,
    Config,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FlowError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NoFaceDetected => FailureKind::NoFaceDetected,
            Self::InvalidEmbedding(_) => FailureKind::InvalidEmbedding,
            Self::DuplicateDigest => FailureKind::DuplicateDigest,
            Self::EncryptionError(_) => FailureKind::EncryptionError,
            Self::DecryptionError(_) => FailureKind::DecryptionError,
            Self::StorageUnavailable(_) => FailureKind::StorageUnavailable,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::LedgerUnauthorized(_) => FailureKind::LedgerUnauthorized,
            Self::LedgerWriteConflict(_) => FailureKind::LedgerWriteConflict,
            Self::ProofGenerationError(_) => FailureKind::ProofGenerationError,
            Self::ProofVerificationFailed(_) => FailureKind::ProofVerificationFailed,
            Self::IntegrityViolation(_) => FailureKind::IntegrityViolation,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Config(_) => FailureKind::Config,
        }
    }

    pub fn from_extraction(e: ExtractionError) -> Self {
        match e {
            ExtractionError::NoFaceDetected => Self::NoFaceDetected,
            ExtractionError::Backend(reason) => Self::InvalidEmbedding(reason),
        }
    }

    pub fn from_quantize(e: QuantizeError) -> Self {
        Self::InvalidEmbedding(e.to_string())
    }

    pub fn from_hash(e: HashError) -> Self {
        Self::InvalidEmbedding(e.to_string())
    }

    pub fn from_vault(e: VaultError) -> Self {
        match e {
            VaultError::Encryption(reason) => Self::EncryptionError(reason),
            VaultError::Decryption(reason) => Self::DecryptionError(reason),
        }
    }

    /// A blob that fails its content check is indistinguishable, to the
    /// caller, from one that was never stored.
    pub fn from_store(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(addr) => Self::NotFound(format!("blob {addr}")),
            StoreError::Corruption(addr) => {
                Self::NotFound(format!("blob {addr} failed its content check"))
            }
            StoreError::Unavailable(reason) | StoreError::Backend(reason) => {
                Self::StorageUnavailable(reason)
            }
        }
    }

    pub fn from_ledger(e: LedgerError) -> Self {
        match e {
            LedgerError::Unauthorized { caller, role } => {
                Self::LedgerUnauthorized(format!("{caller} lacks {role}"))
            }
            LedgerError::DuplicateDigest => Self::DuplicateDigest,
            LedgerError::NotFound(id) => Self::NotFound(format!("record {id}")),
            LedgerError::Unavailable(reason) => {
                Self::StorageUnavailable(format!("ledger: {reason}"))
            }
            LedgerError::WriteConflict(reason) => Self::LedgerWriteConflict(reason),
        }
    }

    pub fn from_prover(e: ProofError) -> Self {
        Self::ProofGenerationError(e.to_string())
    }

    pub fn from_verifier(e: ProofError) -> Self {
        Self::ProofVerificationFailed(e.to_string())
    }

    pub fn from_journal(e: JournalError) -> Self {
        Self::StorageUnavailable(format!("journal: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_types::{Actor, RecordId, Role};

    #[test]
    fn store_corruption_reads_as_not_found() {
        let e = FlowError::from_store(StoreError::Corruption("b2-00".into()));
        assert_eq!(e.kind(), FailureKind::NotFound);
        let e = FlowError::from_store(StoreError::Unavailable("down".into()));
        assert_eq!(e.kind(), FailureKind::StorageUnavailable);
    }

    #[test]
    fn ledger_errors_map_one_to_one() {
        let unauthorized = LedgerError::Unauthorized {
            caller: Actor::new("mallory"),
            role: Role::Officer,
        };
        assert_eq!(
            FlowError::from_ledger(unauthorized).kind(),
            FailureKind::LedgerUnauthorized
        );
        assert_eq!(
            FlowError::from_ledger(LedgerError::DuplicateDigest),
            FlowError::DuplicateDigest
        );
        assert_eq!(
            FlowError::from_ledger(LedgerError::NotFound(RecordId::new(9))),
            FlowError::NotFound("record 9".into())
        );
        assert_eq!(
            FlowError::from_ledger(LedgerError::WriteConflict("nonce".into())).kind(),
            FailureKind::LedgerWriteConflict
        );
    }

    #[test]
    fn extraction_distinguishes_missing_face() {
        assert_eq!(
            FlowError::from_extraction(ExtractionError::NoFaceDetected),
            FlowError::NoFaceDetected
        );
        assert_eq!(
            FlowError::from_extraction(ExtractionError::Backend("model".into())).kind(),
            FailureKind::InvalidEmbedding
        );
    }

    #[test]
    fn proof_errors_depend_on_stage() {
        let e = ProofError::Witness("bad".into());
        assert_eq!(
            FlowError::from_prover(e.clone()).kind(),
            FailureKind::ProofGenerationError
        );
        assert_eq!(
            FlowError::from_verifier(e).kind(),
            FailureKind::ProofVerificationFailed
        );
    }

    #[test]
    fn timeout_names_operation() {
        let e = FlowError::Timeout {
            operation: "extractor.extract",
        };
        assert_eq!(e.to_string(), "extractor.extract timed out");
        assert_eq!(e.kind(), FailureKind::Timeout);
    }
}
