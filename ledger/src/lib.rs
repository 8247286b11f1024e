//! Boundary to the external commitment ledger.
//!
//! The ledger owns every [`RegistryRecord`]: it assigns ids, enforces
//! uniqueness of the fuzzy digest and gates writes by caller role. The core
//! only talks to it through [`CommitmentLedger`] and treats every call as a
//! possibly slow, possibly failing remote operation.
//!
//! The single consistency guarantee the core relies on is that `append` is
//! linearizable with `is_duplicate`: of two concurrent appends carrying the
//! same digest, at most one succeeds and the other fails with
//! [`LedgerError::DuplicateDigest`].

pub mod access;
pub mod error;

pub use access::AccessControl;
pub use error::LedgerError;

use async_trait::async_trait;
use haven_types::{Actor, ContentAddress, FuzzyDigest, NewRecord, RecordId, RegistryRecord};
use serde::{Deserialize, Serialize};

/// Acknowledgement of a suspect-marking write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspectAck {
    pub record_id: RecordId,
    /// Address the record pointed at before the update.
    pub superseded: ContentAddress,
    /// Address the record points at now.
    pub current: ContentAddress,
}

#[async_trait]
pub trait CommitmentLedger: Send + Sync {
    /// Whether a record with this digest has been committed.
    async fn is_duplicate(&self, digest: &FuzzyDigest) -> Result<bool, LedgerError>;

    /// Append a record. Requires the registrar role. Fails with
    /// `DuplicateDigest` if the digest is already present, atomically with
    /// respect to other appends.
    async fn append(&self, caller: &Actor, record: NewRecord) -> Result<RecordId, LedgerError>;

    async fn get(&self, id: RecordId) -> Result<RegistryRecord, LedgerError>;

    /// Flag a record as suspect and repoint it at `new_address`. Requires
    /// the officer role. Marking an already-suspect record at its current
    /// address is accepted and changes nothing.
    async fn mark_suspect(
        &self,
        caller: &Actor,
        id: RecordId,
        new_address: &ContentAddress,
    ) -> Result<SuspectAck, LedgerError>;

    /// Number of committed records. Ids run from 1 to this value.
    async fn record_count(&self) -> Result<u64, LedgerError>;

    /// Whether any record currently points at `address`.
    async fn is_referenced(&self, address: &ContentAddress) -> Result<bool, LedgerError>;

    async fn close(&self) -> Result<(), LedgerError> {
        Ok(())
    }

    fn name(&self) -> &str;
}
