//! Nullable commitment ledger: in-memory records with role checks.

use async_trait::async_trait;
use haven_ledger::{AccessControl, CommitmentLedger, LedgerError, SuspectAck};
use haven_types::{
    Actor, ContentAddress, FuzzyDigest, NewRecord, RecordId, RegistryRecord, Role, Timestamp,
};
use std::collections::HashMap;
use std::sync::Mutex;

struct LedgerState {
    records: Vec<RegistryRecord>,
    by_digest: HashMap<FuzzyDigest, RecordId>,
    fail_next_append: Option<LedgerError>,
    unavailable: bool,
}

/// An in-memory ledger.
///
/// Dedup check and insert happen under one lock, so concurrent appends of
/// the same digest behave like the real ledger: one wins, the rest get
/// `DuplicateDigest`.
pub struct NullLedger {
    state: Mutex<LedgerState>,
    access: Mutex<AccessControl>,
}

impl NullLedger {
    pub fn new(access: AccessControl) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                records: Vec::new(),
                by_digest: HashMap::new(),
                fail_next_append: None,
                unavailable: false,
            }),
            access: Mutex::new(access),
        }
    }

    pub fn with_roles(registrar: Actor, officer: Actor) -> Self {
        Self::new(
            AccessControl::new()
                .with(registrar, Role::Registrar)
                .with(officer, Role::Officer),
        )
    }

    pub fn grant(&self, actor: Actor, role: Role) {
        self.access.lock().unwrap().grant(actor, role);
    }

    pub fn revoke(&self, actor: &Actor, role: Role) -> bool {
        self.access.lock().unwrap().revoke(actor, role)
    }

    /// Snapshot of every record, oldest first.
    pub fn records(&self) -> Vec<RegistryRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `append` fail with `error` without writing.
    pub fn fail_next_append(&self, error: LedgerError) {
        self.state.lock().unwrap().fail_next_append = Some(error);
    }

    /// Make every call fail with `Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    fn check_available(state: &LedgerState) -> Result<(), LedgerError> {
        if state.unavailable {
            return Err(LedgerError::Unavailable("null ledger offline".into()));
        }
        Ok(())
    }

    fn index(id: RecordId, len: usize) -> Result<usize, LedgerError> {
        let idx = id.as_u64().checked_sub(1).ok_or(LedgerError::NotFound(id))? as usize;
        if idx >= len {
            return Err(LedgerError::NotFound(id));
        }
        Ok(idx)
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new(AccessControl::new())
    }
}

#[async_trait]
impl CommitmentLedger for NullLedger {
    async fn is_duplicate(&self, digest: &FuzzyDigest) -> Result<bool, LedgerError> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        Ok(state.by_digest.contains_key(digest))
    }

    async fn append(&self, caller: &Actor, record: NewRecord) -> Result<RecordId, LedgerError> {
        self.access.lock().unwrap().require(caller, Role::Registrar)?;
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        if let Some(error) = state.fail_next_append.take() {
            return Err(error);
        }
        if state.by_digest.contains_key(&record.fuzzy_digest) {
            return Err(LedgerError::DuplicateDigest);
        }
        let id = RecordId::new(state.records.len() as u64 + 1);
        state.by_digest.insert(record.fuzzy_digest, id);
        state.records.push(RegistryRecord {
            id,
            fuzzy_digest: record.fuzzy_digest,
            content_address: record.content_address,
            commitment: record.commitment,
            is_suspect: false,
            timestamp: Timestamp::now(),
        });
        Ok(id)
    }

    async fn get(&self, id: RecordId) -> Result<RegistryRecord, LedgerError> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        let idx = Self::index(id, state.records.len())?;
        Ok(state.records[idx].clone())
    }

    async fn mark_suspect(
        &self,
        caller: &Actor,
        id: RecordId,
        new_address: &ContentAddress,
    ) -> Result<SuspectAck, LedgerError> {
        self.access.lock().unwrap().require(caller, Role::Officer)?;
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        let idx = Self::index(id, state.records.len())?;
        let record = &mut state.records[idx];
        let superseded = std::mem::replace(&mut record.content_address, new_address.clone());
        record.is_suspect = true;
        Ok(SuspectAck {
            record_id: id,
            superseded,
            current: new_address.clone(),
        })
    }

    async fn record_count(&self) -> Result<u64, LedgerError> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        Ok(state.records.len() as u64)
    }

    async fn is_referenced(&self, address: &ContentAddress) -> Result<bool, LedgerError> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        Ok(state
            .records
            .iter()
            .any(|record| &record.content_address == address))
    }

    fn name(&self) -> &str {
        "null-ledger"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_types::Commitment;

    fn registrar() -> Actor {
        Actor::new("registrar")
    }

    fn officer() -> Actor {
        Actor::new("officer")
    }

    fn new_record(digest_byte: u8, address: &str) -> NewRecord {
        let mut digest = [0u8; 32];
        digest[31] = digest_byte;
        NewRecord {
            fuzzy_digest: FuzzyDigest::new(digest),
            content_address: ContentAddress::new(address),
            commitment: Commitment::ZERO,
        }
    }

    #[tokio::test]
    async fn ids_start_at_one() {
        let ledger = NullLedger::with_roles(registrar(), officer());
        let a = ledger.append(&registrar(), new_record(1, "b2-a")).await.unwrap();
        let b = ledger.append(&registrar(), new_record(2, "b2-b")).await.unwrap();
        assert_eq!(a, RecordId::new(1));
        assert_eq!(b, RecordId::new(2));
        assert_eq!(ledger.record_count().await.unwrap(), 2);
        assert!(matches!(
            ledger.get(RecordId::new(0)).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            ledger.get(RecordId::new(3)).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_digest_is_rejected() {
        let ledger = NullLedger::with_roles(registrar(), officer());
        ledger.append(&registrar(), new_record(1, "b2-a")).await.unwrap();
        assert!(ledger.is_duplicate(&new_record(1, "").fuzzy_digest).await.unwrap());
        assert_eq!(
            ledger.append(&registrar(), new_record(1, "b2-b")).await,
            Err(LedgerError::DuplicateDigest)
        );
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn writes_require_roles() {
        let ledger = NullLedger::with_roles(registrar(), officer());
        assert!(matches!(
            ledger.append(&officer(), new_record(1, "b2-a")).await,
            Err(LedgerError::Unauthorized { role: Role::Registrar, .. })
        ));
        let id = ledger.append(&registrar(), new_record(1, "b2-a")).await.unwrap();
        assert!(matches!(
            ledger
                .mark_suspect(&registrar(), id, &ContentAddress::new("b2-c"))
                .await,
            Err(LedgerError::Unauthorized { role: Role::Officer, .. })
        ));
    }

    #[tokio::test]
    async fn mark_suspect_repoints_record() {
        let ledger = NullLedger::with_roles(registrar(), officer());
        let id = ledger.append(&registrar(), new_record(1, "b2-a")).await.unwrap();
        let ack = ledger
            .mark_suspect(&officer(), id, &ContentAddress::new("b2-c"))
            .await
            .unwrap();
        assert_eq!(ack.superseded, ContentAddress::new("b2-a"));
        let record = ledger.get(id).await.unwrap();
        assert!(record.is_suspect);
        assert!(ledger.is_referenced(&ContentAddress::new("b2-c")).await.unwrap());
        assert!(!ledger.is_referenced(&ContentAddress::new("b2-a")).await.unwrap());
    }

    #[tokio::test]
    async fn injected_failure_applies_once() {
        let ledger = NullLedger::with_roles(registrar(), officer());
        ledger.fail_next_append(LedgerError::WriteConflict("reorg".into()));
        assert!(ledger.append(&registrar(), new_record(1, "b2-a")).await.is_err());
        assert!(ledger.append(&registrar(), new_record(1, "b2-a")).await.is_ok());
    }
}
