//! Read-only listing of registry records with their identity metadata.

use crate::error::{FailureKind, FlowError};
use crate::services::{bounded, Services};
use crate::spans::listing_span;
use haven_types::{ContentAddress, IdentityMetadata, RecordId, Timestamp};
use std::sync::Arc;
use tracing::Instrument;

#[derive(Clone, Debug, PartialEq)]
pub enum EntryProfile {
    Readable(IdentityMetadata),
    /// The blob could not be fetched or opened.
    Unreadable(FailureKind),
}

/// One listed record. Never carries the embedding or salt.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistryEntry {
    pub record_id: RecordId,
    pub content_address: ContentAddress,
    pub is_suspect: bool,
    pub timestamp: Timestamp,
    pub profile: EntryProfile,
}

impl RegistryEntry {
    pub fn metadata(&self) -> Option<&IdentityMetadata> {
        match &self.profile {
            EntryProfile::Readable(metadata) => Some(metadata),
            EntryProfile::Unreadable(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct RegistryView {
    services: Arc<Services>,
}

impl RegistryView {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    /// All records, newest first. Ledger failures abort the listing; a
    /// record whose profile cannot be opened is listed as unreadable.
    pub async fn list(&self) -> Result<Vec<RegistryEntry>, FlowError> {
        self.collect().instrument(listing_span()).await
    }

    async fn collect(&self) -> Result<Vec<RegistryEntry>, FlowError> {
        let svc = &self.services;
        svc.ensure_open()?;

        let count = bounded("ledger.record_count", svc.timeouts.ledger(), async {
            svc.ledger.record_count().await.map_err(FlowError::from_ledger)
        })
        .await?;

        let mut entries = Vec::new();
        for id in (1..=count).rev().map(RecordId::new) {
            let record = bounded("ledger.get", svc.timeouts.ledger(), async {
                svc.ledger.get(id).await.map_err(FlowError::from_ledger)
            })
            .await?;

            let profile = match svc.open_profile(&record.content_address).await {
                Ok(profile) => EntryProfile::Readable(profile.metadata),
                Err(e) => {
                    tracing::warn!(record = %id, kind = %e.kind(), "profile unreadable");
                    EntryProfile::Unreadable(e.kind())
                }
            };
            entries.push(RegistryEntry {
                record_id: record.id,
                content_address: record.content_address,
                is_suspect: record.is_suspect,
                timestamp: record.timestamp,
                profile,
            });
        }

        tracing::info!(count = entries.len(), "registry listed");
        Ok(entries)
    }
}
