//! Officer-only suspect marking.
//!
//! Opens the record's profile, sets its suspect flag, re-seals it under a
//! fresh key, stores the new blob and repoints the record at it. The blob it
//! replaces is handled per [`SupersededBlobPolicy`].

use crate::config::SupersededBlobPolicy;
use crate::error::FlowError;
use crate::journal::JournalEntry;
use crate::services::{bounded, Services};
use crate::spans::{suspect_marking_span, FlowId};
use haven_crypto::content_address;
use haven_types::{Actor, ContentAddress, RecordId};
use std::sync::Arc;
use tracing::Instrument;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuspectReceipt {
    pub record_id: RecordId,
    /// Address before marking. Equal to `current` if the record was already
    /// suspect and nothing was written.
    pub previous: ContentAddress,
    pub current: ContentAddress,
    pub superseded: SupersededBlobPolicy,
    pub already_suspect: bool,
}

#[derive(Clone)]
pub struct SuspectMarking {
    services: Arc<Services>,
    officer: Actor,
}

impl SuspectMarking {
    pub fn new(services: Arc<Services>, officer: Actor) -> Self {
        Self { services, officer }
    }

    pub async fn mark(&self, record_id: RecordId) -> Result<SuspectReceipt, FlowError> {
        let flow = FlowId::random();
        let span = suspect_marking_span(flow, record_id);
        let result = self.run(flow, record_id).instrument(span.clone()).await;
        span.in_scope(|| match &result {
            Ok(receipt) if receipt.already_suspect => {
                tracing::info!("record already suspect");
            }
            Ok(receipt) => tracing::info!(
                previous = %receipt.previous,
                current = %receipt.current,
                policy = ?receipt.superseded,
                "record marked suspect"
            ),
            Err(e) => tracing::warn!(kind = %e.kind(), error = %e, "suspect marking failed"),
        });
        result
    }

    async fn run(&self, flow: FlowId, record_id: RecordId) -> Result<SuspectReceipt, FlowError> {
        let svc = &self.services;
        svc.ensure_open()?;
        let policy = svc.superseded_blobs;

        let record = bounded("ledger.get", svc.timeouts.ledger(), async {
            svc.ledger.get(record_id).await.map_err(FlowError::from_ledger)
        })
        .await?;
        if record.is_suspect {
            // Nothing to re-seal, but the ledger still gates the caller:
            // repointing at the current address is a no-op write that only
            // an officer may make.
            let ack = bounded("ledger.mark_suspect", svc.timeouts.ledger(), async {
                svc.ledger
                    .mark_suspect(&self.officer, record_id, &record.content_address)
                    .await
                    .map_err(FlowError::from_ledger)
            })
            .await?;
            return Ok(SuspectReceipt {
                record_id,
                previous: ack.current.clone(),
                current: ack.current,
                superseded: policy,
                already_suspect: true,
            });
        }

        let mut profile = svc.open_profile(&record.content_address).await?;
        profile.is_suspect = true;
        let sealed = svc.seal(profile).await?;

        svc.journal
            .append(JournalEntry::BlobWritten {
                flow,
                address: content_address(&sealed),
                at: svc.now(),
            })
            .await
            .map_err(FlowError::from_journal)?;
        let new_address = bounded("store.put", svc.timeouts.store(), async {
            svc.store.put(&sealed).await.map_err(FlowError::from_store)
        })
        .await?;
        tracing::debug!(address = %new_address, "re-sealed profile stored");

        let ack = bounded("ledger.mark_suspect", svc.timeouts.ledger(), async {
            svc.ledger
                .mark_suspect(&self.officer, record_id, &new_address)
                .await
                .map_err(FlowError::from_ledger)
        })
        .await?;

        let now = svc.now();
        let mut journal_result = svc
            .journal
            .append(JournalEntry::Committed {
                flow,
                address: ack.current.clone(),
                record: record_id,
                at: now,
            })
            .await;
        if journal_result.is_ok() && policy == SupersededBlobPolicy::Release {
            journal_result = svc
                .journal
                .append(JournalEntry::Released {
                    flow,
                    address: ack.superseded.clone(),
                    at: now,
                })
                .await;
        }
        if let Err(e) = journal_result {
            tracing::warn!(error = %e, "failed to journal suspect marking");
        }

        Ok(SuspectReceipt {
            record_id,
            previous: ack.superseded,
            current: ack.current,
            superseded: policy,
            already_suspect: false,
        })
    }
}
