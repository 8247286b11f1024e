//! Reconciliation sweep for orphaned blobs.
//!
//! Reclaims blobs the journal shows as written or released but never
//! (or no longer) committed, once they are older than the grace period and
//! the ledger confirms no record points at them.

use crate::error::FlowError;
use crate::journal::JournalEntry;
use crate::services::{bounded, Services};
use crate::spans::reconcile_span;
use haven_types::{ContentAddress, Timestamp};
use std::sync::Arc;
use tracing::Instrument;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Addresses past the grace period with no commit in the journal.
    pub examined: usize,
    pub reclaimed: Vec<ContentAddress>,
    /// Candidates the ledger still references.
    pub referenced: Vec<ContentAddress>,
    /// Settled journal entries dropped after the sweep.
    pub compacted: usize,
}

#[derive(Clone)]
pub struct Reconciler {
    services: Arc<Services>,
}

impl Reconciler {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    pub async fn sweep(&self, now: Timestamp) -> Result<SweepReport, FlowError> {
        self.run(now).instrument(reconcile_span()).await
    }

    /// Sweep as of the services' clock.
    pub async fn sweep_due(&self) -> Result<SweepReport, FlowError> {
        self.sweep(self.services.now()).await
    }

    async fn run(&self, now: Timestamp) -> Result<SweepReport, FlowError> {
        let svc = &self.services;
        svc.ensure_open()?;

        let candidates = svc
            .journal
            .reclaim_candidates(now, svc.reconcile_grace_secs);
        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };

        for address in candidates {
            let referenced = bounded("ledger.is_referenced", svc.timeouts.ledger(), async {
                svc.ledger
                    .is_referenced(&address)
                    .await
                    .map_err(FlowError::from_ledger)
            })
            .await?;
            if referenced {
                tracing::debug!(%address, "candidate still referenced");
                report.referenced.push(address);
                continue;
            }

            bounded("store.remove", svc.timeouts.store(), async {
                svc.store.remove(&address).await.map_err(FlowError::from_store)
            })
            .await?;
            svc.journal
                .append(JournalEntry::Reclaimed {
                    address: address.clone(),
                    at: now,
                })
                .await
                .map_err(FlowError::from_journal)?;
            tracing::info!(%address, "orphaned blob reclaimed");
            report.reclaimed.push(address);
        }

        match svc.journal.compact().await {
            Ok(dropped) => report.compacted = dropped,
            Err(e) => tracing::warn!(error = %e, "journal compaction failed"),
        }

        tracing::info!(
            examined = report.examined,
            reclaimed = report.reclaimed.len(),
            referenced = report.referenced.len(),
            compacted = report.compacted,
            "reconciliation sweep finished"
        );
        Ok(report)
    }
}
