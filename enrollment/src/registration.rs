//! Enrollment of a new identity.
//!
//! ```text
//! Received → EmbeddingReady → Quantized → DigestComputed → DuplicateChecked
//!          → Encrypted → Stored → CommitmentComputed → Committed
//! ```
//!
//! `Rejected` is reachable only from `DuplicateChecked`, before anything
//! durable exists. `Failed` is reachable from every step. The blob is always
//! stored before the ledger append, and both sides of that boundary are
//! journaled so a failed append leaves a reclaimable orphan rather than a
//! dangling record.

use crate::error::FlowError;
use crate::journal::JournalEntry;
use crate::services::{bounded, Services};
use crate::spans::{registration_span, FlowId};
use haven_crypto::{commit, content_address, fuzzy_digest, generate_salt};
use haven_types::{
    Actor, BiometricProfile, Commitment, ContentAddress, EmbeddingVector, FuzzyDigest,
    IdentityMetadata, NewRecord, QuantizationPolicy, RecordId,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistrationPhase {
    Received,
    EmbeddingReady,
    Quantized,
    DigestComputed,
    DuplicateChecked,
    Encrypted,
    Stored,
    CommitmentComputed,
    Committed,
    Rejected,
    Failed,
}

impl RegistrationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Rejected | Self::Failed)
    }
}

impl fmt::Display for RegistrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::EmbeddingReady => "embedding_ready",
            Self::Quantized => "quantized",
            Self::DigestComputed => "digest_computed",
            Self::DuplicateChecked => "duplicate_checked",
            Self::Encrypted => "encrypted",
            Self::Stored => "stored",
            Self::CommitmentComputed => "commitment_computed",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// A record with the same fuzzy digest is already committed.
    Duplicate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedRecord {
    pub record_id: RecordId,
    pub fuzzy_digest: FuzzyDigest,
    pub content_address: ContentAddress,
    pub commitment: Commitment,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Committed(CommittedRecord),
    Rejected(RejectReason),
    Failed(FlowError),
}

/// Terminal outcome plus the phases the flow passed through.
#[derive(Clone, Debug)]
pub struct RegistrationReport {
    pub flow: FlowId,
    pub outcome: RegistrationOutcome,
    pub path: Vec<RegistrationPhase>,
}

impl RegistrationReport {
    pub fn committed(&self) -> Option<&CommittedRecord> {
        match &self.outcome {
            RegistrationOutcome::Committed(record) => Some(record),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FlowError> {
        match &self.outcome {
            RegistrationOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn final_phase(&self) -> Option<RegistrationPhase> {
        self.path.last().copied()
    }
}

/// Runs registrations on behalf of one registrar identity.
#[derive(Clone)]
pub struct RegistrationFlow {
    services: Arc<Services>,
    registrar: Actor,
}

struct Run {
    flow: FlowId,
    path: Vec<RegistrationPhase>,
}

impl Run {
    fn enter(&mut self, phase: RegistrationPhase) {
        tracing::debug!(phase = %phase, "registration transition");
        self.path.push(phase);
    }
}

impl RegistrationFlow {
    pub fn new(services: Arc<Services>, registrar: Actor) -> Self {
        Self {
            services,
            registrar,
        }
    }

    /// Register from raw image bytes; the extractor produces the embedding.
    pub async fn register_image(
        &self,
        image: &[u8],
        metadata: IdentityMetadata,
    ) -> RegistrationReport {
        self.run(Input::Image(image), metadata).await
    }

    /// Register an embedding that was extracted elsewhere.
    pub async fn register_embedding(
        &self,
        embedding: EmbeddingVector,
        metadata: IdentityMetadata,
    ) -> RegistrationReport {
        self.run(Input::Embedding(embedding), metadata).await
    }

    async fn run(&self, input: Input<'_>, metadata: IdentityMetadata) -> RegistrationReport {
        let flow = FlowId::random();
        let span = registration_span(flow);
        async move {
            let started = Instant::now();
            let mut run = Run {
                flow,
                path: Vec::with_capacity(10),
            };
            run.enter(RegistrationPhase::Received);

            let outcome = match self.steps(&mut run, input, metadata).await {
                Ok(outcome) => outcome,
                Err(e) => RegistrationOutcome::Failed(e),
            };
            let elapsed = haven_utils::format_elapsed(started.elapsed());
            match &outcome {
                RegistrationOutcome::Committed(record) => {
                    run.enter(RegistrationPhase::Committed);
                    tracing::Span::current().record("record", record.record_id.as_u64());
                    tracing::info!(
                        record = %record.record_id,
                        digest = %record.fuzzy_digest,
                        address = %record.content_address,
                        elapsed = %elapsed,
                        "registration committed"
                    );
                }
                RegistrationOutcome::Rejected(reason) => {
                    run.enter(RegistrationPhase::Rejected);
                    tracing::info!(?reason, elapsed = %elapsed, "registration rejected");
                }
                RegistrationOutcome::Failed(e) => {
                    let at = run.path.last().copied();
                    run.enter(RegistrationPhase::Failed);
                    tracing::warn!(
                        kind = %e.kind(),
                        error = %e,
                        after = ?at,
                        elapsed = %elapsed,
                        "registration failed"
                    );
                }
            }
            RegistrationReport {
                flow,
                outcome,
                path: run.path,
            }
        }
        .instrument(span)
        .await
    }

    async fn steps(
        &self,
        run: &mut Run,
        input: Input<'_>,
        metadata: IdentityMetadata,
    ) -> Result<RegistrationOutcome, FlowError> {
        let svc = &self.services;
        svc.ensure_open()?;

        let embedding = match input {
            Input::Embedding(embedding) => embedding,
            Input::Image(image) => {
                bounded("extractor.extract", svc.timeouts.extraction(), async {
                    svc.extractor
                        .extract(image)
                        .await
                        .map_err(FlowError::from_extraction)
                })
                .await?
            }
        };
        run.enter(RegistrationPhase::EmbeddingReady);

        let storage = svc
            .quantizer
            .reduce(&embedding, QuantizationPolicy::Storage)
            .map_err(FlowError::from_quantize)?;
        // The circuit reduction is checked here too so an embedding the
        // circuit cannot accept is refused before anything is written.
        let circuit = svc
            .quantizer
            .reduce(&embedding, QuantizationPolicy::Circuit)
            .map_err(FlowError::from_quantize)?;
        run.enter(RegistrationPhase::Quantized);

        let digest = fuzzy_digest(&storage).map_err(FlowError::from_hash)?;
        run.enter(RegistrationPhase::DigestComputed);

        let duplicate = bounded("ledger.is_duplicate", svc.timeouts.ledger(), async {
            svc.ledger
                .is_duplicate(&digest)
                .await
                .map_err(FlowError::from_ledger)
        })
        .await?;
        run.enter(RegistrationPhase::DuplicateChecked);
        if duplicate {
            return Ok(RegistrationOutcome::Rejected(RejectReason::Duplicate));
        }

        let salt = generate_salt();
        let profile = BiometricProfile::new(embedding, salt.clone(), metadata);
        let sealed = svc.seal(profile).await?;
        run.enter(RegistrationPhase::Encrypted);

        let expected = content_address(&sealed);
        svc.journal
            .append(JournalEntry::BlobWritten {
                flow: run.flow,
                address: expected.clone(),
                at: svc.now(),
            })
            .await
            .map_err(FlowError::from_journal)?;
        let address = bounded("store.put", svc.timeouts.store(), async {
            svc.store.put(&sealed).await.map_err(FlowError::from_store)
        })
        .await?;
        if address != expected {
            // Stores may use their own addressing; journal what they returned.
            svc.journal
                .append(JournalEntry::BlobWritten {
                    flow: run.flow,
                    address: address.clone(),
                    at: svc.now(),
                })
                .await
                .map_err(FlowError::from_journal)?;
        }
        run.enter(RegistrationPhase::Stored);

        let circuit_digest = fuzzy_digest(&circuit).map_err(FlowError::from_hash)?;
        let commitment = commit(&circuit_digest, &salt).map_err(FlowError::from_hash)?;
        drop(salt);
        run.enter(RegistrationPhase::CommitmentComputed);

        let record = NewRecord {
            fuzzy_digest: digest,
            content_address: address.clone(),
            commitment,
        };
        let record_id = bounded("ledger.append", svc.timeouts.ledger(), async {
            svc.ledger
                .append(&self.registrar, record)
                .await
                .map_err(FlowError::from_ledger)
        })
        .await?;

        if let Err(e) = svc
            .journal
            .append(JournalEntry::Committed {
                flow: run.flow,
                address: address.clone(),
                record: record_id,
                at: svc.now(),
            })
            .await
        {
            // The record is committed; the ledger reference alone keeps the
            // blob safe from the sweep.
            tracing::warn!(error = %e, record = %record_id, "failed to journal commit");
        }

        Ok(RegistrationOutcome::Committed(CommittedRecord {
            record_id,
            fuzzy_digest: digest,
            content_address: address,
            commitment,
        }))
    }
}

enum Input<'a> {
    Image(&'a [u8]),
    Embedding(EmbeddingVector),
}
