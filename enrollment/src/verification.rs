//! Proof-based verification of a live probe against one enrolled record.
//!
//! ```text
//! Received → [ProbeExtracted] → RecordFetched → BlobFetched → Decrypted
//!          → ProbeQuantized → ProofGenerated → ProofVerified → Matched | NoMatch
//! ```
//!
//! The match decision rests only on proof verification against the record's
//! on-ledger commitment. There is no numeric-distance fallback. Identity
//! metadata is returned only with `Matched`.

use crate::error::FlowError;
use crate::services::{bounded, Services};
use crate::spans::{verification_span, FlowId};
use haven_crypto::{commit, fuzzy_digest};
use haven_types::{
    EmbeddingVector, IdentityMetadata, QuantizationPolicy, RecordId, RegistryRecord,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VerificationPhase {
    Received,
    ProbeExtracted,
    RecordFetched,
    BlobFetched,
    Decrypted,
    ProbeQuantized,
    ProofGenerated,
    ProofVerified,
    Matched,
    NoMatch,
    Failed,
}

impl VerificationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Matched | Self::NoMatch | Self::Failed)
    }
}

impl fmt::Display for VerificationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::ProbeExtracted => "probe_extracted",
            Self::RecordFetched => "record_fetched",
            Self::BlobFetched => "blob_fetched",
            Self::Decrypted => "decrypted",
            Self::ProbeQuantized => "probe_quantized",
            Self::ProofGenerated => "proof_generated",
            Self::ProofVerified => "proof_verified",
            Self::Matched => "matched",
            Self::NoMatch => "no_match",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum VerificationOutcome {
    /// The probe reproduces the record's commitment. Carries the record and
    /// the decrypted identity metadata, never the stored biometric.
    Matched {
        record: RegistryRecord,
        metadata: IdentityMetadata,
    },
    NoMatch,
    Failed(FlowError),
}

#[derive(Clone, Debug)]
pub struct VerificationReport {
    pub flow: FlowId,
    pub record_id: RecordId,
    pub outcome: VerificationOutcome,
    pub path: Vec<VerificationPhase>,
}

impl VerificationReport {
    pub fn is_match(&self) -> bool {
        matches!(self.outcome, VerificationOutcome::Matched { .. })
    }

    pub fn error(&self) -> Option<&FlowError> {
        match &self.outcome {
            VerificationOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn reached(&self, phase: VerificationPhase) -> bool {
        self.path.contains(&phase)
    }
}

#[derive(Clone)]
pub struct VerificationFlow {
    services: Arc<Services>,
}

enum Probe<'a> {
    Image(&'a [u8]),
    Embedding(EmbeddingVector),
}

impl VerificationFlow {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    pub async fn verify_image(&self, record_id: RecordId, image: &[u8]) -> VerificationReport {
        self.run(record_id, Probe::Image(image)).await
    }

    pub async fn verify_embedding(
        &self,
        record_id: RecordId,
        probe: EmbeddingVector,
    ) -> VerificationReport {
        self.run(record_id, Probe::Embedding(probe)).await
    }

    async fn run(&self, record_id: RecordId, probe: Probe<'_>) -> VerificationReport {
        let flow = FlowId::random();
        let span = verification_span(flow, record_id);
        async move {
            let started = Instant::now();
            let mut path = vec![VerificationPhase::Received];
            tracing::debug!(phase = %VerificationPhase::Received, "verification transition");

            let outcome = match self.steps(record_id, probe, &mut path).await {
                Ok(outcome) => outcome,
                Err(e) => VerificationOutcome::Failed(e),
            };
            let elapsed = haven_utils::format_elapsed(started.elapsed());
            let terminal = match &outcome {
                VerificationOutcome::Matched { .. } => {
                    tracing::info!(elapsed = %elapsed, "verification matched");
                    VerificationPhase::Matched
                }
                VerificationOutcome::NoMatch => {
                    tracing::info!(elapsed = %elapsed, "verification did not match");
                    VerificationPhase::NoMatch
                }
                VerificationOutcome::Failed(e) => {
                    tracing::warn!(
                        kind = %e.kind(),
                        error = %e,
                        after = ?path.last(),
                        elapsed = %elapsed,
                        "verification failed"
                    );
                    VerificationPhase::Failed
                }
            };
            path.push(terminal);
            VerificationReport {
                flow,
                record_id,
                outcome,
                path,
            }
        }
        .instrument(span)
        .await
    }

    async fn steps(
        &self,
        record_id: RecordId,
        probe: Probe<'_>,
        path: &mut Vec<VerificationPhase>,
    ) -> Result<VerificationOutcome, FlowError> {
        let svc = &self.services;
        svc.ensure_open()?;
        let mut enter = |phase: VerificationPhase| {
            tracing::debug!(phase = %phase, "verification transition");
            path.push(phase);
        };

        let probe = match probe {
            Probe::Embedding(embedding) => embedding,
            Probe::Image(image) => {
                let embedding = bounded("extractor.extract", svc.timeouts.extraction(), async {
                    svc.extractor
                        .extract(image)
                        .await
                        .map_err(FlowError::from_extraction)
                })
                .await?;
                enter(VerificationPhase::ProbeExtracted);
                embedding
            }
        };

        let record = bounded("ledger.get", svc.timeouts.ledger(), async {
            svc.ledger.get(record_id).await.map_err(FlowError::from_ledger)
        })
        .await?;
        enter(VerificationPhase::RecordFetched);

        let bytes = bounded("store.get", svc.timeouts.store(), async {
            svc.store
                .get(&record.content_address)
                .await
                .map_err(FlowError::from_store)
        })
        .await?;
        enter(VerificationPhase::BlobFetched);

        let profile = svc.unseal(bytes).await?;
        enter(VerificationPhase::Decrypted);

        // The stored profile must reproduce the on-ledger commitment, or the
        // blob behind this record is not the one that was enrolled.
        let enrolled = svc
            .quantizer
            .reduce(&profile.embedding, QuantizationPolicy::Circuit)
            .map_err(|_| FlowError::IntegrityViolation(record_id.to_string()))?;
        let recomputed = fuzzy_digest(&enrolled)
            .and_then(|digest| commit(&digest, &profile.salt))
            .map_err(|_| FlowError::IntegrityViolation(record_id.to_string()))?;
        if recomputed != record.commitment {
            return Err(FlowError::IntegrityViolation(record_id.to_string()));
        }

        let fresh = svc
            .quantizer
            .reduce(&probe, QuantizationPolicy::Circuit)
            .map_err(FlowError::from_quantize)?;
        drop(probe);
        enter(VerificationPhase::ProbeQuantized);

        let (proof, signals) = bounded("prover.prove", svc.timeouts.proof(), async {
            svc.prover
                .prove(&record.commitment, &profile.salt, &fresh)
                .await
                .map_err(FlowError::from_prover)
        })
        .await?;
        enter(VerificationPhase::ProofGenerated);

        let verified = bounded("prover.verify", svc.timeouts.proof(), async {
            svc.prover
                .verify(&proof, &signals)
                .await
                .map_err(FlowError::from_verifier)
        })
        .await?;
        enter(VerificationPhase::ProofVerified);

        if verified {
            Ok(VerificationOutcome::Matched {
                metadata: profile.metadata,
                record,
            })
        } else {
            Ok(VerificationOutcome::NoMatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases() {
        assert!(VerificationPhase::Matched.is_terminal());
        assert!(VerificationPhase::NoMatch.is_terminal());
        assert!(VerificationPhase::Failed.is_terminal());
        assert!(!VerificationPhase::ProofGenerated.is_terminal());
        assert_eq!(VerificationPhase::NoMatch.to_string(), "no_match");
    }
}
