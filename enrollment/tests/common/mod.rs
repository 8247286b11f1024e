//! Shared wiring for the flow tests: every collaborator is a nullable, kept
//! alongside the `Services` so tests can inspect and steer it.

#![allow(dead_code)]

use haven_enrollment::{HavenConfig, SagaJournal, Services};
use haven_nullables::{NullClock, NullContentStore, NullExtractor, NullLedger, NullProofEngine};
use haven_types::{Actor, EmbeddingVector, IdentityMetadata};
use std::sync::Arc;

pub struct Harness {
    pub services: Arc<Services>,
    pub extractor: Arc<NullExtractor>,
    pub store: Arc<NullContentStore>,
    pub ledger: Arc<NullLedger>,
    pub prover: Arc<NullProofEngine>,
    /// Drives the services' notion of "now"; starts at wall-clock time.
    pub clock: Arc<NullClock>,
}

pub fn registrar() -> Actor {
    Actor::new("registrar-1")
}

pub fn officer() -> Actor {
    Actor::new("officer-1")
}

/// The enrolment embedding used throughout the end-to-end scenarios.
pub fn embedding_a() -> EmbeddingVector {
    EmbeddingVector::new(vec![0.12, 0.98, -0.4, 0.55, 0.03])
}

pub fn metadata_a() -> IdentityMetadata {
    IdentityMetadata::new("A", "X", "1990-01-01")
}

pub fn harness() -> Harness {
    harness_with(HavenConfig::default(), NullExtractor::new())
}

pub fn harness_with(config: HavenConfig, extractor: NullExtractor) -> Harness {
    let extractor = Arc::new(extractor);
    let store = Arc::new(NullContentStore::new());
    let ledger = Arc::new(NullLedger::with_roles(registrar(), officer()));
    let prover = Arc::new(NullProofEngine::new(config.quantizer.circuit_shape()));
    let clock = Arc::new(NullClock::starting_now());
    let services = Services::new(
        &config,
        extractor.clone(),
        store.clone(),
        ledger.clone(),
        prover.clone(),
        Arc::new(SagaJournal::in_memory()),
    )
    .expect("services should wire")
    .with_clock(clock.clone());
    Harness {
        services: Arc::new(services),
        extractor,
        store,
        ledger,
        prover,
        clock,
    }
}
