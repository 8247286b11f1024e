//! Nullable proof engine: the transparent engine with controllable
//! failures and latency.

use async_trait::async_trait;
use haven_proof::{
    CircuitShape, Proof, ProofEngine, ProofError, PublicSignals, TransparentProofEngine,
};
use haven_types::{Commitment, QuantizedVector, Salt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct NullProofEngine {
    inner: TransparentProofEngine,
    stall: Mutex<Option<Duration>>,
    fail_prover: AtomicBool,
    proofs: AtomicUsize,
    closed: AtomicBool,
}

impl NullProofEngine {
    pub fn new(shape: CircuitShape) -> Self {
        Self {
            inner: TransparentProofEngine::development(shape),
            stall: Mutex::new(None),
            fail_prover: AtomicBool::new(false),
            proofs: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Delay every `prove` call by `delay`.
    pub fn set_stall(&self, delay: Option<Duration>) {
        *self.stall.lock().unwrap() = delay;
    }

    /// Make `prove` fail with a prover error until reset.
    pub fn set_failing(&self, failing: bool) {
        self.fail_prover.store(failing, Ordering::SeqCst);
    }

    /// Number of proofs generated so far.
    pub fn proofs(&self) -> usize {
        self.proofs.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProofEngine for NullProofEngine {
    async fn prove(
        &self,
        stored: &Commitment,
        salt: &Salt,
        fresh: &QuantizedVector,
    ) -> Result<(Proof, PublicSignals), ProofError> {
        let stall = *self.stall.lock().unwrap();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        if self.fail_prover.load(Ordering::SeqCst) {
            return Err(ProofError::Prover("null prover failure".into()));
        }
        let result = self.inner.prove(stored, salt, fresh).await?;
        self.proofs.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    }

    async fn verify(&self, proof: &Proof, signals: &PublicSignals) -> Result<bool, ProofError> {
        self.inner.verify(proof, signals).await
    }

    fn circuit_shape(&self) -> CircuitShape {
        self.inner.circuit_shape()
    }

    async fn close(&self) -> Result<(), ProofError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "null-prover"
    }
}
