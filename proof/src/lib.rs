//! Boundary to the external zero-knowledge proof system.
//!
//! The circuit takes the stored commitment as its public input and the salt
//! plus a fresh circuit-policy biometric (`k` integers in `[0, R]`) as
//! private witnesses. It is satisfied when `Poseidon(Poseidon(fresh), salt)`
//! equals the stored commitment. Neither the proof nor the public signals
//! reveal the salt or the stored digest.
//!
//! Proving and verifying are expensive. Implementations must not block the
//! calling task; CPU-bound work belongs on the blocking pool.

pub mod error;
pub mod key;
#[cfg(feature = "transparent")]
pub mod transparent;

pub use error::ProofError;
pub use key::VerificationKey;
#[cfg(feature = "transparent")]
pub use transparent::TransparentProofEngine;

use async_trait::async_trait;
use haven_types::{Commitment, QuantizedVector, Salt};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Input shape a circuit was compiled for: `inputs` private values, each in
/// `[0, range]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CircuitShape {
    pub inputs: usize,
    pub range: i64,
}

impl CircuitShape {
    pub const fn new(inputs: usize, range: i64) -> Self {
        Self { inputs, range }
    }

    /// Check that `vector` fits this shape.
    pub fn check(&self, vector: &QuantizedVector) -> Result<(), ProofError> {
        if vector.len() != self.inputs {
            return Err(ProofError::Witness(format!(
                "expected {} inputs, got {}",
                self.inputs,
                vector.len()
            )));
        }
        if let Some((index, value)) = vector
            .values()
            .iter()
            .enumerate()
            .find(|(_, v)| !(0..=self.range).contains(*v))
        {
            return Err(ProofError::Witness(format!(
                "input {index} = {value} outside [0, {}]",
                self.range
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CircuitShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k={} R={}", self.inputs, self.range)
    }
}

/// An opaque proof as produced by the prover.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub scheme: String,
    /// Hex-encoded proof bytes.
    pub data: String,
}

/// Public signals that accompany a proof. The first signal is always the
/// stored commitment the proof was generated against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicSignals(Vec<String>);

impl PublicSignals {
    pub fn new(signals: Vec<String>) -> Self {
        Self(signals)
    }

    pub fn for_commitment(commitment: &Commitment) -> Self {
        Self(vec![commitment.to_hex()])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// The commitment signal, if present and well formed.
    pub fn commitment(&self) -> Option<Commitment> {
        self.0.first().and_then(|s| Commitment::from_hex(s).ok())
    }
}

#[async_trait]
pub trait ProofEngine: Send + Sync {
    /// Prove that `fresh` and `salt` reproduce `stored`.
    ///
    /// A witness that does not reproduce the commitment still yields a
    /// proof; it simply fails verification.
    async fn prove(
        &self,
        stored: &Commitment,
        salt: &Salt,
        fresh: &QuantizedVector,
    ) -> Result<(Proof, PublicSignals), ProofError>;

    async fn verify(&self, proof: &Proof, signals: &PublicSignals) -> Result<bool, ProofError>;

    /// Shape of the circuit behind this engine.
    fn circuit_shape(&self) -> CircuitShape;

    async fn close(&self) -> Result<(), ProofError> {
        Ok(())
    }

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_types::QuantizationPolicy;

    #[test]
    fn shape_check_bounds() {
        let shape = CircuitShape::new(3, 10);
        let ok = QuantizedVector::new(QuantizationPolicy::Circuit, vec![0, 5, 10]);
        let short = QuantizedVector::new(QuantizationPolicy::Circuit, vec![0, 5]);
        let high = QuantizedVector::new(QuantizationPolicy::Circuit, vec![0, 5, 11]);
        let negative = QuantizedVector::new(QuantizationPolicy::Circuit, vec![-1, 5, 10]);
        assert!(shape.check(&ok).is_ok());
        assert!(shape.check(&short).is_err());
        assert!(shape.check(&high).is_err());
        assert!(shape.check(&negative).is_err());
    }

    #[test]
    fn signals_expose_commitment() {
        let c = Commitment::new([7u8; 32]);
        let signals = PublicSignals::for_commitment(&c);
        assert_eq!(signals.commitment(), Some(c));
        assert_eq!(PublicSignals::new(vec!["xyz".into()]).commitment(), None);
        assert_eq!(PublicSignals::new(vec![]).commitment(), None);
    }
}
