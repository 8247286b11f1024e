//! Transparent development engine.
//!
//! Enforces the same witness contract as the real circuit and recomputes the
//! commitment exactly as the circuit would, but the "proof" is a keyed
//! Blake2b attestation over the recomputed commitment. It is sound only
//! against parties who do not hold the key material and provides no
//! zero-knowledge property. Use it for local runs and tests.

use crate::{CircuitShape, Proof, ProofEngine, ProofError, PublicSignals, VerificationKey};
use async_trait::async_trait;
use haven_crypto::{blake2b_256_multi, commit, fuzzy_digest};
use haven_types::{Commitment, QuantizationPolicy, QuantizedVector, Salt};
use std::sync::Arc;

pub const TRANSPARENT_SCHEME: &str = "transparent-blake2b";

const ATTESTATION_DOMAIN: &[u8] = b"haven/transparent-proof/v1";

pub struct TransparentProofEngine {
    key: VerificationKey,
    material: Arc<Vec<u8>>,
}

impl TransparentProofEngine {
    pub fn new(key: VerificationKey) -> Result<Self, ProofError> {
        let material = key.key_bytes()?;
        if material.is_empty() {
            return Err(ProofError::Key("empty key material".into()));
        }
        Ok(Self {
            key,
            material: Arc::new(material),
        })
    }

    /// Engine with freshly generated key material.
    pub fn development(shape: CircuitShape) -> Self {
        let key = VerificationKey::generate("haven-dev", shape);
        let material = key.key_bytes().unwrap_or_default();
        Self {
            key,
            material: Arc::new(material),
        }
    }

    pub fn verification_key(&self) -> &VerificationKey {
        &self.key
    }
}

fn attest(material: &[u8], circuit_id: &str, commitment: &Commitment) -> [u8; 32] {
    blake2b_256_multi(&[
        ATTESTATION_DOMAIN,
        material,
        circuit_id.as_bytes(),
        commitment.as_bytes(),
    ])
}

#[async_trait]
impl ProofEngine for TransparentProofEngine {
    async fn prove(
        &self,
        stored: &Commitment,
        salt: &Salt,
        fresh: &QuantizedVector,
    ) -> Result<(Proof, PublicSignals), ProofError> {
        if fresh.policy() != QuantizationPolicy::Circuit {
            return Err(ProofError::Witness(format!(
                "expected circuit-policy input, got {}",
                fresh.policy()
            )));
        }
        self.key.shape().check(fresh)?;

        let material = Arc::clone(&self.material);
        let circuit_id = self.key.circuit_id.clone();
        let salt = salt.clone();
        let fresh = fresh.clone();
        let attestation = tokio::task::spawn_blocking(move || {
            let digest = fuzzy_digest(&fresh).map_err(|e| ProofError::Prover(e.to_string()))?;
            let recomputed = commit(&digest, &salt).map_err(|e| ProofError::Prover(e.to_string()))?;
            Ok::<_, ProofError>(attest(&material, &circuit_id, &recomputed))
        })
        .await
        .map_err(|e| ProofError::Prover(format!("prover task failed: {e}")))??;

        tracing::debug!(commitment = %stored, "transparent proof generated");
        Ok((
            Proof {
                scheme: TRANSPARENT_SCHEME.to_string(),
                data: hex::encode(attestation),
            },
            PublicSignals::for_commitment(stored),
        ))
    }

    async fn verify(&self, proof: &Proof, signals: &PublicSignals) -> Result<bool, ProofError> {
        let stored = signals
            .commitment()
            .ok_or_else(|| ProofError::Verifier("malformed public signals".into()))?;
        if proof.scheme != TRANSPARENT_SCHEME {
            return Ok(false);
        }
        let Ok(presented) = hex::decode(&proof.data) else {
            return Ok(false);
        };
        let expected = attest(&self.material, &self.key.circuit_id, &stored);
        Ok(presented.as_slice() == expected.as_slice())
    }

    fn circuit_shape(&self) -> CircuitShape {
        self.key.shape()
    }

    fn name(&self) -> &str {
        "transparent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_crypto::generate_salt;

    fn engine() -> TransparentProofEngine {
        TransparentProofEngine::development(CircuitShape::new(5, 1023))
    }

    fn circuit(values: Vec<i64>) -> QuantizedVector {
        QuantizedVector::new(QuantizationPolicy::Circuit, values)
    }

    fn enrolled(values: Vec<i64>, salt: &Salt) -> Commitment {
        commit(&fuzzy_digest(&circuit(values)).unwrap(), salt).unwrap()
    }

    #[tokio::test]
    async fn matching_witness_verifies() {
        let engine = engine();
        let salt = generate_salt();
        let stored = enrolled(vec![385, 1023, 0, 704, 319], &salt);

        let (proof, signals) = engine
            .prove(&stored, &salt, &circuit(vec![385, 1023, 0, 704, 319]))
            .await
            .unwrap();
        assert_eq!(signals.commitment(), Some(stored));
        assert!(engine.verify(&proof, &signals).await.unwrap());
    }

    #[tokio::test]
    async fn different_witness_fails_verification() {
        let engine = engine();
        let salt = generate_salt();
        let stored = enrolled(vec![385, 1023, 0, 704, 319], &salt);

        let (proof, signals) = engine
            .prove(&stored, &salt, &circuit(vec![385, 1023, 0, 704, 318]))
            .await
            .unwrap();
        assert!(!engine.verify(&proof, &signals).await.unwrap());
    }

    #[tokio::test]
    async fn wrong_salt_fails_verification() {
        let engine = engine();
        let stored = enrolled(vec![1, 2, 3, 4, 5], &generate_salt());
        let (proof, signals) = engine
            .prove(&stored, &generate_salt(), &circuit(vec![1, 2, 3, 4, 5]))
            .await
            .unwrap();
        assert!(!engine.verify(&proof, &signals).await.unwrap());
    }

    #[tokio::test]
    async fn proof_does_not_transfer_between_keys() {
        let a = engine();
        let b = engine();
        let salt = generate_salt();
        let stored = enrolled(vec![1, 2, 3, 4, 5], &salt);
        let (proof, signals) = a
            .prove(&stored, &salt, &circuit(vec![1, 2, 3, 4, 5]))
            .await
            .unwrap();
        assert!(!b.verify(&proof, &signals).await.unwrap());
    }

    #[tokio::test]
    async fn rejects_malformed_witness() {
        let engine = engine();
        let salt = generate_salt();
        let stored = Commitment::ZERO;
        let storage = QuantizedVector::new(QuantizationPolicy::Storage, vec![1, 2, 3, 4, 5]);
        assert!(matches!(
            engine.prove(&stored, &salt, &storage).await,
            Err(ProofError::Witness(_))
        ));
        assert!(matches!(
            engine.prove(&stored, &salt, &circuit(vec![1, 2, 3])).await,
            Err(ProofError::Witness(_))
        ));
        assert!(matches!(
            engine.prove(&stored, &salt, &circuit(vec![1, 2, 3, 4, 2000])).await,
            Err(ProofError::Witness(_))
        ));
    }

    #[tokio::test]
    async fn tampered_proof_is_rejected() {
        let engine = engine();
        let salt = generate_salt();
        let stored = enrolled(vec![1, 2, 3, 4, 5], &salt);
        let (mut proof, signals) = engine
            .prove(&stored, &salt, &circuit(vec![1, 2, 3, 4, 5]))
            .await
            .unwrap();
        proof.data = "not hex".into();
        assert!(!engine.verify(&proof, &signals).await.unwrap());
        assert!(engine
            .verify(&proof, &PublicSignals::new(vec![]))
            .await
            .is_err());
    }
}
