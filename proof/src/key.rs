//! Verification key artifact.
//!
//! The key is produced by the circuit's setup ceremony and shipped alongside
//! the deployment as JSON. Only the fields the core needs are modelled; the
//! opaque key material is carried as hex.

use crate::{CircuitShape, ProofError};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationKey {
    pub circuit_id: String,
    /// Number of private biometric inputs (k).
    pub inputs: usize,
    /// Inclusive upper bound of each input (R).
    pub range: i64,
    /// Hex-encoded key material.
    pub key_material: String,
}

impl VerificationKey {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ProofError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProofError::Key(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ProofError> {
        let key: Self = serde_json::from_str(s).map_err(|e| ProofError::Key(e.to_string()))?;
        key.validate()?;
        Ok(key)
    }

    /// Fresh random key material for `shape`. For local development only.
    pub fn generate(circuit_id: impl Into<String>, shape: CircuitShape) -> Self {
        let mut material = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut material);
        Self {
            circuit_id: circuit_id.into(),
            inputs: shape.inputs,
            range: shape.range,
            key_material: hex::encode(material),
        }
    }

    pub fn shape(&self) -> CircuitShape {
        CircuitShape::new(self.inputs, self.range)
    }

    pub fn key_bytes(&self) -> Result<Vec<u8>, ProofError> {
        hex::decode(&self.key_material).map_err(|e| ProofError::Key(format!("key material: {e}")))
    }

    fn validate(&self) -> Result<(), ProofError> {
        if self.circuit_id.trim().is_empty() {
            return Err(ProofError::Key("missing circuit id".into()));
        }
        if self.inputs == 0 || self.range <= 0 {
            return Err(ProofError::Key(format!("invalid circuit shape {}", self.shape())));
        }
        if self.key_bytes()?.is_empty() {
            return Err(ProofError::Key("empty key material".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationKey")
            .field("circuit_id", &self.circuit_id)
            .field("inputs", &self.inputs)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verification_key.json");
        let key = VerificationKey::generate("biometric_match", CircuitShape::new(5, 1023));
        std::fs::write(&path, serde_json::to_string(&key).unwrap()).unwrap();

        let loaded = VerificationKey::from_json_file(&path).unwrap();
        assert_eq!(loaded, key);
        assert_eq!(loaded.shape(), CircuitShape::new(5, 1023));
    }

    #[test]
    fn missing_file_is_key_error() {
        let err = VerificationKey::from_json_file("/nonexistent/vk.json").unwrap_err();
        assert!(matches!(err, ProofError::Key(_)));
    }

    #[test]
    fn rejects_bad_material() {
        let json = r#"{"circuitId":"c","inputs":5,"range":1023,"keyMaterial":"zz"}"#;
        assert!(VerificationKey::from_json_str(json).is_err());
    }

    #[test]
    fn rejects_zero_inputs() {
        let json = r#"{"circuitId":"c","inputs":0,"range":1023,"keyMaterial":"00ff"}"#;
        assert!(VerificationKey::from_json_str(json).is_err());
    }

    #[test]
    fn debug_hides_material() {
        let key = VerificationKey::generate("c", CircuitShape::new(5, 1023));
        assert!(!format!("{key:?}").contains(&key.key_material));
    }
}
