//! Biometric embeddings and their quantized forms.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A fixed-length real-valued vector produced by the embedding extractor.
///
/// Immutable once captured. The components are wiped from memory when the
/// vector is dropped.
#[derive(Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f64>);

impl EmbeddingVector {
    pub fn new(components: Vec<f64>) -> Self {
        Self(components)
    }

    /// Widen an `f32` descriptor (the usual extractor output) to `f64`.
    pub fn from_f32(components: &[f32]) -> Self {
        Self(components.iter().map(|&x| f64::from(x)).collect())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for EmbeddingVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmbeddingVector(dim={})", self.0.len())
    }
}

/// Which reduction a [`QuantizedVector`] was produced under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantizationPolicy {
    /// Full-dimension scale-and-round, used for the dedup digest.
    Storage,
    /// First `k` components, min-max normalised into `[0, R]`.
    Circuit,
}

impl QuantizationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Circuit => "circuit",
        }
    }
}

impl fmt::Display for QuantizationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded integers derived from an embedding under a given policy.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantizedVector {
    policy: QuantizationPolicy,
    values: Vec<i64>,
}

impl QuantizedVector {
    pub fn new(policy: QuantizationPolicy, values: Vec<i64>) -> Self {
        Self { policy, values }
    }

    pub fn policy(&self) -> QuantizationPolicy {
        self.policy
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for QuantizedVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuantizedVector({}, len={})", self.policy, self.values.len())
    }
}
