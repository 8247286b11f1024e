//! Deterministic, lossy reduction of embeddings to bounded integers.
//!
//! Two policies:
//! - **storage**: `round(x * scale)` for every component. Feeds the dedup
//!   digest.
//! - **circuit**: the first `k` components, min-max normalised into
//!   `[0, R]`. Shaped to the proof circuit's private input.
//!
//! Rounding is half-up (`floor(v + 0.5)`) for both policies, matching the
//! arithmetic the enrollment service has always used, so digests computed
//! here agree with digests already on the ledger.

use crate::QuantizeError;
use haven_types::{EmbeddingVector, QuantizationPolicy, QuantizedVector};

/// Default storage scale factor.
pub const DEFAULT_STORAGE_SCALE: f64 = 1000.0;
/// Default number of circuit inputs (`k`).
pub const DEFAULT_CIRCUIT_INPUTS: usize = 5;
/// Default upper bound of the circuit range (`R`).
pub const DEFAULT_CIRCUIT_RANGE: u32 = 1023;

/// Largest magnitude that still converts to `i64` exactly enough.
const I64_SAFE_BOUND: f64 = 9.0e18;

/// Quantization parameters for one deployment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantizer {
    storage_scale: f64,
    circuit_inputs: usize,
    circuit_range: u32,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self {
            storage_scale: DEFAULT_STORAGE_SCALE,
            circuit_inputs: DEFAULT_CIRCUIT_INPUTS,
            circuit_range: DEFAULT_CIRCUIT_RANGE,
        }
    }
}

impl Quantizer {
    pub fn new(storage_scale: f64, circuit_inputs: usize, circuit_range: u32) -> Self {
        Self {
            storage_scale,
            circuit_inputs,
            circuit_range,
        }
    }

    pub fn circuit_inputs(&self) -> usize {
        self.circuit_inputs
    }

    pub fn circuit_range(&self) -> u32 {
        self.circuit_range
    }

    pub fn storage_scale(&self) -> f64 {
        self.storage_scale
    }

    /// Reduce `embedding` under `policy`. Pure: identical input and policy
    /// always give identical output.
    pub fn reduce(
        &self,
        embedding: &EmbeddingVector,
        policy: QuantizationPolicy,
    ) -> Result<QuantizedVector, QuantizeError> {
        let components = embedding.as_slice();
        if components.is_empty() {
            return Err(QuantizeError::EmptyEmbedding);
        }
        if let Some(index) = components.iter().position(|x| !x.is_finite()) {
            return Err(QuantizeError::NonFinite { index });
        }

        let values = match policy {
            QuantizationPolicy::Storage => self.storage(components)?,
            QuantizationPolicy::Circuit => self.circuit(components)?,
        };
        Ok(QuantizedVector::new(policy, values))
    }

    fn storage(&self, components: &[f64]) -> Result<Vec<i64>, QuantizeError> {
        components
            .iter()
            .enumerate()
            .map(|(index, &x)| {
                let scaled = round_half_up(x * self.storage_scale);
                if !scaled.is_finite() || scaled.abs() >= I64_SAFE_BOUND {
                    return Err(QuantizeError::OutOfRange {
                        index,
                        policy: QuantizationPolicy::Storage,
                    });
                }
                Ok(scaled as i64)
            })
            .collect()
    }

    fn circuit(&self, components: &[f64]) -> Result<Vec<i64>, QuantizeError> {
        let k = self.circuit_inputs;
        if components.len() < k {
            return Err(QuantizeError::InsufficientDimension {
                needed: k,
                have: components.len(),
            });
        }
        let head = &components[..k];
        let range = f64::from(self.circuit_range);

        let min = head.iter().copied().fold(f64::INFINITY, f64::min);
        let max = head.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = max - min;

        if span == 0.0 {
            let midpoint = round_half_up(range / 2.0) as i64;
            return Ok(vec![midpoint; k]);
        }

        Ok(head
            .iter()
            .map(|&x| {
                let normalized = round_half_up((x - min) / span * range);
                normalized.clamp(0.0, range) as i64
            })
            .collect())
    }
}

fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> EmbeddingVector {
        EmbeddingVector::new(vec![0.12, 0.98, -0.4, 0.55, 0.03])
    }

    #[test]
    fn storage_scales_and_rounds() {
        let q = Quantizer::default()
            .reduce(&scenario(), QuantizationPolicy::Storage)
            .unwrap();
        assert_eq!(q.values(), &[120, 980, -400, 550, 30]);
        assert_eq!(q.policy(), QuantizationPolicy::Storage);
    }

    #[test]
    fn storage_rounds_half_up_for_negatives() {
        let e = EmbeddingVector::new(vec![-1.25, 1.25]);
        let q = Quantizer::new(2.0, 1, 10)
            .reduce(&e, QuantizationPolicy::Storage)
            .unwrap();
        assert_eq!(q.values(), &[-2, 3]);
    }

    #[test]
    fn circuit_normalises_into_range() {
        let q = Quantizer::default()
            .reduce(&scenario(), QuantizationPolicy::Circuit)
            .unwrap();
        assert_eq!(q.values(), &[385, 1023, 0, 704, 319]);
        assert!(q.values().iter().all(|&v| (0..=1023).contains(&v)));
    }

    #[test]
    fn circuit_uses_only_first_k() {
        let mut long = scenario().as_slice().to_vec();
        long.extend([5.0, -5.0, 100.0]);
        let a = Quantizer::default()
            .reduce(&EmbeddingVector::new(long), QuantizationPolicy::Circuit)
            .unwrap();
        let b = Quantizer::default()
            .reduce(&scenario(), QuantizationPolicy::Circuit)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn circuit_is_invariant_under_positive_affine_maps() {
        let shifted = EmbeddingVector::new(
            scenario().as_slice().iter().map(|x| x * 2.0 + 0.1).collect(),
        );
        let quantizer = Quantizer::default();
        assert_eq!(
            quantizer
                .reduce(&shifted, QuantizationPolicy::Circuit)
                .unwrap(),
            quantizer
                .reduce(&scenario(), QuantizationPolicy::Circuit)
                .unwrap()
        );
    }

    #[test]
    fn circuit_degenerate_maps_to_midpoint() {
        let flat = EmbeddingVector::new(vec![0.3; 5]);
        let q = Quantizer::default()
            .reduce(&flat, QuantizationPolicy::Circuit)
            .unwrap();
        assert_eq!(q.values(), &[512; 5]);
    }

    #[test]
    fn circuit_needs_k_components() {
        let short = EmbeddingVector::new(vec![0.1, 0.2]);
        assert_eq!(
            Quantizer::default().reduce(&short, QuantizationPolicy::Circuit),
            Err(QuantizeError::InsufficientDimension { needed: 5, have: 2 })
        );
    }

    #[test]
    fn rejects_empty_and_non_finite() {
        let q = Quantizer::default();
        assert_eq!(
            q.reduce(&EmbeddingVector::new(vec![]), QuantizationPolicy::Storage),
            Err(QuantizeError::EmptyEmbedding)
        );
        assert_eq!(
            q.reduce(
                &EmbeddingVector::new(vec![0.1, f64::NAN]),
                QuantizationPolicy::Storage
            ),
            Err(QuantizeError::NonFinite { index: 1 })
        );
    }

    #[test]
    fn storage_overflow_is_an_error() {
        let q = Quantizer::new(1e18, 1, 10);
        assert!(matches!(
            q.reduce(&EmbeddingVector::new(vec![100.0]), QuantizationPolicy::Storage),
            Err(QuantizeError::OutOfRange { index: 0, .. })
        ));
    }
}
