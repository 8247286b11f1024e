#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use haven_crypto::{fuzzy_digest, Quantizer};
use haven_types::{EmbeddingVector, QuantizationPolicy};

#[derive(Debug, Arbitrary)]
struct Input {
    components: Vec<f64>,
    storage_scale: f64,
    circuit_inputs: u8,
    circuit_range: u16,
}

// Quantization accepts arbitrary floats (NaN, infinities, huge scales) and
// must either reject them or produce values the digest can absorb.
fuzz_target!(|input: Input| {
    let quantizer = Quantizer::new(
        input.storage_scale,
        usize::from(input.circuit_inputs),
        u32::from(input.circuit_range),
    );
    let embedding = EmbeddingVector::new(input.components);

    for policy in [QuantizationPolicy::Storage, QuantizationPolicy::Circuit] {
        if let Ok(vector) = quantizer.reduce(&embedding, policy) {
            if policy == QuantizationPolicy::Circuit {
                let range = i64::from(input.circuit_range);
                assert!(vector.values().iter().all(|v| (0..=range).contains(v)));
            }
            let _ = fuzzy_digest(&vector);
        }
    }
});
