//! Circuit-compatible fuzzy digest of a quantized vector.
//!
//! Uses Poseidon with circom parameters over the BN254 scalar field, the
//! same permutation circomlib exposes, so a constraint system can recompute
//! every digest produced here. Negative integers embed as `p - |v|`.
//!
//! One Poseidon instance takes at most [`POSEIDON_MAX_ARITY`] inputs. Longer
//! vectors are absorbed in a chain: the first chunk is hashed on its own and
//! each later chunk is hashed together with the running digest.

use crate::HashError;
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use haven_types::{FuzzyDigest, QuantizedVector};
use light_poseidon::{Poseidon, PoseidonHasher};

/// Largest input count supported by the circom parameter set.
pub const POSEIDON_MAX_ARITY: usize = 12;

/// Hash field elements with a single circom Poseidon instance.
pub fn poseidon_hash(inputs: &[Fr]) -> Result<Fr, HashError> {
    if inputs.is_empty() {
        return Err(HashError::EmptyInput);
    }
    let mut poseidon = Poseidon::<Fr>::new_circom(inputs.len())
        .map_err(|e| HashError::Poseidon(e.to_string()))?;
    poseidon
        .hash(inputs)
        .map_err(|e| HashError::Poseidon(e.to_string()))
}

/// Digest a quantized vector. Pure and deterministic.
pub fn fuzzy_digest(vector: &QuantizedVector) -> Result<FuzzyDigest, HashError> {
    let elements: Vec<Fr> = vector.values().iter().copied().map(signed_to_field).collect();
    let digest = chained_hash(&elements)?;
    Ok(FuzzyDigest::new(field_to_bytes(&digest)))
}

fn chained_hash(elements: &[Fr]) -> Result<Fr, HashError> {
    if elements.len() <= POSEIDON_MAX_ARITY {
        return poseidon_hash(elements);
    }
    let (first, rest) = elements.split_at(POSEIDON_MAX_ARITY);
    let mut acc = poseidon_hash(first)?;
    for chunk in rest.chunks(POSEIDON_MAX_ARITY - 1) {
        let mut inputs = Vec::with_capacity(chunk.len() + 1);
        inputs.push(acc);
        inputs.extend_from_slice(chunk);
        acc = poseidon_hash(&inputs)?;
    }
    Ok(acc)
}

/// Embed a signed integer into the scalar field.
pub(crate) fn signed_to_field(v: i64) -> Fr {
    let magnitude = Fr::from(v.unsigned_abs());
    if v < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Canonical 32-byte big-endian encoding of a field element.
pub(crate) fn field_to_bytes(fe: &Fr) -> [u8; 32] {
    let be = fe.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - be.len()..].copy_from_slice(&be);
    out
}

/// Decode big-endian bytes, reducing modulo the field order.
pub(crate) fn bytes_to_field(bytes: &[u8; 32]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}
