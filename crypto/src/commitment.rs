//! Blinding commitment over a fuzzy digest.
//!
//! `commitment = Poseidon(digest, salt)`. Without both inputs the value can
//! be neither inverted nor recomputed (pre-image hardness of Poseidon).

use crate::fuzzy_hash::{bytes_to_field, field_to_bytes, poseidon_hash};
use crate::HashError;
use ark_bn254::Fr;
use ark_ff::PrimeField;
use haven_types::{Commitment, FuzzyDigest, Salt};
use rand::RngCore;
use zeroize::Zeroize;

/// Draw a uniformly random salt from the OS generator, reduced into the
/// scalar field so it is a valid circuit witness.
pub fn generate_salt() -> Salt {
    let mut raw = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut raw);
    let fe = Fr::from_be_bytes_mod_order(&raw);
    raw.zeroize();
    Salt::new(field_to_bytes(&fe))
}

/// Bind `digest` to `salt`.
pub fn commit(digest: &FuzzyDigest, salt: &Salt) -> Result<Commitment, HashError> {
    let h = poseidon_hash(&[
        bytes_to_field(digest.as_bytes()),
        bytes_to_field(salt.as_bytes()),
    ])?;
    Ok(Commitment::new(field_to_bytes(&h)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_is_deterministic_in_both_inputs() {
        let digest = FuzzyDigest::new([3u8; 32]);
        let salt = Salt::new([0u8; 32]);
        assert_eq!(commit(&digest, &salt).unwrap(), commit(&digest, &salt).unwrap());
    }

    #[test]
    fn salt_blinds_the_digest() {
        let digest = FuzzyDigest::new([3u8; 32]);
        let a = commit(&digest, &generate_salt()).unwrap();
        let b = commit(&digest, &generate_salt()).unwrap();
        assert_ne!(a, b, "fresh salts must give unlinkable commitments");
        assert_ne!(a.as_bytes(), digest.as_bytes());
    }

    #[test]
    fn different_digests_differ_under_same_salt() {
        let salt = generate_salt();
        let a = commit(&FuzzyDigest::new([1u8; 32]), &salt).unwrap();
        let b = commit(&FuzzyDigest::new([2u8; 32]), &salt).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_salt_is_canonical_field_element() {
        for _ in 0..16 {
            let salt = generate_salt();
            let fe = bytes_to_field(salt.as_bytes());
            assert_eq!(&field_to_bytes(&fe), salt.as_bytes());
        }
    }
}
