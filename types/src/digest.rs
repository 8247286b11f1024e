//! Field-element digests: the fuzzy digest used as the dedup key, and the
//! blinding commitment recorded on the ledger.
//!
//! Both are 32-byte big-endian encodings of BN254 scalar field elements, so
//! they can be fed back into a proof circuit unchanged. Their textual form is
//! a 64-character zero-padded lowercase hex string.

use crate::TypeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! field_element {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, TypeError> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let raw = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
                let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
                    TypeError::InvalidLength {
                        expected: 32,
                        actual: raw.len(),
                    }
                })?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

field_element!(
    /// Deterministic hash of a quantized biometric vector.
    ///
    /// Exact-match: two captures collide only if they quantize identically.
    FuzzyDigest
);

field_element!(
    /// `Poseidon(circuit digest, salt)`. Reveals neither input.
    Commitment
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_zero_padded_to_full_width() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0x0f;
        let digest = FuzzyDigest::new(bytes);
        let hex = digest.to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("0000"));
        assert!(hex.ends_with("0f"));
    }

    #[test]
    fn parses_with_and_without_prefix() {
        let hex = "ab".repeat(32);
        let a: Commitment = hex.parse().unwrap();
        let b: Commitment = format!("0x{hex}").parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_short_input() {
        let err = FuzzyDigest::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            FuzzyDigest::from_hex(&"zz".repeat(32)),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn serializes_as_hex_string() {
        let c = Commitment::new([1u8; 32]);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let back: Commitment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
