use haven_types::QuantizationPolicy;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QuantizeError {
    #[error("embedding is empty")]
    EmptyEmbedding,

    #[error("embedding component {index} is not finite")]
    NonFinite { index: usize },

    #[error("embedding component {index} overflows the {policy} range")]
    OutOfRange {
        index: usize,
        policy: QuantizationPolicy,
    },

    #[error("circuit policy needs {needed} components, embedding has {have}")]
    InsufficientDimension { needed: usize, have: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("cannot hash an empty vector")]
    EmptyInput,

    #[error("poseidon error: {0}")]
    Poseidon(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}
