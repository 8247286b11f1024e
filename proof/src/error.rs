use crate::CircuitShape;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    #[error("circuit shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: CircuitShape,
        actual: CircuitShape,
    },

    #[error("witness error: {0}")]
    Witness(String),

    #[error("prover error: {0}")]
    Prover(String),

    #[error("verifier error: {0}")]
    Verifier(String),

    #[error("verification key error: {0}")]
    Key(String),
}
