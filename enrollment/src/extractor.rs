//! Boundary to the embedding extractor (a pretrained face recognition model).

use async_trait::async_trait;
use haven_types::EmbeddingVector;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no face detected")]
    NoFaceDetected,

    #[error("extractor backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait EmbeddingExtractor: Send + Sync {
    /// Produce a fixed-length embedding for the face in `image`.
    async fn extract(&self, image: &[u8]) -> Result<EmbeddingVector, ExtractionError>;

    async fn close(&self) -> Result<(), ExtractionError> {
        Ok(())
    }

    fn name(&self) -> &str;
}
