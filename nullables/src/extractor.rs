//! Nullable embedding extractor: a lookup table from image bytes to
//! embeddings.

use async_trait::async_trait;
use haven_enrollment::{EmbeddingExtractor, ExtractionError};
use haven_types::EmbeddingVector;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Returns the embedding registered for an image, or `NoFaceDetected` for
/// any image it has never seen.
pub struct NullExtractor {
    faces: Mutex<HashMap<Vec<u8>, EmbeddingVector>>,
    stall: Option<Duration>,
    calls: AtomicUsize,
}

impl NullExtractor {
    pub fn new() -> Self {
        Self {
            faces: Mutex::new(HashMap::new()),
            stall: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// An extractor that sleeps for `delay` before every answer.
    pub fn stalled(delay: Duration) -> Self {
        Self {
            stall: Some(delay),
            ..Self::new()
        }
    }

    pub fn with_face(self, image: impl Into<Vec<u8>>, embedding: EmbeddingVector) -> Self {
        self.add_face(image, embedding);
        self
    }

    pub fn add_face(&self, image: impl Into<Vec<u8>>, embedding: EmbeddingVector) {
        self.faces.lock().unwrap().insert(image.into(), embedding);
    }

    /// Number of `extract` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for NullExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingExtractor for NullExtractor {
    async fn extract(&self, image: &[u8]) -> Result<EmbeddingVector, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }
        self.faces
            .lock()
            .unwrap()
            .get(image)
            .cloned()
            .ok_or(ExtractionError::NoFaceDetected)
    }

    fn name(&self) -> &str {
        "null-extractor"
    }
}
