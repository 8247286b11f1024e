//! Nullable content store: thread-safe in-memory blobs for testing.

use async_trait::async_trait;
use haven_crypto::{content_address, matches_content_address};
use haven_store::{ContentStore, StoreError};
use haven_types::ContentAddress;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// An in-memory content-addressed store.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullContentStore {
    blobs: Mutex<HashMap<ContentAddress, Vec<u8>>>,
    physical_writes: AtomicUsize,
    unavailable: AtomicBool,
    stall: Mutex<Option<Duration>>,
    closed: AtomicBool,
}

impl NullContentStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            physical_writes: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            stall: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of puts that actually wrote bytes (idempotent puts excluded).
    pub fn physical_writes(&self) -> usize {
        self.physical_writes.load(Ordering::SeqCst)
    }

    pub fn holds(&self, address: &ContentAddress) -> bool {
        self.blobs.lock().unwrap().contains_key(address)
    }

    /// Raw bytes at `address`, bypassing the content check.
    pub fn raw(&self, address: &ContentAddress) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(address).cloned()
    }

    /// Replace the bytes at `address` without re-addressing them.
    pub fn tamper(&self, address: &ContentAddress, bytes: Vec<u8>) {
        self.blobs.lock().unwrap().insert(address.clone(), bytes);
    }

    /// Drop a blob behind the caller's back.
    pub fn evict(&self, address: &ContentAddress) {
        self.blobs.lock().unwrap().remove(address);
    }

    /// Make every call fail with `Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every call by `delay`.
    pub fn set_stall(&self, delay: Option<Duration>) {
        *self.stall.lock().unwrap() = delay;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), StoreError> {
        let stall = *self.stall.lock().unwrap();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null store offline".into()));
        }
        Ok(())
    }
}

impl Default for NullContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for NullContentStore {
    async fn put(&self, bytes: &[u8]) -> Result<ContentAddress, StoreError> {
        self.gate().await?;
        let address = content_address(bytes);
        let mut blobs = self.blobs.lock().unwrap();
        if !blobs.contains_key(&address) {
            blobs.insert(address.clone(), bytes.to_vec());
            self.physical_writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> Result<Vec<u8>, StoreError> {
        self.gate().await?;
        let bytes = self
            .blobs
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(address.to_string()))?;
        if !matches_content_address(address, &bytes) {
            return Err(StoreError::Corruption(address.to_string()));
        }
        Ok(bytes)
    }

    async fn contains(&self, address: &ContentAddress) -> Result<bool, StoreError> {
        self.gate().await?;
        Ok(self.holds(address))
    }

    async fn remove(&self, address: &ContentAddress) -> Result<(), StoreError> {
        self.gate().await?;
        self.evict(address);
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "null-store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_bytes_are_written_once() {
        let store = NullContentStore::new();
        let a = store.put(b"blob").await.unwrap();
        let b = store.put(b"blob").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.physical_writes(), 1);
        assert_eq!(store.get(&a).await.unwrap(), b"blob");
    }

    #[tokio::test]
    async fn tampered_blob_reads_as_corruption() {
        let store = NullContentStore::new();
        let addr = store.put(b"blob").await.unwrap();
        store.tamper(&addr, b"other".to_vec());
        assert!(matches!(
            store.get(&addr).await,
            Err(StoreError::Corruption(_))
        ));
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = NullContentStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.put(b"x").await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.put(b"x").await.is_ok());
    }
}
