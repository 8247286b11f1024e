//! Content-addressed storage boundary.
//!
//! The registry core never talks to a blob network directly; it depends on
//! the [`ContentStore`] trait. Backends (IPFS gateway, filesystem blockstore,
//! in-memory for testing) implement it.

pub mod error;
pub mod fs;

pub use error::StoreError;
pub use fs::FsContentStore;

use async_trait::async_trait;
use haven_types::ContentAddress;

/// Put/get of opaque bytes keyed by content address.
///
/// `put` is idempotent: identical bytes yield the identical address and are
/// kept at most once. `get` returns exactly the bytes that were put, or
/// fails; content that no longer matches its address is never returned.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` and return their address.
    async fn put(&self, bytes: &[u8]) -> Result<ContentAddress, StoreError>;

    /// Fetch the bytes stored under `address`.
    async fn get(&self, address: &ContentAddress) -> Result<Vec<u8>, StoreError>;

    /// Whether `address` is currently held.
    async fn contains(&self, address: &ContentAddress) -> Result<bool, StoreError>;

    /// Drop the blob at `address`. Used only by the reconciliation sweep for
    /// blobs no ledger record references. Removing an absent blob succeeds.
    async fn remove(&self, address: &ContentAddress) -> Result<(), StoreError>;

    /// Release backend resources. Called once at shutdown.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Human-readable backend name for logs.
    fn name(&self) -> &str;
}
