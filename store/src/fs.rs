//! Filesystem blockstore.
//!
//! Blobs live at `{root}/{shard}/{address}` where `shard` is the first two
//! hex characters of the digest. Writes go to a temporary file that is then
//! renamed into place, so a crash never leaves a partially written blob
//! under a valid address. Every read is re-hashed against the requested
//! address.

use crate::{ContentStore, StoreError};
use async_trait::async_trait;
use haven_crypto::hash::CONTENT_ADDRESS_PREFIX;
use haven_crypto::{content_address, matches_content_address};
use haven_types::ContentAddress;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A content-addressed store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StoreError::Unavailable(format!("cannot create {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the blob for `address`, or `None` if the address was not
    /// produced by this store's hashing scheme.
    fn blob_path(&self, address: &ContentAddress) -> Option<PathBuf> {
        let digest = address.as_str().strip_prefix(CONTENT_ADDRESS_PREFIX)?;
        if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(self.root.join(&digest[..2]).join(address.as_str()))
    }

    async fn read_verified(&self, address: &ContentAddress, path: &Path) -> Result<Vec<u8>, StoreError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(address.to_string()))
            }
            Err(e) => return Err(StoreError::Backend(e.to_string())),
        };
        if !matches_content_address(address, &bytes) {
            return Err(StoreError::Corruption(address.to_string()));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, bytes: &[u8]) -> Result<ContentAddress, StoreError> {
        let address = content_address(bytes);
        let path = self
            .blob_path(&address)
            .ok_or_else(|| StoreError::Backend(format!("unroutable address {address}")))?;

        match self.read_verified(&address, &path).await {
            Ok(_) => {
                tracing::trace!(%address, "blob already present");
                return Ok(address);
            }
            Err(StoreError::NotFound(_)) => {}
            Err(StoreError::Corruption(_)) => {
                tracing::warn!(%address, "overwriting corrupted blob");
            }
            Err(e) => return Err(e),
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        // One temp file per write; concurrent puts of the same blob must not
        // share it.
        let tmp = path.with_extension(format!("tmp-{:016x}", rand::random::<u64>()));
        fs::write(&tmp, bytes).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            if self.read_verified(&address, &path).await.is_ok() {
                tracing::trace!(%address, "blob stored by a concurrent put");
                return Ok(address);
            }
            return Err(StoreError::Backend(format!("cannot place {address}: {e}")));
        }

        tracing::debug!(%address, len = bytes.len(), "blob stored");
        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> Result<Vec<u8>, StoreError> {
        let path = self
            .blob_path(address)
            .ok_or_else(|| StoreError::NotFound(address.to_string()))?;
        self.read_verified(address, &path).await
    }

    async fn contains(&self, address: &ContentAddress) -> Result<bool, StoreError> {
        match self.blob_path(address) {
            Some(path) => Ok(fs::try_exists(&path).await?),
            None => Ok(false),
        }
    }

    async fn remove(&self, address: &ContentAddress) -> Result<(), StoreError> {
        let Some(path) = self.blob_path(address) else {
            return Ok(());
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(%address, "blob removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    fn name(&self) -> &str {
        "fs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, FsContentStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FsContentStore::open(dir.path().join("blocks"))
            .await
            .expect("open store");
        (dir, store)
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let (_dir, store) = store().await;
        let addr = store.put(b"sealed profile").await.unwrap();
        assert_eq!(store.get(&addr).await.unwrap(), b"sealed profile");
        assert!(store.contains(&addr).await.unwrap());
    }

    #[tokio::test]
    async fn put_is_idempotent() {
        let (_dir, store) = store().await;
        let a = store.put(b"same bytes").await.unwrap();
        let b = store.put(b"same bytes").await.unwrap();
        assert_eq!(a, b);

        let shard = store.blob_path(&a).unwrap();
        let entries: Vec<_> = std::fs::read_dir(shard.parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1, "identical bytes stored once");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_puts_of_the_same_blob_all_succeed() {
        let (_dir, store) = store().await;
        let blob = vec![0x5a; 4 * 1024 * 1024];
        let expected = content_address(&blob);

        for _ in 0..5 {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = store.clone();
                    let blob = blob.clone();
                    tokio::spawn(async move { store.put(&blob).await })
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.await.unwrap().unwrap(), expected);
            }
            store.remove(&expected).await.unwrap();
        }

        let shard = store.blob_path(&expected).unwrap();
        let leftovers = std::fs::read_dir(shard.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 0, "no temp files left behind");
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let (_dir, store) = store().await;
        let addr = content_address(b"never stored");
        assert!(matches!(store.get(&addr).await, Err(StoreError::NotFound(_))));
        assert!(!store.contains(&addr).await.unwrap());
    }

    #[tokio::test]
    async fn foreign_address_is_not_found() {
        let (_dir, store) = store().await;
        let addr = ContentAddress::new("bafyreib4pff766vhpbxbhjbqqnsh5emeznvujayjj4z2iu533cprgbz23m");
        assert!(matches!(store.get(&addr).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn tampered_blob_is_detected() {
        let (_dir, store) = store().await;
        let addr = store.put(b"original").await.unwrap();
        std::fs::write(store.blob_path(&addr).unwrap(), b"tampered").unwrap();
        assert!(matches!(
            store.get(&addr).await,
            Err(StoreError::Corruption(_))
        ));

        // Re-putting the original content repairs the blob.
        assert_eq!(store.put(b"original").await.unwrap(), addr);
        assert_eq!(store.get(&addr).await.unwrap(), b"original");
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_dir, store) = store().await;
        let addr = store.put(b"orphan").await.unwrap();
        store.remove(&addr).await.unwrap();
        store.remove(&addr).await.unwrap();
        assert!(!store.contains(&addr).await.unwrap());
    }
}
