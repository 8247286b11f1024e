//! Saga journal for writes that span the content store and the ledger.
//!
//! The store and the ledger are independent systems, so a registration that
//! stores its blob and then fails (or crashes) before the ledger append
//! leaves an unreferenced blob behind. Flows record each durable step here
//! before and after the external call; the [`Reconciler`](crate::Reconciler)
//! later reclaims blobs that never became referenced.
//!
//! Entries are appended as flows progress. With a path the journal is
//! persisted as JSON lines and reloaded on open; without one it lives in
//! memory. [`SagaJournal::compact`] drops every entry that no longer bears on
//! a pending blob, and runs on open and after each sweep.

use crate::spans::FlowId;
use haven_types::{ContentAddress, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JournalError {
    #[error("journal io error: {0}")]
    Io(String),

    #[error("journal line {line} is corrupt: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("cannot encode journal entry: {0}")]
    Encode(String),
}

impl From<std::io::Error> for JournalError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalEntry {
    /// About to put a blob at `address`. Written before the store call.
    BlobWritten {
        flow: FlowId,
        address: ContentAddress,
        at: Timestamp,
    },
    /// A ledger record now points at `address`.
    Committed {
        flow: FlowId,
        address: ContentAddress,
        record: RecordId,
        at: Timestamp,
    },
    /// `address` was superseded and may be reclaimed.
    Released {
        flow: FlowId,
        address: ContentAddress,
        at: Timestamp,
    },
    /// The sweep removed `address` from the store.
    Reclaimed {
        address: ContentAddress,
        at: Timestamp,
    },
}

impl JournalEntry {
    pub fn address(&self) -> &ContentAddress {
        match self {
            Self::BlobWritten { address, .. }
            | Self::Committed { address, .. }
            | Self::Released { address, .. }
            | Self::Reclaimed { address, .. } => address,
        }
    }
}

#[derive(Clone, Copy)]
enum BlobState {
    /// Awaiting a commit since `since`; `entry` is the index that opened it.
    Pending { since: Timestamp, entry: usize },
    Referenced,
}

/// Fold `entries` into the latest state of each address, in order of first
/// appearance. Reclaimed addresses are absent from the map.
fn blob_states(
    entries: &[JournalEntry],
) -> (Vec<&ContentAddress>, HashMap<&ContentAddress, BlobState>) {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut state = HashMap::new();

    for (index, entry) in entries.iter().enumerate() {
        let address = entry.address();
        if seen.insert(address) {
            order.push(address);
        }
        match entry {
            JournalEntry::BlobWritten { at, .. } => {
                state.entry(address).or_insert(BlobState::Pending {
                    since: *at,
                    entry: index,
                });
            }
            JournalEntry::Committed { .. } => {
                state.insert(address, BlobState::Referenced);
            }
            JournalEntry::Released { at, .. } => {
                state.insert(
                    address,
                    BlobState::Pending {
                        since: *at,
                        entry: index,
                    },
                );
            }
            JournalEntry::Reclaimed { .. } => {
                state.remove(address);
            }
        }
    }
    (order, state)
}

/// The entries that still open a pending blob, in their original order.
fn pending_entries(entries: &[JournalEntry]) -> Vec<JournalEntry> {
    let (_, state) = blob_states(entries);
    let keep: HashSet<usize> = state
        .values()
        .filter_map(|s| match s {
            BlobState::Pending { entry, .. } => Some(*entry),
            BlobState::Referenced => None,
        })
        .collect();
    entries
        .iter()
        .enumerate()
        .filter(|(index, _)| keep.contains(index))
        .map(|(_, entry)| entry.clone())
        .collect()
}

/// Replace the file at `path` with `entries` and reopen it for appending.
async fn rewrite(path: &Path, entries: &[JournalEntry]) -> Result<tokio::fs::File, JournalError> {
    let mut text = String::new();
    for entry in entries {
        text.push_str(
            &serde_json::to_string(entry).map_err(|e| JournalError::Encode(e.to_string()))?,
        );
        text.push('\n');
    }
    let tmp = path.with_extension("compact");
    tokio::fs::write(&tmp, text).await?;
    tokio::fs::rename(&tmp, path).await?;
    open_append(path).await
}

async fn open_append(path: &Path) -> Result<tokio::fs::File, JournalError> {
    Ok(tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?)
}

pub struct SagaJournal {
    entries: Mutex<Vec<JournalEntry>>,
    file: Option<tokio::sync::Mutex<tokio::fs::File>>,
    path: Option<PathBuf>,
}

impl SagaJournal {
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            file: None,
            path: None,
        }
    }

    /// Open a persistent journal, replaying any entries already in `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let mut entries = Vec::new();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for (index, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let entry = serde_json::from_str(line).map_err(|e| JournalError::Corrupt {
                        line: index + 1,
                        reason: e.to_string(),
                    })?;
                    entries.push(entry);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let replayed = entries.len();
        let pending = pending_entries(&entries);
        let file = if pending.len() < replayed {
            let file = rewrite(&path, &pending).await?;
            entries = pending;
            file
        } else {
            open_append(&path).await?
        };

        tracing::debug!(
            path = %path.display(),
            replayed,
            kept = entries.len(),
            "journal opened"
        );
        Ok(Self {
            entries: Mutex::new(entries),
            file: Some(tokio::sync::Mutex::new(file)),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Durably append `entry`. The in-memory view is updated only after the
    /// line reaches the file.
    pub async fn append(&self, entry: JournalEntry) -> Result<(), JournalError> {
        // Held until the in-memory push so a compaction never sees the line
        // on disk without the entry.
        let _file = match &self.file {
            Some(file) => {
                let mut line = serde_json::to_string(&entry)
                    .map_err(|e| JournalError::Encode(e.to_string()))?;
                line.push('\n');
                let mut file = file.lock().await;
                file.write_all(line.as_bytes()).await?;
                file.flush().await?;
                Some(file)
            }
            None => None,
        };
        tracing::trace!(address = %entry.address(), "journal entry appended");
        self.lock().push(entry);
        Ok(())
    }

    /// Drop entries for blobs that are committed or reclaimed, keeping only
    /// what opens a still-pending blob. Returns how many entries were
    /// dropped.
    pub async fn compact(&self) -> Result<usize, JournalError> {
        let (Some(file), Some(path)) = (&self.file, &self.path) else {
            let mut entries = self.lock();
            let before = entries.len();
            let pending = pending_entries(&entries);
            *entries = pending;
            return Ok(before - entries.len());
        };

        let mut file = file.lock().await;
        let (before, pending) = {
            let entries = self.lock();
            (entries.len(), pending_entries(&entries))
        };
        if pending.len() == before {
            return Ok(0);
        }
        *file = rewrite(path, &pending).await?;
        let kept = pending.len();
        *self.lock() = pending;
        tracing::debug!(dropped = before - kept, kept, "journal compacted");
        Ok(before - kept)
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Addresses written or released more than `grace_secs` before `now`
    /// that no later entry committed or reclaimed.
    pub fn reclaim_candidates(&self, now: Timestamp, grace_secs: u64) -> Vec<ContentAddress> {
        let entries = self.lock();
        let (order, state) = blob_states(&entries);
        order
            .into_iter()
            .filter(|address| {
                matches!(
                    state.get(*address),
                    Some(BlobState::Pending { since, .. }) if since.is_older_than(grace_secs, now)
                )
            })
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<JournalEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SagaJournal {
    fn default() -> Self {
        Self::in_memory()
    }
}
