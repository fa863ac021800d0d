//! Seen-set deduplication and its crash snapshot
//!
//! [`SeenSet`] is owned by the orchestrator and cloned into every worker. A worker claims a
//! fingerprint before its first fetch attempt; the claim is an atomic check-and-insert, so
//! two workers holding the same URL cannot both fetch it.
//!
//! Claimed fingerprints also sit in an in-flight set until the attempt loop ends. The
//! snapshot written on fatal failure is `seen - in_flight`: a task interrupted mid-fetch is
//! attempted again by the next run, while tasks that finished (downloaded or abandoned)
//! are not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::TaskFingerprint;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Default)]
struct SeenState {
    seen: HashSet<TaskFingerprint>,
    in_flight: HashSet<TaskFingerprint>,
}

/// Thread-safe set of fingerprints already handled (cloneable, all clones share state)
#[derive(Clone, Debug, Default)]
pub struct SeenSet {
    inner: Arc<Mutex<SeenState>>,
}

/// On-disk form of a [`SeenSet`]
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    created_at: DateTime<Utc>,
    fingerprints: Vec<TaskFingerprint>,
}

impl SeenSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set pre-populated with fingerprints from an earlier run
    pub fn with_fingerprints(fingerprints: impl IntoIterator<Item = TaskFingerprint>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SeenState {
                seen: fingerprints.into_iter().collect(),
                in_flight: HashSet::new(),
            })),
        }
    }

    /// True if the fingerprint was already claimed
    pub async fn contains(&self, fingerprint: &TaskFingerprint) -> bool {
        self.inner.lock().await.seen.contains(fingerprint)
    }

    /// Insert without marking in-flight
    pub async fn insert(&self, fingerprint: TaskFingerprint) -> bool {
        self.inner.lock().await.seen.insert(fingerprint)
    }

    /// Atomically claim a fingerprint for an attempt. Returns false if it was already seen.
    pub async fn claim(&self, fingerprint: &TaskFingerprint) -> bool {
        let mut state = self.inner.lock().await;
        if !state.seen.insert(fingerprint.clone()) {
            return false;
        }
        state.in_flight.insert(fingerprint.clone());
        true
    }

    /// End the attempt window of a claimed fingerprint. It stays seen.
    pub async fn settle(&self, fingerprint: &TaskFingerprint) {
        self.inner.lock().await.in_flight.remove(fingerprint);
    }

    /// Number of fingerprints seen
    pub async fn len(&self) -> usize {
        self.inner.lock().await.seen.len()
    }

    /// True if nothing has been seen
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.seen.is_empty()
    }

    /// Fingerprints whose attempts have finished, sorted
    pub async fn settled(&self) -> Vec<TaskFingerprint> {
        let state = self.inner.lock().await;
        let mut out: Vec<_> = state.seen.difference(&state.in_flight).cloned().collect();
        out.sort();
        out
    }

    /// Restore a set from `path`. A missing file yields an empty set.
    pub async fn restore(path: &Path) -> Result<Self> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No snapshot found, starting empty");
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(Error::Snapshot {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        let snapshot: Snapshot = serde_json::from_slice(&raw).map_err(|e| Error::Snapshot {
            path: path.to_path_buf(),
            reason: format!("corrupt snapshot: {e}"),
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Snapshot {
                path: path.to_path_buf(),
                reason: format!("unsupported snapshot version {}", snapshot.version),
            });
        }

        tracing::info!(
            path = %path.display(),
            fingerprints = snapshot.fingerprints.len(),
            created_at = %snapshot.created_at,
            "Restored seen set from snapshot"
        );
        Ok(Self::with_fingerprints(snapshot.fingerprints))
    }

    /// Write the settled fingerprints to `path` (temp file + rename)
    pub async fn persist(&self, path: &Path) -> Result<usize> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            fingerprints: self.settled().await,
        };
        let count = snapshot.fingerprints.len();
        let body = serde_json::to_vec(&snapshot)?;

        let snapshot_error = |e: std::io::Error| Error::Snapshot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(snapshot_error)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, body).await.map_err(snapshot_error)?;
        tokio::fs::rename(&tmp, path).await.map_err(snapshot_error)?;

        tracing::info!(path = %path.display(), fingerprints = count, "Snapshot written");
        Ok(count)
    }
}
