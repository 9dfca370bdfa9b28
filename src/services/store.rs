// src/services/store.rs
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{Period, Snapshot, SnapshotKey};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Snapshots keyed by (ticker, year, month), at most one per key.
/// When opened on a file, every write rewrites the whole file.
pub struct SnapshotStore {
    path: Option<PathBuf>,
    snapshots: RwLock<BTreeMap<SnapshotKey, Snapshot>>,
}

impl SnapshotStore {
    pub fn in_memory() -> Self {
        SnapshotStore {
            path: None,
            snapshots: RwLock::new(BTreeMap::new()),
        }
    }

    /// Loads `path` if it exists; a missing file starts an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshots = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<Snapshot> =
                    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
                        path: path.clone(),
                        source,
                    })?;
                list.into_iter().map(|s| (s.key.clone(), s)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        info!("Loaded {} snapshots from {}", snapshots.len(), path.display());

        Ok(SnapshotStore {
            path: Some(path),
            snapshots: RwLock::new(snapshots),
        })
    }

    pub async fn get(&self, key: &SnapshotKey) -> Option<Snapshot> {
        self.snapshots.read().await.get(key).cloned()
    }

    /// Most recent snapshot for `ticker`, by year then month.
    pub async fn latest(&self, ticker: &str) -> Option<Snapshot> {
        let snapshots = self.snapshots.read().await;
        snapshots
            .range(ticker_range(ticker))
            .next_back()
            .map(|(_, s)| s.clone())
    }

    /// Stored periods for `ticker`, newest first.
    pub async fn periods(&self, ticker: &str) -> Vec<Period> {
        let snapshots = self.snapshots.read().await;
        snapshots
            .range(ticker_range(ticker))
            .rev()
            .map(|(key, _)| key.period())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Last write wins. Returns true when an existing snapshot was replaced.
    pub async fn upsert(&self, snapshot: Snapshot) -> Result<bool, StoreError> {
        let replaced = self.upsert_all(vec![snapshot]).await?;
        Ok(replaced == 1)
    }

    /// Inserts a batch and persists once. Returns how many keys already existed.
    /// The live map only changes after the file write succeeds.
    pub async fn upsert_all(&self, batch: Vec<Snapshot>) -> Result<usize, StoreError> {
        let mut snapshots = self.snapshots.write().await;
        let mut staged = snapshots.clone();
        let mut replaced = 0;
        for snapshot in batch {
            debug!("Upserting snapshot {}", snapshot.key);
            if staged.insert(snapshot.key.clone(), snapshot).is_some() {
                replaced += 1;
            }
        }
        if let Some(path) = &self.path {
            persist(path, &staged).await?;
        }
        *snapshots = staged;
        Ok(replaced)
    }
}

fn ticker_range(ticker: &str) -> std::ops::RangeInclusive<SnapshotKey> {
    SnapshotKey::new(ticker, i32::MIN, 0)..=SnapshotKey::new(ticker, i32::MAX, u32::MAX)
}

async fn persist(
    path: &Path,
    snapshots: &BTreeMap<SnapshotKey, Snapshot>,
) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let list: Vec<&Snapshot> = snapshots.values().collect();
    let bytes = serde_json::to_vec_pretty(&list).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    debug!("Persisted {} snapshots to {}", list.len(), path.display());
    Ok(())
}
