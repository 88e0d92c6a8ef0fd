//! Persistence for the set of movie ids the user has marked as seen.
//!
//! Saves replace the stored set wholesale. There is no locking: a single
//! interactive writer is assumed and concurrent writers may lose updates.
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::{RecommendError, RecommendResult};
use crate::tmdb::parse_tmdb_id;

pub type SeenSet = BTreeSet<i32>;

#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Reads the persisted set, creating an empty one if none exists yet.
    async fn load(&self) -> RecommendResult<SeenSet>;
    /// Replaces the persisted set with `ids`.
    async fn save(&self, ids: &SeenSet) -> RecommendResult<()>;
}

/// Keeps ids that are plain non-negative integers and drops everything else.
pub fn parse_submission<S: AsRef<str>>(raw: &[S]) -> SeenSet {
    raw.iter().filter_map(|s| parse_tmdb_id(s.as_ref())).collect()
}

/// Stores the set as a JSON array of integers in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileSeenStore {
    path: PathBuf,
}

impl JsonFileSeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, action: &str, err: impl std::fmt::Display) -> RecommendError {
        RecommendError::Persistence(format!("{} {}: {}", action, self.path.display(), err))
    }
}

#[async_trait]
impl SeenStore for JsonFileSeenStore {
    async fn load(&self) -> RecommendResult<SeenSet> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No seen-set file at {}, creating an empty one", self.path.display());
                let empty = SeenSet::new();
                self.save(&empty).await?;
                return Ok(empty);
            }
            Err(e) => return Err(self.persistence_error("reading", e)),
        };
        let ids: Vec<i32> =
            serde_json::from_slice(&bytes).map_err(|e| self.persistence_error("parsing", e))?;
        debug!(count = ids.len(), "Loaded seen set");
        Ok(ids.into_iter().collect())
    }

    async fn save(&self, ids: &SeenSet) -> RecommendResult<()> {
        let body = serde_json::to_vec(&ids.iter().collect::<Vec<_>>())
            .map_err(|e| self.persistence_error("encoding", e))?;
        // Write a sibling file first so readers never observe a partial array.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| self.persistence_error("writing", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.persistence_error("replacing", e))?;
        debug!(count = ids.len(), "Saved seen set");
        Ok(())
    }
}

/// In-process store, used by tests and tooling.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    ids: Mutex<Option<SeenSet>>,
}

impl MemorySeenStore {
    pub fn with_ids(ids: impl IntoIterator<Item = i32>) -> Self {
        Self {
            ids: Mutex::new(Some(ids.into_iter().collect())),
        }
    }

    /// The stored set, or `None` if nothing has been persisted yet.
    pub fn snapshot(&self) -> Option<SeenSet> {
        self.ids.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait]
impl SeenStore for MemorySeenStore {
    async fn load(&self) -> RecommendResult<SeenSet> {
        let mut guard = self
            .ids
            .lock()
            .map_err(|e| RecommendError::Persistence(e.to_string()))?;
        Ok(guard.get_or_insert_with(SeenSet::new).clone())
    }

    async fn save(&self, ids: &SeenSet) -> RecommendResult<()> {
        let mut guard = self
            .ids
            .lock()
            .map_err(|e| RecommendError::Persistence(e.to_string()))?;
        *guard = Some(ids.clone());
        Ok(())
    }
}
