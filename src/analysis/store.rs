use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::StoreError;

/// Persistence collaborator: one JSON blob per `(analysis_id, stage)`.
/// Writing the same key again replaces the previous blob.
pub trait AnalysisStore: Send + Sync {
    fn upsert(&self, analysis_id: &str, stage: &str, payload: &serde_json::Value) -> Result<(), StoreError>;
}

pub fn store_key(analysis_id: &str, stage: &str) -> String {
    format!("{analysis_id}_{stage}")
}

/// Blobs kept in memory, for tests and dry runs.
#[derive(Default)]
pub struct InMemoryStore {
    blobs: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, analysis_id: &str, stage: &str) -> Option<serde_json::Value> {
        self.blobs
            .lock()
            .ok()
            .and_then(|b| b.get(&store_key(analysis_id, stage)).cloned())
    }

    pub fn keys(&self) -> Vec<String> {
        self.blobs
            .lock()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl AnalysisStore for InMemoryStore {
    fn upsert(&self, analysis_id: &str, stage: &str, payload: &serde_json::Value) -> Result<(), StoreError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
        blobs.insert(store_key(analysis_id, stage), payload.clone());
        Ok(())
    }
}

/// `<analysis_id>_<stage>.json` files under one directory. Each write goes
/// to a temp file in the same directory and is renamed into place.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, analysis_id: &str, stage: &str) -> PathBuf {
        let name: String = store_key(analysis_id, stage)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl AnalysisStore for JsonFileStore {
    fn upsert(&self, analysis_id: &str, stage: &str, payload: &serde_json::Value) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(analysis_id, stage);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(payload)?)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| StoreError::Persist {
            path: path.display().to_string(),
            message: e.error.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "Analysis blob written");
        Ok(())
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Rejects every write.
    pub struct FailingStore;

    impl AnalysisStore for FailingStore {
        fn upsert(&self, _analysis_id: &str, _stage: &str, _payload: &serde_json::Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk full".into()))
        }
    }
}
