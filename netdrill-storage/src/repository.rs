//! Durable mirrors of experiment state

use crate::error::{StorageError, StorageResult};
use crate::state::ExperimentState;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Persistence for experiment records, keyed by name
#[async_trait]
pub trait ExperimentRepository: Send + Sync {
    /// Insert or replace the record
    async fn save(&self, state: &ExperimentState) -> StorageResult<()>;

    async fn load(&self, name: &str) -> StorageResult<Option<ExperimentState>>;

    async fn name_is_unique(&self, name: &str) -> StorageResult<bool> {
        Ok(self.load(name).await?.is_none())
    }
}

/// Repository keeping records in process memory
#[derive(Debug, Default)]
pub struct InMemoryExperimentRepository {
    records: Mutex<HashMap<String, ExperimentState>>,
}

impl InMemoryExperimentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl ExperimentRepository for InMemoryExperimentRepository {
    async fn save(&self, state: &ExperimentState) -> StorageResult<()> {
        self.records.lock().insert(state.name.clone(), state.clone());
        Ok(())
    }

    async fn load(&self, name: &str) -> StorageResult<Option<ExperimentState>> {
        Ok(self.records.lock().get(name).cloned())
    }
}

/// Repository writing one JSON document per experiment into a directory
#[derive(Debug, Clone)]
pub struct FileExperimentRepository {
    base_path: PathBuf,
}

impl FileExperimentRepository {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn record_path(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.base_path.join(format!("{}.json", name)))
    }
}

#[async_trait]
impl ExperimentRepository for FileExperimentRepository {
    async fn save(&self, state: &ExperimentState) -> StorageResult<()> {
        let path = self.record_path(&state.name)?;
        fs::create_dir_all(&self.base_path).await?;

        // Replace atomically so readers never see a torn document
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?).await?;
        fs::rename(&tmp, &path).await?;
        debug!("Saved experiment {} to {}", state.name, path.display());
        Ok(())
    }

    async fn load(&self, name: &str) -> StorageResult<Option<ExperimentState>> {
        let path = self.record_path(name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ExperimentStatus;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_in_memory_save_and_load() {
        let repo = InMemoryExperimentRepository::new();
        assert!(repo.name_is_unique("exp-1").await.unwrap());

        let state = ExperimentState::new("exp-1", json!({}));
        repo.save(&state).await.unwrap();

        assert!(!repo.name_is_unique("exp-1").await.unwrap());
        assert_eq!(repo.load("exp-1").await.unwrap(), Some(state));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_file_repository_overwrites() {
        let dir = TempDir::new().unwrap();
        let repo = FileExperimentRepository::new(dir.path().join("state"));

        let mut state = ExperimentState::new("exp-2", json!({"rounds": 1}));
        repo.save(&state).await.unwrap();
        state.status = ExperimentStatus::Running;
        state.logs.push("Performing step discovery (0)".to_string());
        repo.save(&state).await.unwrap();

        let loaded = repo.load("exp-2").await.unwrap().unwrap();
        assert_eq!(loaded.status, ExperimentStatus::Running);
        assert_eq!(loaded.logs.len(), 1);
        assert!(repo.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_repository_rejects_path_names() {
        let dir = TempDir::new().unwrap();
        let repo = FileExperimentRepository::new(dir.path());
        let state = ExperimentState::new("../escape", json!({}));
        assert!(matches!(
            repo.save(&state).await,
            Err(StorageError::InvalidName(_))
        ));
    }
}
