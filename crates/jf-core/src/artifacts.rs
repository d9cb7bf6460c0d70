//! Per-project, per-window intermediate artifacts.
//!
//! Every window can persist its train/validation/test slices, its
//! predictions, and the final report. Writes are atomic (temp file then
//! rename) so a reader never sees a half-written artifact.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    TrainSlice,
    ValidSlice,
    TestSlice,
    Predictions,
    Report,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::TrainSlice => "train",
            ArtifactKind::ValidSlice => "valid",
            ArtifactKind::TestSlice => "test",
            ArtifactKind::Predictions => "predictions",
            ArtifactKind::Report => "report",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub project: String,
    pub kind: ArtifactKind,
    pub window: u64,
}

impl ArtifactKey {
    pub fn new(project: impl Into<String>, kind: ArtifactKind, window: u64) -> Self {
        Self {
            project: project.into(),
            kind,
            window,
        }
    }

    fn file_name(&self) -> String {
        format!("{}-{}.json", self.kind, self.window)
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode artifact {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ArtifactError> for jf_common::Error {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Io { path, source } => jf_common::Error::Io(std::io::Error::new(
                source.kind(),
                format!("{}: {}", path.display(), source),
            )),
            ArtifactError::Json { source, .. } => jf_common::Error::Json(source),
        }
    }
}

/// Durable key-value storage with read-after-write consistency.
pub trait ArtifactStore {
    fn put(&mut self, key: &ArtifactKey, value: &Value) -> Result<(), ArtifactError>;
    fn get(&self, key: &ArtifactKey) -> Result<Option<Value>, ArtifactError>;
}

/// Artifacts as JSON files under `<root>/<project>/<kind>-<window>.json`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(&key.project).join(key.file_name())
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(&mut self, key: &ArtifactKey, value: &Value) -> Result<(), ArtifactError> {
        let path = self.path_for(key);
        write_json_atomic(&path, value)?;
        tracing::debug!(
            target: crate::logging::event_names::ARTIFACT_WRITTEN,
            path = %path.display(),
            kind = %key.kind,
            window = key.window,
            "artifact written"
        );
        Ok(())
    }

    fn get(&self, key: &ArtifactKey) -> Result<Option<Value>, ArtifactError> {
        let path = self.path_for(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ArtifactError::Io { path, source: e }),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| ArtifactError::Json { path, source: e })
    }
}

/// Write `value` as pretty JSON, replacing `path` atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArtifactError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let content = serde_json::to_vec_pretty(value).map_err(|e| ArtifactError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact.json");
    let tmp_path = path.with_file_name(format!("{}.tmp.{}", file_name, std::process::id()));
    {
        use std::io::Write;
        let mut file = std::fs::File::create(&tmp_path).map_err(|e| ArtifactError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        file.write_all(&content).map_err(|e| ArtifactError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        let _ = file.sync_all();
    }
    std::fs::rename(&tmp_path, path).map_err(|e| ArtifactError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactStore {
    entries: HashMap<ArtifactKey, Value>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn put(&mut self, key: &ArtifactKey, value: &Value) -> Result<(), ArtifactError> {
        self.entries.insert(key.clone(), value.clone());
        Ok(())
    }

    fn get(&self, key: &ArtifactKey) -> Result<Option<Value>, ArtifactError> {
        Ok(self.entries.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn fs_store_read_after_write() {
        let dir = tempdir().unwrap();
        let mut store = FsArtifactStore::new(dir.path());
        let key = ArtifactKey::new("commons-lang", ArtifactKind::TestSlice, 3);

        assert_eq!(store.get(&key).unwrap(), None);
        store.put(&key, &json!({"n": 1})).unwrap();
        store.put(&key, &json!({"n": 2})).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(json!({"n": 2})));

        let path = store.path_for(&key);
        assert!(path.ends_with("commons-lang/test-3.json"));
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn corrupt_artifact_is_an_error() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let key = ArtifactKey::new("p", ArtifactKind::Report, 0);
        let path = store.path_for(&key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(store.get(&key), Err(ArtifactError::Json { .. })));
    }

    #[test]
    fn memory_store_overwrites() {
        let mut store = MemoryArtifactStore::new();
        let key = ArtifactKey::new("p", ArtifactKind::Predictions, 1);
        store.put(&key, &json!([1])).unwrap();
        store.put(&key, &json!([2])).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key).unwrap(), Some(json!([2])));
    }
}
