use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

use crate::io::recovery::{self, Incident, RecoveryEntry};

/// Error type for chart storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not encode chart {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

/// Key-value persistence for serialized chart trees.
///
/// One payload per chart id. Payloads are opaque JSON text to the store;
/// parsing them into steps is the caller's business.
pub trait ChartStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&mut self, key: &str, payload: &str) -> Result<(), StoreError>;
    /// Remove a chart. Returns whether it existed.
    fn remove(&mut self, key: &str) -> Result<bool, StoreError>;
    /// Chart ids in storage order
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Called when a stored payload could not be turned into a chart and is
    /// about to be replaced.
    fn report_corrupt(&mut self, _key: &str, _payload: &str, _reason: &str) {}
}

impl<T: ChartStore + ?Sized> ChartStore for &mut T {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, payload: &str) -> Result<(), StoreError> {
        (**self).save(key, payload)
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }

    fn report_corrupt(&mut self, key: &str, payload: &str, reason: &str) {
        (**self).report_corrupt(key, payload, reason)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Store backed by a map, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    charts: IndexMap<String, String>,
    /// Number of successful saves, across all keys
    pub saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chart(mut self, key: impl Into<String>, payload: impl Into<String>) -> Self {
        self.charts.insert(key.into(), payload.into());
        self
    }
}

impl ChartStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.charts.get(key).cloned())
    }

    fn save(&mut self, key: &str, payload: &str) -> Result<(), StoreError> {
        self.charts.insert(key.to_string(), payload.to_string());
        self.saves += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        Ok(self.charts.shift_remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.charts.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// Store backed by one JSON object per namespace: `<dir>/<namespace>.json`,
/// mapping chart id to chart tree. The whole file is rewritten atomically on
/// every save.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    path: PathBuf,
    charts: IndexMap<String, Value>,
}

impl JsonFileStore {
    /// Open the namespace file in `dir`.
    ///
    /// A missing file is an empty store. A file that is not a JSON object is
    /// backed up as `<file>.bak` and treated as empty.
    pub fn open(dir: &Path, namespace: &str) -> Result<Self, StoreError> {
        let path = dir.join(format!("{}.json", namespace));
        let charts = match fs::read_to_string(&path) {
            Ok(content) => parse_namespace(dir, &path, &content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => IndexMap::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        Ok(JsonFileStore {
            dir: dir.to_path_buf(),
            path,
            charts,
        })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&self.charts).map_err(|source| StoreError::Encode {
            key: String::new(),
            source,
        })?;
        if let Err(source) = recovery::atomic_write(&self.path, content.as_bytes()) {
            recovery::log_recovery(
                &self.dir,
                RecoveryEntry::now(Incident::FailedWrite, &self.path, &source, content),
            );
            return Err(StoreError::Write {
                path: self.path.clone(),
                source,
            });
        }
        Ok(())
    }
}

fn parse_namespace(dir: &Path, path: &Path, content: &str) -> IndexMap<String, Value> {
    match serde_json::from_str::<IndexMap<String, Value>>(content) {
        Ok(charts) => charts,
        Err(e) => {
            let bak = path.with_extension("json.bak");
            let _ = fs::copy(path, &bak);
            tracing::warn!(
                path = %path.display(),
                backup = %bak.display(),
                error = %e,
                "chart store is unreadable, starting empty"
            );
            recovery::log_recovery(
                dir,
                RecoveryEntry::now(Incident::UnreadableStore { backup: bak }, path, e, ""),
            );
            IndexMap::new()
        }
    }
}

impl ChartStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.charts.get(key).map(Value::to_string))
    }

    fn save(&mut self, key: &str, payload: &str) -> Result<(), StoreError> {
        let value: Value = serde_json::from_str(payload).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.charts.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        if self.charts.shift_remove(key).is_none() {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.charts.keys().cloned().collect())
    }

    fn report_corrupt(&mut self, key: &str, payload: &str, reason: &str) {
        let incident = Incident::UnreadableChart {
            chart: key.to_string(),
        };
        recovery::log_recovery(
            &self.dir,
            RecoveryEntry::now(incident, &self.path, reason, payload),
        );
    }
}
