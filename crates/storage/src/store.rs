use crate::error::StorageError;
use crate::records::ExchangeRecord;
use core_types::ExchangeSnapshot;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Provides the complete set of exchange snapshots for one run.
pub trait SnapshotSource {
    /// Loads every well-formed snapshot. Malformed entries are left out.
    fn load_all(&self) -> Result<Vec<ExchangeSnapshot>, StorageError>;
}

/// Writes mutated snapshots back, replacing the stored state entirely.
pub trait SnapshotSink {
    fn persist(&self, snapshot: &ExchangeSnapshot) -> Result<(), StorageError>;

    /// Persists each snapshot in turn, stopping at the first failure.
    fn persist_all(&self, snapshots: &[&ExchangeSnapshot]) -> Result<usize, StorageError> {
        for snapshot in snapshots {
            self.persist(snapshot)?;
        }
        Ok(snapshots.len())
    }
}

/// Stores one JSON document per exchange in a directory.
///
/// A loaded exchange is written back to the file it came from, whatever that
/// file is called. Exchanges the store has not loaded go to `<exchange id>.json`.
#[derive(Debug)]
pub struct JsonDirectoryStore {
    dir: PathBuf,
    pretty: bool,
    sources: Mutex<HashMap<String, PathBuf>>,
}

impl JsonDirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pretty: true,
            sources: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file a new exchange `id` is written to.
    pub fn path_for(&self, id: &str) -> Result<PathBuf, StorageError> {
        let usable = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\'])
            && !id.contains('\0');
        if !usable {
            return Err(StorageError::InvalidExchangeId(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    /// The file exchange `id` is persisted to: its source file when it was
    /// loaded by this store, `<id>.json` otherwise.
    pub fn target_for(&self, id: &str) -> Result<PathBuf, StorageError> {
        let sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
        match sources.get(id) {
            Some(path) => Ok(path.clone()),
            None => self.path_for(id),
        }
    }

    fn read_snapshot(path: &Path) -> Result<ExchangeSnapshot, StorageError> {
        let content = fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let record: ExchangeRecord =
            serde_json::from_str(&content).map_err(|source| StorageError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(record.into_snapshot())
    }

    fn json_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| StorageError::Io {
                    path: self.dir.clone(),
                    source,
                })?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl SnapshotSource for JsonDirectoryStore {
    fn load_all(&self) -> Result<Vec<ExchangeSnapshot>, StorageError> {
        if !self.dir.is_dir() {
            return Err(StorageError::MissingDirectory(self.dir.clone()));
        }

        let mut snapshots: Vec<ExchangeSnapshot> = Vec::new();
        let mut sources = HashMap::new();
        for path in self.json_files()? {
            let snapshot = match Self::read_snapshot(&path) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable exchange file");
                    continue;
                }
            };
            if let Err(e) = snapshot.validate() {
                tracing::warn!(path = %path.display(), error = %e, "skipping invalid exchange snapshot");
                continue;
            }
            if snapshots.iter().any(|s| s.id == snapshot.id) {
                tracing::warn!(path = %path.display(), exchange = %snapshot.id, "skipping duplicate exchange id");
                continue;
            }
            tracing::debug!(
                path = %path.display(),
                exchange = %snapshot.id,
                bids = snapshot.bids.len(),
                asks = snapshot.asks.len(),
                "loaded exchange snapshot"
            );
            sources.insert(snapshot.id.clone(), path);
            snapshots.push(snapshot);
        }
        *self.sources.lock().unwrap_or_else(PoisonError::into_inner) = sources;

        tracing::info!(dir = %self.dir.display(), count = snapshots.len(), "loaded exchanges");
        Ok(snapshots)
    }
}

impl SnapshotSink for JsonDirectoryStore {
    /// Writes the snapshot to a temporary file, syncs it and renames it over
    /// the previous version, so readers never observe a half-written file.
    fn persist(&self, snapshot: &ExchangeSnapshot) -> Result<(), StorageError> {
        let path = self.target_for(&snapshot.id)?;
        let record = ExchangeRecord::from(snapshot);
        let body = if self.pretty {
            serde_json::to_vec_pretty(&record)
        } else {
            serde_json::to_vec(&record)
        }
        .map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StorageError::Io {
            path: tmp.clone(),
            source,
        };
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&body).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp, &path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), exchange = %snapshot.id, "persisted exchange snapshot");
        Ok(())
    }
}
