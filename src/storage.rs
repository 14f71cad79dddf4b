use crate::model::NoteRecord;
use directories::ProjectDirs;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const NOTES_FILE: &str = "notes.json";

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serializing notes: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("could not locate a data directory")]
    NoDataDir,
    #[error("save task did not complete: {0}")]
    TaskJoin(String),
}

/// Where notes live between sessions.
///
/// `load` is best effort and never fails; `save` replaces the whole stored
/// collection and reports failures.
pub trait NoteStore: Send + Sync {
    fn load(&self) -> Vec<NoteRecord>;
    fn save(&self, notes: &[NoteRecord]) -> Result<(), StorageError>;
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn default_location() -> Result<PathBuf, StorageError> {
        let dirs = ProjectDirs::from("", "", "stickies").ok_or(StorageError::NoDataDir)?;
        Ok(dirs.data_dir().join(NOTES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, path: &Path, source: io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl NoteStore for JsonFileStore {
    fn load(&self) -> Vec<NoteRecord> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "no notes file yet");
            return Vec::new();
        }
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "reading notes file");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<NoteRecord>>(&data) {
            Ok(notes) => {
                tracing::debug!(count = notes.len(), "loaded notes");
                notes
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "parsing notes file");
                Vec::new()
            }
        }
    }

    fn save(&self, notes: &[NoteRecord]) -> Result<(), StorageError> {
        let serialized = serde_json::to_string_pretty(notes)?;
        // A poisoned lock only means an earlier writer panicked mid-save; the
        // rename below keeps the file itself whole, so carry on.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(parent, e))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized).map_err(|e| self.io_err(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(&self.path, e))?;
        tracing::debug!(count = notes.len(), path = %self.path.display(), "saved notes");
        Ok(())
    }
}

/// Keeps notes in memory and remembers every snapshot it was asked to save.
#[derive(Debug, Default)]
pub struct MemoryStore {
    initial: Vec<NoteRecord>,
    saves: Mutex<Vec<Vec<NoteRecord>>>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new(initial: Vec<NoteRecord>) -> Self {
        MemoryStore {
            initial,
            ..Default::default()
        }
    }

    /// A store whose every save fails, for exercising error paths.
    pub fn failing() -> Self {
        MemoryStore {
            fail_saves: true,
            ..Default::default()
        }
    }

    pub fn saves(&self) -> Vec<Vec<NoteRecord>> {
        self.saves
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn last_saved(&self) -> Option<Vec<NoteRecord>> {
        self.saves.lock().ok().and_then(|s| s.last().cloned())
    }
}

impl NoteStore for MemoryStore {
    fn load(&self) -> Vec<NoteRecord> {
        self.last_saved().unwrap_or_else(|| self.initial.clone())
    }

    fn save(&self, notes: &[NoteRecord]) -> Result<(), StorageError> {
        if self.fail_saves {
            return Err(StorageError::Io {
                path: PathBuf::from("<memory>"),
                source: io::Error::new(io::ErrorKind::Other, "store configured to fail"),
            });
        }
        if let Ok(mut saves) = self.saves.lock() {
            saves.push(notes.to_vec());
        }
        Ok(())
    }
}
