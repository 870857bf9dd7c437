//! Flat key/value persistence for the whole document.

use std::collections::HashMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use quire_core::Document;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_CONTENT_KEY: &str = "content";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid store key: {0:?}")]
    InvalidKey(String),
}

/// A string-to-string store with last-write-wins semantics.
pub trait FlatStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlatStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One file per key under `dir`, named `<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Deletes the entry for `key`; a missing entry is not an error.
    pub fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl FlatStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes through a sibling `.tmp` file and renames it into place.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Reads the document stored under `key`. A missing, empty or unparseable
/// entry yields the single empty paragraph.
pub fn load<S: FlatStore + ?Sized>(store: &S, key: &str) -> Document {
    match try_load(store, key) {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            debug!(key, "no stored document, starting empty");
            Document::empty_paragraph()
        }
        Err(err) => {
            warn!(key, "failed to load stored document: {err}");
            Document::empty_paragraph()
        }
    }
}

fn try_load<S: FlatStore + ?Sized>(store: &S, key: &str) -> Result<Option<Document>, StoreError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    let doc = Document::from_json_str(&raw)?;
    Ok((!doc.children.is_empty()).then_some(doc))
}

/// Serializes the whole document under `key`.
pub fn save<S: FlatStore + ?Sized>(store: &mut S, key: &str, doc: &Document) -> Result<(), StoreError> {
    let json = doc.to_json_string()?;
    store.set(key, &json)?;
    debug!(key, bytes = json.len(), "saved document");
    Ok(())
}
