//! Key-value persistence for tracker records.
//!
//! Records are opaque JSON strings addressed by key. The file-backed store keeps
//! one `<key>.json` file per record in the data directory and replaces files
//! atomically (temp file + rename). Structure validation is the caller's job.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Key of the task collection record.
pub const TASKS_KEY: &str = "tasks";
/// Key of the category to subcategory map record.
pub const SUBCATEGORIES_KEY: &str = "subcategories";

/// A synchronous string-valued key-value store.
pub trait KeyValueStore {
    /// Read a record. `Ok(None)` means the key has never been written.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace a record.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Read and deserialise a record, or `None` if it does not exist.
pub fn load_record<T, S>(store: &S, key: &str) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.read(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Parse { key: key.to_string(), source }),
        None => Ok(None),
    }
}

/// Serialise and write a record.
pub fn save_record<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let data = serde_json::to_string_pretty(value)
        .map_err(|source| StorageError::Serialize { key: key.to_string(), source })?;
    store.write(key, &data)
}

/// Directory of JSON files, one per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(FileStore { dir: dir.to_path_buf() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Paths of every record file that currently exists.
    pub fn record_files(&self) -> Vec<PathBuf> {
        [TASKS_KEY, SUBCATEGORIES_KEY]
            .iter()
            .map(|k| self.path_for(k))
            .filter(|p| p.exists())
            .collect()
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(buf) if buf.trim().is_empty() => Ok(None),
            Ok(buf) => Ok(Some(buf)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { key: key.to_string(), path, source }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StorageError::Io { key: key.to_string(), path: path.clone(), source };

        let mut f = File::create(&tmp).map_err(io_err)?;
        f.write_all(value.as_bytes()).map_err(io_err)?;
        f.flush().map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        tracing::debug!(key, path = %path.display(), bytes = value.len(), "record written");
        Ok(())
    }
}
