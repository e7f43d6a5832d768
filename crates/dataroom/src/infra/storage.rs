//! Key-value slot storage backing the persisted tree.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

const SLOT_EXTENSION: &str = "json";

/// Errors surfaced by a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded writing `{key}`: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        key: String,
        needed: u64,
        quota: u64,
    },
    #[error("storage i/o failed for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// A string-valued slot store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Stores each slot as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota: None,
        }
    }

    /// Limit the combined size of all slots, in bytes.
    pub fn with_quota(mut self, bytes: Option<u64>) -> Self {
        self.quota = bytes.filter(|bytes| *bytes > 0);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the slot file for `key`.
    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{SLOT_EXTENSION}", sanitize_key(key)))
    }

    fn used_by_others(&self, key: &str) -> u64 {
        let own = self.slot_path(key);
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        entries
            .filter_map(Result::ok)
            .filter(|entry| {
                let path = entry.path();
                path != own && path.extension().is_some_and(|ext| ext == SLOT_EXTENSION)
            })
            .filter_map(|entry| entry.metadata().ok())
            .map(|meta| meta.len())
            .sum()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let needed = self.used_by_others(key) + value.len() as u64;
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_owned(),
                    needed,
                    quota,
                });
            }
        }

        let io_err = |source| StorageError::Io {
            key: key.to_owned(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        staged.write_all(value.as_bytes()).map_err(io_err)?;
        staged.flush().map_err(io_err)?;
        staged
            .persist(self.slot_path(key))
            .map_err(|err| io_err(err.error))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }
}

/// In-memory slots, mainly for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
    quota: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(mut self, bytes: Option<u64>) -> Self {
        self.quota = bytes.filter(|bytes| *bytes > 0);
        self
    }

    /// Seed a slot directly, bypassing the quota.
    pub fn with_slot(mut self, key: &str, value: impl Into<String>) -> Self {
        self.slots.insert(key.to_owned(), value.into());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let others: u64 = self
                .slots
                .iter()
                .filter(|(slot, _)| slot.as_str() != key)
                .map(|(_, value)| value.len() as u64)
                .sum();
            let needed = others + value.len() as u64;
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_owned(),
                    needed,
                    quota,
                });
            }
        }
        self.slots.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.slots.remove(key);
        Ok(())
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
