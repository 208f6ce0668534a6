// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Durable key/value storage
//
// Every persisting component receives a backend at construction time.
// Keys are relative, '/'-separated paths such as "cookies/example.com.json".

use crate::types::SessionError;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

const TMP_SUFFIX: &str = ".tmp";

/// Durable storage used by the cookie jar, snapshot store and settings store
pub trait StorageBackend: Send + Sync {
    /// Read a whole entry; `Ok(None)` if it does not exist
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError>;

    /// Replace an entry in a single write
    fn write(&self, key: &str, data: &[u8]) -> Result<(), SessionError>;

    /// Remove an entry; removing a missing entry succeeds
    fn remove(&self, key: &str) -> Result<(), SessionError>;

    /// Keys of all entries directly under `namespace`
    fn list(&self, namespace: &str) -> Result<Vec<String>, SessionError>;
}

fn check_key(key: &str) -> Result<(), SessionError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && key.split('/').all(|part| !part.is_empty() && part != "." && part != "..");

    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidConfig(format!(
            "Invalid storage key: {:?}",
            key
        )))
    }
}

/// Files under a single root directory
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Use `root`, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| SessionError::FileIo(format!("Failed to create data dir: {}", e)))?;

        Ok(Self { root })
    }

    /// The platform data directory for this application
    pub fn default_location() -> Result<Self, SessionError> {
        let data_dir = directories::ProjectDirs::from("net", "artsy", "session")
            .ok_or_else(|| {
                SessionError::FileIo("Could not determine data directory".to_string())
            })?
            .data_dir()
            .to_path_buf();

        tracing::info!("Session data directory: {:?}", data_dir);
        Self::new(data_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SessionError> {
        check_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, part| path.join(part)))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::FileIo(format!(
                "Failed to read {}: {}",
                key, e
            ))),
        }
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), SessionError> {
        let path = self.path_for(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)
            .map_err(|e| SessionError::FileIo(format!("Failed to create {:?}: {}", parent, e)))?;

        // Each writer gets its own temp file beside the target, then renames
        // it over the entry so readers never see a partial write
        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(TMP_SUFFIX)
            .tempfile_in(parent)
            .map_err(|e| SessionError::FileIo(format!("Failed to stage {}: {}", key, e)))?;
        tmp.write_all(data)
            .map_err(|e| SessionError::FileIo(format!("Failed to write {}: {}", key, e)))?;
        tmp.persist(&path)
            .map_err(|e| SessionError::FileIo(format!("Failed to replace {}: {}", key, e.error)))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::FileIo(format!(
                "Failed to remove {}: {}",
                key, e
            ))),
        }
    }

    fn list(&self, namespace: &str) -> Result<Vec<String>, SessionError> {
        let dir = self.path_for(namespace)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SessionError::FileIo(format!(
                    "Failed to list {}: {}",
                    namespace, e
                )))
            }
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(TMP_SUFFIX) {
                continue;
            }
            keys.push(format!("{}/{}", namespace, name));
        }
        keys.sort();

        Ok(keys)
    }
}

/// Process-local storage, lost on exit
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        check_key(key)?;
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), SessionError> {
        check_key(key)?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        check_key(key)?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn list(&self, namespace: &str) -> Result<Vec<String>, SessionError> {
        check_key(namespace)?;
        let prefix = format!("{}/", namespace);
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|key| key.starts_with(&prefix) && !key[prefix.len()..].contains('/'))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        assert_eq!(storage.read("user_data.json").unwrap(), None);
        storage.write("user_data.json", b"{}").unwrap();
        assert_eq!(storage.read("user_data.json").unwrap(), Some(b"{}".to_vec()));

        storage.remove("user_data.json").unwrap();
        storage.remove("user_data.json").unwrap();
        assert_eq!(storage.read("user_data.json").unwrap(), None);
    }

    #[test]
    fn test_file_storage_lists_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        assert!(storage.list("cookies").unwrap().is_empty());
        storage.write("cookies/b.json", b"[]").unwrap();
        storage.write("cookies/a.json", b"[]").unwrap();
        storage.write("settings.json", b"{}").unwrap();

        assert_eq!(
            storage.list("cookies").unwrap(),
            vec!["cookies/a.json".to_string(), "cookies/b.json".to_string()]
        );
    }

    #[test]
    fn test_concurrent_writers_of_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        std::thread::scope(|scope| {
            for writer in 0..8 {
                let storage = &storage;
                scope.spawn(move || {
                    for round in 0..20 {
                        let data = format!("{}-{}", writer, round);
                        storage.write("cookies/shared.json", data.as_bytes()).unwrap();
                    }
                });
            }
        });

        let data = storage.read("cookies/shared.json").unwrap().unwrap();
        assert!(String::from_utf8(data).unwrap().ends_with("-19"));
        assert_eq!(
            storage.list("cookies").unwrap(),
            vec!["cookies/shared.json".to_string()]
        );
    }

    #[test]
    fn test_keys_cannot_escape_root() {
        let storage = MemoryStorage::new();
        assert!(storage.write("../outside", b"x").is_err());
        assert!(storage.write("/abs", b"x").is_err());
        assert!(storage.write("cookies//x", b"x").is_err());
    }

    #[test]
    fn test_memory_storage_list_is_shallow() {
        let storage = MemoryStorage::new();
        storage.write("cookies/a.json", b"1").unwrap();
        storage.write("cookies/nested/b.json", b"2").unwrap();
        storage.write("cookiesx/c.json", b"3").unwrap();

        assert_eq!(storage.list("cookies").unwrap(), vec!["cookies/a.json".to_string()]);
        assert_eq!(storage.len(), 3);
    }
}
