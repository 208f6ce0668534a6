// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - User snapshot persistence
//
// The last known user is stored as a small JSON file so the UI can show
// a logged-in state before the server has confirmed the session.
// The snapshot is never treated as proof of a valid session.

use crate::storage::StorageBackend;
use crate::types::{is_blank_url, SessionError, User};
use std::sync::Arc;

/// Fixed entry name of the snapshot
const SNAPSHOT_KEY: &str = "user_data.json";

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile {
    id: String,
    full_name: String,
    email: String,
    /// Empty string when the user has no avatar
    #[serde(default)]
    profile_image_url: Option<String>,
}

impl From<&User> for SnapshotFile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            profile_image_url: Some(user.avatar_url.clone().unwrap_or_default()),
        }
    }
}

impl From<SnapshotFile> for User {
    fn from(file: SnapshotFile) -> Self {
        Self {
            id: file.id,
            full_name: file.full_name,
            email: file.email,
            avatar_url: file.profile_image_url.filter(|url| !is_blank_url(url)),
        }
    }
}

/// Best-effort durable copy of the current user
pub struct SessionSnapshotStore {
    storage: Arc<dyn StorageBackend>,
}

impl SessionSnapshotStore {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Write the snapshot; failures are logged
    pub fn save(&self, user: &User) {
        if let Err(e) = self.try_save(user) {
            tracing::error!("Failed to save user snapshot: {}", e);
        }
    }

    fn try_save(&self, user: &User) -> Result<(), SessionError> {
        let content = serde_json::to_vec(&SnapshotFile::from(user))
            .map_err(|e| SessionError::Serialization(format!("Failed to serialize user: {}", e)))?;
        self.storage.write(SNAPSHOT_KEY, &content)?;
        tracing::debug!("Saved user snapshot for {}", user.email);
        Ok(())
    }

    /// The saved user, or `None` if missing or unreadable
    pub fn load(&self) -> Option<User> {
        let content = match self.storage.read(SNAPSHOT_KEY) {
            Ok(Some(content)) => content,
            Ok(None) => {
                tracing::debug!("No saved user snapshot found");
                return None;
            }
            Err(e) => {
                tracing::error!("Failed to read user snapshot: {}", e);
                return None;
            }
        };

        match serde_json::from_slice::<SnapshotFile>(&content) {
            Ok(file) => Some(file.into()),
            Err(e) => {
                tracing::warn!("Failed to parse user snapshot, ignoring: {}", e);
                None
            }
        }
    }

    /// Delete the snapshot; a missing snapshot is fine
    pub fn clear(&self) {
        match self.storage.remove(SNAPSHOT_KEY) {
            Ok(()) => tracing::debug!("Cleared user snapshot"),
            Err(e) => tracing::error!("Failed to clear user snapshot: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    fn store() -> (Arc<MemoryStorage>, SessionSnapshotStore) {
        let storage = Arc::new(MemoryStorage::new());
        (storage.clone(), SessionSnapshotStore::new(storage))
    }

    #[test]
    fn test_roundtrip_with_avatar() {
        let (_, snapshots) = store();
        let user = User::new(
            "ada@example.com",
            "Ada Lovelace",
            "ada@example.com",
            Some("https://img.example.com/ada.png".to_string()),
        );

        snapshots.save(&user);
        assert_eq!(snapshots.load(), Some(user));
    }

    #[test]
    fn test_absent_avatar_stays_absent() {
        let (storage, snapshots) = store();
        let user = User::new("ada@example.com", "Ada", "ada@example.com", None);

        snapshots.save(&user);
        let raw: serde_json::Value =
            serde_json::from_slice(&storage.read(SNAPSHOT_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw["profileImageUrl"], "");

        let loaded = snapshots.load().unwrap();
        assert_eq!(loaded.avatar_url, None);
        assert_eq!(loaded, user);
    }

    #[test]
    fn test_literal_null_string_is_absent() {
        let (storage, snapshots) = store();
        storage
            .write(
                SNAPSHOT_KEY,
                br#"{"id":"x","fullName":"X","email":"x@y.z","profileImageUrl":"null"}"#,
            )
            .unwrap();

        assert_eq!(snapshots.load().unwrap().avatar_url, None);
    }

    #[test]
    fn test_missing_or_corrupt_loads_none() {
        let (storage, snapshots) = store();
        assert_eq!(snapshots.load(), None);

        storage.write(SNAPSHOT_KEY, b"{\"id\":").unwrap();
        assert_eq!(snapshots.load(), None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = SessionSnapshotStore::new(Arc::new(FileStorage::new(dir.path()).unwrap()));

        snapshots.save(&User::new("a", "A", "a@b.c", None));
        assert!(dir.path().join(SNAPSHOT_KEY).exists());

        snapshots.clear();
        snapshots.clear();
        assert!(!dir.path().join(SNAPSHOT_KEY).exists());
        assert_eq!(snapshots.load(), None);
    }
}
