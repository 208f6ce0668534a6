// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Settings persistence
//
// Settings are stored as settings.json next to the session data.

use crate::storage::StorageBackend;
use crate::types::{ClientSettings, SessionError};
use std::sync::{Arc, PoisonError, RwLock};

const SETTINGS_KEY: &str = "settings.json";

/// In-memory cache of settings, persisted on changes
pub struct SettingsStore {
    settings: RwLock<ClientSettings>,
    storage: Arc<dyn StorageBackend>,
}

impl SettingsStore {
    /// Load settings, falling back to defaults if missing or unreadable
    pub fn new(storage: Arc<dyn StorageBackend>) -> Result<Self, SessionError> {
        let (settings, exists) = match storage.read(SETTINGS_KEY)? {
            Some(content) => {
                tracing::info!("Loading settings from disk");
                let settings = serde_json::from_slice::<ClientSettings>(&content)
                    .ok()
                    .filter(|settings| settings.validate().is_ok())
                    .unwrap_or_else(|| {
                        tracing::warn!("Failed to parse settings, using defaults");
                        ClientSettings::default()
                    });
                (settings, true)
            }
            None => {
                tracing::info!("No settings file found, using defaults");
                (ClientSettings::default(), false)
            }
        };

        let store = Self {
            settings: RwLock::new(settings),
            storage,
        };

        if !exists {
            tracing::info!("Creating initial settings file");
            store.persist()?;
        }

        Ok(store)
    }

    fn persist(&self) -> Result<(), SessionError> {
        let content = {
            let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
            serde_json::to_vec_pretty(&*settings).map_err(|e| {
                SessionError::Serialization(format!("Failed to serialize settings: {}", e))
            })?
        };

        self.storage.write(SETTINGS_KEY, &content)
    }

    /// Get current settings
    pub fn get(&self) -> ClientSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validate, replace and persist settings
    pub fn update(&self, new_settings: ClientSettings) -> Result<(), SessionError> {
        new_settings.validate()?;
        tracing::info!("Updating settings, base URL: {}", new_settings.base_url);

        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = new_settings;

        let result = self.persist();
        match &result {
            Ok(()) => tracing::info!("Settings persisted successfully"),
            Err(e) => tracing::error!("Failed to persist settings: {}", e),
        }
        result
    }
}
