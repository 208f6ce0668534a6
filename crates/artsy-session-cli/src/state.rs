// SPDX-License-Identifier: AGPL-3.0
// Artsy Session CLI - Application State

use artsy_session_core::{
    AccountService, CatalogGateway, CookieJar, FavoritesSynchronizer, FileStorage, HttpGateway,
    NetworkGateway, SessionBootstrapper, SessionError, SessionSnapshotStore, SessionStore,
    SettingsStore, StorageBackend,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs, wired over one storage directory
pub struct AppState {
    pub settings: SettingsStore,
    pub cookies: Arc<CookieJar>,
    pub store: Arc<SessionStore>,
    pub sync: FavoritesSynchronizer,
    pub bootstrapper: SessionBootstrapper,
    pub account: AccountService,
    pub catalog: Arc<dyn CatalogGateway>,
}

impl AppState {
    /// Create application state with all stores initialized
    pub fn new(data_dir: Option<PathBuf>, base_url: Option<String>) -> Result<Self, SessionError> {
        let storage: Arc<dyn StorageBackend> = Arc::new(match data_dir {
            Some(dir) => FileStorage::new(dir)?,
            None => FileStorage::default_location()?,
        });

        let settings = SettingsStore::new(storage.clone())?;
        let mut client_settings = settings.get();
        if let Some(base_url) = base_url {
            client_settings.base_url = base_url;
        }

        let cookies = Arc::new(CookieJar::new(storage.clone()));
        let http = Arc::new(HttpGateway::new(&client_settings, cookies.clone())?);
        let gateway: Arc<dyn NetworkGateway> = http.clone();
        let catalog: Arc<dyn CatalogGateway> = http;

        let store = Arc::new(SessionStore::new(SessionSnapshotStore::new(storage)));
        let sync = FavoritesSynchronizer::new(store.clone(), gateway.clone(), &client_settings);
        let bootstrapper = SessionBootstrapper::new(store.clone(), gateway.clone());
        let account = AccountService::new(sync.clone(), gateway, cookies.clone());

        Ok(Self {
            settings,
            cookies,
            store,
            sync,
            bootstrapper,
            account,
            catalog,
        })
    }
}
