// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Scripted gateway for tests

use crate::gateway::NetworkGateway;
use crate::storage::MemoryStorage;
use crate::snapshot::SessionSnapshotStore;
use crate::store::SessionStore;
use crate::types::{ApiResponse, FavoriteDetail, FavoriteId, FavoritesResponse, SessionError, User};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub(crate) fn detail(id: &str) -> FavoriteDetail {
    FavoriteDetail {
        id: FavoriteId::from(id),
        name: format!("Artist {}", id),
        nationality: "French".to_string(),
        years: "1840-1926".to_string(),
        added_at: Utc::now(),
        thumbnail_url: format!("https://img.example.com/{}.jpg", id),
    }
}

pub(crate) fn user() -> User {
    User::new("ada@example.com", "Ada Lovelace", "ada@example.com", None)
}

pub(crate) fn memory_store() -> (Arc<MemoryStorage>, Arc<SessionStore>) {
    let storage = Arc::new(MemoryStorage::new());
    let store = Arc::new(SessionStore::new(SessionSnapshotStore::new(storage.clone())));
    (storage, store)
}

/// Wait for `n` change notifications
pub(crate) async fn next_changes(rx: &mut mpsc::UnboundedReceiver<()>, n: usize) {
    for _ in 0..n {
        tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("timed out waiting for a change notification")
            .expect("notifier dropped");
    }
}

/// In-memory stand-in for the discovery API
pub(crate) struct MockGateway {
    pub server: Mutex<Vec<FavoriteDetail>>,
    pub offline: AtomicBool,
    pub unauthorized: AtomicBool,
    pub reject_toggles: AtomicBool,
    pub fetch_failures: AtomicU32,
    pub fetch_delay: Mutex<Duration>,
    pub fetch_calls: AtomicUsize,
    pub toggle_calls: AtomicUsize,
    pub auth_status: AtomicU16,
    pub auth_body: Mutex<String>,
    pub delete_status: AtomicU16,
    pub profile: Mutex<Option<User>>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            server: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
            unauthorized: AtomicBool::new(false),
            reject_toggles: AtomicBool::new(false),
            fetch_failures: AtomicU32::new(0),
            fetch_delay: Mutex::new(Duration::ZERO),
            fetch_calls: AtomicUsize::new(0),
            toggle_calls: AtomicUsize::new(0),
            auth_status: AtomicU16::new(200),
            auth_body: Mutex::new(String::new()),
            delete_status: AtomicU16::new(200),
            profile: Mutex::new(None),
        })
    }

    pub fn with_favorites(ids: &[&str]) -> Arc<Self> {
        let gateway = Self::new();
        *gateway.server.lock().unwrap() = ids.iter().map(|id| detail(id)).collect();
        gateway
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn server_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .server
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.id.to_string())
            .collect();
        ids.sort();
        ids
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), SessionError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(SessionError::Network("offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn toggle_response(&self) -> Result<Option<ApiResponse>, SessionError> {
        self.toggle_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.reject_toggles.load(Ordering::SeqCst) {
            return Ok(Some(ApiResponse::new(500, r#"{"message":"rejected"}"#)));
        }
        Ok(None)
    }
}

#[async_trait]
impl NetworkGateway for MockGateway {
    async fn fetch_favorites(&self) -> Result<FavoritesResponse, SessionError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.check_online()?;
        if self
            .fetch_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SessionError::Timeout("scripted failure".to_string()));
        }
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(SessionError::Rejected {
                status: 401,
                message: "Unauthorized".to_string(),
            });
        }

        Ok(FavoritesResponse {
            favorites: self.server.lock().unwrap().clone(),
            message: "success".to_string(),
        })
    }

    async fn add_favorite(&self, id: &FavoriteId) -> Result<ApiResponse, SessionError> {
        if let Some(rejection) = self.toggle_response()? {
            return Ok(rejection);
        }
        let mut server = self.server.lock().unwrap();
        if !server.iter().any(|d| &d.id == id) {
            server.push(detail(id.as_str()));
        }
        Ok(ApiResponse::new(200, r#"{"message":"added"}"#))
    }

    async fn remove_favorite(&self, id: &FavoriteId) -> Result<ApiResponse, SessionError> {
        if let Some(rejection) = self.toggle_response()? {
            return Ok(rejection);
        }
        self.server.lock().unwrap().retain(|d| &d.id != id);
        Ok(ApiResponse::new(200, r#"{"message":"removed"}"#))
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<ApiResponse, SessionError> {
        self.check_online()?;
        Ok(ApiResponse::new(
            self.auth_status.load(Ordering::SeqCst),
            self.auth_body.lock().unwrap().clone(),
        ))
    }

    async fn register(
        &self,
        _fullname: &str,
        _email: &str,
        _password: &str,
    ) -> Result<ApiResponse, SessionError> {
        self.check_online()?;
        Ok(ApiResponse::new(
            self.auth_status.load(Ordering::SeqCst),
            self.auth_body.lock().unwrap().clone(),
        ))
    }

    async fn fetch_user_profile(&self) -> Result<User, SessionError> {
        self.check_online()?;
        self.profile.lock().unwrap().clone().ok_or(SessionError::Rejected {
            status: 401,
            message: "Unauthorized".to_string(),
        })
    }

    async fn delete_account(&self) -> Result<ApiResponse, SessionError> {
        self.check_online()?;
        Ok(ApiResponse::new(self.delete_status.load(Ordering::SeqCst), "{}"))
    }
}
