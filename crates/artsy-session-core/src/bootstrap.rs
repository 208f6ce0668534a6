// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Startup session validation
//
// On launch the cached user is shown right away, then the server is asked
// for favorites. The answer decides whether the persisted cookies still
// carry a live session.

use crate::gateway::NetworkGateway;
use crate::store::SessionStore;
use crate::types::SessionError;
use std::sync::Arc;

/// Outcome of [`SessionBootstrapper::validate_session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The server recognized the session; favorites are loaded
    Authenticated,
    /// The server did not recognize the session; the user was dropped
    Anonymous,
    /// The server could not be asked; a restored user, if any, is kept
    Offline,
}

pub struct SessionBootstrapper {
    store: Arc<SessionStore>,
    gateway: Arc<dyn NetworkGateway>,
}

impl SessionBootstrapper {
    pub fn new(store: Arc<SessionStore>, gateway: Arc<dyn NetworkGateway>) -> Self {
        Self { store, gateway }
    }

    pub async fn validate_session(&self) -> SessionStatus {
        tracing::info!("Validating session from persisted cookies");

        if let Some(user) = self.store.snapshots().load() {
            tracing::info!("Restored user from snapshot: {}", user.email);
            self.store.set_user(Some(user));
        }

        match self.gateway.fetch_favorites().await {
            Ok(response) if response.indicates_session() => {
                if !self.store.is_logged_in() {
                    if let Some(status) = self.restore_user_from_profile().await {
                        return status;
                    }
                }
                tracing::info!(
                    "Session is valid, restored {} favorites",
                    response.favorites.len()
                );
                self.store.replace_favorites(response.favorites);
                SessionStatus::Authenticated
            }
            Ok(_) => {
                tracing::info!("No valid session found");
                self.store.set_user(None);
                SessionStatus::Anonymous
            }
            Err(SessionError::Rejected { status, message }) if matches!(status, 401 | 403) => {
                tracing::info!("Session rejected by server ({}): {}", status, message);
                self.store.set_user(None);
                SessionStatus::Anonymous
            }
            Err(e) => {
                tracing::warn!("Could not validate session, keeping cached user: {}", e);
                SessionStatus::Offline
            }
        }
    }

    /// Live cookies but no snapshot: ask the profile endpoint who is logged
    /// in. Returns the final status when the user could not be restored.
    async fn restore_user_from_profile(&self) -> Option<SessionStatus> {
        match self.gateway.fetch_user_profile().await {
            Ok(profile) => {
                tracing::info!("Restored user from profile: {}", profile.email);
                self.store.set_user(Some(profile));
                None
            }
            Err(SessionError::Rejected { status, message }) if matches!(status, 401 | 403) => {
                tracing::info!("Profile rejected by server ({}): {}", status, message);
                self.store.set_user(None);
                Some(SessionStatus::Anonymous)
            }
            Err(e) => {
                tracing::warn!("Could not fetch profile for live session: {}", e);
                Some(SessionStatus::Offline)
            }
        }
    }
}
