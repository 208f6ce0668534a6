// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Account flows
//
// Login, registration, logout and account deletion, built on the session
// store, the favorites synchronizer and the cookie jar.

use crate::cookies::CookieJar;
use crate::gateway::NetworkGateway;
use crate::store::SessionStore;
use crate::sync::FavoritesSynchronizer;
use crate::types::{ApiResponse, SessionError, User};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
struct AuthBody {
    user: AuthUser,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthUser {
    #[serde(default = "default_full_name")]
    fullname: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    profile_image_url: Option<String>,
}

fn default_full_name() -> String {
    "User".to_string()
}

/// Build a user from a login/registration body. The API returns no id, so
/// the email stands in for it.
fn parse_auth_user(body: &str) -> Result<User, SessionError> {
    let body: AuthBody = serde_json::from_str(body)
        .map_err(|e| SessionError::Serialization(format!("Failed to parse user: {}", e)))?;
    let user = body.user;
    Ok(User::new(
        user.email.clone(),
        user.fullname,
        user.email,
        user.profile_image_url,
    ))
}

fn rejection(response: &ApiResponse, fallback: &str) -> SessionError {
    SessionError::Rejected {
        status: response.status,
        message: response.message().unwrap_or_else(|| fallback.to_string()),
    }
}

pub struct AccountService {
    sync: FavoritesSynchronizer,
    gateway: Arc<dyn NetworkGateway>,
    cookies: Arc<CookieJar>,
}

impl AccountService {
    pub fn new(
        sync: FavoritesSynchronizer,
        gateway: Arc<dyn NetworkGateway>,
        cookies: Arc<CookieJar>,
    ) -> Self {
        Self {
            sync,
            gateway,
            cookies,
        }
    }

    fn store(&self) -> &Arc<SessionStore> {
        self.sync.store()
    }

    fn start_session(&self, user: User) -> User {
        self.store().set_user(Some(user.clone()));
        self.sync.reload();
        user
    }

    /// Log in and start loading favorites in the background
    pub async fn login(&self, email: &str, password: &str) -> Result<User, SessionError> {
        tracing::info!("Logging in as {}", email);
        let response = self.gateway.login(email, password).await?;
        if !response.is_success() {
            tracing::warn!("Login rejected ({})", response.status);
            return Err(rejection(&response, "Username or password is incorrect"));
        }

        let user = parse_auth_user(&response.body)?;
        Ok(self.start_session(user))
    }

    pub async fn register(
        &self,
        fullname: &str,
        email: &str,
        password: &str,
    ) -> Result<User, SessionError> {
        tracing::info!("Registering {}", email);
        let response = self.gateway.register(fullname, email, password).await?;
        if !response.is_success() {
            tracing::warn!("Registration rejected ({})", response.status);
            return Err(rejection(&response, "Registration failed"));
        }

        let user = parse_auth_user(&response.body)?;
        Ok(self.start_session(user))
    }

    /// Forget the session locally, cookies included
    pub fn logout(&self) {
        tracing::info!("Logging out");
        self.cookies.clear();
        self.store().clear();
    }

    /// Delete the account on the server.
    ///
    /// The local session is dropped whatever the outcome, since a failed
    /// call usually means the session was already invalid.
    pub async fn delete_account(&self) -> Result<(), SessionError> {
        let result = match self.gateway.delete_account().await {
            Ok(response) if response.is_success() => {
                tracing::info!("Account deleted");
                Ok(())
            }
            Ok(response) => {
                tracing::error!("Error deleting account: {}", response.body);
                Err(rejection(&response, "Failed to delete account"))
            }
            Err(e) => {
                tracing::error!("Exception deleting account: {}", e);
                Err(e)
            }
        };

        self.cookies.clear();
        self.store().clear();
        result
    }

    /// Fetch the profile and replace the current user with it
    pub async fn refresh_profile(&self) -> Result<User, SessionError> {
        if !self.store().is_logged_in() {
            return Err(SessionError::NotLoggedIn);
        }

        let user = self.gateway.fetch_user_profile().await?;
        self.store().set_user(Some(user.clone()));
        Ok(user)
    }
}
