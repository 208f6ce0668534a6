// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The logged-in user. Replaced wholesale on login/logout, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(rename = "profileImageUrl", default)]
    pub avatar_url: Option<String>,
}

impl User {
    pub fn new(
        id: impl Into<String>,
        full_name: impl Into<String>,
        email: impl Into<String>,
        avatar_url: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            email: email.into(),
            avatar_url: avatar_url.filter(|url| !is_blank_url(url)),
        }
    }
}

/// Blank and literal "null" avatar values both mean "no avatar"
pub(crate) fn is_blank_url(url: &str) -> bool {
    let trimmed = url.trim();
    trimmed.is_empty() || trimmed == "null"
}

/// Identifier of a favorited artist
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteId(String);

impl FavoriteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FavoriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FavoriteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for FavoriteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for FavoriteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Enriched favorite record as returned by the favorites endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteDetail {
    #[serde(rename = "artistId")]
    pub id: FavoriteId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nationality: String,
    #[serde(default)]
    pub years: String,
    #[serde(rename = "addedAt")]
    pub added_at: DateTime<Utc>,
    #[serde(rename = "thumbnail", default)]
    pub thumbnail_url: String,
}

/// Body of `GET api/favorites`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritesResponse {
    #[serde(default)]
    pub favorites: Vec<FavoriteDetail>,
    #[serde(default)]
    pub message: String,
}

impl FavoritesResponse {
    /// Whether the server treated the request as coming from a live session
    pub fn indicates_session(&self) -> bool {
        !self.favorites.is_empty() || self.message == "success"
    }
}

/// Raw outcome of a request whose body the caller interprets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `message` field of a JSON body, if there is one
    pub fn message(&self) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()?
            .get("message")?
            .as_str()
            .map(str::to_string)
    }
}

/// Client settings, persisted as `settings.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    /// Root URL of the discovery API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Retries for a failed favorites reload
    #[serde(default = "default_reload_retries")]
    pub reload_retries: u32,
    /// Delay between reload retries in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub read_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://rohit-hw-3.wl.r.appspot.com/".to_string()
}

fn default_reload_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            reload_retries: default_reload_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            connect_timeout_secs: default_timeout_secs(),
            read_timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientSettings {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Reject settings the HTTP gateway could not work with
    pub fn validate(&self) -> Result<(), SessionError> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SessionError::InvalidConfig(format!("Invalid base URL: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(SessionError::InvalidConfig(format!(
                "Unsupported URL scheme: {}",
                url.scheme()
            )));
        }
        if self.connect_timeout_secs == 0 || self.read_timeout_secs == 0 {
            return Err(SessionError::InvalidConfig(
                "Timeouts must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

/// Error types for the session engine
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("No user is logged in")]
    NotLoggedIn,

    #[error("File I/O error: {0}")]
    FileIo(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SessionError {
    /// No response was received at all
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SessionError::Network(_) | SessionError::ConnectionRefused(_) | SessionError::Timeout(_)
        )
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::FileIo(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            SessionError::ConnectionRefused(err.to_string())
        } else if err.is_timeout() {
            SessionError::Timeout(err.to_string())
        } else if err.is_decode() {
            SessionError::Serialization(err.to_string())
        } else {
            SessionError::Network(err.to_string())
        }
    }
}
