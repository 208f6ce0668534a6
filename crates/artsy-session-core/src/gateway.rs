// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Remote API boundary
//
// Every call may fail with a transport error (`Err`); application-level
// rejections come back as a non-2xx `ApiResponse`, or as
// `SessionError::Rejected` for calls that return a typed value.

use crate::catalog::{Artist, ArtistDetails, Artwork, Category};
use crate::types::{ApiResponse, FavoriteId, FavoritesResponse, SessionError, User};
use async_trait::async_trait;

/// Operations the session engine consumes from the discovery API.
/// The session cookie is supplied implicitly by the implementation.
#[async_trait]
pub trait NetworkGateway: Send + Sync {
    async fn fetch_favorites(&self) -> Result<FavoritesResponse, SessionError>;

    async fn add_favorite(&self, id: &FavoriteId) -> Result<ApiResponse, SessionError>;

    async fn remove_favorite(&self, id: &FavoriteId) -> Result<ApiResponse, SessionError>;

    async fn login(&self, email: &str, password: &str) -> Result<ApiResponse, SessionError>;

    async fn register(
        &self,
        fullname: &str,
        email: &str,
        password: &str,
    ) -> Result<ApiResponse, SessionError>;

    async fn fetch_user_profile(&self) -> Result<User, SessionError>;

    async fn delete_account(&self) -> Result<ApiResponse, SessionError>;
}

/// Read-only artist discovery. Non-2xx answers surface as
/// `SessionError::Rejected`.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn search_artists(&self, query: &str) -> Result<Vec<Artist>, SessionError>;

    async fn artist_details(&self, id: &FavoriteId) -> Result<ArtistDetails, SessionError>;

    async fn artworks(&self, artist_id: &FavoriteId) -> Result<Vec<Artwork>, SessionError>;

    /// Needs a logged-in session cookie
    async fn similar_artists(&self, artist_id: &FavoriteId) -> Result<Vec<Artist>, SessionError>;

    async fn artwork_categories(&self, artwork_id: &str) -> Result<Vec<Category>, SessionError>;
}
