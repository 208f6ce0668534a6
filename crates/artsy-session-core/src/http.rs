// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - HTTP gateway
//
// reqwest-backed implementation of the gateway. Cookies flow through the
// persistent cookie jar so a session survives restarts.

use crate::catalog::{Artist, ArtistDetails, Artwork, Category, GenesResponse};
use crate::cookies::{CookieJar, CookieRecord};
use crate::gateway::{CatalogGateway, NetworkGateway};
use crate::types::{ApiResponse, ClientSettings, FavoriteId, FavoritesResponse, SessionError, User};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderValue;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Adapts [`CookieJar`] to reqwest's cookie hook
pub struct JarCookieProvider {
    jar: Arc<CookieJar>,
}

impl JarCookieProvider {
    pub fn new(jar: Arc<CookieJar>) -> Self {
        Self { jar }
    }
}

impl reqwest::cookie::CookieStore for JarCookieProvider {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let Some(host) = url.host_str() else {
            return;
        };

        let now = Utc::now();
        let cookies: Vec<CookieRecord> = cookie_headers
            .filter_map(|header| header.to_str().ok())
            .filter_map(|header| CookieRecord::from_set_cookie(header, host, now))
            .collect();

        if cookies.is_empty() {
            tracing::debug!("No usable cookies in response from {}", host);
            return;
        }

        tracing::debug!("Response from {} set {} cookies", url, cookies.len());
        self.jar.store(host, cookies);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let host = url.host_str()?;
        let is_https = url.scheme() == "https";

        let header = self
            .jar
            .retrieve(host)
            .iter()
            .filter(|cookie| cookie.matches_path(url.path()))
            .filter(|cookie| is_https || !cookie.secure)
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

/// Discovery API client
pub struct HttpGateway {
    http_client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(settings: &ClientSettings, cookies: Arc<CookieJar>) -> Result<Self, SessionError> {
        settings.validate()?;

        // Url::join drops the last segment unless the base ends with '/'
        let mut base = settings.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| SessionError::InvalidConfig(format!("Invalid base URL: {}", e)))?;

        let http_client = Client::builder()
            .cookie_provider(Arc::new(JarCookieProvider::new(cookies)))
            .connect_timeout(settings.connect_timeout())
            .read_timeout(settings.read_timeout())
            .build()
            .map_err(|e| SessionError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SessionError> {
        self.base_url
            .join(path)
            .map_err(|e| SessionError::InvalidConfig(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn send(&self, request: RequestBuilder) -> Result<ApiResponse, SessionError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!("Response {} ({} bytes)", status, body.len());

        Ok(ApiResponse { status, body })
    }

    /// Send and require a 2xx answer
    async fn send_ok(&self, request: RequestBuilder) -> Result<ApiResponse, SessionError> {
        let response = self.send(request).await?;
        if response.is_success() {
            return Ok(response);
        }

        Err(SessionError::Rejected {
            status: response.status,
            message: response
                .message()
                .unwrap_or_else(|| format!("Server returned status {}", response.status)),
        })
    }

    /// `api/artists/<id>/<tail..>` with the id escaped as one path segment
    fn artist_endpoint(&self, id: &FavoriteId, tail: &[&str]) -> Result<Url, SessionError> {
        let mut url = self.endpoint("api/artists")?;
        url.path_segments_mut()
            .map_err(|_| SessionError::InvalidConfig("Base URL cannot carry a path".to_string()))?
            .push(id.as_str())
            .extend(tail);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, SessionError> {
        tracing::debug!("GET {}", url);
        let response = self.send_ok(self.http_client.get(url)).await?;

        serde_json::from_str(&response.body)
            .map_err(|e| SessionError::Serialization(format!("Failed to parse {}: {}", what, e)))
    }

    async fn toggle(&self, path: &str, id: &FavoriteId) -> Result<ApiResponse, SessionError> {
        let url = self.endpoint(path)?;
        tracing::debug!("GET {} artistId={}", url, id);
        self.send(self.http_client.get(url).query(&[("artistId", id.as_str())]))
            .await
    }
}

#[async_trait]
impl NetworkGateway for HttpGateway {
    async fn fetch_favorites(&self) -> Result<FavoritesResponse, SessionError> {
        let url = self.endpoint("api/favorites")?;
        tracing::debug!("GET {}", url);
        let response = self.send_ok(self.http_client.get(url)).await?;

        serde_json::from_str(&response.body)
            .map_err(|e| SessionError::Serialization(format!("Failed to parse favorites: {}", e)))
    }

    async fn add_favorite(&self, id: &FavoriteId) -> Result<ApiResponse, SessionError> {
        self.toggle("api/favorites/add", id).await
    }

    async fn remove_favorite(&self, id: &FavoriteId) -> Result<ApiResponse, SessionError> {
        self.toggle("api/favorites/remove", id).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<ApiResponse, SessionError> {
        let url = self.endpoint("api/auth/login")?;
        tracing::debug!("POST {}", url);
        let body = serde_json::json!({
            "email": email,
            "password": password,
        });
        self.send(self.http_client.post(url).json(&body)).await
    }

    async fn register(
        &self,
        fullname: &str,
        email: &str,
        password: &str,
    ) -> Result<ApiResponse, SessionError> {
        let url = self.endpoint("api/auth/register")?;
        tracing::debug!("POST {}", url);
        let body = serde_json::json!({
            "fullname": fullname,
            "email": email,
            "password": password,
        });
        self.send(self.http_client.post(url).json(&body)).await
    }

    async fn fetch_user_profile(&self) -> Result<User, SessionError> {
        let url = self.endpoint("api/auth/profile")?;
        tracing::debug!("GET {}", url);
        let response = self.send_ok(self.http_client.get(url)).await?;

        let profile: User = serde_json::from_str(&response.body)
            .map_err(|e| SessionError::Serialization(format!("Failed to parse profile: {}", e)))?;
        Ok(User::new(
            profile.id,
            profile.full_name,
            profile.email,
            profile.avatar_url,
        ))
    }

    async fn delete_account(&self) -> Result<ApiResponse, SessionError> {
        let url = self.endpoint("api/auth/delete")?;
        tracing::debug!("DELETE {}", url);
        self.send(self.http_client.delete(url)).await
    }
}

#[async_trait]
impl CatalogGateway for HttpGateway {
    async fn search_artists(&self, query: &str) -> Result<Vec<Artist>, SessionError> {
        let mut url = self.endpoint("api/artists/search")?;
        url.query_pairs_mut().append_pair("q", query);
        self.get_json(url, "search results").await
    }

    async fn artist_details(&self, id: &FavoriteId) -> Result<ArtistDetails, SessionError> {
        let url = self.artist_endpoint(id, &[])?;
        self.get_json(url, "artist details").await
    }

    async fn artworks(&self, artist_id: &FavoriteId) -> Result<Vec<Artwork>, SessionError> {
        let url = self.artist_endpoint(artist_id, &["artworks"])?;
        self.get_json(url, "artworks").await
    }

    async fn similar_artists(&self, artist_id: &FavoriteId) -> Result<Vec<Artist>, SessionError> {
        let url = self.artist_endpoint(artist_id, &["similar"])?;
        self.get_json(url, "similar artists").await
    }

    async fn artwork_categories(&self, artwork_id: &str) -> Result<Vec<Category>, SessionError> {
        let mut url = self.endpoint("api/genes")?;
        url.query_pairs_mut().append_pair("artwork_id", artwork_id);
        let genes: GenesResponse = self.get_json(url, "categories").await?;
        Ok(genes.into_categories())
    }
}
