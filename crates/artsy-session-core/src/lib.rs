// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Session and favorites synchronization
//
// This crate provides:
// - CookieJar for persistent per-host authentication cookies
// - SessionSnapshotStore for restoring the last user at startup
// - SessionStore holding the user and the favorites cache
// - FavoritesSynchronizer for optimistic toggles and reconciliation
// - SessionBootstrapper and AccountService for session lifecycle
// - Artist catalog lookups through CatalogGateway
// - HttpGateway, the reqwest implementation of both gateways
//
// Frontends live in separate crates.

pub mod account;
pub mod bootstrap;
pub mod catalog;
pub mod cookies;
pub mod favorites;
pub mod gateway;
pub mod http;
pub mod notifier;
pub mod settings;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod sync;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use account::AccountService;
pub use bootstrap::{SessionBootstrapper, SessionStatus};
pub use catalog::{Artist, ArtistDetails, Artwork, Category};
pub use cookies::{CookieJar, CookieRecord};
pub use favorites::{FavoritesState, PendingToggle, ToggleKind};
pub use gateway::{CatalogGateway, NetworkGateway};
pub use http::{HttpGateway, JarCookieProvider};
pub use notifier::{ChangeNotifier, Subscription};
pub use settings::SettingsStore;
pub use snapshot::SessionSnapshotStore;
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use store::SessionStore;
pub use sync::FavoritesSynchronizer;
pub use types::{
    ApiResponse, ClientSettings, FavoriteDetail, FavoriteId, FavoritesResponse, SessionError, User,
};
