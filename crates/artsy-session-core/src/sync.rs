// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Favorites synchronization
//
// Toggles are applied locally first and confirmed in the background.
// Whatever the server answers, a full reload follows so local state
// converges on the server's within one round trip.

use crate::favorites::PendingToggle;
use crate::gateway::NetworkGateway;
use crate::store::SessionStore;
use crate::types::{ClientSettings, FavoriteId};
use std::sync::Arc;
use std::time::Duration;

/// Drives optimistic toggles and bulk reloads against the gateway.
///
/// Cloning is cheap; clones share the same store and gateway. Methods
/// spawn onto the current Tokio runtime and must be called from within one.
#[derive(Clone)]
pub struct FavoritesSynchronizer {
    store: Arc<SessionStore>,
    gateway: Arc<dyn NetworkGateway>,
    max_retries: u32,
    backoff: Duration,
}

impl FavoritesSynchronizer {
    pub fn new(
        store: Arc<SessionStore>,
        gateway: Arc<dyn NetworkGateway>,
        settings: &ClientSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            max_retries: settings.reload_retries,
            backoff: settings.retry_backoff(),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Reload favorites with the configured retry count
    pub fn reload(&self) {
        self.reload_with_retries(self.max_retries);
    }

    /// Replace local favorites with the server's list.
    ///
    /// Without a user the cache is cleared synchronously. If a reload is
    /// already in flight this call does nothing.
    pub fn reload_with_retries(&self, max_retries: u32) {
        if !self.store.is_logged_in() {
            tracing::debug!("No user logged in, clearing local favorites");
            self.store.clear_favorites();
            return;
        }

        if !self.store.try_begin_reconcile() {
            tracing::debug!("Favorites reload already in flight, skipping");
            return;
        }

        let sync = self.clone();
        tokio::spawn(async move {
            sync.run_reload(max_retries).await;
        });
    }

    async fn run_reload(self, max_retries: u32) {
        match self.gateway.fetch_favorites().await {
            Ok(response) => {
                tracing::debug!("Fetched {} favorites", response.favorites.len());
                self.store.end_reconcile();
                self.store.replace_favorites(response.favorites);
            }
            Err(e) if max_retries > 0 => {
                tracing::warn!(
                    "Failed to load favorites, retrying in {:?} ({} retries left): {}",
                    self.backoff,
                    max_retries,
                    e
                );
                tokio::time::sleep(self.backoff).await;
                self.store.end_reconcile();
                self.reload_with_retries(max_retries - 1);
            }
            Err(e) => {
                tracing::error!("Failed to load favorites, clearing local cache: {}", e);
                self.store.end_reconcile();
                self.store.clear_favorites();
            }
        }
    }

    /// Flip `id` optimistically and confirm with the server in the background.
    ///
    /// Returns whether `id` is a favorite after the optimistic change;
    /// `false` without side effects when nobody is logged in.
    pub fn toggle(&self, id: impl Into<FavoriteId>) -> bool {
        let id = id.into();
        let Some(pending) = self.store.begin_toggle(id) else {
            tracing::warn!("Toggle requested with no user logged in");
            return false;
        };

        let adding = pending.is_add();
        tracing::debug!(
            "Optimistic {} of {}",
            if adding { "add" } else { "remove" },
            pending.id()
        );

        let sync = self.clone();
        tokio::spawn(async move {
            sync.settle_toggle(pending).await;
        });

        adding
    }

    async fn settle_toggle(self, pending: PendingToggle) {
        let result = if pending.is_add() {
            self.gateway.add_favorite(pending.id()).await
        } else {
            self.gateway.remove_favorite(pending.id()).await
        };

        match result {
            Ok(response) if response.is_success() => {
                let id = pending.confirm();
                tracing::debug!("Server accepted toggle for {}", id);
            }
            Ok(response) => {
                tracing::error!(
                    "Server rejected toggle for {} ({}): {}",
                    pending.id(),
                    response.status,
                    response.body
                );
                self.store.revert_toggle(pending);
            }
            Err(e) => {
                tracing::error!("Toggle request for {} failed: {}", pending.id(), e);
                self.store.revert_toggle(pending);
            }
        }

        self.reload();
    }
}
