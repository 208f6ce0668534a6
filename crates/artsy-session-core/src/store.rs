// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Session state
//
// Holds the current user and the favorites cache for the whole process.
// One instance is created at startup and shared through an Arc.

use crate::favorites::{FavoritesState, PendingToggle};
use crate::notifier::{ChangeNotifier, Subscription};
use crate::snapshot::SessionSnapshotStore;
use crate::types::{FavoriteDetail, FavoriteId, User};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    favorites: FavoritesState,
}

/// Authoritative in-memory session state.
///
/// Every favorites mutation fires the change notifier after the state lock
/// has been released.
pub struct SessionStore {
    state: RwLock<SessionState>,
    reconciling: AtomicBool,
    snapshots: SessionSnapshotStore,
    notifier: ChangeNotifier,
}

impl SessionStore {
    pub fn new(snapshots: SessionSnapshotStore) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            reconciling: AtomicBool::new(false),
            snapshots,
            notifier: ChangeNotifier::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshots(&self) -> &SessionSnapshotStore {
        &self.snapshots
    }

    pub fn current_user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().user.is_some()
    }

    pub fn favorite_ids(&self) -> HashSet<FavoriteId> {
        self.read().favorites.ids().clone()
    }

    pub fn favorite_details(&self) -> Vec<FavoriteDetail> {
        self.read().favorites.details().to_vec()
    }

    pub fn is_favorite(&self, id: &FavoriteId) -> bool {
        self.read().favorites.contains(id)
    }

    /// Copy of both favorites views taken under one lock
    pub fn favorites(&self) -> FavoritesState {
        self.read().favorites.clone()
    }

    /// Replace the current user and its snapshot. Favorites are untouched;
    /// callers reload them after a login.
    pub fn set_user(&self, user: Option<User>) {
        match &user {
            Some(user) => {
                tracing::info!("Setting current user: {}", user.email);
                self.snapshots.save(user);
            }
            None => {
                tracing::info!("Clearing current user");
                self.snapshots.clear();
            }
        }
        self.write().user = user;
    }

    /// Log out locally: no user, no snapshot, no favorites, one notification
    pub fn clear(&self) {
        {
            let mut state = self.write();
            state.user = None;
            state.favorites.clear();
        }
        self.snapshots.clear();
        self.notify();
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier.subscribe(listener)
    }

    pub fn subscribe_channel(&self) -> (Subscription, mpsc::UnboundedReceiver<()>) {
        self.notifier.subscribe_channel()
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.notifier.unsubscribe(subscription)
    }

    pub fn notify(&self) {
        self.notifier.notify();
    }

    /// Whether a bulk reload is in flight
    pub fn is_reconciling(&self) -> bool {
        self.reconciling.load(Ordering::Acquire)
    }

    /// Atomically take the reload guard; `false` if another reload holds it
    pub(crate) fn try_begin_reconcile(&self) -> bool {
        self.reconciling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn end_reconcile(&self) {
        self.reconciling.store(false, Ordering::Release);
    }

    /// Reconcile with the server's list.
    ///
    /// A response arriving after logout must not repopulate the cache, so
    /// without a user the favorites are cleared instead.
    pub fn replace_favorites(&self, details: Vec<FavoriteDetail>) {
        {
            let mut state = self.write();
            if state.user.is_some() {
                state.favorites.replace(details);
                tracing::debug!("Replaced favorites, {} entries", state.favorites.len());
            } else {
                tracing::debug!("Dropping favorites response received while logged out");
                state.favorites.clear();
            }
        }
        self.notify();
    }

    /// Empty both favorites views
    pub fn clear_favorites(&self) {
        self.write().favorites.clear();
        self.notify();
    }

    /// Apply an optimistic toggle; `None` when nobody is logged in
    pub(crate) fn begin_toggle(&self, id: FavoriteId) -> Option<PendingToggle> {
        let pending = {
            let mut state = self.write();
            if state.user.is_none() {
                return None;
            }
            PendingToggle::begin(&mut state.favorites, id)
        };
        self.notify();
        Some(pending)
    }

    /// Undo an optimistic toggle the server did not accept
    pub(crate) fn revert_toggle(&self, pending: PendingToggle) {
        {
            let mut state = self.write();
            if state.user.is_some() {
                let id = pending.revert(&mut state.favorites);
                tracing::debug!("Reverted optimistic toggle for {}", id);
            }
        }
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn store() -> SessionStore {
        SessionStore::new(SessionSnapshotStore::new(Arc::new(MemoryStorage::new())))
    }

    fn user() -> User {
        User::new("ada@example.com", "Ada", "ada@example.com", None)
    }

    fn detail(id: &str) -> FavoriteDetail {
        FavoriteDetail {
            id: id.into(),
            name: id.to_string(),
            nationality: String::new(),
            years: String::new(),
            added_at: Utc::now(),
            thumbnail_url: String::new(),
        }
    }

    fn count_notifications(store: &SessionStore) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn test_set_user_persists_snapshot() {
        let store = store();
        store.set_user(Some(user()));
        assert_eq!(store.snapshots().load(), Some(user()));

        store.set_user(None);
        assert_eq!(store.current_user(), None);
        assert_eq!(store.snapshots().load(), None);
    }

    #[test]
    fn test_set_user_leaves_favorites() {
        let store = store();
        store.set_user(Some(user()));
        store.replace_favorites(vec![detail("a")]);

        store.set_user(None);
        assert_eq!(store.favorite_ids().len(), 1);
    }

    #[test]
    fn test_clear_is_idempotent_and_notifies_once() {
        let store = store();
        let notifications = count_notifications(&store);
        store.set_user(Some(user()));
        store.replace_favorites(vec![detail("a"), detail("b")]);
        let after_replace = notifications.load(Ordering::SeqCst);

        store.clear();
        assert_eq!(notifications.load(Ordering::SeqCst), after_replace + 1);
        let once = (store.current_user(), store.favorites());

        store.clear();
        let twice = (store.current_user(), store.favorites());
        assert_eq!(once, twice);
        assert_eq!(twice.0, None);
        assert!(twice.1.is_empty());
        assert_eq!(store.snapshots().load(), None);
    }

    #[test]
    fn test_toggle_requires_user() {
        let store = store();
        let notifications = count_notifications(&store);

        assert!(store.begin_toggle("a".into()).is_none());
        assert!(store.favorite_ids().is_empty());
        assert_eq!(notifications.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_toggle_and_revert_notify() {
        let store = store();
        store.set_user(Some(user()));
        let notifications = count_notifications(&store);

        let pending = store.begin_toggle("a".into()).unwrap();
        assert!(store.is_favorite(&"a".into()));

        store.revert_toggle(pending);
        assert!(!store.is_favorite(&"a".into()));
        assert_eq!(notifications.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_replace_without_user_clears() {
        let store = store();
        store.replace_favorites(vec![detail("a")]);
        assert!(store.favorites().is_empty());
    }

    #[test]
    fn test_reconcile_guard_is_exclusive() {
        let store = store();
        assert!(store.try_begin_reconcile());
        assert!(!store.try_begin_reconcile());
        assert!(store.is_reconciling());

        store.end_reconcile();
        assert!(!store.is_reconciling());
        assert!(store.try_begin_reconcile());
    }
}
