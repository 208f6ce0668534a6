// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Local favorites state
//
// The favorites cache holds two views: the id set used for membership
// checks and the detailed entries shown in lists. Reconciliation replaces
// both wholesale; a toggle changes them tentatively until the server
// answers.

use crate::types::{FavoriteDetail, FavoriteId};
use std::collections::HashSet;

/// Favorite ids plus their detailed entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoritesState {
    ids: HashSet<FavoriteId>,
    details: Vec<FavoriteDetail>,
}

impl FavoritesState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &FavoriteId) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> &HashSet<FavoriteId> {
        &self.ids
    }

    pub fn details(&self) -> &[FavoriteDetail] {
        &self.details
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.details.is_empty()
    }

    /// Replace both views with the server's list
    pub fn replace(&mut self, details: Vec<FavoriteDetail>) {
        self.ids = details.iter().map(|detail| detail.id.clone()).collect();
        self.details = details;
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.details.clear();
    }
}

/// Direction of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    Add,
    Remove,
}

/// A tentative toggle awaiting the server's verdict.
///
/// Created by [`PendingToggle::begin`], which applies the optimistic change.
/// It then ends either in [`confirm`](Self::confirm) or in
/// [`revert`](Self::revert), which undoes the id change.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a pending toggle must be confirmed or reverted"]
pub struct PendingToggle {
    id: FavoriteId,
    kind: ToggleKind,
}

impl PendingToggle {
    /// Apply the optimistic change for `id` to `state`
    pub fn begin(state: &mut FavoritesState, id: FavoriteId) -> Self {
        let kind = if state.contains(&id) {
            ToggleKind::Remove
        } else {
            ToggleKind::Add
        };

        match kind {
            ToggleKind::Add => {
                state.ids.insert(id.clone());
            }
            ToggleKind::Remove => {
                state.ids.remove(&id);
                state.details.retain(|detail| detail.id != id);
            }
        }

        Self { id, kind }
    }

    pub fn id(&self) -> &FavoriteId {
        &self.id
    }

    pub fn kind(&self) -> ToggleKind {
        self.kind
    }

    pub fn is_add(&self) -> bool {
        self.kind == ToggleKind::Add
    }

    /// The server accepted the change
    pub fn confirm(self) -> FavoriteId {
        self.id
    }

    /// The server rejected the change or could not be reached.
    ///
    /// Only membership is restored; a removed detail entry comes back with
    /// the next reconciliation.
    pub fn revert(self, state: &mut FavoritesState) -> FavoriteId {
        match self.kind {
            ToggleKind::Add => {
                state.ids.remove(&self.id);
                state.details.retain(|detail| detail.id != self.id);
            }
            ToggleKind::Remove => {
                state.ids.insert(self.id.clone());
            }
        }
        self.id
    }
}
