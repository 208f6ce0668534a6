// SPDX-License-Identifier: AGPL-3.0
// Artsy Session CLI - Command Handlers

use crate::state::AppState;
use anyhow::{bail, Context};
use artsy_session_core::{Artist, FavoriteDetail, FavoriteId, SessionStatus, SessionStore};
use clap::Subcommand;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Upper bound on waiting for background reconciliation
const SYNC_TIMEOUT: Duration = Duration::from_secs(15);
/// Silence after which the favorites are considered settled
const QUIET_PERIOD: Duration = Duration::from_millis(300);

type CommandResult = anyhow::Result<()>;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate the stored session and show who is logged in
    Status,
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ARTSY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        fullname: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "ARTSY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the local session and cookies
    Logout,
    /// List favorite artists
    Favorites,
    /// Add or remove an artist from favorites
    Toggle { artist_id: String },
    /// Search artists by name
    Search { query: String },
    /// Show an artist with their artworks
    Artist { artist_id: String },
    /// List the categories of an artwork
    Categories { artwork_id: String },
    /// Refresh the user from the profile endpoint
    Profile,
    /// Delete the account on the server and log out
    DeleteAccount,
    /// Show settings, optionally saving a new API base URL
    Config {
        #[arg(long)]
        set_base_url: Option<String>,
    },
}

/// Wait until at least `min_changes` notifications arrived and the
/// favorites have been quiet with no reload in flight
async fn await_sync(store: &SessionStore, rx: &mut mpsc::UnboundedReceiver<()>, min_changes: usize) {
    let deadline = Instant::now() + SYNC_TIMEOUT;
    let mut seen = 0;

    loop {
        let wake = if seen < min_changes {
            deadline
        } else {
            (Instant::now() + QUIET_PERIOD).min(deadline)
        };

        match tokio::time::timeout_at(wake, rx.recv()).await {
            Ok(Some(())) => seen += 1,
            Ok(None) => break,
            Err(_) if Instant::now() >= deadline => {
                tracing::warn!("Timed out waiting for favorites to sync");
                break;
            }
            Err(_) if !store.is_reconciling() => break,
            Err(_) => {}
        }
    }
}

fn print_session(state: &AppState) {
    match state.store.current_user() {
        Some(user) => {
            println!("Logged in as {} <{}>", user.full_name, user.email);
            if let Some(avatar) = &user.avatar_url {
                println!("Avatar: {}", avatar);
            }
            println!("Favorites: {}", state.store.favorite_ids().len());
        }
        None => println!("Not logged in"),
    }
}

/// Most recently added first
fn newest_first(mut details: Vec<FavoriteDetail>) -> Vec<FavoriteDetail> {
    details.sort_by(|a, b| b.added_at.cmp(&a.added_at));
    details
}

fn favorite_marker(store: &SessionStore, id: &FavoriteId) -> &'static str {
    if store.is_favorite(id) {
        "*"
    } else {
        " "
    }
}

fn print_artists(state: &AppState, artists: &[Artist]) {
    for artist in artists {
        println!(
            "{} {}  {}",
            favorite_marker(&state.store, &artist.id),
            artist.id,
            artist.name
        );
    }
}

fn print_favorites(state: &AppState) {
    let details = newest_first(state.store.favorite_details());
    if details.is_empty() {
        println!("No favorites");
        return;
    }

    for detail in details {
        println!(
            "{}  {} ({}, {})  added {}",
            detail.id,
            detail.name,
            detail.nationality,
            detail.years,
            detail.added_at.format("%Y-%m-%d")
        );
    }
}

pub async fn run(state: &AppState, command: Command) -> CommandResult {
    let (subscription, mut rx) = state.store.subscribe_channel();

    let status = state.bootstrapper.validate_session().await;
    tracing::info!("Session status: {:?}", status);
    // Drain notifications from validation
    while rx.try_recv().is_ok() {}

    let result = match command {
        Command::Status => {
            if status == SessionStatus::Offline {
                println!("Server unreachable, showing cached session");
            }
            print_session(state);
            println!("Cookies stored for {} host(s)", state.cookies.hosts().len());
            Ok(())
        }
        Command::Login { email, password } => {
            let user = state
                .account
                .login(&email, &password)
                .await
                .context("Login failed")?;
            println!("Welcome {}!", user.full_name);
            await_sync(&state.store, &mut rx, 1).await;
            print_session(state);
            Ok(())
        }
        Command::Register {
            fullname,
            email,
            password,
        } => {
            let user = state
                .account
                .register(&fullname, &email, &password)
                .await
                .context("Registration failed")?;
            println!("Registered successfully as {}", user.full_name);
            await_sync(&state.store, &mut rx, 1).await;
            Ok(())
        }
        Command::Logout => {
            state.account.logout();
            println!("Logged out successfully");
            Ok(())
        }
        Command::Favorites => {
            if !state.store.is_logged_in() {
                bail!("Not logged in");
            }
            print_favorites(state);
            Ok(())
        }
        Command::Toggle { artist_id } => {
            if !state.store.is_logged_in() {
                bail!("Not logged in");
            }
            let adding = state.sync.toggle(artist_id.as_str());
            println!(
                "{} {}",
                if adding { "Adding" } else { "Removing" },
                artist_id
            );

            // optimistic change plus the server's verdict
            await_sync(&state.store, &mut rx, 2).await;
            let now_favorite = state.store.is_favorite(&artist_id.as_str().into());
            if now_favorite != adding {
                bail!("Server did not accept the change for {}", artist_id);
            }
            println!("{} is {}a favorite", artist_id, if now_favorite { "" } else { "not " });
            Ok(())
        }
        Command::Search { query } => {
            let query = query.trim();
            if query.is_empty() {
                bail!("Search query is empty");
            }
            let artists = state
                .catalog
                .search_artists(query)
                .await
                .context("Search failed")?;
            if artists.is_empty() {
                println!("No results found");
            }
            print_artists(state, &artists);
            Ok(())
        }
        Command::Artist { artist_id } => {
            let id = FavoriteId::from(artist_id);
            let details = state
                .catalog
                .artist_details(&id)
                .await
                .context("Failed to load artist")?;
            println!(
                "{} {} ({}, {})",
                favorite_marker(&state.store, &details.id),
                details.name,
                details.nationality,
                details.years
            );
            if !details.biography.is_empty() {
                println!("\n{}", details.biography);
            }

            let artworks = state
                .catalog
                .artworks(&id)
                .await
                .context("Failed to load artworks")?;
            println!("\nArtworks:");
            if artworks.is_empty() {
                println!("  No artworks");
            }
            for artwork in artworks {
                println!("  {}  {}, {}", artwork.id, artwork.title, artwork.date);
            }

            // Similar artists need a session
            if state.store.is_logged_in() {
                match state.catalog.similar_artists(&id).await {
                    Ok(similar) if !similar.is_empty() => {
                        println!("\nSimilar artists:");
                        print_artists(state, &similar);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Error loading similar artists: {}", e),
                }
            }
            Ok(())
        }
        Command::Categories { artwork_id } => {
            let categories = state
                .catalog
                .artwork_categories(&artwork_id)
                .await
                .context("Failed to load categories")?;
            if categories.is_empty() {
                println!("No categories available");
            }
            for category in categories {
                println!("{}  {}", category.id, category.name);
            }
            Ok(())
        }
        Command::Profile => {
            let user = state
                .account
                .refresh_profile()
                .await
                .context("Failed to fetch profile")?;
            println!("Profile refreshed for {}", user.email);
            print_session(state);
            Ok(())
        }
        Command::DeleteAccount => {
            state
                .account
                .delete_account()
                .await
                .context("Failed to delete account")?;
            println!("Account deleted successfully");
            Ok(())
        }
        Command::Config { set_base_url } => {
            if let Some(base_url) = set_base_url {
                let mut settings = state.settings.get();
                settings.base_url = base_url;
                state.settings.update(settings)?;
            }
            let settings = state.settings.get();
            println!("Base URL: {}", settings.base_url);
            println!(
                "Reload retries: {} (backoff {:?})",
                settings.reload_retries,
                settings.retry_backoff()
            );
            println!(
                "Timeouts: connect {:?}, read {:?}",
                settings.connect_timeout(),
                settings.read_timeout()
            );
            Ok(())
        }
    };

    state.store.unsubscribe(subscription);
    result
}
