//! # truyenkho-server
//!
//! HTTP backend for the truyenkho web-novel platform.
//!
//! This binary provides:
//! - **Public read API** (axum): story listing, chapter reader, catalog
//!   pages, diacritic-insensitive search and title suggestions
//! - **Admin CRUD API** for stories, chapters, licensed stories, ebooks,
//!   advertisements and back-office users
//! - **Chapter renumbering** on delete, so chapter numbers stay a dense
//!   1..N sequence per story
//! - **In-memory search index** rebuilt from SQLite at startup and kept
//!   eventually consistent after every admin write

mod api;
mod config;
mod error;
mod search_service;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use truyenkho_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::search_service::{
    searchable_from_ebook, searchable_from_licensed, searchable_from_story, SearchService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,truyenkho_server=debug")),
        )
        .init();

    info!("Starting truyenkho server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the database (runs migrations)
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.database_path)?;

    // -----------------------------------------------------------------------
    // 4. Build the search index from the full catalog
    // -----------------------------------------------------------------------
    let search = Arc::new(SearchService::new());
    let mut items = Vec::new();
    items.extend(db.list_all_stories()?.iter().map(searchable_from_story));
    items.extend(db.list_licensed_stories()?.iter().map(searchable_from_licensed));
    items.extend(db.list_ebooks()?.iter().map(searchable_from_ebook));
    info!(documents = items.len(), "building search index");
    search.rebuild(items).await;

    let db = Arc::new(Mutex::new(db));

    // -----------------------------------------------------------------------
    // 5. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic numbering sweep (every 30 minutes): self-heals any story whose
    // chapter sequence was left gapped, e.g. by a crash on an older build.
    let sweep_db = db.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1800));
        loop {
            interval.tick().await;
            let mut db = sweep_db.lock().await;
            let stories = match db.list_all_stories() {
                Ok(stories) => stories,
                Err(e) => {
                    tracing::warn!(error = %e, "repair sweep could not list stories");
                    continue;
                }
            };
            for story in stories {
                if let Err(e) = db.repair_chapter_numbers(story.id) {
                    tracing::warn!(story_id = story.id, error = %e, "repair sweep failed");
                }
            }
        }
    });

    // -----------------------------------------------------------------------
    // 6. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    let state = AppState {
        db,
        search,
        config: Arc::new(config.clone()),
    };

    tokio::select! {
        result = api::serve(state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
