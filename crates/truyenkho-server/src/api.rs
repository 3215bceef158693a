//! HTTP surface: public read API plus the admin CRUD API.
//!
//! Thin glue only — handlers validate input, call the store, and keep the
//! search index eventually consistent.  Every route returns JSON.
//!
//! The `Database` handle is synchronous `rusqlite`, so the state holds it
//! behind a `tokio::sync::Mutex`; that also serializes the multi-row chapter
//! renumbering against concurrent admin writes.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::Method,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use truyenkho_search::{ItemKind, SearchHit};
use truyenkho_store::{
    Advertisement, AdvertisementDraft, AdKind, CatalogDraft, Chapter, ChapterDraft, Database,
    Ebook, LicensedStory, PurchaseLink, Story, StoryDraft, StoryStatus, StoreError, User,
    UserDraft,
};
use truyenkho_text::{slug_for_id, slug_with_token};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::search_service::{
    searchable_from_ebook, searchable_from_licensed, searchable_from_story, SearchService,
};

/// Attempts at inserting a token-suffixed slug before giving up.
const SLUG_RETRY_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub search: Arc<SearchService>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        // Public read API
        .route("/health", get(health_check))
        .route("/stories", get(list_stories))
        .route("/stories/:slug", get(get_story))
        .route("/stories/:slug/chapters", get(list_story_chapters))
        .route("/stories/:slug/chapters/:number", get(read_chapter))
        .route("/search", get(search))
        .route("/suggest", get(suggest))
        .route("/ebooks", get(list_ebooks))
        .route("/ebooks/:slug", get(get_ebook))
        .route("/licensed", get(list_licensed))
        .route("/licensed/:slug", get(get_licensed))
        .route("/ads/:id/click", post(ad_click))
        // Admin CRUD API
        .route("/admin/stories", post(admin_create_story))
        .route("/admin/stories/:id", put(admin_update_story))
        .route("/admin/stories/:id", delete(admin_delete_story))
        .route("/admin/stories/:id/chapters", post(admin_create_chapter))
        .route("/admin/stories/:id/chapters/:chapter_id", put(admin_update_chapter))
        .route("/admin/stories/:id/chapters/:chapter_id", delete(admin_delete_chapter))
        .route("/admin/ebooks", post(admin_create_ebook))
        .route("/admin/ebooks/:id", put(admin_update_ebook))
        .route("/admin/ebooks/:id", delete(admin_delete_ebook))
        .route("/admin/licensed", post(admin_create_licensed))
        .route("/admin/licensed/:id", put(admin_update_licensed))
        .route("/admin/licensed/:id", delete(admin_delete_licensed))
        .route("/admin/ads", get(admin_list_ads).post(admin_create_ad))
        .route("/admin/ads/:id", put(admin_update_ad))
        .route("/admin/ads/:id", delete(admin_delete_ad))
        .route("/admin/users", get(admin_list_users).post(admin_create_user))
        .route("/admin/users/:id", put(admin_update_user))
        .route("/admin/users/:id", delete(admin_delete_user))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and run the HTTP server.
pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP API listening");
    axum::serve(listener, router).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct StoryListQuery {
    page: Option<u32>,
    status: Option<StoryStatus>,
}

#[derive(Serialize)]
struct StoryListResponse {
    stories: Vec<Story>,
    page: u32,
    per_page: u32,
    total: u64,
}

#[derive(Serialize)]
struct ChapterReadResponse {
    chapter: Chapter,
    /// Active in-chapter advertisements due at this chapter number.
    ads: Vec<Advertisement>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    hits: Vec<SearchHit>,
}

#[derive(Serialize)]
struct SuggestResponse {
    titles: Vec<String>,
}

#[derive(Deserialize)]
struct StoryPayload {
    title: String,
    author: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    cover_url: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default = "default_status")]
    status: StoryStatus,
}

fn default_status() -> StoryStatus {
    StoryStatus::Ongoing
}

#[derive(Deserialize)]
struct ChapterPayload {
    title: String,
    #[serde(default)]
    content: String,
    /// Omitted on create: the chapter is appended (max number + 1).
    number: Option<i64>,
}

#[derive(Deserialize)]
struct CatalogPayload {
    title: String,
    author: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    cover_url: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    purchase_links: Vec<PurchaseLink>,
}

#[derive(Serialize)]
struct DeletedResponse {
    deleted: bool,
}

// ---------------------------------------------------------------------------
// Public handlers
// ---------------------------------------------------------------------------

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_stories(
    State(state): State<AppState>,
    Query(query): Query<StoryListQuery>,
) -> Result<Json<StoryListResponse>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = state.config.page_size;

    let db = state.db.lock().await;
    let (stories, total) = db.list_stories(page, per_page, query.status)?;
    Ok(Json(StoryListResponse {
        stories,
        page,
        per_page,
        total,
    }))
}

async fn get_story(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Story>, ApiError> {
    let db = state.db.lock().await;
    let story = db.get_story_by_slug(&slug)?;
    db.increment_story_views(story.id)?;
    Ok(Json(story))
}

async fn list_story_chapters(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Chapter>>, ApiError> {
    let db = state.db.lock().await;
    let story = db.get_story_by_slug(&slug)?;
    Ok(Json(db.list_chapters(story.id)?))
}

async fn read_chapter(
    State(state): State<AppState>,
    Path((slug, number)): Path<(String, i64)>,
) -> Result<Json<ChapterReadResponse>, ApiError> {
    let db = state.db.lock().await;
    let story = db.get_story_by_slug(&slug)?;
    let chapter = db.get_chapter_by_number(story.id, number)?;
    db.increment_chapter_views(chapter.id)?;

    // Every ad runs on its own cadence: frequency 3 shows on chapters 3, 6, 9...
    let mut ads = Vec::new();
    for ad in db.list_active_advertisements(AdKind::InChapter)? {
        if ad.frequency > 0 && number % ad.frequency == 0 {
            db.record_ad_impression(ad.id)?;
            ads.push(ad);
        }
    }

    Ok(Json(ChapterReadResponse { chapter, ads }))
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.config.search_limit)
        .min(state.config.search_limit);
    let hits = state.search.search(&query.q, limit).await?;
    Ok(Json(SearchResponse { hits }))
}

async fn suggest(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.config.suggest_limit)
        .min(state.config.suggest_limit);
    let titles = state.search.suggest(&query.q, limit).await?;
    Ok(Json(SuggestResponse { titles }))
}

async fn list_ebooks(State(state): State<AppState>) -> Result<Json<Vec<Ebook>>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_ebooks()?))
}

async fn get_ebook(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Ebook>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.get_ebook_by_slug(&slug)?))
}

async fn list_licensed(
    State(state): State<AppState>,
) -> Result<Json<Vec<LicensedStory>>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_licensed_stories()?))
}

async fn get_licensed(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<LicensedStory>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.get_licensed_story_by_slug(&slug)?))
}

async fn ad_click(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Advertisement>, ApiError> {
    let db = state.db.lock().await;
    let ad = db.get_advertisement(id)?;
    db.record_ad_click(ad.id)?;
    Ok(Json(ad))
}

// ---------------------------------------------------------------------------
// Admin: stories
// ---------------------------------------------------------------------------

async fn admin_create_story(
    State(state): State<AppState>,
    Json(payload): Json<StoryPayload>,
) -> Result<Json<Story>, ApiError> {
    let db = state.db.lock().await;

    // The slug token is random; on the (unlikely) UNIQUE collision we mint a
    // fresh one and try again.
    let mut last_conflict = String::new();
    for _ in 0..SLUG_RETRY_ATTEMPTS {
        let slug = slug_with_token(&payload.title)?;
        match db.create_story(&StoryDraft {
            title: payload.title.clone(),
            slug,
            author: payload.author.clone(),
            description: payload.description.clone(),
            cover_url: payload.cover_url.clone(),
            genres: payload.genres.clone(),
            status: payload.status,
        }) {
            Ok(story) => {
                state.search.upsert(searchable_from_story(&story)).await;
                return Ok(Json(story));
            }
            Err(StoreError::Duplicate(msg)) => last_conflict = msg,
            Err(e) => return Err(e.into()),
        }
    }
    Err(ApiError::Conflict(last_conflict))
}

async fn admin_update_story(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<StoryPayload>,
) -> Result<Json<Story>, ApiError> {
    let db = state.db.lock().await;

    // Edit flows regenerate the slug from the (possibly changed) title with
    // the stable id suffix.
    let slug = slug_for_id(&payload.title, id)?;
    let story = db.update_story(
        id,
        &StoryDraft {
            title: payload.title,
            slug,
            author: payload.author,
            description: payload.description,
            cover_url: payload.cover_url,
            genres: payload.genres,
            status: payload.status,
        },
    )?;

    state.search.upsert(searchable_from_story(&story)).await;
    Ok(Json(story))
}

async fn admin_delete_story(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let db = state.db.lock().await;
    let deleted = db.delete_story(id)?;
    if deleted {
        state.search.remove(ItemKind::Story, id).await;
    }
    Ok(Json(DeletedResponse { deleted }))
}

// ---------------------------------------------------------------------------
// Admin: chapters
// ---------------------------------------------------------------------------

/// Reject a write whose explicit `number` is already held by another chapter
/// of the story.  Number uniqueness is a handler contract; the schema only
/// enforces UNIQUE on slugs, so skipping this check would leave the story
/// with two chapters at the same position.
fn ensure_chapter_number_free(
    db: &Database,
    story_id: i64,
    number: i64,
    current_id: Option<i64>,
) -> Result<(), ApiError> {
    match db.get_chapter_by_number(story_id, number) {
        Ok(holder) if Some(holder.id) != current_id => Err(ApiError::Conflict(format!(
            "chapter number {number} is already taken"
        ))),
        Ok(_) => Ok(()),
        Err(StoreError::NotFound) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn admin_create_chapter(
    State(state): State<AppState>,
    Path(story_id): Path<i64>,
    Json(payload): Json<ChapterPayload>,
) -> Result<Json<Chapter>, ApiError> {
    let db = state.db.lock().await;

    // Make sure the story exists before minting a chapter for it.
    db.get_story(story_id)?;
    let number = match payload.number {
        Some(n) => {
            ensure_chapter_number_free(&db, story_id, n, None)?;
            n
        }
        None => db.next_chapter_number(story_id)?,
    };

    let mut last_conflict = String::new();
    for _ in 0..SLUG_RETRY_ATTEMPTS {
        let slug = slug_with_token(&payload.title)?;
        match db.upsert_chapter(
            story_id,
            None,
            &ChapterDraft {
                title: payload.title.clone(),
                content: payload.content.clone(),
                slug,
                number,
            },
        ) {
            Ok(chapter) => return Ok(Json(chapter)),
            Err(StoreError::Duplicate(msg)) => last_conflict = msg,
            Err(e) => return Err(e.into()),
        }
    }
    Err(ApiError::Conflict(last_conflict))
}

async fn admin_update_chapter(
    State(state): State<AppState>,
    Path((story_id, chapter_id)): Path<(i64, i64)>,
    Json(payload): Json<ChapterPayload>,
) -> Result<Json<Chapter>, ApiError> {
    let db = state.db.lock().await;

    let existing = db.get_chapter(chapter_id)?;
    let number = payload.number.unwrap_or(existing.number);
    ensure_chapter_number_free(&db, story_id, number, Some(chapter_id))?;
    let slug = slug_for_id(&payload.title, chapter_id)?;

    let chapter = db.upsert_chapter(
        story_id,
        Some(chapter_id),
        &ChapterDraft {
            title: payload.title,
            content: payload.content,
            slug,
            number,
        },
    )?;
    Ok(Json(chapter))
}

async fn admin_delete_chapter(
    State(state): State<AppState>,
    Path((story_id, chapter_id)): Path<(i64, i64)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let mut db = state.db.lock().await;

    let deleted = db.delete_chapter(story_id, chapter_id)?;
    // Belt and braces: densify in case older non-transactional builds left a
    // gap behind.
    let repaired = db.repair_chapter_numbers(story_id)?;
    if repaired > 0 {
        tracing::warn!(story_id, repaired, "chapter numbering needed repair after delete");
    }
    Ok(Json(DeletedResponse { deleted }))
}

// ---------------------------------------------------------------------------
// Admin: ebooks & licensed stories
// ---------------------------------------------------------------------------

impl CatalogPayload {
    fn into_draft(self, slug: String) -> CatalogDraft {
        CatalogDraft {
            title: self.title,
            slug,
            author: self.author,
            description: self.description,
            cover_url: self.cover_url,
            genres: self.genres,
            purchase_links: self.purchase_links,
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        for link in &self.purchase_links {
            if !link.url.starts_with("http://") && !link.url.starts_with("https://") {
                return Err(ApiError::BadRequest(format!(
                    "malformed purchase link URL: {}",
                    link.url
                )));
            }
        }
        Ok(())
    }
}

async fn admin_create_ebook(
    State(state): State<AppState>,
    Json(payload): Json<CatalogPayload>,
) -> Result<Json<Ebook>, ApiError> {
    payload.validate()?;
    let db = state.db.lock().await;

    let mut last_conflict = String::new();
    for _ in 0..SLUG_RETRY_ATTEMPTS {
        let slug = slug_with_token(&payload.title)?;
        match db.create_ebook(&CatalogDraft {
            title: payload.title.clone(),
            slug,
            author: payload.author.clone(),
            description: payload.description.clone(),
            cover_url: payload.cover_url.clone(),
            genres: payload.genres.clone(),
            purchase_links: payload.purchase_links.clone(),
        }) {
            Ok(ebook) => {
                state.search.upsert(searchable_from_ebook(&ebook)).await;
                return Ok(Json(ebook));
            }
            Err(StoreError::Duplicate(msg)) => last_conflict = msg,
            Err(e) => return Err(e.into()),
        }
    }
    Err(ApiError::Conflict(last_conflict))
}

async fn admin_update_ebook(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CatalogPayload>,
) -> Result<Json<Ebook>, ApiError> {
    payload.validate()?;
    let db = state.db.lock().await;

    let slug = slug_for_id(&payload.title, id)?;
    let ebook = db.update_ebook(id, &payload.into_draft(slug))?;
    state.search.upsert(searchable_from_ebook(&ebook)).await;
    Ok(Json(ebook))
}

async fn admin_delete_ebook(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let db = state.db.lock().await;
    let deleted = db.delete_ebook(id)?;
    if deleted {
        state.search.remove(ItemKind::Ebook, id).await;
    }
    Ok(Json(DeletedResponse { deleted }))
}

async fn admin_create_licensed(
    State(state): State<AppState>,
    Json(payload): Json<CatalogPayload>,
) -> Result<Json<LicensedStory>, ApiError> {
    payload.validate()?;
    let db = state.db.lock().await;

    let mut last_conflict = String::new();
    for _ in 0..SLUG_RETRY_ATTEMPTS {
        let slug = slug_with_token(&payload.title)?;
        match db.create_licensed_story(&CatalogDraft {
            title: payload.title.clone(),
            slug,
            author: payload.author.clone(),
            description: payload.description.clone(),
            cover_url: payload.cover_url.clone(),
            genres: payload.genres.clone(),
            purchase_links: payload.purchase_links.clone(),
        }) {
            Ok(story) => {
                state.search.upsert(searchable_from_licensed(&story)).await;
                return Ok(Json(story));
            }
            Err(StoreError::Duplicate(msg)) => last_conflict = msg,
            Err(e) => return Err(e.into()),
        }
    }
    Err(ApiError::Conflict(last_conflict))
}

async fn admin_update_licensed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CatalogPayload>,
) -> Result<Json<LicensedStory>, ApiError> {
    payload.validate()?;
    let db = state.db.lock().await;

    let slug = slug_for_id(&payload.title, id)?;
    let story = db.update_licensed_story(id, &payload.into_draft(slug))?;
    state.search.upsert(searchable_from_licensed(&story)).await;
    Ok(Json(story))
}

async fn admin_delete_licensed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let db = state.db.lock().await;
    let deleted = db.delete_licensed_story(id)?;
    if deleted {
        state.search.remove(ItemKind::LicensedStory, id).await;
    }
    Ok(Json(DeletedResponse { deleted }))
}

// ---------------------------------------------------------------------------
// Admin: advertisements
// ---------------------------------------------------------------------------

fn validate_ad(draft: &AdvertisementDraft) -> Result<(), ApiError> {
    for url in [&draft.image_url, &draft.affiliate_url] {
        if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ApiError::BadRequest(format!("malformed URL: {url}")));
        }
    }
    Ok(())
}

async fn admin_list_ads(
    State(state): State<AppState>,
) -> Result<Json<Vec<Advertisement>>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_advertisements()?))
}

async fn admin_create_ad(
    State(state): State<AppState>,
    Json(draft): Json<AdvertisementDraft>,
) -> Result<Json<Advertisement>, ApiError> {
    validate_ad(&draft)?;
    let db = state.db.lock().await;
    Ok(Json(db.create_advertisement(&draft)?))
}

async fn admin_update_ad(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<AdvertisementDraft>,
) -> Result<Json<Advertisement>, ApiError> {
    validate_ad(&draft)?;
    let db = state.db.lock().await;
    Ok(Json(db.update_advertisement(id, &draft)?))
}

async fn admin_delete_ad(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(DeletedResponse {
        deleted: db.delete_advertisement(id)?,
    }))
}

// ---------------------------------------------------------------------------
// Admin: users
// ---------------------------------------------------------------------------

async fn admin_list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_users()?))
}

async fn admin_create_user(
    State(state): State<AppState>,
    Json(draft): Json<UserDraft>,
) -> Result<Json<User>, ApiError> {
    if !draft.email.contains('@') {
        return Err(ApiError::BadRequest("malformed email".into()));
    }
    let db = state.db.lock().await;
    Ok(Json(db.create_user(&draft)?))
}

async fn admin_update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<UserDraft>,
) -> Result<Json<User>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.update_user(id, &draft)?))
}

async fn admin_delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(DeletedResponse {
        deleted: db.delete_user(id)?,
    }))
}
