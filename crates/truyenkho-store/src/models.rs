//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer as JSON.  Timestamps are `DateTime<Utc>` in
//! Rust and integer unix seconds in storage; the comma-joined `genres`
//! column and the JSON `purchase_links` column are converted at the storage
//! boundary only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Story
// ---------------------------------------------------------------------------

/// Publication status of a story.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoryStatus {
    Ongoing,
    Completed,
}

impl StoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStatus::Ongoing => "ongoing",
            StoryStatus::Completed => "completed",
        }
    }

    /// Parse the storage representation; unknown values fall back to ongoing.
    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => StoryStatus::Completed,
            _ => StoryStatus::Ongoing,
        }
    }
}

/// A serialized web novel with chapters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Story {
    pub id: i64,
    pub title: String,
    /// URL-safe identifier, unique across stories.
    pub slug: String,
    pub author: String,
    pub description: String,
    /// Reference to the cover image (external URL or object-store key).
    pub cover_url: String,
    /// Free-text genre tags, ordered.
    pub genres: Vec<String>,
    pub status: StoryStatus,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating or updating a [`Story`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryDraft {
    pub title: String,
    pub slug: String,
    pub author: String,
    pub description: String,
    pub cover_url: String,
    pub genres: Vec<String>,
    pub status: StoryStatus,
}

// ---------------------------------------------------------------------------
// Chapter
// ---------------------------------------------------------------------------

/// A single chapter of a [`Story`].
///
/// `number` is maintained as a dense 1..N sequence per story; deletion
/// renumbers the chapters that follow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chapter {
    pub id: i64,
    pub story_id: i64,
    pub title: String,
    /// Raw chapter body (HTML or plain text).
    pub content: String,
    pub slug: String,
    pub number: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating or updating a [`Chapter`].
///
/// The store does not validate `number` or `slug` uniqueness beyond the
/// schema constraints; admin flows pre-check them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterDraft {
    pub title: String,
    pub content: String,
    pub slug: String,
    pub number: i64,
}

// ---------------------------------------------------------------------------
// Licensed stories & ebooks
// ---------------------------------------------------------------------------

/// Where a licensed title or ebook can be bought.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseLink {
    pub store: String,
    pub url: String,
}

/// A licensed (externally published) story.  No chapters are hosted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LicensedStory {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub description: String,
    pub cover_url: String,
    pub genres: Vec<String>,
    pub purchase_links: Vec<PurchaseLink>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An ebook in the catalog.  Same shape as [`LicensedStory`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ebook {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub description: String,
    pub cover_url: String,
    pub genres: Vec<String>,
    pub purchase_links: Vec<PurchaseLink>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for the licensed-story and ebook catalogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDraft {
    pub title: String,
    pub slug: String,
    pub author: String,
    pub description: String,
    pub cover_url: String,
    pub genres: Vec<String>,
    pub purchase_links: Vec<PurchaseLink>,
}

// ---------------------------------------------------------------------------
// Advertisement
// ---------------------------------------------------------------------------

/// Placement slot for an advertisement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdKind {
    InChapter,
    Priority,
    Banner,
    Loading,
    EbookWaiting,
    Other,
}

impl AdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdKind::InChapter => "in_chapter",
            AdKind::Priority => "priority",
            AdKind::Banner => "banner",
            AdKind::Loading => "loading",
            AdKind::EbookWaiting => "ebook_waiting",
            AdKind::Other => "other",
        }
    }

    /// Parse the storage representation; unknown values fall back to other.
    pub fn parse(s: &str) -> Self {
        match s {
            "in_chapter" => AdKind::InChapter,
            "priority" => AdKind::Priority,
            "banner" => AdKind::Banner,
            "loading" => AdKind::Loading,
            "ebook_waiting" => AdKind::EbookWaiting,
            _ => AdKind::Other,
        }
    }
}

/// An advertisement with impression/click counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Advertisement {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub affiliate_url: String,
    pub impressions: i64,
    pub clicks: i64,
    pub active: bool,
    /// Show the ad every N chapters (in-chapter placements).
    pub frequency: i64,
    pub kind: AdKind,
}

/// Caller-supplied fields for creating or updating an [`Advertisement`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvertisementDraft {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub affiliate_url: String,
    pub active: bool,
    pub frequency: i64,
    pub kind: AdKind,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Back-office role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
        }
    }

    /// Parse the storage representation; unknown values fall back to editor.
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::Editor,
        }
    }
}

/// A back-office account.  Password hashing happens upstream; the store only
/// persists the opaque hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
}

/// Caller-supplied fields for creating or updating a [`User`].
#[derive(Debug, Clone, Deserialize)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

// ---------------------------------------------------------------------------
// Storage-boundary helpers
// ---------------------------------------------------------------------------

/// Decode the integer unix-seconds column into a `DateTime<Utc>`.
///
/// Out-of-range values (never produced by this crate) clamp to the epoch.
pub(crate) fn datetime_from_secs(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

/// Join genre tags into the single TEXT column the schema uses.
pub(crate) fn genres_to_column(genres: &[String]) -> String {
    genres.join(",")
}

/// Split the comma-joined genre column back into an ordered tag list.
///
/// Trims whitespace around each tag and drops empty entries, so legacy
/// values like `"tiên hiệp, huyền huyễn,"` parse cleanly.
pub(crate) fn genres_from_column(column: &str) -> Vec<String> {
    column
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genres_round_trip() {
        let tags = vec!["tiên hiệp".to_string(), "huyền huyễn".to_string()];
        let col = genres_to_column(&tags);
        assert_eq!(genres_from_column(&col), tags);
    }

    #[test]
    fn genres_column_tolerates_sloppy_input() {
        assert_eq!(
            genres_from_column(" a , b ,, c ,"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(genres_from_column("").is_empty());
    }

    #[test]
    fn enum_storage_round_trips() {
        assert_eq!(StoryStatus::parse(StoryStatus::Completed.as_str()), StoryStatus::Completed);
        assert_eq!(AdKind::parse(AdKind::EbookWaiting.as_str()), AdKind::EbookWaiting);
        assert_eq!(UserRole::parse(UserRole::Admin.as_str()), UserRole::Admin);
        // Unknown values degrade to the safe defaults.
        assert_eq!(StoryStatus::parse("???"), StoryStatus::Ongoing);
        assert_eq!(AdKind::parse("???"), AdKind::Other);
    }
}
