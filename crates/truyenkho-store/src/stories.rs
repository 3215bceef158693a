//! CRUD operations for [`Story`] records.

use chrono::Utc;
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{
    datetime_from_secs, genres_from_column, genres_to_column, Story, StoryDraft, StoryStatus,
};

/// Columns selected by every story query, in `row_to_story` order.
const STORY_COLUMNS: &str =
    "id, title, slug, author, description, cover_url, genres, status, views, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new story and return the stored row.
    pub fn create_story(&self, draft: &StoryDraft) -> Result<Story> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::Validation("story title is required".into()));
        }

        let now = Utc::now().timestamp();
        self.conn().execute(
            "INSERT INTO stories (title, slug, author, description, cover_url, genres, status, views, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
            params![
                draft.title,
                draft.slug,
                draft.author,
                draft.description,
                draft.cover_url,
                genres_to_column(&draft.genres),
                draft.status.as_str(),
                now,
            ],
        )?;

        self.get_story(self.conn().last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single story by id.
    pub fn get_story(&self, id: i64) -> Result<Story> {
        self.conn()
            .query_row(
                &format!("SELECT {STORY_COLUMNS} FROM stories WHERE id = ?1"),
                params![id],
                row_to_story,
            )
            .map_err(not_found)
    }

    /// Fetch a single story by its URL slug.
    pub fn get_story_by_slug(&self, slug: &str) -> Result<Story> {
        self.conn()
            .query_row(
                &format!("SELECT {STORY_COLUMNS} FROM stories WHERE slug = ?1"),
                params![slug],
                row_to_story,
            )
            .map_err(not_found)
    }

    /// List one page of stories, newest updates first, with the total count.
    ///
    /// `page` is 1-based.  Passing a status restricts the listing.
    pub fn list_stories(
        &self,
        page: u32,
        per_page: u32,
        status: Option<StoryStatus>,
    ) -> Result<(Vec<Story>, u64)> {
        let page = page.max(1);
        let offset = (page - 1) as i64 * per_page as i64;

        let (filter, status_str) = match status {
            Some(s) => ("WHERE status = ?1", s.as_str()),
            None => ("", ""),
        };

        let total: u64 = if filter.is_empty() {
            self.conn()
                .query_row("SELECT COUNT(*) FROM stories", [], |row| row.get(0))?
        } else {
            self.conn().query_row(
                "SELECT COUNT(*) FROM stories WHERE status = ?1",
                params![status_str],
                |row| row.get(0),
            )?
        };

        let sql = format!(
            "SELECT {STORY_COLUMNS} FROM stories {filter}
             ORDER BY updated_at DESC
             LIMIT {per_page} OFFSET {offset}"
        );
        let mut stmt = self.conn().prepare(&sql)?;

        let mut stories = Vec::new();
        if filter.is_empty() {
            let rows = stmt.query_map([], row_to_story)?;
            for row in rows {
                stories.push(row?);
            }
        } else {
            let rows = stmt.query_map(params![status_str], row_to_story)?;
            for row in rows {
                stories.push(row?);
            }
        }
        Ok((stories, total))
    }

    /// List every story.  Used to (re)build the search index.
    pub fn list_all_stories(&self) -> Result<Vec<Story>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {STORY_COLUMNS} FROM stories ORDER BY id ASC"))?;

        let rows = stmt.query_map([], row_to_story)?;

        let mut stories = Vec::new();
        for row in rows {
            stories.push(row?);
        }
        Ok(stories)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update an existing story's editable fields and bump `updated_at`.
    pub fn update_story(&self, id: i64, draft: &StoryDraft) -> Result<Story> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::Validation("story title is required".into()));
        }

        let affected = self.conn().execute(
            "UPDATE stories
             SET title = ?1, slug = ?2, author = ?3, description = ?4, cover_url = ?5,
                 genres = ?6, status = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                draft.title,
                draft.slug,
                draft.author,
                draft.description,
                draft.cover_url,
                genres_to_column(&draft.genres),
                draft.status.as_str(),
                Utc::now().timestamp(),
                id,
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_story(id)
    }

    /// Bump the view counter of a story.
    pub fn increment_story_views(&self, id: i64) -> Result<()> {
        self.conn().execute(
            "UPDATE stories SET views = views + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a story by id.  Chapters cascade.  Returns `true` if a row was
    /// deleted.
    pub fn delete_story(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM stories WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Story`].
fn row_to_story(row: &rusqlite::Row<'_>) -> rusqlite::Result<Story> {
    let genres_col: String = row.get(6)?;
    let status_col: String = row.get(7)?;
    let created_secs: i64 = row.get(9)?;
    let updated_secs: i64 = row.get(10)?;

    Ok(Story {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        author: row.get(3)?,
        description: row.get(4)?,
        cover_url: row.get(5)?,
        genres: genres_from_column(&genres_col),
        status: StoryStatus::parse(&status_col),
        views: row.get(8)?,
        created_at: datetime_from_secs(created_secs),
        updated_at: datetime_from_secs(updated_secs),
    })
}

/// Translate the no-rows case into [`StoreError::NotFound`].
pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::from(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, slug: &str) -> StoryDraft {
        StoryDraft {
            title: title.to_string(),
            slug: slug.to_string(),
            author: "Vong Ngữ".to_string(),
            description: "Một phàm nhân trên con đường tu tiên.".to_string(),
            cover_url: String::new(),
            genres: vec!["tiên hiệp".to_string(), "huyền huyễn".to_string()],
            status: StoryStatus::Ongoing,
        }
    }

    #[test]
    fn create_and_fetch_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let story = db
            .create_story(&draft("Phàm Nhân Tu Tiên", "pham-nhan-tu-tien-ab12cd34"))
            .unwrap();

        assert_eq!(story.genres.len(), 2);
        assert_eq!(story.views, 0);

        let by_slug = db.get_story_by_slug("pham-nhan-tu-tien-ab12cd34").unwrap();
        assert_eq!(by_slug, story);
    }

    #[test]
    fn duplicate_slug_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_story(&draft("A", "same-slug-1")).unwrap();
        let err = db.create_story(&draft("B", "same-slug-1")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn empty_title_fails_validation() {
        let db = Database::open_in_memory().unwrap();
        let err = db.create_story(&draft("   ", "x-1")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn pagination_and_status_filter() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            let mut d = draft(&format!("Truyện {i}"), &format!("truyen-{i}"));
            if i % 2 == 0 {
                d.status = StoryStatus::Completed;
            }
            db.create_story(&d).unwrap();
        }

        let (page, total) = db.list_stories(1, 2, None).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(total, 5);

        let (done, done_total) = db.list_stories(1, 10, Some(StoryStatus::Completed)).unwrap();
        assert_eq!(done.len(), 3);
        assert_eq!(done_total, 3);
    }

    #[test]
    fn update_missing_story_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.update_story(999, &draft("T", "t-999")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn view_counter_increments() {
        let db = Database::open_in_memory().unwrap();
        let story = db.create_story(&draft("T", "t-1")).unwrap();
        db.increment_story_views(story.id).unwrap();
        db.increment_story_views(story.id).unwrap();
        assert_eq!(db.get_story(story.id).unwrap().views, 2);
    }
}
