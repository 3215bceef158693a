//! CRUD operations for [`LicensedStory`] records.

use chrono::Utc;
use rusqlite::params;

use crate::database::Database;
use crate::ebooks::{links_from_column, links_to_column};
use crate::error::{Result, StoreError};
use crate::models::{
    datetime_from_secs, genres_from_column, genres_to_column, CatalogDraft, LicensedStory,
};
use crate::stories::not_found;

const LICENSED_COLUMNS: &str = "id, title, slug, author, description, cover_url, genres, purchase_links, views, created_at, updated_at";

impl Database {
    /// Insert a new licensed story and return the stored row.
    pub fn create_licensed_story(&self, draft: &CatalogDraft) -> Result<LicensedStory> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::Validation(
                "licensed story title is required".into(),
            ));
        }

        let now = Utc::now().timestamp();
        self.conn().execute(
            "INSERT INTO licensed_stories (title, slug, author, description, cover_url, genres, purchase_links, views, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
            params![
                draft.title,
                draft.slug,
                draft.author,
                draft.description,
                draft.cover_url,
                genres_to_column(&draft.genres),
                links_to_column(&draft.purchase_links)?,
                now,
            ],
        )?;

        self.get_licensed_story(self.conn().last_insert_rowid())
    }

    /// Fetch a single licensed story by id.
    pub fn get_licensed_story(&self, id: i64) -> Result<LicensedStory> {
        self.conn()
            .query_row(
                &format!("SELECT {LICENSED_COLUMNS} FROM licensed_stories WHERE id = ?1"),
                params![id],
                row_to_licensed,
            )
            .map_err(not_found)
    }

    /// Fetch a single licensed story by its URL slug.
    pub fn get_licensed_story_by_slug(&self, slug: &str) -> Result<LicensedStory> {
        self.conn()
            .query_row(
                &format!("SELECT {LICENSED_COLUMNS} FROM licensed_stories WHERE slug = ?1"),
                params![slug],
                row_to_licensed,
            )
            .map_err(not_found)
    }

    /// List every licensed story, newest first.
    pub fn list_licensed_stories(&self) -> Result<Vec<LicensedStory>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LICENSED_COLUMNS} FROM licensed_stories ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map([], row_to_licensed)?;

        let mut stories = Vec::new();
        for row in rows {
            stories.push(row?);
        }
        Ok(stories)
    }

    /// Update an existing licensed story's fields and bump `updated_at`.
    pub fn update_licensed_story(&self, id: i64, draft: &CatalogDraft) -> Result<LicensedStory> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::Validation(
                "licensed story title is required".into(),
            ));
        }

        let affected = self.conn().execute(
            "UPDATE licensed_stories
             SET title = ?1, slug = ?2, author = ?3, description = ?4, cover_url = ?5,
                 genres = ?6, purchase_links = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                draft.title,
                draft.slug,
                draft.author,
                draft.description,
                draft.cover_url,
                genres_to_column(&draft.genres),
                links_to_column(&draft.purchase_links)?,
                Utc::now().timestamp(),
                id,
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_licensed_story(id)
    }

    /// Delete a licensed story by id.  Returns `true` if a row was deleted.
    pub fn delete_licensed_story(&self, id: i64) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM licensed_stories WHERE id = ?1",
            params![id],
        )?;
        Ok(affected > 0)
    }
}

/// Map a `rusqlite::Row` to a [`LicensedStory`].
fn row_to_licensed(row: &rusqlite::Row<'_>) -> rusqlite::Result<LicensedStory> {
    let genres_col: String = row.get(6)?;
    let links_col: String = row.get(7)?;
    let created_secs: i64 = row.get(9)?;
    let updated_secs: i64 = row.get(10)?;

    Ok(LicensedStory {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        author: row.get(3)?,
        description: row.get(4)?,
        cover_url: row.get(5)?,
        genres: genres_from_column(&genres_col),
        purchase_links: links_from_column(&links_col),
        views: row.get(8)?,
        created_at: datetime_from_secs(created_secs),
        updated_at: datetime_from_secs(updated_secs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PurchaseLink;

    #[test]
    fn create_list_delete() {
        let db = Database::open_in_memory().unwrap();
        let story = db
            .create_licensed_story(&CatalogDraft {
                title: "Thiên Quan Tứ Phúc".to_string(),
                slug: "thien-quan-tu-phuc-xy98zw76".to_string(),
                author: "Mặc Hương Đồng Khứu".to_string(),
                description: String::new(),
                cover_url: String::new(),
                genres: vec!["đam mỹ".to_string()],
                purchase_links: vec![PurchaseLink {
                    store: "Fahasa".to_string(),
                    url: "https://fahasa.com/tqtp".to_string(),
                }],
            })
            .unwrap();

        let listed = db.list_licensed_stories().unwrap();
        assert_eq!(listed, vec![story.clone()]);

        assert!(db.delete_licensed_story(story.id).unwrap());
        assert!(db.list_licensed_stories().unwrap().is_empty());
    }
}
