//! CRUD operations for [`Ebook`] records.
//!
//! `purchase_links` is persisted as a JSON array column; conversion happens
//! only at this boundary.

use chrono::Utc;
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{
    datetime_from_secs, genres_from_column, genres_to_column, CatalogDraft, Ebook, PurchaseLink,
};
use crate::stories::not_found;

/// Columns selected by every ebook query, in `row_to_ebook` order.
const EBOOK_COLUMNS: &str = "id, title, slug, author, description, cover_url, genres, purchase_links, views, created_at, updated_at";

impl Database {
    /// Insert a new ebook and return the stored row.
    pub fn create_ebook(&self, draft: &CatalogDraft) -> Result<Ebook> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::Validation("ebook title is required".into()));
        }

        let now = Utc::now().timestamp();
        self.conn().execute(
            "INSERT INTO ebooks (title, slug, author, description, cover_url, genres, purchase_links, views, created_at, updated_at)
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

        self.get_ebook(self.conn().last_insert_rowid())
    }

    /// Fetch a single ebook by id.
    pub fn get_ebook(&self, id: i64) -> Result<Ebook> {
        self.conn()
            .query_row(
                &format!("SELECT {EBOOK_COLUMNS} FROM ebooks WHERE id = ?1"),
                params![id],
                row_to_ebook,
            )
            .map_err(not_found)
    }

    /// Fetch a single ebook by its URL slug.
    pub fn get_ebook_by_slug(&self, slug: &str) -> Result<Ebook> {
        self.conn()
            .query_row(
                &format!("SELECT {EBOOK_COLUMNS} FROM ebooks WHERE slug = ?1"),
                params![slug],
                row_to_ebook,
            )
            .map_err(not_found)
    }

    /// List every ebook, newest first.
    pub fn list_ebooks(&self) -> Result<Vec<Ebook>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {EBOOK_COLUMNS} FROM ebooks ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map([], row_to_ebook)?;

        let mut ebooks = Vec::new();
        for row in rows {
            ebooks.push(row?);
        }
        Ok(ebooks)
    }

    /// Update an existing ebook's fields and bump `updated_at`.
    pub fn update_ebook(&self, id: i64, draft: &CatalogDraft) -> Result<Ebook> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::Validation("ebook title is required".into()));
        }

        let affected = self.conn().execute(
            "UPDATE ebooks
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
        self.get_ebook(id)
    }

    /// Delete an ebook by id.  Returns `true` if a row was deleted.
    pub fn delete_ebook(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM ebooks WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Serialize purchase links into the JSON TEXT column.
pub(crate) fn links_to_column(links: &[PurchaseLink]) -> Result<String> {
    serde_json::to_string(links)
        .map_err(|e| StoreError::Validation(format!("invalid purchase links: {e}")))
}

/// Parse the JSON purchase-links column; malformed legacy data reads as empty.
pub(crate) fn links_from_column(column: &str) -> Vec<PurchaseLink> {
    serde_json::from_str(column).unwrap_or_default()
}

/// Map a `rusqlite::Row` to an [`Ebook`].
fn row_to_ebook(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ebook> {
    let genres_col: String = row.get(6)?;
    let links_col: String = row.get(7)?;
    let created_secs: i64 = row.get(9)?;
    let updated_secs: i64 = row.get(10)?;

    Ok(Ebook {
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

    fn draft() -> CatalogDraft {
        CatalogDraft {
            title: "Ma Thổi Đèn".to_string(),
            slug: "ma-thoi-den-ab12cd34".to_string(),
            author: "Thiên Hạ Bá Xướng".to_string(),
            description: String::new(),
            cover_url: String::new(),
            genres: vec!["trinh thám".to_string()],
            purchase_links: vec![PurchaseLink {
                store: "Tiki".to_string(),
                url: "https://tiki.vn/ma-thoi-den".to_string(),
            }],
        }
    }

    #[test]
    fn purchase_links_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let ebook = db.create_ebook(&draft()).unwrap();
        assert_eq!(ebook.purchase_links.len(), 1);
        assert_eq!(ebook.purchase_links[0].store, "Tiki");

        let fetched = db.get_ebook_by_slug("ma-thoi-den-ab12cd34").unwrap();
        assert_eq!(fetched, ebook);
    }

    #[test]
    fn malformed_links_column_reads_as_empty() {
        let db = Database::open_in_memory().unwrap();
        let ebook = db.create_ebook(&draft()).unwrap();
        db.conn()
            .execute(
                "UPDATE ebooks SET purchase_links = 'not-json' WHERE id = ?1",
                params![ebook.id],
            )
            .unwrap();
        assert!(db.get_ebook(ebook.id).unwrap().purchase_links.is_empty());
    }

    #[test]
    fn update_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let ebook = db.create_ebook(&draft()).unwrap();

        let mut d = draft();
        d.title = "Ma Thổi Đèn (tái bản)".to_string();
        let updated = db.update_ebook(ebook.id, &d).unwrap();
        assert_eq!(updated.title, "Ma Thổi Đèn (tái bản)");

        assert!(db.delete_ebook(ebook.id).unwrap());
        assert!(matches!(db.get_ebook(ebook.id), Err(StoreError::NotFound)));
    }
}
