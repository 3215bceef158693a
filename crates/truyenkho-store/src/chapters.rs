//! Chapter lifecycle: upsert, delete-with-renumber, repair, listing.
//!
//! Each story keeps its chapters numbered as a dense 1..N sequence.  The
//! invariant is maintained reactively: deleting chapter k shifts every later
//! chapter down by one, and [`Database::repair_chapter_numbers`] rewrites any
//! story whose sequence has drifted (e.g. after a crash on an old,
//! non-transactional build).  Both multi-row operations run inside a single
//! SQLite transaction, so a crash can no longer leave a gapped story.
//!
//! Uniqueness of `number` and `slug` within a story is a caller contract for
//! [`Database::upsert_chapter`]; the store only enforces the schema-level
//! UNIQUE on slugs.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{datetime_from_secs, Chapter, ChapterDraft};
use crate::stories::not_found;

/// Columns selected by every chapter query, in `row_to_chapter` order.
const CHAPTER_COLUMNS: &str =
    "id, story_id, title, content, slug, number, views, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Upsert
    // ------------------------------------------------------------------

    /// Update an existing chapter (when `chapter_id` is given) or insert a
    /// new one owned by `story_id`.  Returns the resulting row.
    pub fn upsert_chapter(
        &self,
        story_id: i64,
        chapter_id: Option<i64>,
        draft: &ChapterDraft,
    ) -> Result<Chapter> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::Validation("chapter title is required".into()));
        }
        if draft.number < 1 {
            return Err(StoreError::Validation(
                "chapter number must be at least 1".into(),
            ));
        }

        let now = Utc::now().timestamp();
        match chapter_id {
            Some(id) => {
                let affected = self.conn().execute(
                    "UPDATE chapters
                     SET title = ?1, content = ?2, slug = ?3, number = ?4, updated_at = ?5
                     WHERE id = ?6 AND story_id = ?7",
                    params![draft.title, draft.content, draft.slug, draft.number, now, id, story_id],
                )?;
                if affected == 0 {
                    return Err(StoreError::NotFound);
                }
                self.get_chapter(id)
            }
            None => {
                self.conn().execute(
                    "INSERT INTO chapters (story_id, title, content, slug, number, views, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
                    params![story_id, draft.title, draft.content, draft.slug, draft.number, now],
                )?;
                self.get_chapter(self.conn().last_insert_rowid())
            }
        }
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single chapter by id.
    pub fn get_chapter(&self, id: i64) -> Result<Chapter> {
        self.conn()
            .query_row(
                &format!("SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = ?1"),
                params![id],
                row_to_chapter,
            )
            .map_err(not_found)
    }

    /// Fetch a chapter by its position within a story.
    pub fn get_chapter_by_number(&self, story_id: i64, number: i64) -> Result<Chapter> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {CHAPTER_COLUMNS} FROM chapters
                     WHERE story_id = ?1 AND number = ?2"
                ),
                params![story_id, number],
                row_to_chapter,
            )
            .map_err(not_found)
    }

    /// List all chapters of a story ordered by number.
    ///
    /// NULL timestamps (legacy rows) are filled with "now" for display; the
    /// fallback is never written back.
    pub fn list_chapters(&self, story_id: i64) -> Result<Vec<Chapter>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters
             WHERE story_id = ?1
             ORDER BY number ASC"
        ))?;

        let rows = stmt.query_map(params![story_id], row_to_chapter)?;

        let mut chapters = Vec::new();
        for row in rows {
            chapters.push(row?);
        }
        Ok(chapters)
    }

    /// The number the next appended chapter should get (max + 1).
    pub fn next_chapter_number(&self, story_id: i64) -> Result<i64> {
        let next: i64 = self.conn().query_row(
            "SELECT COALESCE(MAX(number), 0) + 1 FROM chapters WHERE story_id = ?1",
            params![story_id],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    /// Bump the view counter of a chapter.
    pub fn increment_chapter_views(&self, id: i64) -> Result<()> {
        self.conn().execute(
            "UPDATE chapters SET views = views + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete + renumber
    // ------------------------------------------------------------------

    /// Delete a chapter and close the numbering gap it leaves.
    ///
    /// Later chapters are shifted down by one in ascending number order, so
    /// each target number is already vacant when its update runs.  The whole
    /// sequence is one transaction.  Deleting an absent chapter is a
    /// successful no-op; the return value says whether a row was removed.
    pub fn delete_chapter(&mut self, story_id: i64, chapter_id: i64) -> Result<bool> {
        let number: Option<i64> = self
            .conn()
            .query_row(
                "SELECT number FROM chapters WHERE id = ?1 AND story_id = ?2",
                params![chapter_id, story_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(number) = number else {
            return Ok(false);
        };

        let now = Utc::now().timestamp();
        let tx = self.conn_mut().transaction()?;

        tx.execute("DELETE FROM chapters WHERE id = ?1", params![chapter_id])?;

        let later: Vec<i64> = {
            let mut stmt = tx.prepare(
                "SELECT id FROM chapters
                 WHERE story_id = ?1 AND number > ?2
                 ORDER BY number ASC",
            )?;
            let rows = stmt.query_map(params![story_id, number], |row| row.get(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            ids
        };

        for id in &later {
            tx.execute(
                "UPDATE chapters SET number = number - 1, updated_at = ?1 WHERE id = ?2",
                params![now, id],
            )?;
        }

        tx.commit()?;

        tracing::debug!(
            story_id,
            chapter_id,
            shifted = later.len(),
            "deleted chapter and renumbered"
        );
        Ok(true)
    }

    /// Rewrite any chapter whose number deviates from its 1..N position.
    ///
    /// A no-op (zero writes) on an already-contiguous story.  Returns the
    /// number of rows rewritten.  Transactional.
    pub fn repair_chapter_numbers(&mut self, story_id: i64) -> Result<usize> {
        let now = Utc::now().timestamp();
        let tx = self.conn_mut().transaction()?;

        let numbered: Vec<(i64, i64)> = {
            let mut stmt = tx.prepare(
                "SELECT id, number FROM chapters
                 WHERE story_id = ?1
                 ORDER BY number ASC",
            )?;
            let rows = stmt.query_map(params![story_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            out
        };

        let mut rewritten = 0;
        for (position, (id, number)) in numbered.iter().enumerate() {
            let expected = position as i64 + 1;
            if *number != expected {
                tx.execute(
                    "UPDATE chapters SET number = ?1, updated_at = ?2 WHERE id = ?3",
                    params![expected, now, id],
                )?;
                rewritten += 1;
            }
        }

        tx.commit()?;

        if rewritten > 0 {
            tracing::warn!(story_id, rewritten, "repaired chapter numbering");
        }
        Ok(rewritten)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Chapter`], default-filling NULL timestamps.
fn row_to_chapter(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chapter> {
    let created_secs: Option<i64> = row.get(7)?;
    let updated_secs: Option<i64> = row.get(8)?;
    let now = Utc::now();

    Ok(Chapter {
        id: row.get(0)?,
        story_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        slug: row.get(4)?,
        number: row.get(5)?,
        views: row.get(6)?,
        created_at: created_secs.map(datetime_from_secs).unwrap_or(now),
        updated_at: updated_secs.map(datetime_from_secs).unwrap_or(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StoryDraft, StoryStatus};

    fn story_with_chapters(db: &Database, count: i64) -> i64 {
        let story = db
            .create_story(&StoryDraft {
                title: "Phàm Nhân Tu Tiên".to_string(),
                slug: "pham-nhan-tu-tien-test1".to_string(),
                author: "Vong Ngữ".to_string(),
                description: String::new(),
                cover_url: String::new(),
                genres: vec!["tiên hiệp".to_string()],
                status: StoryStatus::Ongoing,
            })
            .unwrap();

        for n in 1..=count {
            db.upsert_chapter(
                story.id,
                None,
                &ChapterDraft {
                    title: format!("Chương {n}"),
                    content: format!("Nội dung chương {n}"),
                    slug: format!("chuong-{n}-{}", story.id),
                    number: n,
                },
            )
            .unwrap();
        }
        story.id
    }

    fn numbers(db: &Database, story_id: i64) -> Vec<i64> {
        db.list_chapters(story_id)
            .unwrap()
            .iter()
            .map(|c| c.number)
            .collect()
    }

    #[test]
    fn delete_middle_chapter_renumbers_rest() {
        let mut db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 5);

        let third = db.get_chapter_by_number(story_id, 3).unwrap();
        assert!(db.delete_chapter(story_id, third.id).unwrap());

        assert_eq!(numbers(&db, story_id), vec![1, 2, 3, 4]);

        // Relative order preserved: former chapter 4 is now 3, former 5 is 4.
        let chapters = db.list_chapters(story_id).unwrap();
        assert_eq!(chapters[2].title, "Chương 4");
        assert_eq!(chapters[3].title, "Chương 5");
    }

    #[test]
    fn delete_first_and_last_chapters() {
        let mut db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 4);

        let first = db.get_chapter_by_number(story_id, 1).unwrap();
        db.delete_chapter(story_id, first.id).unwrap();
        assert_eq!(numbers(&db, story_id), vec![1, 2, 3]);

        let last = db.get_chapter_by_number(story_id, 3).unwrap();
        db.delete_chapter(story_id, last.id).unwrap();
        assert_eq!(numbers(&db, story_id), vec![1, 2]);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 2);

        let second = db.get_chapter_by_number(story_id, 2).unwrap();
        assert!(db.delete_chapter(story_id, second.id).unwrap());
        assert!(!db.delete_chapter(story_id, second.id).unwrap());
        assert_eq!(numbers(&db, story_id), vec![1]);
    }

    #[test]
    fn delete_checks_story_ownership() {
        let mut db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 2);
        let chapter = db.get_chapter_by_number(story_id, 1).unwrap();

        // Wrong story id: no-op, nothing deleted.
        assert!(!db.delete_chapter(story_id + 1, chapter.id).unwrap());
        assert_eq!(numbers(&db, story_id), vec![1, 2]);
    }

    #[test]
    fn repair_is_noop_on_contiguous_story() {
        let mut db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 3);
        assert_eq!(db.repair_chapter_numbers(story_id).unwrap(), 0);
    }

    #[test]
    fn repair_densifies_gapped_numbers() {
        let mut db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 3);

        // Simulate a partially-renumbered story left by a crash.
        db.conn()
            .execute(
                "UPDATE chapters SET number = number * 3 WHERE story_id = ?1",
                params![story_id],
            )
            .unwrap();
        assert_eq!(numbers(&db, story_id), vec![3, 6, 9]);

        let rewritten = db.repair_chapter_numbers(story_id).unwrap();
        assert_eq!(rewritten, 3);
        assert_eq!(numbers(&db, story_id), vec![1, 2, 3]);
    }

    #[test]
    fn upsert_updates_existing_row() {
        let db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 1);

        let chapter = db.get_chapter_by_number(story_id, 1).unwrap();
        let updated = db
            .upsert_chapter(
                story_id,
                Some(chapter.id),
                &ChapterDraft {
                    title: "Chương 1 (sửa)".to_string(),
                    content: "Bản sửa".to_string(),
                    slug: chapter.slug.clone(),
                    number: 1,
                },
            )
            .unwrap();

        assert_eq!(updated.id, chapter.id);
        assert_eq!(updated.title, "Chương 1 (sửa)");
        assert!(updated.updated_at >= chapter.updated_at);
    }

    #[test]
    fn upsert_unknown_chapter_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 1);

        let err = db
            .upsert_chapter(
                story_id,
                Some(9999),
                &ChapterDraft {
                    title: "T".to_string(),
                    content: String::new(),
                    slug: "t-9999".to_string(),
                    number: 2,
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn upsert_rejects_bad_number() {
        let db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 1);

        let err = db
            .upsert_chapter(
                story_id,
                None,
                &ChapterDraft {
                    title: "T".to_string(),
                    content: String::new(),
                    slug: "t-0".to_string(),
                    number: 0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn list_fills_null_timestamps_without_persisting() {
        let db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 1);

        // Legacy row with NULL timestamps.
        db.conn()
            .execute(
                "INSERT INTO chapters (story_id, title, content, slug, number, views)
                 VALUES (?1, 'Chương cũ', '', 'chuong-cu-x', 2, 0)",
                params![story_id],
            )
            .unwrap();

        let chapters = db.list_chapters(story_id).unwrap();
        assert_eq!(chapters.len(), 2);
        // The fallback is close to now, not the epoch.
        assert!(chapters[1].created_at.timestamp() > 0);

        // And storage still holds NULL.
        let stored: Option<i64> = db
            .conn()
            .query_row(
                "SELECT created_at FROM chapters WHERE slug = 'chuong-cu-x'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(stored.is_none());
    }

    #[test]
    fn next_chapter_number_counts_from_max() {
        let db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 3);
        assert_eq!(db.next_chapter_number(story_id).unwrap(), 4);
        assert_eq!(db.next_chapter_number(story_id + 100).unwrap(), 1);
    }

    #[test]
    fn deleting_story_cascades_to_chapters() {
        let db = Database::open_in_memory().unwrap();
        let story_id = story_with_chapters(&db, 3);

        assert!(db.delete_story(story_id).unwrap());
        let orphans: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM chapters WHERE story_id = ?1",
                params![story_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
