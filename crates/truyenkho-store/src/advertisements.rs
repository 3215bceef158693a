//! CRUD operations for [`Advertisement`] records plus the impression and
//! click counters the public site bumps.

use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{AdKind, Advertisement, AdvertisementDraft};
use crate::stories::not_found;

const AD_COLUMNS: &str =
    "id, title, description, image_url, affiliate_url, impressions, clicks, active, frequency, kind";

impl Database {
    /// Insert a new advertisement and return the stored row.
    pub fn create_advertisement(&self, draft: &AdvertisementDraft) -> Result<Advertisement> {
        if draft.frequency < 1 {
            return Err(StoreError::Validation(
                "display frequency must be at least 1".into(),
            ));
        }

        self.conn().execute(
            "INSERT INTO advertisements (title, description, image_url, affiliate_url, impressions, clicks, active, frequency, kind)
             VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?6, ?7)",
            params![
                draft.title,
                draft.description,
                draft.image_url,
                draft.affiliate_url,
                draft.active,
                draft.frequency,
                draft.kind.as_str(),
            ],
        )?;

        self.get_advertisement(self.conn().last_insert_rowid())
    }

    /// Fetch a single advertisement by id.
    pub fn get_advertisement(&self, id: i64) -> Result<Advertisement> {
        self.conn()
            .query_row(
                &format!("SELECT {AD_COLUMNS} FROM advertisements WHERE id = ?1"),
                params![id],
                row_to_advertisement,
            )
            .map_err(not_found)
    }

    /// List all advertisements.
    pub fn list_advertisements(&self) -> Result<Vec<Advertisement>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {AD_COLUMNS} FROM advertisements ORDER BY id ASC"
        ))?;

        let rows = stmt.query_map([], row_to_advertisement)?;

        let mut ads = Vec::new();
        for row in rows {
            ads.push(row?);
        }
        Ok(ads)
    }

    /// List active advertisements of one placement kind.
    pub fn list_active_advertisements(&self, kind: AdKind) -> Result<Vec<Advertisement>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {AD_COLUMNS} FROM advertisements
             WHERE active = 1 AND kind = ?1
             ORDER BY id ASC"
        ))?;

        let rows = stmt.query_map(params![kind.as_str()], row_to_advertisement)?;

        let mut ads = Vec::new();
        for row in rows {
            ads.push(row?);
        }
        Ok(ads)
    }

    /// Update an advertisement's editable fields.  Counters are untouched.
    pub fn update_advertisement(
        &self,
        id: i64,
        draft: &AdvertisementDraft,
    ) -> Result<Advertisement> {
        if draft.frequency < 1 {
            return Err(StoreError::Validation(
                "display frequency must be at least 1".into(),
            ));
        }

        let affected = self.conn().execute(
            "UPDATE advertisements
             SET title = ?1, description = ?2, image_url = ?3, affiliate_url = ?4,
                 active = ?5, frequency = ?6, kind = ?7
             WHERE id = ?8",
            params![
                draft.title,
                draft.description,
                draft.image_url,
                draft.affiliate_url,
                draft.active,
                draft.frequency,
                draft.kind.as_str(),
                id,
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_advertisement(id)
    }

    /// Delete an advertisement by id.  Returns `true` if a row was deleted.
    pub fn delete_advertisement(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM advertisements WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Record that an advertisement was shown.
    pub fn record_ad_impression(&self, id: i64) -> Result<()> {
        self.conn().execute(
            "UPDATE advertisements SET impressions = impressions + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    /// Record that an advertisement was clicked.
    pub fn record_ad_click(&self, id: i64) -> Result<()> {
        self.conn().execute(
            "UPDATE advertisements SET clicks = clicks + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }
}

/// Map a `rusqlite::Row` to an [`Advertisement`].
fn row_to_advertisement(row: &rusqlite::Row<'_>) -> rusqlite::Result<Advertisement> {
    let kind_col: String = row.get(9)?;

    Ok(Advertisement {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        affiliate_url: row.get(4)?,
        impressions: row.get(5)?,
        clicks: row.get(6)?,
        active: row.get(7)?,
        frequency: row.get(8)?,
        kind: AdKind::parse(&kind_col),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(kind: AdKind, active: bool) -> AdvertisementDraft {
        AdvertisementDraft {
            title: "Quảng cáo".to_string(),
            description: String::new(),
            image_url: "https://cdn.example/banner.png".to_string(),
            affiliate_url: "https://shop.example/ref".to_string(),
            active,
            frequency: 3,
            kind,
        }
    }

    #[test]
    fn counters_start_at_zero_and_increment() {
        let db = Database::open_in_memory().unwrap();
        let ad = db.create_advertisement(&draft(AdKind::Banner, true)).unwrap();
        assert_eq!((ad.impressions, ad.clicks), (0, 0));

        db.record_ad_impression(ad.id).unwrap();
        db.record_ad_impression(ad.id).unwrap();
        db.record_ad_click(ad.id).unwrap();

        let ad = db.get_advertisement(ad.id).unwrap();
        assert_eq!((ad.impressions, ad.clicks), (2, 1));
    }

    #[test]
    fn active_filter_respects_kind_and_flag() {
        let db = Database::open_in_memory().unwrap();
        db.create_advertisement(&draft(AdKind::InChapter, true)).unwrap();
        db.create_advertisement(&draft(AdKind::InChapter, false)).unwrap();
        db.create_advertisement(&draft(AdKind::Banner, true)).unwrap();

        let active = db.list_active_advertisements(AdKind::InChapter).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kind, AdKind::InChapter);
    }

    #[test]
    fn zero_frequency_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let mut d = draft(AdKind::Loading, true);
        d.frequency = 0;
        assert!(matches!(
            db.create_advertisement(&d),
            Err(StoreError::Validation(_))
        ));
    }
}
