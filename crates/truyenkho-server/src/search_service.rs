//! The process-wide search index, owned by the application state.
//!
//! The index itself is plain data; this wrapper adds the locking a
//! multi-threaded runtime needs (concurrent readers, exclusive writers) and
//! the "not built yet" state.  Admin write handlers call [`upsert`] /
//! [`remove`] after each store write; staleness between the database and the
//! index is accepted (search is best-effort, not authoritative).
//!
//! [`upsert`]: SearchService::upsert
//! [`remove`]: SearchService::remove

use tokio::sync::RwLock;

use truyenkho_search::{ItemKind, SearchError, SearchHit, SearchIndex, SearchableItem};
use truyenkho_store::{Ebook, LicensedStory, Story};

/// Shared handle around the singleton [`SearchIndex`].
#[derive(Default)]
pub struct SearchService {
    index: RwLock<Option<SearchIndex>>,
}

impl SearchService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the index wholesale with one built from the full catalog.
    pub async fn rebuild(&self, items: Vec<SearchableItem>) {
        let built = SearchIndex::build(items);
        *self.index.write().await = Some(built);
    }

    /// Insert or replace one record.  A no-op before the first build; the
    /// startup rebuild will pick the record up anyway.
    pub async fn upsert(&self, item: SearchableItem) {
        if let Some(index) = self.index.write().await.as_mut() {
            index.add(vec![item]);
        }
    }

    /// Remove one record, if present.
    pub async fn remove(&self, kind: ItemKind, id: i64) {
        if let Some(index) = self.index.write().await.as_mut() {
            index.remove(kind, id);
        }
    }

    /// Ranked full-text search.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        match self.index.read().await.as_ref() {
            Some(index) => Ok(index.search(query, limit)),
            None => Err(SearchError::Uninitialized),
        }
    }

    /// Title suggestions for a partial query.
    pub async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<String>, SearchError> {
        match self.index.read().await.as_ref() {
            Some(index) => Ok(index.auto_suggest(query, limit)),
            None => Err(SearchError::Uninitialized),
        }
    }
}

// ---------------------------------------------------------------------------
// Store row -> searchable record projections
// ---------------------------------------------------------------------------

pub fn searchable_from_story(story: &Story) -> SearchableItem {
    SearchableItem::new(
        story.id,
        ItemKind::Story,
        story.title.clone(),
        story.author.clone(),
        story.genres.clone(),
        story.slug.clone(),
    )
}

pub fn searchable_from_licensed(story: &LicensedStory) -> SearchableItem {
    SearchableItem::new(
        story.id,
        ItemKind::LicensedStory,
        story.title.clone(),
        story.author.clone(),
        story.genres.clone(),
        story.slug.clone(),
    )
}

pub fn searchable_from_ebook(ebook: &Ebook) -> SearchableItem {
    SearchableItem::new(
        ebook.id,
        ItemKind::Ebook,
        ebook.title.clone(),
        ebook.author.clone(),
        ebook.genres.clone(),
        ebook.slug.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn query_before_build_is_uninitialized() {
        let service = SearchService::new();
        assert_eq!(
            service.search("nguyen", 10).await.unwrap_err(),
            SearchError::Uninitialized
        );
        assert_eq!(
            service.suggest("nguyen", 10).await.unwrap_err(),
            SearchError::Uninitialized
        );
    }

    #[tokio::test]
    async fn rebuild_then_search() {
        let service = SearchService::new();
        service
            .rebuild(vec![SearchableItem::new(
                1,
                ItemKind::Story,
                "Nguyên Tôn",
                "Thiên Tằm Thổ Đậu",
                vec![],
                "nguyen-ton-1",
            )])
            .await;

        let hits = service.search("nguyen ton", 10).await.unwrap();
        assert_eq!(hits[0].item.id, 1);

        service.remove(ItemKind::Story, 1).await;
        assert!(service.search("nguyen ton", 10).await.unwrap().is_empty());
    }
}
