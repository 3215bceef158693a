//! Searchable catalog records.
//!
//! A [`SearchableItem`] is the flat projection of a story, licensed story or
//! ebook that the index understands.  The accent-less duplicates of title and
//! author are computed once, at construction, with the same normalization the
//! slug generator uses.

use serde::{Deserialize, Serialize};
use truyenkho_text::normalize::fold_for_search;

/// Which catalog a record came from.
///
/// Ids are only unique within one catalog table, so the index keys records by
/// `(kind, id)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Story,
    LicensedStory,
    Ebook,
}

impl Default for ItemKind {
    fn default() -> Self {
        ItemKind::Story
    }
}

/// A single indexed record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchableItem {
    pub id: i64,
    pub kind: ItemKind,
    pub title: String,
    pub author: String,
    pub genres: Vec<String>,
    pub slug: String,
    /// Accent-stripped, lowercased copy of `title`.
    pub normalized_title: String,
    /// Accent-stripped, lowercased copy of `author`.
    pub normalized_author: String,
}

impl SearchableItem {
    /// Build a record, computing the normalized duplicates.
    ///
    /// Genre entries are themselves normalized: each is split on commas (so a
    /// legacy comma-joined string passed as one element still works), trimmed
    /// and dropped when empty.
    pub fn new(
        id: i64,
        kind: ItemKind,
        title: impl Into<String>,
        author: impl Into<String>,
        genres: Vec<String>,
        slug: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let author = author.into();

        let genres = genres
            .iter()
            .flat_map(|g| g.split(','))
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();

        let normalized_title = fold_for_search(&title);
        let normalized_author = fold_for_search(&author);

        Self {
            id,
            kind,
            title,
            author,
            genres,
            slug: slug.into(),
            normalized_title,
            normalized_author,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_fields_are_computed() {
        let item = SearchableItem::new(
            1,
            ItemKind::Story,
            "Nguyên Tôn",
            "Thiên Tằm Thổ Đậu",
            vec!["huyền huyễn".to_string()],
            "nguyen-ton-1",
        );
        assert_eq!(item.normalized_title, "nguyen ton");
        assert_eq!(item.normalized_author, "thien tam tho dau");
    }

    #[test]
    fn comma_joined_genres_are_split() {
        let item = SearchableItem::new(
            2,
            ItemKind::Ebook,
            "T",
            "A",
            vec!["tiên hiệp, kiếm hiệp,".to_string()],
            "t-2",
        );
        assert_eq!(item.genres, vec!["tiên hiệp", "kiếm hiệp"]);
    }
}
