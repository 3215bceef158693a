//! The in-memory search index.
//!
//! Structure: a document map keyed by `(kind, id)` plus an inverted token
//! index.  Title and author are indexed twice, once as typed (lowercased,
//! accents kept) and once accent-stripped, so queries with and without
//! Vietnamese tone marks reach the same records.  Each query token matches
//! indexed tokens exactly, by prefix, or fuzzily within a length-dependent
//! edit-distance budget; ranking multiplies the match weight by a fixed
//! per-field boost.

use std::collections::{BTreeMap, HashMap, HashSet};

use truyenkho_text::strip_diacritics;

use crate::item::{ItemKind, SearchableItem};

/// Which field an indexed token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    NormalizedTitle,
    Author,
    NormalizedAuthor,
    Genre,
}

impl Field {
    /// Ranking boost.  The typed title dominates; its accent-less duplicate
    /// comes next so unaccented queries still rank title hits above author
    /// hits.
    fn boost(self) -> f64 {
        match self {
            Field::Title => 4.0,
            Field::NormalizedTitle => 2.0,
            Field::Author => 1.5,
            Field::NormalizedAuthor => 0.75,
            Field::Genre => 1.0,
        }
    }

    fn is_title(self) -> bool {
        matches!(self, Field::Title | Field::NormalizedTitle)
    }
}

/// Match weights, ordered strongest to weakest.
const EXACT_WEIGHT: f64 = 1.0;
const PREFIX_WEIGHT: f64 = 0.5;
const FUZZY_WEIGHT: f64 = 0.3;

/// Minimum query length for [`SearchIndex::auto_suggest`].
const MIN_SUGGEST_CHARS: usize = 2;

type DocKey = (ItemKind, i64);

struct Entry {
    item: SearchableItem,
    /// The (token, field) pairs this document contributed to the postings.
    tokens: Vec<(String, Field)>,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SearchHit {
    pub item: SearchableItem,
    pub score: f64,
}

/// In-memory full-text index over the catalog.
#[derive(Default)]
pub struct SearchIndex {
    docs: BTreeMap<DocKey, Entry>,
    postings: HashMap<String, Vec<(DocKey, Field)>>,
}

impl SearchIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from the full catalog, replacing nothing (this is a
    /// constructor; the caller swaps it in wholesale).
    pub fn build(items: Vec<SearchableItem>) -> Self {
        let mut index = Self::new();
        let count = items.len();
        index.add(items);
        tracing::info!(documents = count, "search index built");
        index
    }

    /// Insert or replace records.  Used for incremental maintenance after an
    /// admin write; re-adding an existing `(kind, id)` replaces it.
    pub fn add(&mut self, items: Vec<SearchableItem>) {
        for item in items {
            let key = (item.kind, item.id);
            self.remove(item.kind, item.id);

            let mut tokens: Vec<(String, Field)> = Vec::new();
            collect_tokens(&item.title, Field::Title, &mut tokens);
            collect_tokens(&item.normalized_title, Field::NormalizedTitle, &mut tokens);
            collect_tokens(&item.author, Field::Author, &mut tokens);
            collect_tokens(&item.normalized_author, Field::NormalizedAuthor, &mut tokens);
            for genre in &item.genres {
                collect_tokens(genre, Field::Genre, &mut tokens);
            }
            tokens.sort_by(|a, b| (&a.0, field_rank(a.1)).cmp(&(&b.0, field_rank(b.1))));
            tokens.dedup();

            for (token, field) in &tokens {
                self.postings
                    .entry(token.clone())
                    .or_default()
                    .push((key, *field));
            }
            self.docs.insert(key, Entry { item, tokens });
        }
    }

    /// Remove one record.  Returns `true` if it was present.
    pub fn remove(&mut self, kind: ItemKind, id: i64) -> bool {
        let key = (kind, id);
        let Some(entry) = self.docs.remove(&key) else {
            return false;
        };

        for (token, _) in &entry.tokens {
            if let Some(posts) = self.postings.get_mut(token) {
                posts.retain(|(k, _)| *k != key);
                if posts.is_empty() {
                    self.postings.remove(token);
                }
            }
        }
        true
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Rank the catalog against a free-text query and return the top `limit`
    /// hits.
    ///
    /// The query is tokenized twice, as typed and accent-stripped, so "Nguyên
    /// Tôn" and "nguyen ton" produce the same top result.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let ranked = self.rank(query, |_| true);
        ranked
            .into_iter()
            .take(limit)
            .map(|(key, score)| SearchHit {
                item: self.docs[&key].item.clone(),
                score,
            })
            .collect()
    }

    /// Suggest up to `limit` distinct titles for a partial query.
    ///
    /// Only title fields participate.  Queries under two characters return
    /// nothing.
    pub fn auto_suggest(&self, query: &str, limit: usize) -> Vec<String> {
        if query.trim().chars().count() < MIN_SUGGEST_CHARS {
            return Vec::new();
        }

        let ranked = self.rank(query, Field::is_title);

        let mut seen = HashSet::new();
        let mut titles = Vec::new();
        for (key, _) in ranked {
            let title = &self.docs[&key].item.title;
            if seen.insert(title.clone()) {
                titles.push(title.clone());
                if titles.len() == limit {
                    break;
                }
            }
        }
        titles
    }

    /// Score every document against the query, restricted to fields accepted
    /// by `field_filter`, sorted best-first with a stable tiebreak.
    fn rank(&self, query: &str, field_filter: impl Fn(Field) -> bool) -> Vec<(DocKey, f64)> {
        let query_tokens = query_tokens(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scores: HashMap<DocKey, f64> = HashMap::new();
        for qt in &query_tokens {
            // Exact hits via direct lookup.
            if let Some(posts) = self.postings.get(qt) {
                for (key, field) in posts {
                    if field_filter(*field) {
                        *scores.entry(*key).or_default() += EXACT_WEIGHT * field.boost();
                    }
                }
            }

            // Prefix and fuzzy hits require a scan over the distinct tokens.
            let budget = fuzzy_budget(qt);
            for (token, posts) in &self.postings {
                if token == qt {
                    continue;
                }
                let weight = if qt.chars().count() >= 2 && token.starts_with(qt.as_str()) {
                    PREFIX_WEIGHT
                } else if budget > 0 && strsim::levenshtein(qt, token) <= budget {
                    FUZZY_WEIGHT
                } else {
                    continue;
                };
                for (key, field) in posts {
                    if field_filter(*field) {
                        *scores.entry(*key).or_default() += weight * field.boost();
                    }
                }
            }
        }

        let mut ranked: Vec<(DocKey, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lowercase and split on non-alphanumeric runs.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn collect_tokens(text: &str, field: Field, out: &mut Vec<(String, Field)>) {
    for token in tokenize(text) {
        out.push((token, field));
    }
}

/// Combined query tokens: as typed plus diacritic-stripped, deduplicated.
fn query_tokens(query: &str) -> Vec<String> {
    let mut tokens = tokenize(query);
    tokens.extend(tokenize(&strip_diacritics(query)));
    tokens.sort();
    tokens.dedup();
    tokens
}

/// Edit-distance budget for fuzzy matching, scaled by token length.
fn fuzzy_budget(token: &str) -> usize {
    match token.chars().count() {
        0..=3 => 0,
        4..=7 => 1,
        _ => 2,
    }
}

fn field_rank(f: Field) -> u8 {
    match f {
        Field::Title => 0,
        Field::NormalizedTitle => 1,
        Field::Author => 2,
        Field::NormalizedAuthor => 3,
        Field::Genre => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<SearchableItem> {
        vec![
            SearchableItem::new(
                1,
                ItemKind::Story,
                "Nguyên Tôn",
                "Thiên Tằm Thổ Đậu",
                vec!["huyền huyễn".to_string()],
                "nguyen-ton-1",
            ),
            SearchableItem::new(
                2,
                ItemKind::Story,
                "Phàm Nhân Tu Tiên",
                "Vong Ngữ",
                vec!["tiên hiệp".to_string()],
                "pham-nhan-tu-tien-2",
            ),
            SearchableItem::new(
                3,
                ItemKind::Ebook,
                "Đấu Phá Thương Khung",
                "Thiên Tằm Thổ Đậu",
                vec!["huyền huyễn".to_string()],
                "dau-pha-thuong-khung-3",
            ),
        ]
    }

    #[test]
    fn accented_query_ranks_exact_title_first() {
        let index = SearchIndex::build(catalog());
        let hits = index.search("Nguyên Tôn", 10);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].item.id, 1);
    }

    #[test]
    fn stripped_query_ranks_same_item_first() {
        let index = SearchIndex::build(catalog());
        let hits = index.search("nguyen ton", 10);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].item.id, 1);
        assert_eq!(hits[0].item.slug, "nguyen-ton-1");
    }

    #[test]
    fn author_query_finds_both_works() {
        let index = SearchIndex::build(catalog());
        let hits = index.search("thien tam tho dau", 10);
        let ids: Vec<i64> = hits.iter().map(|h| h.item.id).collect();
        assert!(ids.contains(&1));
        assert!(ids.contains(&3));
    }

    #[test]
    fn prefix_match_reaches_longer_tokens() {
        let index = SearchIndex::build(catalog());
        // "thuong" is a full token; "thuo" only a prefix.
        let hits = index.search("thuo khung", 10);
        assert_eq!(hits[0].item.id, 3);
    }

    #[test]
    fn fuzzy_match_tolerates_a_typo() {
        let index = SearchIndex::build(catalog());
        let hits = index.search("nguyan ton", 10);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].item.id, 1);
    }

    #[test]
    fn limit_truncates_results() {
        let index = SearchIndex::build(catalog());
        // "thien" hits both Thiên Tằm Thổ Đậu works.
        let hits = index.search("thien", 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn remove_then_search_misses() {
        let mut index = SearchIndex::build(catalog());
        assert!(index.remove(ItemKind::Story, 1));
        assert!(!index.remove(ItemKind::Story, 1));
        let hits = index.search("nguyen ton", 10);
        assert!(hits.iter().all(|h| h.item.id != 1));
    }

    #[test]
    fn re_adding_replaces_the_old_record() {
        let mut index = SearchIndex::build(catalog());
        index.add(vec![SearchableItem::new(
            1,
            ItemKind::Story,
            "Nguyên Tôn (bản mới)",
            "Thiên Tằm Thổ Đậu",
            vec![],
            "nguyen-ton-moi-1",
        )]);
        assert_eq!(index.len(), 3);
        let hits = index.search("nguyen ton", 10);
        assert_eq!(hits[0].item.slug, "nguyen-ton-moi-1");
    }

    #[test]
    fn ebook_and_story_ids_do_not_collide() {
        let mut index = SearchIndex::new();
        index.add(vec![
            SearchableItem::new(7, ItemKind::Story, "Trùng Sinh", "A", vec![], "trung-sinh-7"),
            SearchableItem::new(7, ItemKind::Ebook, "Trùng Sinh EPUB", "A", vec![], "trung-sinh-epub-7"),
        ]);
        assert_eq!(index.len(), 2);
        assert!(index.remove(ItemKind::Ebook, 7));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn auto_suggest_dedupes_and_limits() {
        let mut items = catalog();
        // Duplicate title under a different id and kind.
        items.push(SearchableItem::new(
            9,
            ItemKind::LicensedStory,
            "Nguyên Tôn",
            "Thiên Tằm Thổ Đậu",
            vec![],
            "nguyen-ton-ban-quyen-9",
        ));
        let index = SearchIndex::build(items);

        let suggestions = index.auto_suggest("nguyen", 10);
        assert_eq!(
            suggestions.iter().filter(|t| t.as_str() == "Nguyên Tôn").count(),
            1
        );

        let limited = index.auto_suggest("t", 10);
        assert!(limited.is_empty(), "single-char query suggests nothing");

        let capped = index.auto_suggest("thien", 1);
        assert!(capped.len() <= 1);
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = SearchIndex::new();
        assert!(index.is_empty());
        assert!(index.search("nguyen", 10).is_empty());
        assert!(index.auto_suggest("nguyen", 10).is_empty());
    }
}
