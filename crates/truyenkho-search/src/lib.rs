//! # truyenkho-search
//!
//! In-memory, diacritic-insensitive full-text search over the catalog
//! (stories, licensed stories, ebooks).
//!
//! The index is a derived cache with no persistence: it is rebuilt from the
//! database at process start and kept eventually consistent by single-record
//! [`SearchIndex::add`] / [`SearchIndex::remove`] calls after admin writes.
//! Queries tolerate missing Vietnamese tone marks and minor typos; ranking
//! uses fixed field boosts with the display title weighted highest.

pub mod index;
pub mod item;

mod error;

pub use error::SearchError;
pub use index::{SearchHit, SearchIndex};
pub use item::{ItemKind, SearchableItem};
