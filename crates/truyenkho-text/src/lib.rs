//! # truyenkho-text
//!
//! Text helpers shared by the store, the search index and the server:
//! Vietnamese diacritic stripping and URL-slug generation.
//!
//! Both the slug generator and the search index must agree on what the
//! accent-less form of a title looks like, so the normalization lives here
//! in one place.

pub mod normalize;
pub mod slug;

mod error;

pub use error::SlugError;
pub use normalize::strip_diacritics;
pub use slug::{slug_for_id, slug_with_token};
