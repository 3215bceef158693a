//! # truyenkho-store
//!
//! SQLite-backed storage for the truyenkho publishing platform.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model: stories and their chapters, the licensed-story and ebook catalogs,
//! advertisements and admin users.  Chapter deletion renumbers the remaining
//! chapters inside a single transaction so the per-story 1..N numbering
//! invariant survives crashes.

pub mod advertisements;
pub mod chapters;
pub mod database;
pub mod ebooks;
pub mod licensed;
pub mod migrations;
pub mod models;
pub mod stories;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
