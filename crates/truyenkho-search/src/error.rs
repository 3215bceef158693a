use thiserror::Error;

/// Errors produced by the search layer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SearchError {
    /// A query arrived before the index was first built from the store.
    #[error("Search index has not been built yet")]
    Uninitialized,
}
