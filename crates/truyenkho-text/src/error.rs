use thiserror::Error;

/// Errors produced by slug generation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SlugError {
    /// The title contains no sluggable characters at all.
    #[error("Title is empty after normalization")]
    EmptyTitle,
}
