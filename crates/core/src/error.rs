use crate::model::{BlobId, FileId};

/// Errors surfaced by Stash core operations.
///
/// Query paths turn authorization failures into empty results and never return the first four
/// variants; mutation paths reject with them.
#[derive(Debug, thiserror::Error)]
pub enum StashError {
    #[error("you must be logged in")]
    Unauthenticated,
    #[error("no user record exists for the current identity")]
    UnknownUser,
    #[error("you do not have access to this scope")]
    Forbidden,
    #[error("file not found: {0}")]
    FileNotFound(FileId),

    #[error("blob not found: {0}")]
    BlobNotFound(BlobId),
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("invalid scope: {0}")]
    InvalidScope(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("document store is unavailable")]
    StoreUnavailable,
    #[error("blob storage error: {0}")]
    Blob(#[from] stash_blobs::BlobError),
    #[error("invalid identifier: {0}")]
    Uuid(#[from] stash_uuid::UuidError),
    #[error("invalid text: {0}")]
    Text(#[from] stash_types::TextError),
}

pub type StashResult<T> = std::result::Result<T, StashError>;
