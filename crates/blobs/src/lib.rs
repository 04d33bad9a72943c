//! Stash blob storage
//!
//! Binary content (the uploaded images, PDFs and CSVs) lives outside the document store. Files
//! only hold a blob identifier; this crate turns identifiers into bytes and URLs.
//!
//! ## Upload flow
//!
//! 1. An authenticated caller asks for an upload URL. The store issues a single-use ticket and
//!    returns `<public_base_url>/blobs/upload/<ticket>`.
//! 2. The client POSTs the bytes to that URL. The ticket is consumed and a new blob id is
//!    returned.
//! 3. The client records a file pointing at the blob id.
//!
//! ## Storage layout
//!
//! ```text
//! <root>/
//! └── 55/0e/550e8400e29b41d4a716446655440000/
//!     ├── content
//!     └── metadata.json
//! ```

mod constants;
mod store;

pub use constants::{CONTENT_FILE_NAME, METADATA_FILE_NAME};
pub use stash_uuid::ShardableUuid;
pub use store::{BlobMetadata, BlobStore, LocalBlobStore};

/// Errors that can occur during blob operations
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Upload ticket was never issued or has already been used
    #[error("Unknown or already used upload ticket: {0}")]
    UnknownTicket(ShardableUuid),

    /// Upload ticket outlived its time-to-live
    #[error("Upload ticket expired: {0}")]
    TicketExpired(ShardableUuid),

    /// No blob stored under the identifier
    #[error("Blob not found: {0}")]
    NotFound(ShardableUuid),

    /// Sidecar metadata could not be encoded or decoded
    #[error("Blob metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Ticket bookkeeping lock was poisoned by a panicking thread
    #[error("Upload ticket registry is unavailable")]
    TicketRegistryPoisoned,

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BlobResult<T> = Result<T, BlobError>;
