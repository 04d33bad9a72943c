//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Request
//! handling never reads process-wide environment variables.

use crate::constants::DEFAULT_UPLOAD_TTL_SECS;
use crate::{StashError, StashResult};
use chrono::Duration;
use stash_blobs::LocalBlobStore;
use stash_types::NonEmptyText;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    blob_dir: PathBuf,
    public_base_url: NonEmptyText,
    upload_ticket_ttl: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::InvalidInput`] if `public_base_url` is not an `http(s)://` origin or
    /// `upload_ticket_ttl` is not positive.
    pub fn new(
        blob_dir: PathBuf,
        public_base_url: NonEmptyText,
        upload_ticket_ttl: Duration,
    ) -> StashResult<Self> {
        let url = public_base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(StashError::InvalidInput(format!(
                "public base URL must start with http:// or https://, got '{}'",
                url
            )));
        }

        if upload_ticket_ttl <= Duration::zero() {
            return Err(StashError::InvalidInput(
                "upload ticket TTL must be positive".into(),
            ));
        }

        Ok(Self {
            blob_dir,
            public_base_url,
            upload_ticket_ttl,
        })
    }

    pub fn blob_dir(&self) -> &Path {
        &self.blob_dir
    }

    pub fn public_base_url(&self) -> &str {
        self.public_base_url.as_str()
    }

    pub fn upload_ticket_ttl(&self) -> Duration {
        self.upload_ticket_ttl
    }

    /// Opens the local blob store described by this configuration, creating the blob directory
    /// if it does not exist yet.
    pub fn open_blob_store(&self) -> StashResult<LocalBlobStore> {
        std::fs::create_dir_all(&self.blob_dir)
            .map_err(|e| StashError::Blob(stash_blobs::BlobError::Io(e)))?;
        Ok(LocalBlobStore::new(
            &self.blob_dir,
            self.public_base_url.as_str(),
            self.upload_ticket_ttl,
        )?)
    }
}

/// Parse the upload ticket TTL (in seconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default TTL.
pub fn upload_ttl_from_env_value(value: Option<String>) -> StashResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let seconds = match value {
        Some(v) => v.parse::<i64>().map_err(|e| {
            StashError::InvalidInput(format!("upload TTL must be whole seconds, got '{}': {}", v, e))
        })?,
        None => DEFAULT_UPLOAD_TTL_SECS,
    };

    if seconds <= 0 {
        return Err(StashError::InvalidInput(
            "upload TTL must be positive".into(),
        ));
    }

    Duration::try_seconds(seconds).ok_or_else(|| {
        StashError::InvalidInput(format!("upload TTL of {} seconds is out of range", seconds))
    })
}
