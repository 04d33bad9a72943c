//! Filesystem-backed blob store.
//!
//! [`LocalBlobStore`] keeps each blob in its own sharded directory under a single root, next to a
//! JSON sidecar with its digest, size and content type. Upload tickets are held in memory; they
//! are single-use and expire after the configured time-to-live.

use crate::constants::{CONTENT_FILE_NAME, DOWNLOAD_ROUTE, METADATA_FILE_NAME, UPLOAD_ROUTE};
use crate::{BlobError, BlobResult};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use stash_types::NonEmptyText;
use stash_uuid::{Sha256Hash, ShardableUuid};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Metadata recorded alongside every stored blob.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct BlobMetadata {
    /// Identifier files use to reference this blob
    pub id: ShardableUuid,

    /// SHA-256 digest of the content
    pub hash: Sha256Hash,

    /// Size of the content in bytes
    pub size_bytes: u64,

    /// Content type declared by the uploader, if any
    pub content_type: Option<NonEmptyText>,

    /// Media type sniffed from the bytes (best effort, not authoritative)
    pub detected_media_type: Option<NonEmptyText>,

    pub stored_at: DateTime<Utc>,
}

/// The primitives the file services need from binary storage.
pub trait BlobStore: Send + Sync {
    /// Issues a single-use URL the client can POST content to.
    fn generate_upload_url(&self) -> BlobResult<String>;

    /// Resolves a blob to a download URL, or `None` if nothing is stored under `blob_id`.
    fn get_url(&self, blob_id: &ShardableUuid) -> Option<String>;

    /// Content type recorded for a stored blob: the declared type, else the sniffed one.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::NotFound`] if nothing is stored under `blob_id`.
    fn content_type(&self, blob_id: &ShardableUuid) -> BlobResult<Option<NonEmptyText>>;
}

/// Blob store rooted at a local directory.
#[derive(Debug)]
pub struct LocalBlobStore {
    root_directory: PathBuf,
    public_base_url: String,
    ticket_ttl: Duration,
    tickets: Mutex<HashMap<ShardableUuid, DateTime<Utc>>>,
}

impl LocalBlobStore {
    /// Creates a store over an existing directory.
    ///
    /// `public_base_url` is the externally reachable origin of the HTTP server; upload and
    /// download URLs are built beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::InvalidRootDirectory`] if `root_directory` is missing, is not a
    /// directory, or cannot be canonicalised.
    pub fn new(
        root_directory: &Path,
        public_base_url: &str,
        ticket_ttl: Duration,
    ) -> BlobResult<Self> {
        if !root_directory.is_dir() {
            return Err(BlobError::InvalidRootDirectory(format!(
                "Not an existing directory: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            BlobError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self {
            root_directory,
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
            ticket_ttl,
            tickets: Mutex::new(HashMap::new()),
        })
    }

    /// Issues a new upload ticket, dropping any tickets that have already expired.
    pub fn issue_ticket(&self) -> BlobResult<ShardableUuid> {
        let now = Utc::now();
        let ticket = ShardableUuid::new();

        let mut tickets = self
            .tickets
            .lock()
            .map_err(|_| BlobError::TicketRegistryPoisoned)?;
        let ttl = self.ticket_ttl;
        tickets.retain(|_, issued_at| now - *issued_at <= ttl);
        tickets.insert(ticket, now);

        Ok(ticket)
    }

    /// Stores `content` against a previously issued ticket and consumes the ticket.
    ///
    /// # Errors
    ///
    /// - [`BlobError::UnknownTicket`] if the ticket was never issued or was already used
    /// - [`BlobError::TicketExpired`] if the ticket outlived its time-to-live
    /// - [`BlobError::Io`] / [`BlobError::Metadata`] if writing to disk fails
    pub fn upload(
        &self,
        ticket: &ShardableUuid,
        content_type: Option<&str>,
        content: &[u8],
    ) -> BlobResult<BlobMetadata> {
        let issued_at = self
            .tickets
            .lock()
            .map_err(|_| BlobError::TicketRegistryPoisoned)?
            .remove(ticket)
            .ok_or(BlobError::UnknownTicket(*ticket))?;

        if Utc::now() - issued_at > self.ticket_ttl {
            return Err(BlobError::TicketExpired(*ticket));
        }

        let hash_array: [u8; 32] = Sha256::digest(content).into();

        let metadata = BlobMetadata {
            id: ShardableUuid::new(),
            hash: Sha256Hash::from_bytes(&hash_array),
            size_bytes: content.len() as u64,
            content_type: content_type.and_then(|c| NonEmptyText::new(c).ok()),
            detected_media_type: infer::get(content)
                .and_then(|kind| NonEmptyText::new(kind.mime_type()).ok()),
            stored_at: Utc::now(),
        };

        let blob_dir = self.blob_directory(&metadata.id);
        if let Err(e) = write_blob(&blob_dir, &metadata, content) {
            if let Err(cleanup) = fs::remove_dir_all(&blob_dir) {
                tracing::warn!(
                    "failed to clean up partial blob {}: {}",
                    blob_dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        tracing::debug!(blob_id = %metadata.id, size = metadata.size_bytes, "blob stored");
        Ok(metadata)
    }

    /// Reads the sidecar metadata for a blob.
    pub fn metadata(&self, blob_id: &ShardableUuid) -> BlobResult<BlobMetadata> {
        let path = self.blob_directory(blob_id).join(METADATA_FILE_NAME);
        let raw = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BlobError::NotFound(*blob_id),
            _ => BlobError::Io(e),
        })?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Reads a blob's metadata and content.
    pub fn read(&self, blob_id: &ShardableUuid) -> BlobResult<(BlobMetadata, Vec<u8>)> {
        let metadata = self.metadata(blob_id)?;
        let path = self.blob_directory(blob_id).join(CONTENT_FILE_NAME);
        let content = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BlobError::NotFound(*blob_id),
            _ => BlobError::Io(e),
        })?;
        Ok((metadata, content))
    }

    /// Returns true if content is stored under `blob_id`.
    pub fn exists(&self, blob_id: &ShardableUuid) -> bool {
        self.blob_directory(blob_id)
            .join(CONTENT_FILE_NAME)
            .is_file()
    }

    fn blob_directory(&self, blob_id: &ShardableUuid) -> PathBuf {
        blob_id.sharded_dir(&self.root_directory)
    }
}

impl BlobStore for LocalBlobStore {
    fn generate_upload_url(&self) -> BlobResult<String> {
        let ticket = self.issue_ticket()?;
        Ok(format!("{}/{}/{}", self.public_base_url, UPLOAD_ROUTE, ticket))
    }

    fn get_url(&self, blob_id: &ShardableUuid) -> Option<String> {
        self.exists(blob_id).then(|| {
            format!("{}/{}/{}", self.public_base_url, DOWNLOAD_ROUTE, blob_id)
        })
    }

    fn content_type(&self, blob_id: &ShardableUuid) -> BlobResult<Option<NonEmptyText>> {
        if !self.exists(blob_id) {
            return Err(BlobError::NotFound(*blob_id));
        }
        let metadata = self.metadata(blob_id)?;
        Ok(metadata.content_type.or(metadata.detected_media_type))
    }
}

fn write_blob(dir: &Path, metadata: &BlobMetadata, content: &[u8]) -> BlobResult<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(CONTENT_FILE_NAME), content)?;
    fs::write(
        dir.join(METADATA_FILE_NAME),
        serde_json::to_vec_pretty(metadata)?,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BASE_URL: &str = "http://localhost:3000/";

    fn test_store(temp: &TempDir) -> LocalBlobStore {
        LocalBlobStore::new(temp.path(), BASE_URL, Duration::minutes(5)).unwrap()
    }

    fn ticket_from_url(url: &str) -> ShardableUuid {
        let raw = url.rsplit('/').next().unwrap();
        ShardableUuid::parse(raw).unwrap()
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let temp = TempDir::new().unwrap();
        let result = LocalBlobStore::new(
            &temp.path().join("missing"),
            BASE_URL,
            Duration::minutes(5),
        );

        assert!(matches!(result, Err(BlobError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_new_rejects_file_as_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "not a directory").unwrap();

        let result = LocalBlobStore::new(&file, BASE_URL, Duration::minutes(5));
        assert!(matches!(result, Err(BlobError::InvalidRootDirectory(_))));
    }

    #[test]
    fn test_generate_upload_url_points_at_upload_route() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let url = store.generate_upload_url().unwrap();
        assert!(url.starts_with("http://localhost:3000/blobs/upload/"));
        assert!(ShardableUuid::is_canonical(url.rsplit('/').next().unwrap()));
    }

    #[test]
    fn test_upload_stores_content_and_metadata() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let ticket = ticket_from_url(&store.generate_upload_url().unwrap());

        let png_header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let metadata = store
            .upload(&ticket, Some("image/png"), &png_header)
            .unwrap();

        assert_eq!(metadata.size_bytes, 8);
        assert_eq!(metadata.hash.as_str().len(), 64);
        assert_eq!(
            metadata.content_type.as_ref().map(|t| t.as_str()),
            Some("image/png")
        );
        assert_eq!(
            metadata.detected_media_type.as_ref().map(|t| t.as_str()),
            Some("image/png")
        );

        let (read_back, content) = store.read(&metadata.id).unwrap();
        assert_eq!(read_back, metadata);
        assert_eq!(content, png_header);

        let dir = metadata.id.sharded_dir(&temp.path().canonicalize().unwrap());
        assert!(dir.join(CONTENT_FILE_NAME).is_file());
        assert!(dir.join(METADATA_FILE_NAME).is_file());
    }

    #[test]
    fn test_ticket_is_single_use() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let ticket = store.issue_ticket().unwrap();

        store.upload(&ticket, Some("text/csv"), b"a,b\n1,2\n").unwrap();
        let second = store.upload(&ticket, Some("text/csv"), b"a,b\n1,2\n");

        assert!(matches!(second, Err(BlobError::UnknownTicket(_))));
    }

    #[test]
    fn test_unknown_ticket_rejected() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let result = store.upload(&ShardableUuid::new(), None, b"data");
        assert!(matches!(result, Err(BlobError::UnknownTicket(_))));
    }

    #[test]
    fn test_expired_ticket_rejected() {
        let temp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp.path(), BASE_URL, Duration::milliseconds(-1)).unwrap();
        let ticket = store.issue_ticket().unwrap();

        let result = store.upload(&ticket, None, b"data");
        assert!(matches!(result, Err(BlobError::TicketExpired(_))));
    }

    #[test]
    fn test_get_url_only_for_stored_blobs() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);
        let ticket = store.issue_ticket().unwrap();
        let metadata = store.upload(&ticket, Some("application/pdf"), b"%PDF-1.4").unwrap();

        assert_eq!(
            store.get_url(&metadata.id),
            Some(format!("http://localhost:3000/blobs/{}", metadata.id))
        );
        assert_eq!(store.get_url(&ShardableUuid::new()), None);
    }

    #[test]
    fn test_content_type_prefers_declared_then_detected() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let ticket = store.issue_ticket().unwrap();
        let declared = store.upload(&ticket, Some("text/csv"), b"a,b\n1,2\n").unwrap();
        assert_eq!(
            store.content_type(&declared.id).unwrap().as_ref().map(|t| t.as_str()),
            Some("text/csv")
        );

        let ticket = store.issue_ticket().unwrap();
        let sniffed = store.upload(&ticket, None, b"%PDF-1.4 body").unwrap();
        assert_eq!(
            store.content_type(&sniffed.id).unwrap(),
            sniffed.detected_media_type
        );

        let missing = ShardableUuid::new();
        assert!(matches!(
            store.content_type(&missing),
            Err(BlobError::NotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_read_missing_blob() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let result = store.read(&ShardableUuid::new());
        assert!(matches!(result, Err(BlobError::NotFound(_))));
    }

    #[test]
    fn test_identical_content_gets_distinct_blobs() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let first = store
            .upload(&store.issue_ticket().unwrap(), None, b"same bytes")
            .unwrap();
        let second = store
            .upload(&store.issue_ticket().unwrap(), None, b"same bytes")
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.hash, second.hash);
    }
}
