/// File holding the raw bytes inside a blob directory.
pub const CONTENT_FILE_NAME: &str = "content";

/// JSON sidecar describing the blob.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Route prefix under the public base URL where uploads are accepted.
pub(crate) const UPLOAD_ROUTE: &str = "blobs/upload";

/// Route prefix under the public base URL where blobs are served.
pub(crate) const DOWNLOAD_ROUTE: &str = "blobs";
