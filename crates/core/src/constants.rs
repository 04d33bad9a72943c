//! Defaults used when the environment does not override them.

/// Directory blobs are written to when `STASH_BLOB_DIR` is unset.
pub const DEFAULT_BLOB_DIR: &str = "stash_data/blobs";

/// Public origin used to build upload and download URLs when `STASH_PUBLIC_URL` is unset.
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";

/// Lifetime of an upload ticket when `STASH_UPLOAD_TTL_SECS` is unset.
pub const DEFAULT_UPLOAD_TTL_SECS: i64 = 3600;

/// Wire prefix of a personal scope identifier.
pub const PERSONAL_SCOPE_PREFIX: &str = "personal";

/// Wire prefix of an organization scope identifier.
pub const ORGANIZATION_SCOPE_PREFIX: &str = "org";
