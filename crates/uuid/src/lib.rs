//! Identifier and sharded-path utilities.
//!
//! Stash identifies users, files, favorites and blobs with a *canonical* UUID representation:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - [`ShardableUuid`], a wrapper that guarantees the canonical format once constructed.
//! - Shared sharding logic used by the blob store to derive on-disk locations.
//! - [`Sha256Hash`], a validated hex digest used for blob integrity metadata.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Canonical form is *required* for externally supplied identifiers (path segments, JSON bodies).
//! Non-canonical values (uppercase, hyphenated, wrong length, non-hex) are rejected.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, data lives under `parent_dir/<u[0..2]>/<u[2..4]>/<u>`, which keeps
//! fan-out per directory small.

mod service;

pub use service::{Sha256Hash, ShardableUuid, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
