//! Read paths.
//!
//! Listing and favorites fail soft: any access denial yields an empty result, so a caller cannot
//! tell an inaccessible scope from an empty one. Store failures still propagate.

use crate::access::{self, ScopeAccess};
use crate::identity::IdentityProvider;
use crate::model::{BlobId, Favorite, File, FileId};
use crate::scope::Scope;
use crate::store::MemoryStore;
use crate::{StashError, StashResult};
use stash_blobs::BlobStore;
use std::collections::HashSet;
use std::sync::Arc;

/// Optional narrowing applied to a scope listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileFilter {
    /// Case-insensitive substring matched against file names.
    pub query: Option<String>,
    /// Keep only files the caller has favorited in this scope.
    pub favorites_only: bool,
}

impl FileFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn favorites_only(mut self) -> Self {
        self.favorites_only = true;
        self
    }

    fn needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Clone)]
pub struct FileQueryService {
    store: Arc<MemoryStore>,
    blobs: Arc<dyn BlobStore>,
}

impl FileQueryService {
    pub fn new(store: Arc<MemoryStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Lists the files of `scope`, in insertion order, narrowed by `filter`.
    ///
    /// Returns an empty vector when the caller may not access `scope`.
    pub fn get_files(
        &self,
        caller: &impl IdentityProvider,
        scope: &Scope,
        filter: &FileFilter,
    ) -> StashResult<Vec<File>> {
        let identity = caller.current_identity();
        let needle = filter.needle();

        self.store.read(|tables| {
            let user = match access::check_scope(tables, identity.as_ref(), scope) {
                ScopeAccess::Authorized(user) => user,
                ScopeAccess::Denied(denial) => {
                    tracing::debug!(%scope, ?denial, "file listing denied");
                    return Vec::new();
                }
            };

            let favorite_ids: Option<HashSet<FileId>> = filter.favorites_only.then(|| {
                tables
                    .favorites_by_owner(&user.id, scope)
                    .map(|favorite| favorite.file_id)
                    .collect()
            });

            tables
                .files_by_scope(scope)
                .filter(|file| match &needle {
                    Some(needle) => file.name.as_str().to_lowercase().contains(needle.as_str()),
                    None => true,
                })
                .filter(|file| match &favorite_ids {
                    Some(ids) => ids.contains(&file.id),
                    None => true,
                })
                .cloned()
                .collect()
        })
    }

    /// Returns the caller's favorite markers for `scope`, or nothing if access is denied.
    pub fn get_all_favorites(
        &self,
        caller: &impl IdentityProvider,
        scope: &Scope,
    ) -> StashResult<Vec<Favorite>> {
        let identity = caller.current_identity();

        self.store.read(|tables| {
            match access::check_scope(tables, identity.as_ref(), scope) {
                ScopeAccess::Authorized(user) => tables
                    .favorites_by_owner(&user.id, scope)
                    .cloned()
                    .collect(),
                ScopeAccess::Denied(denial) => {
                    tracing::debug!(%scope, ?denial, "favorites listing denied");
                    Vec::new()
                }
            }
        })
    }

    /// Resolves a download URL for a stored blob.
    ///
    /// # Errors
    ///
    /// - `StashError::Unauthenticated` without an identity
    /// - `StashError::BlobNotFound` when the blob store has no such object
    pub fn get_file_url(
        &self,
        caller: &impl IdentityProvider,
        blob_id: &BlobId,
    ) -> StashResult<String> {
        caller
            .current_identity()
            .ok_or(StashError::Unauthenticated)?;
        self.blobs
            .get_url(blob_id)
            .ok_or(StashError::BlobNotFound(*blob_id))
    }
}
