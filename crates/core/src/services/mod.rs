//! Services exposed to the API layer.
//!
//! - [`UserService`]: explicit, idempotent user registration and membership updates
//! - [`FileQueryService`]: soft-failing reads (listing, favorites, download URLs)
//! - [`FileMutationService`]: hard-failing writes (create, delete, favorite toggle, uploads)
//!
//! All of them share one [`MemoryStore`] and one [`BlobStore`].

pub mod mutations;
pub mod queries;
pub mod users;

pub use mutations::{FileMutationService, NewFile};
pub use queries::{FileFilter, FileQueryService};
pub use users::UserService;

use crate::store::MemoryStore;
use stash_blobs::BlobStore;
use std::sync::Arc;

/// The full set of services wired to the same store and blob backend.
#[derive(Clone)]
pub struct StashServices {
    pub users: UserService,
    pub queries: FileQueryService,
    pub mutations: FileMutationService,
}

impl StashServices {
    pub fn new(store: Arc<MemoryStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            users: UserService::new(store.clone()),
            queries: FileQueryService::new(store.clone(), blobs.clone()),
            mutations: FileMutationService::new(store, blobs),
        }
    }
}
