//! # Stash Core
//!
//! Access control and file bookkeeping for the Stash file service.
//!
//! This crate holds the domain model and the rules that decide who may see or change what:
//! - Users, organization memberships and the tagged [`Scope`] a file belongs to
//! - Scope and file access checks returning explicit outcomes
//! - File listing with name search and favorites filtering
//! - Transactional create / delete / favorite mutations over an in-memory document store
//!
//! **No API concerns**: HTTP routing, header parsing and status codes belong in `api-rest`.

pub mod access;
pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod model;
pub mod scope;
pub mod services;
pub mod store;

pub use access::{Denial, FileAccess, ScopeAccess};
pub use config::CoreConfig;
pub use error::{StashError, StashResult};
pub use identity::{Identity, IdentityProvider};
pub use model::{
    BlobId, Favorite, FavoriteId, FavoriteState, File, FileId, MediaType, Membership, Role, User,
    UserId,
};
pub use scope::{OrgId, Scope};
pub use services::{
    FileFilter, FileMutationService, FileQueryService, NewFile, StashServices, UserService,
};
pub use store::MemoryStore;
