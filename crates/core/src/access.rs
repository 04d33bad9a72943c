//! Access checks.
//!
//! Both checkers resolve the caller against the snapshot they are given and return an explicit
//! outcome instead of a nullable user. Read paths map any [`Denial`] to an empty result; write
//! paths convert it into a [`StashError`] with [`ScopeAccess::into_result`] /
//! [`FileAccess::into_result`].
//!
//! Nothing here is cached: every call re-reads the caller's memberships.

use crate::identity::Identity;
use crate::model::{File, FileId, User};
use crate::scope::Scope;
use crate::store::Tables;
use crate::StashError;

/// Why access was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    /// No identity was presented.
    Unauthenticated,
    /// The identity has no user record yet.
    UnknownUser,
    /// The user is neither the personal owner nor a member of the organization.
    NotMember,
    /// The referenced file does not exist.
    FileNotFound(FileId),
}

impl From<Denial> for StashError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => StashError::Unauthenticated,
            Denial::UnknownUser => StashError::UnknownUser,
            Denial::NotMember => StashError::Forbidden,
            Denial::FileNotFound(id) => StashError::FileNotFound(id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeAccess {
    Authorized(User),
    Denied(Denial),
}

impl ScopeAccess {
    pub fn into_result(self) -> Result<User, StashError> {
        match self {
            ScopeAccess::Authorized(user) => Ok(user),
            ScopeAccess::Denied(denial) => Err(denial.into()),
        }
    }

    pub fn authorized(self) -> Option<User> {
        match self {
            ScopeAccess::Authorized(user) => Some(user),
            ScopeAccess::Denied(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileAccess {
    Authorized { user: User, file: File },
    Denied(Denial),
}

impl FileAccess {
    pub fn into_result(self) -> Result<(User, File), StashError> {
        match self {
            FileAccess::Authorized { user, file } => Ok((user, file)),
            FileAccess::Denied(denial) => Err(denial.into()),
        }
    }
}

/// Resolves the caller into its persisted user record.
pub fn resolve_user<'a>(tables: &'a Tables, caller: Option<&Identity>) -> Result<&'a User, Denial> {
    let identity = caller.ok_or(Denial::Unauthenticated)?;
    tables
        .user_by_token(identity.token_identifier().as_str())
        .ok_or(Denial::UnknownUser)
}

/// Decides whether `caller` may act within `scope`.
pub fn check_scope(tables: &Tables, caller: Option<&Identity>, scope: &Scope) -> ScopeAccess {
    let user = match resolve_user(tables, caller) {
        Ok(user) => user,
        Err(denial) => return ScopeAccess::Denied(denial),
    };

    if user.can_access(scope) {
        ScopeAccess::Authorized(user.clone())
    } else {
        ScopeAccess::Denied(Denial::NotMember)
    }
}

/// Fetches `file_id` and checks the caller against the file's owning scope.
pub fn check_file(tables: &Tables, caller: Option<&Identity>, file_id: &FileId) -> FileAccess {
    let Some(file) = tables.file(file_id) else {
        return FileAccess::Denied(Denial::FileNotFound(*file_id));
    };

    match check_scope(tables, caller, &file.scope) {
        ScopeAccess::Authorized(user) => FileAccess::Authorized {
            user,
            file: file.clone(),
        },
        ScopeAccess::Denied(denial) => FileAccess::Denied(denial),
    }
}
