//! User registry.
//!
//! Users are created explicitly at session start and only ever gain memberships afterwards.

use crate::identity::IdentityProvider;
use crate::model::{Membership, Role, User};
use crate::scope::OrgId;
use crate::store::MemoryStore;
use crate::{StashError, StashResult};
use stash_types::NonEmptyText;
use std::sync::Arc;

#[derive(Clone)]
pub struct UserService {
    store: Arc<MemoryStore>,
}

impl UserService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Returns the user record for the caller, creating it on first contact.
    ///
    /// # Errors
    ///
    /// Returns `StashError::Unauthenticated` when the caller presents no identity.
    pub fn ensure_user(&self, caller: &impl IdentityProvider) -> StashResult<User> {
        let identity = caller
            .current_identity()
            .ok_or(StashError::Unauthenticated)?;
        self.ensure_user_for_token(identity.token_identifier().clone())
    }

    /// Idempotent registration keyed on the provider's token identifier.
    pub fn ensure_user_for_token(&self, token_identifier: NonEmptyText) -> StashResult<User> {
        let existing = self.store.read(|tables| {
            tables
                .user_by_token(token_identifier.as_str())
                .cloned()
        })?;
        if let Some(user) = existing {
            return Ok(user);
        }

        // Re-check under the write lock.
        self.store.transaction(|tables| {
            if let Some(user) = tables.user_by_token(token_identifier.as_str()) {
                return Ok(user.clone());
            }
            let user = tables.insert_user(token_identifier);
            tracing::info!(user_id = %user.id, "registered new user");
            Ok(user)
        })
    }

    /// Appends an organization membership. Re-adding an existing organization is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StashError::UnknownUser` if no user is registered for `token_identifier`.
    pub fn add_membership(
        &self,
        token_identifier: &NonEmptyText,
        org_id: OrgId,
        role: Role,
    ) -> StashResult<User> {
        self.store.transaction(|tables| {
            let user_id = tables
                .user_by_token(token_identifier.as_str())
                .map(|user| user.id)
                .ok_or(StashError::UnknownUser)?;

            let already_member = tables
                .user(&user_id)
                .is_some_and(|user| user.is_member_of(&org_id));
            if !already_member {
                tracing::info!(user_id = %user_id, org_id = %org_id, role = role.as_str(), "membership added");
            }

            tables
                .append_membership(&user_id, Membership { org_id, role })
                .cloned()
                .ok_or(StashError::UnknownUser)
        })
    }
}
