//! Caller identity as handed over by the authentication provider.
//!
//! The provider is external: Stash only receives an opaque, already verified token identifier,
//! or nothing at all for anonymous callers.

use stash_types::NonEmptyText;

/// A verified caller identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    token_identifier: NonEmptyText,
}

impl Identity {
    pub fn new(token_identifier: NonEmptyText) -> Self {
        Self { token_identifier }
    }

    /// Opaque identifier issued by the provider, stable for one external account.
    pub fn token_identifier(&self) -> &NonEmptyText {
        &self.token_identifier
    }
}

/// Source of the identity of the current caller.
pub trait IdentityProvider {
    fn current_identity(&self) -> Option<Identity>;
}

impl IdentityProvider for Identity {
    fn current_identity(&self) -> Option<Identity> {
        Some(self.clone())
    }
}

impl IdentityProvider for Option<Identity> {
    fn current_identity(&self) -> Option<Identity> {
        self.clone()
    }
}
