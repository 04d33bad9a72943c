//! Ownership scopes.
//!
//! Every file belongs to exactly one scope: either a single user's personal space or an
//! organization. On the wire a scope is written `personal:<user id>` or `org:<org id>`.

use crate::constants::{ORGANIZATION_SCOPE_PREFIX, PERSONAL_SCOPE_PREFIX};
use crate::model::UserId;
use crate::{StashError, StashResult};
use stash_types::NonEmptyText;
use std::fmt;
use std::str::FromStr;

/// Organization identifier issued by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OrgId(NonEmptyText);

impl OrgId {
    pub fn new(input: impl AsRef<str>) -> StashResult<Self> {
        Ok(Self(NonEmptyText::new(input)?))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Personal(UserId),
    Organization(OrgId),
}

impl Scope {
    /// Parses the `personal:<id>` / `org:<id>` wire form.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::InvalidScope`] for an unknown prefix, a missing separator, an empty
    /// organization id, or a personal id that is not a canonical UUID.
    pub fn parse(input: &str) -> StashResult<Self> {
        let (kind, id) = input
            .split_once(':')
            .ok_or_else(|| StashError::InvalidScope(format!("missing ':' in '{}'", input)))?;

        match kind {
            PERSONAL_SCOPE_PREFIX => UserId::parse(id)
                .map(Scope::Personal)
                .map_err(|e| StashError::InvalidScope(e.to_string())),
            ORGANIZATION_SCOPE_PREFIX => OrgId::new(id)
                .map(Scope::Organization)
                .map_err(|_| StashError::InvalidScope("organization id cannot be empty".into())),
            other => Err(StashError::InvalidScope(format!(
                "unknown scope kind '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Personal(user_id) => write!(f, "{}:{}", PERSONAL_SCOPE_PREFIX, user_id),
            Scope::Organization(org_id) => write!(f, "{}:{}", ORGANIZATION_SCOPE_PREFIX, org_id),
        }
    }
}

impl FromStr for Scope {
    type Err = StashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::parse(s)
    }
}

impl serde::Serialize for Scope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Scope::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_personal_scope() {
        let scope = Scope::parse("personal:550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(
            scope,
            Scope::Personal(UserId::parse("550e8400e29b41d4a716446655440000").unwrap())
        );
        assert_eq!(scope.to_string(), "personal:550e8400e29b41d4a716446655440000");
    }

    #[test]
    fn test_parse_organization_scope_keeps_provider_id() {
        let scope = Scope::parse("org:org_2aBcD:x").unwrap();
        assert_eq!(scope, Scope::Organization(OrgId::new("org_2aBcD:x").unwrap()));
        assert_eq!(scope.to_string(), "org:org_2aBcD:x");
    }

    #[test]
    fn test_parse_rejects_malformed_scopes() {
        for raw in [
            "",
            "org_2aBcD",
            "org:",
            "org:   ",
            "team:abc",
            "personal:not-a-uuid",
            "personal:550E8400E29B41D4A716446655440000",
        ] {
            assert!(
                matches!(Scope::parse(raw), Err(StashError::InvalidScope(_))),
                "'{}' should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_personal_and_org_scopes_never_collide() {
        let user_id = UserId::new();
        let personal = Scope::Personal(user_id);
        let org_named_like_user = Scope::Organization(OrgId::new(user_id.to_string()).unwrap());

        assert_ne!(personal, org_named_like_user);
    }

    #[test]
    fn test_serde_round_trips_through_wire_form() {
        let scope = Scope::Organization(OrgId::new("org_acme").unwrap());
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, "\"org:org_acme\"");
        assert_eq!(serde_json::from_str::<Scope>(&json).unwrap(), scope);
    }
}
