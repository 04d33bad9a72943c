//! Documents held by the store.

use crate::scope::{OrgId, Scope};
use crate::StashError;
use chrono::{DateTime, Utc};
use stash_types::NonEmptyText;
use stash_uuid::ShardableUuid;
use std::fmt;
use std::str::FromStr;

pub type UserId = ShardableUuid;
pub type FileId = ShardableUuid;
pub type FavoriteId = ShardableUuid;
pub type BlobId = ShardableUuid;

/// Role a user holds inside an organization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl FromStr for Role {
    type Err = StashError;

    /// Accepts `admin` / `member`, with or without the provider's `org:` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches("org:") {
            "admin" => Ok(Role::Admin),
            "member" | "basic_member" => Ok(Role::Member),
            other => Err(StashError::InvalidInput(format!("unknown role '{}'", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Membership {
    pub org_id: OrgId,
    pub role: Role,
}

/// A persisted user, created once per external identity.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct User {
    pub id: UserId,
    pub token_identifier: NonEmptyText,
    pub memberships: Vec<Membership>,
}

impl User {
    pub fn is_member_of(&self, org_id: &OrgId) -> bool {
        self.memberships.iter().any(|m| &m.org_id == org_id)
    }

    /// Whether this user may act within `scope`.
    pub fn can_access(&self, scope: &Scope) -> bool {
        match scope {
            Scope::Personal(user_id) => *user_id == self.id,
            Scope::Organization(org_id) => self.is_member_of(org_id),
        }
    }

    /// The user's own personal scope.
    pub fn personal_scope(&self) -> Scope {
        Scope::Personal(self.id)
    }
}

/// The kinds of content Stash accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Pdf,
    Csv,
}

impl MediaType {
    /// Maps an upload `Content-Type` onto a media type.
    ///
    /// Parameters such as `; charset=utf-8` are ignored. Images are limited to raster formats that
    /// browsers render without running scripts; `image/svg+xml` and anything else unknown is
    /// `None`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/pdf" => Some(MediaType::Pdf),
            "text/csv" => Some(MediaType::Csv),
            "image/png" | "image/jpeg" | "image/gif" | "image/webp" => Some(MediaType::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Pdf => "pdf",
            MediaType::Csv => "csv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = StashError;

    /// Accepts either a kind name (`image`, `pdf`, `csv`) or an upload content type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(MediaType::Image),
            "pdf" => Ok(MediaType::Pdf),
            "csv" => Ok(MediaType::Csv),
            _ => MediaType::from_content_type(s)
                .ok_or_else(|| StashError::UnsupportedMediaType(s.to_string())),
        }
    }
}

/// A stored file record. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct File {
    pub id: FileId,
    pub name: NonEmptyText,
    pub scope: Scope,
    pub blob_id: BlobId,
    pub media_type: MediaType,
    pub created_at: DateTime<Utc>,
}

/// Marker recording that a user starred a file within a scope.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Favorite {
    pub id: FavoriteId,
    pub user_id: UserId,
    pub scope: Scope,
    pub file_id: FileId,
}

/// Outcome of a favorite toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteState {
    Favorited,
    Unfavorited,
}

impl FavoriteState {
    pub fn is_favorited(&self) -> bool {
        matches!(self, FavoriteState::Favorited)
    }
}
