//! JSON bodies exchanged over the REST API.
//!
//! Identifiers are rendered as 32-character lowercase hex strings and scopes in their
//! `personal:<id>` / `org:<id>` wire form.

use serde::{Deserialize, Serialize};
use stash_core::{Favorite, FavoriteState, File, Membership, User};
use utoipa::{IntoParams, ToSchema};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct MembershipRes {
    pub org_id: String,
    /// `admin` or `member`
    pub role: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct UserRes {
    pub id: String,
    /// Scope holding the user's personal files.
    pub personal_scope: String,
    pub memberships: Vec<MembershipRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct FileRes {
    pub id: String,
    pub name: String,
    pub scope: String,
    pub blob_id: String,
    /// `image`, `pdf` or `csv`
    pub media_type: String,
    /// RFC 3339 timestamp
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ListFilesRes {
    pub files: Vec<FileRes>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Case-insensitive substring matched against file names.
    pub query: Option<String>,
    /// Only return files the caller has favorited.
    pub favorites: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct CreateFileReq {
    pub name: String,
    /// Blob identifier returned by the upload endpoint.
    pub blob_id: String,
    /// Kind name (`image`, `pdf`, `csv`) or the uploaded content type.
    pub media_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct FavoriteRes {
    pub id: String,
    pub user_id: String,
    pub scope: String,
    pub file_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ListFavoritesRes {
    pub favorites: Vec<FavoriteRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ToggleFavoriteRes {
    pub favorited: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct UploadUrlRes {
    /// Single-use URL to POST the file content to.
    pub upload_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct BlobUploadRes {
    pub blob_id: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub sha256: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct FileUrlRes {
    pub url: String,
}

/// Payload of an identity-provider webhook call.
///
/// The gateway resolves provider user ids into token identifiers before forwarding.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "type", content = "data")]
pub enum IdentityEventReq {
    #[serde(rename = "user.created")]
    UserCreated { token_identifier: String },
    #[serde(rename = "organizationMembership.created")]
    MembershipCreated {
        token_identifier: String,
        org_id: String,
        /// `admin`, `member`, or the provider's `org:`-prefixed role name
        role: String,
    },
}

impl From<&Membership> for MembershipRes {
    fn from(membership: &Membership) -> Self {
        Self {
            org_id: membership.org_id.to_string(),
            role: membership.role.as_str().to_owned(),
        }
    }
}

impl From<User> for UserRes {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            personal_scope: user.personal_scope().to_string(),
            memberships: user.memberships.iter().map(MembershipRes::from).collect(),
        }
    }
}

impl From<File> for FileRes {
    fn from(file: File) -> Self {
        Self {
            id: file.id.to_string(),
            name: file.name.into_inner(),
            scope: file.scope.to_string(),
            blob_id: file.blob_id.to_string(),
            media_type: file.media_type.as_str().to_owned(),
            created_at: file.created_at.to_rfc3339(),
        }
    }
}

impl From<Favorite> for FavoriteRes {
    fn from(favorite: Favorite) -> Self {
        Self {
            id: favorite.id.to_string(),
            user_id: favorite.user_id.to_string(),
            scope: favorite.scope.to_string(),
            file_id: favorite.file_id.to_string(),
        }
    }
}

impl From<FavoriteState> for ToggleFavoriteRes {
    fn from(state: FavoriteState) -> Self {
        Self {
            favorited: state.is_favorited(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_event_membership_payload() {
        let raw = r#"{
            "type": "organizationMembership.created",
            "data": {"token_identifier": "issuer|alice", "org_id": "org_acme", "role": "org:admin"}
        }"#;
        let event: IdentityEventReq = serde_json::from_str(raw).unwrap();

        assert_eq!(
            event,
            IdentityEventReq::MembershipCreated {
                token_identifier: "issuer|alice".into(),
                org_id: "org_acme".into(),
                role: "org:admin".into(),
            }
        );
    }

    #[test]
    fn test_identity_event_rejects_unknown_type() {
        let raw = r#"{"type": "session.ended", "data": {}}"#;
        assert!(serde_json::from_str::<IdentityEventReq>(raw).is_err());
    }
}
