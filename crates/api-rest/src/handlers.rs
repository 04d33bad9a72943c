use api_shared::{
    BlobUploadRes, CreateFileReq, FileRes, FileUrlRes, HealthRes, HealthService, IdentityEventReq,
    ListFavoritesRes, ListFilesQuery, ListFilesRes, ToggleFavoriteRes, UploadUrlRes, UserRes,
};
use axum::body::Bytes;
use axum::extract::{Path as AxumPath, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use stash_blobs::ShardableUuid;
use stash_core::{FileFilter, MediaType, NewFile, OrgId, Role, Scope};
use stash_types::NonEmptyText;

use crate::error::{reject, Rejection};
use crate::AppState;

fn parse_scope(raw: &str) -> Result<Scope, Rejection> {
    Scope::parse(raw).map_err(reject)
}

fn parse_id(raw: &str) -> Result<ShardableUuid, Rejection> {
    ShardableUuid::parse(raw).map_err(reject)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
pub(crate) async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/session",
    responses(
        (status = 200, description = "User record for the caller", body = UserRes),
        (status = 401, description = "Unauthenticated or invalid API key")
    )
)]
/// Start a session for the caller
///
/// Registers the caller on first contact and returns their user record. Clients call this once
/// after signing in, before any file operation.
pub(crate) async fn start_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserRes>, Rejection> {
    let caller = state.caller(&headers)?;
    let user = state.services.users.ensure_user(&caller).map_err(reject)?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/scopes/{scope}/files",
    params(
        ("scope" = String, Path, description = "`personal:<user id>` or `org:<org id>`"),
        ListFilesQuery
    ),
    responses(
        (status = 200, description = "Files in the scope; empty if the caller has no access", body = ListFilesRes),
        (status = 400, description = "Malformed scope")
    )
)]
/// List the files of a scope
///
/// Access failures are not reported: a caller without access to the scope gets an empty list.
///
/// # Errors
/// Returns `400 Bad Request` if the scope cannot be parsed, and `500` if the store is
/// unavailable.
pub(crate) async fn list_files(
    State(state): State<AppState>,
    AxumPath(scope): AxumPath<String>,
    Query(params): Query<ListFilesQuery>,
    headers: HeaderMap,
) -> Result<Json<ListFilesRes>, Rejection> {
    let caller = state.caller(&headers)?;
    let scope = parse_scope(&scope)?;
    let filter = FileFilter {
        query: params.query,
        favorites_only: params.favorites.unwrap_or(false),
    };

    let files = state
        .services
        .queries
        .get_files(&caller, &scope, &filter)
        .map_err(reject)?;
    Ok(Json(ListFilesRes {
        files: files.into_iter().map(FileRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/scopes/{scope}/files",
    params(("scope" = String, Path, description = "`personal:<user id>` or `org:<org id>`")),
    request_body = CreateFileReq,
    responses(
        (status = 201, description = "File created", body = FileRes),
        (status = 400, description = "Invalid input or unsupported media type"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Caller has no access to the scope")
    )
)]
/// Record an uploaded blob as a file in a scope.
pub(crate) async fn create_file(
    State(state): State<AppState>,
    AxumPath(scope): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<CreateFileReq>,
) -> Result<(StatusCode, Json<FileRes>), Rejection> {
    let caller = state.caller(&headers)?;
    let scope = parse_scope(&scope)?;
    let blob_id = parse_id(&req.blob_id)?;

    let file = state
        .services
        .mutations
        .create_file(
            &caller,
            NewFile {
                name: req.name,
                scope,
                blob_id,
                media_type: req.media_type,
            },
        )
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(file.into())))
}

#[utoipa::path(
    get,
    path = "/scopes/{scope}/favorites",
    params(("scope" = String, Path, description = "`personal:<user id>` or `org:<org id>`")),
    responses(
        (status = 200, description = "Caller's favorites in the scope; empty if the caller has no access", body = ListFavoritesRes),
        (status = 400, description = "Malformed scope")
    )
)]
pub(crate) async fn list_favorites(
    State(state): State<AppState>,
    AxumPath(scope): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Json<ListFavoritesRes>, Rejection> {
    let caller = state.caller(&headers)?;
    let scope = parse_scope(&scope)?;

    let favorites = state
        .services
        .queries
        .get_all_favorites(&caller, &scope)
        .map_err(reject)?;
    Ok(Json(ListFavoritesRes {
        favorites: favorites.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    delete,
    path = "/files/{id}",
    params(("id" = String, Path, description = "File identifier")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Caller has no access to the file's scope"),
        (status = 404, description = "File not found")
    )
)]
/// Delete a file
///
/// Favorite markers pointing at the file are removed with it. The stored blob is kept.
pub(crate) async fn delete_file(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> Result<StatusCode, Rejection> {
    let caller = state.caller(&headers)?;
    let file_id = parse_id(&id)?;

    state
        .services
        .mutations
        .delete_file(&caller, &file_id)
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/files/{id}/favorite",
    params(("id" = String, Path, description = "File identifier")),
    responses(
        (status = 200, description = "New favorite state", body = ToggleFavoriteRes),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Caller has no access to the file's scope"),
        (status = 404, description = "File not found")
    )
)]
pub(crate) async fn toggle_favorite(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Json<ToggleFavoriteRes>, Rejection> {
    let caller = state.caller(&headers)?;
    let file_id = parse_id(&id)?;

    let favorite_state = state
        .services
        .mutations
        .toggle_favorite(&caller, &file_id)
        .map_err(reject)?;
    Ok(Json(favorite_state.into()))
}

#[utoipa::path(
    post,
    path = "/uploads",
    responses(
        (status = 200, description = "Single-use upload URL", body = UploadUrlRes),
        (status = 401, description = "Unauthenticated")
    )
)]
/// Issue a single-use upload URL.
pub(crate) async fn generate_upload_url(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UploadUrlRes>, Rejection> {
    let caller = state.caller(&headers)?;
    let upload_url = state
        .services
        .mutations
        .generate_upload_url(&caller)
        .map_err(reject)?;
    Ok(Json(UploadUrlRes { upload_url }))
}

#[utoipa::path(
    post,
    path = "/blobs/upload/{ticket}",
    params(("ticket" = String, Path, description = "Ticket from the upload URL")),
    request_body(content = String, content_type = "application/octet-stream", description = "Raw file content; Content-Type must be an image, PDF or CSV type"),
    responses(
        (status = 201, description = "Blob stored", body = BlobUploadRes),
        (status = 404, description = "Ticket unknown, already used, or expired"),
        (status = 415, description = "Unsupported content type")
    )
)]
/// Store uploaded content against an upload ticket
///
/// The ticket in the path is the credential, so no identity is required. It is consumed by the
/// first upload attempt that reaches the blob store.
///
/// # Errors
/// - `415 Unsupported Media Type` if the Content-Type is not an image, PDF or CSV type
/// - `404 Not Found` if the ticket is unknown, used or expired
/// - `500 Internal Server Error` if writing the blob fails
pub(crate) async fn upload_blob(
    State(state): State<AppState>,
    AxumPath(ticket): AxumPath<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<BlobUploadRes>), Rejection> {
    let ticket = parse_id(&ticket)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if MediaType::from_content_type(content_type).is_none() {
        tracing::debug!("Rejected upload with content type '{}'", content_type);
        return Err((StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type"));
    }

    let metadata = state
        .blobs
        .upload(&ticket, Some(content_type), &body)
        .map_err(reject)?;
    Ok((
        StatusCode::CREATED,
        Json(BlobUploadRes {
            blob_id: metadata.id.to_string(),
            content_type: content_type.to_owned(),
            size_bytes: metadata.size_bytes,
            sha256: metadata.hash.to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/blobs/{id}",
    params(("id" = String, Path, description = "Blob identifier")),
    responses(
        (status = 200, description = "Blob content"),
        (status = 404, description = "Blob not found")
    )
)]
pub(crate) async fn download_blob(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<impl IntoResponse, Rejection> {
    let blob_id = parse_id(&id)?;
    let (metadata, content) = state.blobs.read(&blob_id).map_err(reject)?;

    let content_type = metadata
        .content_type
        .or(metadata.detected_media_type)
        .map(NonEmptyText::into_inner)
        .unwrap_or_else(|| "application/octet-stream".to_owned());
    let disposition = if MediaType::from_content_type(&content_type).is_some() {
        "inline"
    } else {
        "attachment"
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_owned()),
            (header::CONTENT_DISPOSITION, disposition.to_owned()),
        ],
        content,
    ))
}

#[utoipa::path(
    get,
    path = "/blobs/{id}/url",
    params(("id" = String, Path, description = "Blob identifier")),
    responses(
        (status = 200, description = "Download URL", body = FileUrlRes),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "Blob not found")
    )
)]
/// Resolve a blob to its download URL.
pub(crate) async fn get_file_url(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Json<FileUrlRes>, Rejection> {
    let caller = state.caller(&headers)?;
    let blob_id = parse_id(&id)?;

    let url = state
        .services
        .queries
        .get_file_url(&caller, &blob_id)
        .map_err(reject)?;
    Ok(Json(FileUrlRes { url }))
}

#[utoipa::path(
    post,
    path = "/webhooks/identity",
    request_body = IdentityEventReq,
    responses(
        (status = 200, description = "User record after applying the event", body = UserRes),
        (status = 400, description = "Invalid event payload"),
        (status = 401, description = "Invalid API key, or membership for an unregistered user")
    )
)]
/// Apply an identity-provider event
///
/// Only the authentication gateway may call this endpoint.
///
/// # Events
/// - `user.created`: registers the user (idempotent)
/// - `organizationMembership.created`: appends the membership to an existing user
pub(crate) async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<IdentityEventReq>,
) -> Result<Json<UserRes>, Rejection> {
    state.verify_gateway(&headers)?;

    let users = &state.services.users;
    let user = match event {
        IdentityEventReq::UserCreated { token_identifier } => {
            let token = NonEmptyText::new(&token_identifier).map_err(reject)?;
            users.ensure_user_for_token(token)
        }
        IdentityEventReq::MembershipCreated {
            token_identifier,
            org_id,
            role,
        } => {
            let token = NonEmptyText::new(&token_identifier).map_err(reject)?;
            let org_id = OrgId::new(&org_id).map_err(reject)?;
            let role = role.parse::<Role>().map_err(reject)?;
            users.add_membership(&token, org_id, role)
        }
    }
    .map_err(reject)?;

    Ok(Json(user.into()))
}
