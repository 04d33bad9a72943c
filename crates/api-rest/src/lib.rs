//! # API REST
//!
//! REST API implementation for Stash.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Gateway authentication and caller identity headers
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for request/response bodies and `stash-core` for every decision about
//! access.

#![warn(rust_2018_idioms)]

mod error;
mod handlers;

use api_shared::auth::{API_KEY_HEADER, IDENTITY_HEADER};
use api_shared::validate_api_key;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::Router;
use stash_blobs::LocalBlobStore;
use stash_core::{CoreConfig, Identity, MemoryStore, StashResult, StashServices};
use stash_types::NonEmptyText;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use error::Rejection;

/// Largest accepted request body, which bounds blob uploads.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    services: StashServices,
    blobs: Arc<LocalBlobStore>,
    api_key: Arc<str>,
}

impl AppState {
    /// Opens the blob store described by `cfg` and wires the core services to a fresh store.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob directory cannot be created or opened.
    pub fn new(cfg: &CoreConfig, api_key: impl Into<String>) -> StashResult<Self> {
        let blobs = Arc::new(cfg.open_blob_store()?);
        let services = StashServices::new(Arc::new(MemoryStore::new()), blobs.clone());
        Ok(Self {
            services,
            blobs,
            api_key: Arc::from(api_key.into()),
        })
    }

    /// Checks that the request was forwarded by the authentication gateway.
    fn verify_gateway(&self, headers: &HeaderMap) -> Result<(), Rejection> {
        let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
        validate_api_key(provided, &self.api_key).map_err(|e| {
            tracing::warn!("Gateway authentication failed: {}", e);
            (StatusCode::UNAUTHORIZED, "Invalid API key")
        })
    }

    /// Extracts the caller identity.
    ///
    /// No identity header means an anonymous caller. An identity header is only trusted when the
    /// gateway's API key accompanies it.
    fn caller(&self, headers: &HeaderMap) -> Result<Option<Identity>, Rejection> {
        let Some(raw) = headers.get(IDENTITY_HEADER) else {
            return Ok(None);
        };
        self.verify_gateway(headers)?;

        let token = raw
            .to_str()
            .ok()
            .and_then(|t| NonEmptyText::new(t).ok())
            .ok_or((StatusCode::BAD_REQUEST, "Invalid identity header"))?;
        Ok(Some(Identity::new(token)))
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::start_session,
        handlers::list_files,
        handlers::create_file,
        handlers::list_favorites,
        handlers::delete_file,
        handlers::toggle_favorite,
        handlers::generate_upload_url,
        handlers::upload_blob,
        handlers::download_blob,
        handlers::get_file_url,
        handlers::identity_webhook,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::UserRes,
        api_shared::MembershipRes,
        api_shared::FileRes,
        api_shared::ListFilesRes,
        api_shared::CreateFileReq,
        api_shared::FavoriteRes,
        api_shared::ListFavoritesRes,
        api_shared::ToggleFavoriteRes,
        api_shared::UploadUrlRes,
        api_shared::BlobUploadRes,
        api_shared::FileUrlRes,
        api_shared::IdentityEventReq,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI mounted at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/session", post(handlers::start_session))
        .route(
            "/scopes/:scope/files",
            get(handlers::list_files).post(handlers::create_file),
        )
        .route("/scopes/:scope/favorites", get(handlers::list_favorites))
        .route("/files/:id", delete(handlers::delete_file))
        .route("/files/:id/favorite", post(handlers::toggle_favorite))
        .route("/uploads", post(handlers::generate_upload_url))
        .route("/blobs/upload/:ticket", post(handlers::upload_blob))
        .route("/blobs/:id", get(handlers::download_blob))
        .route("/blobs/:id/url", get(handlers::get_file_url))
        .route("/webhooks/identity", post(handlers::identity_webhook))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
