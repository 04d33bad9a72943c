use axum::http::StatusCode;
use stash_blobs::BlobError;
use stash_core::StashError;

/// Error half of every handler result: a status code and a short, non-sensitive message.
pub(crate) type Rejection = (StatusCode, &'static str);

/// Maps a core error onto the HTTP surface.
pub(crate) fn status_for(err: &StashError) -> Rejection {
    match err {
        StashError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthenticated"),
        StashError::UnknownUser => (StatusCode::UNAUTHORIZED, "Unknown user"),
        StashError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
        StashError::FileNotFound(_) => (StatusCode::NOT_FOUND, "File not found"),
        StashError::BlobNotFound(_) | StashError::Blob(BlobError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "Blob not found")
        }
        StashError::Blob(BlobError::UnknownTicket(_) | BlobError::TicketExpired(_)) => {
            (StatusCode::NOT_FOUND, "Upload ticket not found or expired")
        }
        StashError::UnsupportedMediaType(_) => (StatusCode::BAD_REQUEST, "Unsupported media type"),
        StashError::InvalidScope(_) => (StatusCode::BAD_REQUEST, "Invalid scope"),
        StashError::InvalidInput(_) | StashError::Uuid(_) | StashError::Text(_) => {
            (StatusCode::BAD_REQUEST, "Invalid input")
        }
        StashError::StoreUnavailable | StashError::Blob(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

/// Logs `err` at a level matching its status and converts it into a [`Rejection`].
pub(crate) fn reject(err: impl Into<StashError>) -> Rejection {
    let err = err.into();
    let rejection = status_for(&err);
    if rejection.0.is_server_error() {
        tracing::error!("Request failed: {:?}", err);
    } else {
        tracing::debug!("Request rejected: {}", err);
    }
    rejection
}
