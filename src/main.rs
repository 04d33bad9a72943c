use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use stash_core::config::upload_ttl_from_env_value;
use stash_core::constants::{DEFAULT_BLOB_DIR, DEFAULT_PUBLIC_URL};
use stash_core::CoreConfig;
use stash_types::NonEmptyText;

/// Main entry point for the Stash server
///
/// Loads `.env`, resolves configuration once, and serves the REST API with Swagger UI.
///
/// # Environment Variables
/// - `STASH_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `STASH_BLOB_DIR`: Directory for uploaded blobs (default: "stash_data/blobs")
/// - `STASH_PUBLIC_URL`: Externally reachable origin used in upload/download URLs
///   (default: "http://localhost:3000")
/// - `STASH_UPLOAD_TTL_SECS`: Lifetime of upload tickets in seconds (default: 3600)
/// - `API_KEY`: Shared secret the authentication gateway presents in `x-api-key`
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - `API_KEY` is missing or the configuration is invalid,
/// - the blob directory cannot be opened, or
/// - the server address cannot be bound or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stash=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("STASH_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let blob_dir = std::env::var("STASH_BLOB_DIR").unwrap_or_else(|_| DEFAULT_BLOB_DIR.into());
    let public_url =
        std::env::var("STASH_PUBLIC_URL").unwrap_or_else(|_| DEFAULT_PUBLIC_URL.into());
    let upload_ttl = upload_ttl_from_env_value(std::env::var("STASH_UPLOAD_TTL_SECS").ok())?;
    let api_key = std::env::var("API_KEY")
        .map_err(|_| anyhow::anyhow!("API_KEY not set in environment"))?;

    let cfg = CoreConfig::new(
        PathBuf::from(blob_dir),
        NonEmptyText::new(&public_url)?,
        upload_ttl,
    )?;

    tracing::info!("++ Storing blobs under {}", cfg.blob_dir().display());
    let state = AppState::new(&cfg, api_key)?;
    let app = api_rest::router(state);

    tracing::info!("++ Starting Stash REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
