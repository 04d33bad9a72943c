//! # API Shared
//!
//! Shared utilities and definitions for Stash APIs.
//!
//! Contains:
//! - Request and response bodies (`dto` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Gateway authentication utilities
//!
//! Used by `api-rest` and the `stash-run` binary.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{validate_api_key, AuthError};
pub use dto::*;
pub use health::HealthService;
