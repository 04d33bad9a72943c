/// Header carrying the shared secret of the authentication gateway.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the verified caller's token identifier.
pub const IDENTITY_HEADER: &str = "x-identity-token";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing x-api-key header")]
    MissingApiKey,
    #[error("Invalid API key")]
    InvalidApiKey,
}

/// Validates the key presented by the gateway against the configured API key.
///
/// Returns `Ok(())` if the key matches, or an error if it is missing or wrong.
pub fn validate_api_key(provided_key: Option<&str>, expected_key: &str) -> Result<(), AuthError> {
    let provided_key = provided_key.ok_or(AuthError::MissingApiKey)?;

    if provided_key == expected_key {
        Ok(())
    } else {
        Err(AuthError::InvalidApiKey)
    }
}
