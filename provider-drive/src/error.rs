//! Error types for the Drive provider

use bridge_traits::storage::StoreError;
use thiserror::Error;

/// Drive provider errors
#[derive(Error, Debug)]
pub enum DriveError {
    /// Token rejected or missing scope
    #[error("Authentication failed (status {status_code}): {message}")]
    AuthenticationFailed { status_code: u16, message: String },

    /// API request returned an error
    #[error("Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded (status {status_code})")]
    RateLimitExceeded { status_code: u16 },

    /// Id-addressed object is gone
    #[error("Object not found: {object_id}")]
    ObjectNotFound { object_id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Resumable upload initiation did not yield a session URI
    #[error("Upload session missing Location header")]
    MissingUploadSession,
}

/// Result type for Drive operations
pub type Result<T> = std::result::Result<T, DriveError>;

impl DriveError {
    /// Classify a non-success HTTP status into the provider taxonomy.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        match status_code {
            401 | 403 => DriveError::AuthenticationFailed {
                status_code,
                message: message.into(),
            },
            429 => DriveError::RateLimitExceeded { status_code },
            _ => DriveError::ApiError {
                status_code,
                message: message.into(),
            },
        }
    }
}

impl From<bridge_traits::error::BridgeError> for DriveError {
    fn from(error: bridge_traits::error::BridgeError) -> Self {
        DriveError::NetworkError(error.to_string())
    }
}

impl From<DriveError> for StoreError {
    fn from(error: DriveError) -> Self {
        match error {
            DriveError::AuthenticationFailed {
                status_code,
                message,
            } => {
                if status_code == 403 {
                    StoreError::PermissionDenied(message)
                } else {
                    StoreError::Auth(message)
                }
            }
            DriveError::ApiError {
                status_code,
                message,
            } => {
                if status_code == 404 {
                    StoreError::NotFound(message)
                } else {
                    StoreError::Api {
                        status: status_code,
                        message,
                    }
                }
            }
            DriveError::RateLimitExceeded { status_code } => StoreError::RateLimited {
                status: status_code,
            },
            DriveError::ObjectNotFound { object_id } => StoreError::NotFound(object_id),
            DriveError::ParseError(msg) => StoreError::Malformed(msg),
            DriveError::NetworkError(msg) => StoreError::Network(msg),
            DriveError::MissingUploadSession => {
                StoreError::Malformed("upload session missing Location header".to_string())
            }
        }
    }
}
