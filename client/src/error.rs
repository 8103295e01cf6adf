//! Error types for the Campus client.
//!
//! Each module defines its own error enum; [`ClientError`] gathers them for
//! operations that cross module boundaries.

use campus_history::PayloadError;
use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::session::SessionError;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session persistence error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Campus API error.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Content payload could not be interpreted.
    #[error("content error: {0}")]
    Payload(#[from] PayloadError),

    /// The requested version is not in the loaded history.
    #[error("no version {version} in the history of file {file_id}")]
    UnknownVersion { file_id: String, version: String },
}

impl ClientError {
    /// Returns true if the error means the session is no longer valid.
    #[must_use]
    pub fn is_session_invalidating(&self) -> bool {
        matches!(self, Self::Api(api) if api.is_session_invalidating())
    }
}

/// A specialized `Result` type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
