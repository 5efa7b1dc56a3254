//! Error types for client operations

use std::fmt;

use chartmuseum_core::CoreError;
use thiserror::Error;

/// Client operation errors
#[derive(Debug, Error)]
pub enum ClientError {
    // ============ Configuration Errors ============
    #[error("Invalid client configuration: {message}")]
    Config { message: String },

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    // ============ Request Construction Errors ============
    #[error("Chart to upload must be a file, but {path} is a directory")]
    NotAFile { path: String },

    #[error("Cannot read {path}: {source}")]
    UnreadableFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode request body: {message}")]
    Encode { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    // ============ Transport Errors ============
    #[error("{method} {url}: network error: {message}")]
    Network {
        method: String,
        url: String,
        message: String,
    },

    #[error("{method} {url}: request timed out")]
    Timeout { method: String, url: String },

    #[error("Operation cancelled")]
    Cancelled,

    // ============ Server Errors ============
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{method} {url}: two-factor authentication required")]
    TwoFactorRequired { method: String, url: String },

    #[error("Request accepted by server; result not yet available")]
    Accepted { body: Vec<u8> },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        ClientError::Config {
            message: message.into(),
        }
    }

    /// HTTP status carried by a server error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api(api) => Some(api.status),
            ClientError::TwoFactorRequired { .. } => Some(401),
            ClientError::Accepted { .. } => Some(202),
            _ => None,
        }
    }

    /// True for the 202 "scheduled, not ready yet" signal
    pub fn is_accepted(&self) -> bool {
        matches!(self, ClientError::Accepted { .. })
    }

    /// True when the server reported 404
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Encode {
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ClientError {
    fn from(e: serde_yaml::Error) -> Self {
        ClientError::Config {
            message: e.to_string(),
        }
    }
}

/// A non-success response from the server
///
/// The URL is sanitized before it is stored, so the error can be logged as is.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub message: String,
    /// Raw response body
    pub body: Vec<u8>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} {}",
            self.method, self.url, self.status, self.message
        )
    }
}

impl std::error::Error for ApiError {}
