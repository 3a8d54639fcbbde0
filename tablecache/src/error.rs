//! Error types for the table cache client

use thiserror::Error;

/// Result type alias for table cache operations
pub type Result<T> = std::result::Result<T, TableCacheError>;

/// Backend error code returned when creating a table that already exists
pub const CODE_OBJECT_ALREADY_EXIST: &str = "OTSObjectAlreadyExist";

/// Backend error code returned when addressing a table that does not exist
pub const CODE_OBJECT_NOT_EXIST: &str = "OTSObjectNotExist";

/// Backend error code returned for malformed or out-of-contract parameters
pub const CODE_PARAMETER_INVALID: &str = "OTSParameterInvalid";

/// Table cache error types
#[derive(Error, Debug)]
pub enum TableCacheError {
    /// The lookup succeeded but no row exists for the key
    #[error("key not found")]
    KeyNotFound,

    /// The row exists but has no `value` column
    #[error("no field named \"value\"")]
    NoFieldNamedValue,

    /// The `value` column holds something other than a string
    #[error("value is not string")]
    ValueNotString,

    /// The backend rejected the request
    #[error("Server error ({status}) {code}: {message}")]
    ServerError {
        status: u16,
        code: String,
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid endpoint URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client configuration cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TableCacheError {
    /// Build a backend rejection
    pub fn server(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// True for the "row absent" condition
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound)
    }

    /// True when the backend refused to create an already existing table
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::ServerError { code, .. } if code == CODE_OBJECT_ALREADY_EXIST)
    }

    /// Backend error code, if the error came from the backend
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::ServerError { code, .. } => Some(code),
            _ => None,
        }
    }
}
