//! Error types for the session store

use crate::session::Session;
use std::sync::Arc;
use tablecache::TableCacheError;
use thiserror::Error;

/// Result type alias for session codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Result type alias for session store operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Authenticated codec errors
///
/// Every decode failure is reported; the codec never returns data it
/// could not authenticate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("hash key is not set")]
    HashKeyNotSet,

    #[error("invalid block key length {0}, expected 16 or 32 bytes")]
    InvalidBlockKey(usize),

    #[error("the value is too long")]
    ValueTooLong,

    #[error("base64 decode failed: {0}")]
    Base64(String),

    #[error("invalid value format")]
    InvalidFormat,

    #[error("the value is not valid")]
    MacInvalid,

    #[error("invalid timestamp")]
    TimestampInvalid,

    #[error("expired timestamp")]
    TimestampExpired,

    #[error("timestamp is too new")]
    TimestampTooNew,

    #[error("the value could not be encrypted")]
    Encrypt,

    #[error("the value could not be decrypted")]
    Decrypt,

    #[error("serialization failed: {0}")]
    Serialize(String),

    #[error("no codecs configured")]
    NoCodecs,
}

/// Session store errors
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// The cache backend failed; the source error is shared, not copied
    #[error("session backend error: {0}")]
    Backend(Arc<TableCacheError>),

    #[error("session codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("invalid cookie header: {0}")]
    InvalidHeader(String),

    /// Loading an existing session failed after its cookie was accepted.
    /// Carries the fresh session that was handed out instead; its data
    /// must not be trusted.
    #[error("failed to load session: {source}")]
    Load {
        session: Box<Session>,
        #[source]
        source: Box<SessionError>,
    },
}

impl SessionError {
    pub(crate) fn load(session: Session, source: impl Into<SessionError>) -> Self {
        Self::Load {
            session: Box::new(session),
            source: Box::new(source.into()),
        }
    }

    /// Session attached to a load failure
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Load { session, .. } => Some(&**session),
            _ => None,
        }
    }

    /// Take the session attached to a load failure
    pub fn into_session(self) -> Option<Session> {
        match self {
            Self::Load { session, .. } => Some(*session),
            _ => None,
        }
    }

    /// True if the error came from loading a session rather than saving one
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::Load { .. })
    }

    /// Backend error behind this failure, if any
    pub fn backend_error(&self) -> Option<&TableCacheError> {
        match self {
            Self::Backend(e) => Some(&**e),
            Self::Load { source, .. } => source.backend_error(),
            _ => None,
        }
    }
}

impl From<TableCacheError> for SessionError {
    fn from(e: TableCacheError) -> Self {
        Self::Backend(Arc::new(e))
    }
}
