//! Error types for the Tidewater engine.

use std::sync::Arc;
use thiserror::Error;

/// All possible errors from the Tidewater engine.
#[derive(Debug, Error, Clone)]
pub enum Error {
    // Entity errors
    #[error("initialization failed: record could not be turned into an entity")]
    InitializationFailed,

    #[error("unidentifiable record: missing identifier field '{0}'")]
    Unidentifiable(String),

    // Transport errors
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("server error: status {0}")]
    ServerError(u16),

    // Payload errors
    #[error("parsing failed: {0}")]
    ParsingFailed(String),

    #[error("casting failed: expected {0}")]
    CastingFailed(&'static str),

    // Persistence layer and runtime failures
    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary error coming from a store implementation.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Other(Arc::new(err))
    }

    /// Whether the error came back from the remote store's transport or server.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::BadRequest(_)
                | Error::BadResponse(_)
                | Error::ServerError(_)
                | Error::ParsingFailed(_)
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
