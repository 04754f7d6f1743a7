//! Error types for piplay-engine
//!
//! [`Error`] is what the engine returns to its callers. [`ApiError`] wraps it
//! for the HTTP layer and decides the status code each failure maps to.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::CatalogError;

/// Engine error taxonomy
#[derive(Error, Debug)]
pub enum Error {
    /// Search text was empty
    #[error("Invalid query: search text is empty")]
    InvalidQuery,

    /// Catalog could not be reached or answered with a failure status
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Catalog answered with a payload that could not be understood
    #[error("Catalog returned a malformed response: {0}")]
    CatalogBadResponse(String),

    /// Selection index outside the requester's current result set
    #[error("Index {index} out of range for {len} search results")]
    IndexOutOfRange { index: usize, len: usize },

    /// Selection made against a result set that has since been replaced
    #[error("Search {0} is no longer current")]
    StaleSelection(Uuid),

    /// Requested song, playlist or result set does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempt to start playback with nothing to play
    #[error("Playback queue is empty")]
    EmptyQueue,

    /// The player process could not be spawned or terminated
    #[error("Playback unavailable: {0}")]
    PlaybackUnavailable(String),

    /// The player process exited on its own with a failure
    #[error("Player crashed (exit code {exit_code:?})")]
    PlayerCrashed { exit_code: Option<i32> },

    /// piplay-common error (database, I/O, config)
    #[error(transparent)]
    Common(#[from] piplay_common::Error),
}

impl Error {
    /// Catalog failures degrade to "no results" instead of an error page
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::CatalogUnavailable(_) | Error::CatalogBadResponse(_)
        )
    }
}

impl From<CatalogError> for Error {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unavailable(msg) => Error::CatalogUnavailable(msg),
            CatalogError::BadResponse(msg) => Error::CatalogBadResponse(msg),
        }
    }
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400) rejected before reaching the engine
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Engine error
    #[error(transparent)]
    Engine(#[from] Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Engine(err) => match err {
                Error::InvalidQuery => (StatusCode::BAD_REQUEST, "INVALID_QUERY"),
                Error::IndexOutOfRange { .. } => (StatusCode::BAD_REQUEST, "INDEX_OUT_OF_RANGE"),
                Error::StaleSelection(_) => (StatusCode::BAD_REQUEST, "STALE_SELECTION"),
                Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                Error::EmptyQueue => (StatusCode::CONFLICT, "EMPTY_QUEUE"),
                Error::CatalogUnavailable(_) => (StatusCode::BAD_GATEWAY, "CATALOG_UNAVAILABLE"),
                Error::CatalogBadResponse(_) => (StatusCode::BAD_GATEWAY, "CATALOG_BAD_RESPONSE"),
                Error::PlaybackUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "PLAYBACK_UNAVAILABLE")
                }
                Error::PlayerCrashed { .. } => (StatusCode::SERVICE_UNAVAILABLE, "PLAYER_CRASHED"),
                Error::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(Error::InvalidQuery.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(Error::IndexOutOfRange { index: 4, len: 3 }.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::NotFound("song 1".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(Error::EmptyQueue.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(Error::PlayerCrashed { exit_code: Some(1) }.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(Error::CatalogUnavailable("down".to_string()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ApiError::BadRequest("missing header".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_catalog_errors_are_recoverable() {
        let unavailable: Error = CatalogError::Unavailable("timeout".to_string()).into();
        let bad: Error = CatalogError::BadResponse("not json".to_string()).into();
        assert!(unavailable.is_recoverable());
        assert!(bad.is_recoverable());
        assert!(!Error::EmptyQueue.is_recoverable());
    }
}
