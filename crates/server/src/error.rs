//! REST error mapping (spec.md §7, SPEC_FULL.md § Transport Adaptor).
//!
//! Wraps the core's error enums plus a transport-only variant, and maps
//! each to the status code the design's error table names.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use replay_core::error::{CatalogueError, SessionError};

/// Error surfaced across the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    /// Boundary-only failure with no counterpart in the core (e.g. a
    /// subscriber that disconnected between the request and the send).
    #[error("transport error: {0}")]
    Transport(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Session(SessionError::UnknownSession(_)) => StatusCode::NOT_FOUND,
            ApiError::Session(SessionError::UnknownEvent(_)) => StatusCode::NOT_FOUND,
            ApiError::Session(SessionError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            ApiError::Session(SessionError::Terminal(_)) => StatusCode::CONFLICT,
            ApiError::Session(SessionError::AlreadySubscribed(_)) => StatusCode::CONFLICT,
            ApiError::Catalogue(CatalogueError::UnknownEvent(_)) => StatusCode::NOT_FOUND,
            ApiError::Catalogue(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }

        (status, self.to_string()).into_response()
    }
}
