//! Error types for the ProdRec engine
//!
//! - `thiserror` for the error enum
//! - Lookup failures (`NotFound`, `IndexOutOfRange`) are recoverable and map to 4xx
//! - Empty aggregation results are plain values, never errors
//! - HTTP status code mapping for API responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::borrow::Cow;
use thiserror::Error;

/// Result type alias for ProdRec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ProdRec engine
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig {
        key: &'static str,
        message: Cow<'static, str>,
    },

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    #[error("Similarity matrix index {index} out of range (bound {bound})")]
    IndexOutOfRange { index: usize, bound: usize },

    // ========================================================================
    // Data Loading Errors
    // ========================================================================
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data format: {message}")]
    InvalidFormat { message: Cow<'static, str> },

    // ========================================================================
    // API Errors
    // ========================================================================
    #[error("Bad request: {message}")]
    BadRequest { message: Cow<'static, str> },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: Cow<'static, str> },

    #[error("Internal server error")]
    Internal {
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    // ========================================================================
    // Constructors for common error patterns
    // ========================================================================

    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Create an invalid data format error
    pub fn invalid_format(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create an I/O error tagged with the offending path
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal {
            source: Some(Box::new(source)),
        }
    }

    // ========================================================================
    // Error Classification
    // ========================================================================

    /// Returns true if the caller should render a "nothing found" state
    /// instead of treating this as a failure.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::IndexOutOfRange { .. })
    }

    /// Returns true if this error should be logged at error level
    pub fn is_error_level(&self) -> bool {
        matches!(
            self,
            Error::Io { .. } | Error::Csv(_) | Error::Internal { .. }
        )
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::IndexOutOfRange { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidConfig { .. } => "CONFIG_ERROR",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            Error::Io { .. } | Error::Csv(_) | Error::InvalidFormat { .. } => "DATA_ERROR",
            Error::Json(_) => "SERIALIZATION_ERROR",
            Error::BadRequest { .. } => "BAD_REQUEST",
            Error::Unauthorized { .. } => "UNAUTHORIZED",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

// ============================================================================
// Error Response for API
// ============================================================================

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_error_level() {
            tracing::error!("Request failed: {:?}", self);
        }

        // Don't expose internal error details
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}
