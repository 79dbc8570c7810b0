//! Request failure types
//!
//! Resource code returns [`AppError`] for anything that goes wrong while
//! serving a request. The variants are grouped the way the error taxonomy
//! in [`crate::dispatch::taxonomy`] orders them; converting an `AppError`
//! into a response always goes through that taxonomy.

use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::dispatch::{taxonomy, Operation};

/// Result type alias for request handling
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Failure raised while serving a request
#[derive(Error, Debug)]
pub enum AppError {
    // Representation
    #[error("no acceptable representation for '{requested}'")]
    UnsupportedFormat { requested: String },

    #[error("failed to format response: {0}")]
    Formatting(String),

    // Client input
    #[error("bad request body: {message}")]
    BadBody {
        message: String,
        details: Option<Map<String, Value>>,
    },

    #[error("bad value for query parameter '{name}': {reason}")]
    BadQueryParameter { name: String, reason: String },

    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("bad date/time for '{name}': {source}")]
    BadDateTime {
        name: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        fields: Map<String, Value>,
    },

    // Identity
    #[error("unauthenticated: {reason}")]
    Unauthenticated {
        reason: String,
        /// Whether `reason` may be shown to the caller
        expose_reason: bool,
    },

    #[error("forbidden: {0}")]
    Forbidden(String),

    // Domain
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("cannot delete {message}")]
    DeleteBlocked {
        message: String,
        references: Map<String, Value>,
    },

    #[error("{operation} is not implemented for {resource}")]
    NotImplemented {
        operation: Operation,
        resource: String,
    },

    // Everything else
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a not found error for a resource identifier
    pub fn not_found(resource: &str, id: &str) -> Self {
        Self::NotFound(format!("{} '{}'", resource, id))
    }

    /// Create an already-exists error for a resource identifier
    pub fn already_exists(resource: &str, id: &str) -> Self {
        Self::AlreadyExists(format!("{} '{}'", resource, id))
    }

    /// Create a bad body error without field details
    pub fn bad_body(message: impl Into<String>) -> Self {
        Self::BadBody {
            message: message.into(),
            details: None,
        }
    }

    /// Create an unauthenticated error whose reason is never shown to the caller
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
            expose_reason: false,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        let mut details = Map::new();
        details.insert("line".to_string(), Value::from(err.line()));
        details.insert("column".to_string(), Value::from(err.column()));
        AppError::BadBody {
            message: err.to_string(),
            details: Some(details),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        taxonomy::standard().translate(&self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_serde_error_keeps_location() {
        let err = serde_json::from_str::<serde_json::Value>("{\"a\": ").unwrap_err();
        match AppError::from(err) {
            AppError::BadBody { details, .. } => {
                let details = details.unwrap();
                assert_eq!(details["line"], 1);
                assert!(details.contains_key("column"));
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_into_response_uses_taxonomy() {
        let response = AppError::not_found("location category", "ABC").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
