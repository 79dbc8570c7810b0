//! Failure-to-response taxonomy
//!
//! An ordered table of mappings, each a predicate over [`AppError`], the
//! status it answers with and a builder for the error body. The first
//! matching entry wins; a failure no entry claims falls through to a `500`
//! carrying a fresh incident identifier.
//!
//! ```text
//!  1  representation      406 / 501
//!  2  client input        400
//!  3  identity            401 / 403
//!  4  not found           404
//!  5  already exists      409
//!  6  delete blocked      409
//!  -  not implemented     501
//!  7  anything else       500 + incident
//! ```
//!
//! Database errors are classified by the same predicates, so a
//! `sqlx::Error::RowNotFound` is a `404` and a unique violation a `409`.
//!
//! The table is built once and shared read-only for the life of the
//! process.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use uuid::Uuid;

use crate::api::response::ErrorEnvelope;
use crate::error::AppError;

/// Log severity of a mapped failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller mistakes
    Client,
    /// Server-side gaps that are expected, e.g. an unimplemented operation
    Server,
}

/// One row of the taxonomy
pub struct ErrorMapping {
    pub name: &'static str,
    pub status: StatusCode,
    pub severity: Severity,
    matches: fn(&AppError) -> bool,
    body: fn(&AppError) -> ErrorEnvelope,
}

/// Result of translating a failure
#[derive(Debug)]
pub struct Translation {
    pub status: StatusCode,
    pub envelope: ErrorEnvelope,
    /// Name of the mapping that fired, `"unhandled"` for the fallback
    pub mapping: &'static str,
    pub incident: Option<Uuid>,
}

impl IntoResponse for Translation {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.envelope)).into_response();
        // Error bodies describe one request and must never be cached.
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

/// Ordered, immutable failure-to-response table
pub struct ErrorTaxonomy {
    mappings: Vec<ErrorMapping>,
}

static STANDARD: LazyLock<ErrorTaxonomy> = LazyLock::new(ErrorTaxonomy::new);

/// The process-wide taxonomy
pub fn standard() -> &'static ErrorTaxonomy {
    &STANDARD
}

impl ErrorTaxonomy {
    fn new() -> Self {
        Self {
            mappings: vec![
                ErrorMapping {
                    name: "unsupported-format",
                    status: StatusCode::NOT_ACCEPTABLE,
                    severity: Severity::Client,
                    matches: |e| matches!(e, AppError::UnsupportedFormat { .. }),
                    body: |e| ErrorEnvelope::new(e.to_string()),
                },
                ErrorMapping {
                    name: "formatter-fault",
                    status: StatusCode::NOT_IMPLEMENTED,
                    severity: Severity::Server,
                    matches: |e| matches!(e, AppError::Formatting(_)),
                    body: |_| ErrorEnvelope::new("Formatting error"),
                },
                ErrorMapping {
                    name: "bad-request",
                    status: StatusCode::BAD_REQUEST,
                    severity: Severity::Client,
                    matches: |e| {
                        matches!(
                            e,
                            AppError::BadBody { .. }
                                | AppError::BadQueryParameter { .. }
                                | AppError::MissingParameter(_)
                                | AppError::BadDateTime { .. }
                                | AppError::Validation { .. }
                        )
                    },
                    body: bad_request_body,
                },
                ErrorMapping {
                    name: "unauthenticated",
                    status: StatusCode::UNAUTHORIZED,
                    severity: Severity::Client,
                    matches: |e| matches!(e, AppError::Unauthenticated { .. }),
                    body: |e| match e {
                        AppError::Unauthenticated {
                            reason,
                            expose_reason: true,
                        } => ErrorEnvelope::new(reason.clone()),
                        _ => ErrorEnvelope::new("Unauthorized"),
                    },
                },
                ErrorMapping {
                    name: "forbidden",
                    status: StatusCode::FORBIDDEN,
                    severity: Severity::Client,
                    matches: |e| matches!(e, AppError::Forbidden(_)),
                    body: |_| ErrorEnvelope::new("Not Authorized"),
                },
                ErrorMapping {
                    name: "not-found",
                    status: StatusCode::NOT_FOUND,
                    severity: Severity::Client,
                    matches: |e| {
                        matches!(
                            e,
                            AppError::NotFound(_) | AppError::Database(sqlx::Error::RowNotFound)
                        )
                    },
                    body: |_| ErrorEnvelope::new("Not Found."),
                },
                ErrorMapping {
                    name: "already-exists",
                    status: StatusCode::CONFLICT,
                    severity: Severity::Client,
                    matches: |e| match e {
                        AppError::AlreadyExists(_) => true,
                        AppError::Database(err) => is_unique_violation(err),
                        _ => false,
                    },
                    body: |_| ErrorEnvelope::new("Already Exists."),
                },
                ErrorMapping {
                    name: "delete-blocked",
                    status: StatusCode::CONFLICT,
                    severity: Severity::Client,
                    matches: |e| match e {
                        AppError::DeleteBlocked { .. } => true,
                        AppError::Database(err) => is_foreign_key_violation(err),
                        _ => false,
                    },
                    body: delete_blocked_body,
                },
                ErrorMapping {
                    name: "not-implemented",
                    status: StatusCode::NOT_IMPLEMENTED,
                    severity: Severity::Server,
                    matches: |e| matches!(e, AppError::NotImplemented { .. }),
                    body: |e| ErrorEnvelope::new(e.to_string()),
                },
            ],
        }
    }

    pub fn mappings(&self) -> &[ErrorMapping] {
        &self.mappings
    }

    /// The mapping that claims `failure`, if any
    pub fn find(&self, failure: &AppError) -> Option<&ErrorMapping> {
        self.mappings.iter().find(|mapping| (mapping.matches)(failure))
    }

    /// Map a failure to its status and body, logging the decision
    pub fn translate(&self, failure: &AppError) -> Translation {
        match self.find(failure) {
            Some(mapping) => {
                let status = mapping.status;
                match mapping.severity {
                    Severity::Client => tracing::debug!(
                        mapping = mapping.name,
                        status = status.as_u16(),
                        error = %failure,
                        "request failed"
                    ),
                    Severity::Server => tracing::warn!(
                        mapping = mapping.name,
                        status = status.as_u16(),
                        error = %failure,
                        "request failed"
                    ),
                }
                Translation {
                    status,
                    envelope: (mapping.body)(failure),
                    mapping: mapping.name,
                    incident: None,
                }
            },
            None => {
                let incident = Uuid::new_v4();
                tracing::error!(
                    incident = %incident,
                    error = ?failure,
                    "unhandled failure"
                );
                Translation {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    envelope: ErrorEnvelope::incident(incident),
                    mapping: "unhandled",
                    incident: Some(incident),
                }
            },
        }
    }
}

fn bad_request_body(failure: &AppError) -> ErrorEnvelope {
    match failure {
        AppError::BadBody { message, details } => {
            let envelope = ErrorEnvelope::new(format!("Bad Request: {}", message));
            match details {
                Some(details) => envelope.with_details(details.clone()),
                None => envelope,
            }
        },
        AppError::BadQueryParameter { name, reason } => {
            ErrorEnvelope::new("Bad Request").with_details(single(name, Value::from(reason.as_str())))
        },
        AppError::MissingParameter(name) => ErrorEnvelope::new("Bad Request")
            .with_details(single(name, Value::from("required parameter is missing"))),
        AppError::BadDateTime { name, source } => ErrorEnvelope::new("Bad Request")
            .with_details(single(name, Value::from(format!("invalid date/time: {}", source)))),
        AppError::Validation { message, fields } => ErrorEnvelope::new(message.clone())
            .with_details(fields.clone())
            .field_errors(),
        other => ErrorEnvelope::new(other.to_string()),
    }
}

fn delete_blocked_body(failure: &AppError) -> ErrorEnvelope {
    match failure {
        AppError::DeleteBlocked {
            message,
            references,
        } => ErrorEnvelope::new(format!("Cannot delete {}", message))
            .with_details(references.clone()),
        AppError::Database(sqlx::Error::Database(db_err)) => {
            let mut details = Map::new();
            if let Some(constraint) = db_err.constraint() {
                details.insert("constraint".to_string(), Value::from(constraint));
            }
            if let Some(table) = db_err.table() {
                details.insert("table".to_string(), Value::from(table));
            }
            ErrorEnvelope::new("Cannot delete: referenced by other records").with_details(details)
        },
        _ => ErrorEnvelope::new("Cannot delete: referenced by other records"),
    }
}

fn single(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}
