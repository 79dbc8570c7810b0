//! Error body shared by every failed request
//!
//! ```json
//! {"message": "Bad Request", "details": {"begin": "invalid date/time"}}
//! {"message": "Internal Server Error", "incidentIdentifier": "6f1c..."}
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Standard error response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    /// Set when `details` describes individual payload fields
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fields: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_identifier: Option<Uuid>,
}

impl ErrorEnvelope {
    /// Create an error body with a message only
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            fields: false,
            incident_identifier: None,
        }
    }

    /// Body of an unclassified failure; carries nothing but the incident
    pub fn incident(incident: Uuid) -> Self {
        Self {
            incident_identifier: Some(incident),
            ..Self::new("Internal Server Error")
        }
    }

    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark the details as per-field validation errors
    pub fn field_errors(mut self) -> Self {
        self.fields = true;
        self
    }
}
