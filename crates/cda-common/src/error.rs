//! Start-up error types
//!
//! Everything in here is raised before the first request is served. A
//! malformed route template or an unusable setting must stop the process,
//! so none of these variants ever reach the HTTP error taxonomy.

use thiserror::Error;

/// Result type alias for start-up operations
pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;

/// Errors detected while assembling the server
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("too few segments in path template '{template}'")]
    TooFewSegments { template: String },

    #[error("missing identifier segment in path template '{template}'")]
    MissingIdentifier { template: String },

    #[error("base segment itself parameterized in path template '{template}'")]
    BaseSegmentParameterized { template: String },

    #[error("segment '{segment}' in path template '{template}' is not a plain literal")]
    InvalidLiteralSegment { template: String, segment: String },

    #[error("duplicate binding {method} {path}")]
    DuplicateBinding { method: String, path: String },

    #[error("write operations on '{template}' require at least one role")]
    NoWriteRoles { template: String },

    #[error("invalid cache duration '{0}': expected e.g. '300s', '5m', '1h' or '1d'")]
    InvalidCacheDuration(String),

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: String, reason: String },
}

impl ConfigurationError {
    /// Create an invalid setting error
    pub fn invalid_setting(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
