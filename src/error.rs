//! Error handling for the rehaportal backend

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// PostgreSQL error code for an undefined relation (table does not exist).
pub const UNDEFINED_TABLE: &str = "42P01";

/// PostgreSQL error code for an undefined column.
pub const UNDEFINED_COLUMN: &str = "42703";

/// PostgreSQL error code for an undefined function (missing stored procedure).
pub const UNDEFINED_FUNCTION: &str = "42883";

/// PostgreSQL error code for a unique-constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// PostgREST code returned when a single-object request matches no rows.
pub const NO_ROWS: &str = "PGRST116";

/// Structured error body returned by the PostgREST and GoTrue APIs.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for ApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("hint: {}", hint));
        }
        if parts.is_empty() {
            write!(f, "no error details")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Unified error type for the rehaportal backend
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Errors reported by the hosted backend with a parseable body
    #[error("API error: {details} (status {status})")]
    Api {
        details: ApiErrorDetails,
        status: reqwest::StatusCode,
    },

    /// Errors reported by the hosted backend without a parseable body
    #[error("API error (unparsed): {message} (status {status})")]
    UnparsedApi {
        message: String,
        status: reqwest::StatusCode,
    },

    /// Missing or invalid process configuration; fatal at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// Authentication / identity subsystem errors
    #[error("authentication error: {0}")]
    Auth(String),

    /// Object storage errors
    #[error("storage error: {0}")]
    Storage(String),

    /// Schema migration errors
    #[error("migration error: {0}")]
    Migration(String),

    /// A row violating a uniqueness rule, surfaced with a user-facing message
    #[error("{0}")]
    Duplicate(String),

    /// A request rejected by a service-level rule (e.g. course capacity)
    #[error("{0}")]
    Validation(String),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new storage error
    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Create a new migration error
    pub fn migration<T: fmt::Display>(msg: T) -> Self {
        Error::Migration(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// The backend error code carried by this error, if any.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Error::Api { details, .. } => details.code.as_deref(),
            _ => None,
        }
    }

    fn has_code(&self, code: &str) -> bool {
        self.api_code() == Some(code)
    }

    /// True when the queried table does not exist (`42P01`).
    pub fn is_undefined_table(&self) -> bool {
        self.has_code(UNDEFINED_TABLE)
    }

    /// True when a selected column does not exist (`42703`).
    pub fn is_undefined_column(&self) -> bool {
        self.has_code(UNDEFINED_COLUMN)
    }

    /// True when a called stored procedure does not exist (`42883`).
    pub fn is_undefined_function(&self) -> bool {
        self.has_code(UNDEFINED_FUNCTION)
    }

    /// True when an insert hit a unique constraint (`23505`).
    pub fn is_unique_violation(&self) -> bool {
        self.has_code(UNIQUE_VIOLATION)
    }

    /// True when a single-object request matched no rows (`PGRST116`).
    pub fn is_no_rows(&self) -> bool {
        self.has_code(NO_ROWS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: &str) -> Error {
        Error::Api {
            details: ApiErrorDetails {
                code: Some(code.to_string()),
                message: None,
                details: None,
                hint: None,
            },
            status: reqwest::StatusCode::NOT_FOUND,
        }
    }

    #[test]
    fn classifies_undefined_table() {
        assert!(api_error(UNDEFINED_TABLE).is_undefined_table());
        assert!(!api_error(UNIQUE_VIOLATION).is_undefined_table());
    }

    #[test]
    fn classifies_unique_violation() {
        assert!(api_error(UNIQUE_VIOLATION).is_unique_violation());
    }

    #[test]
    fn classifies_no_rows() {
        assert!(api_error(NO_ROWS).is_no_rows());
    }

    #[test]
    fn non_api_errors_have_no_code() {
        assert_eq!(Error::general("boom").api_code(), None);
        assert!(!Error::general("boom").is_undefined_table());
    }

    #[test]
    fn details_display_joins_present_fields() {
        let details = ApiErrorDetails {
            code: Some("42P01".into()),
            message: Some("relation does not exist".into()),
            details: None,
            hint: None,
        };
        assert_eq!(
            details.to_string(),
            "code: 42P01, message: relation does not exist"
        );
    }
}
