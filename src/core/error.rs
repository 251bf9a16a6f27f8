//! Typed error handling for notegate
//!
//! Every fallible operation in the crate returns [`NoteError`]. The taxonomy is
//! intentionally small so callers can match on what matters to them:
//!
//! - [`NoteError::NotFound`]: no item matches the full primary key
//! - [`NoteError::Validation`]: malformed key, body or parameter
//! - [`NoteError::TransientIo`]: the storage backend failed; the caller decides
//!   whether to retry
//! - [`NoteError::UnhandledRequest`]: a pipeline ran out of stages without a
//!   terminal response
//! - [`NoteError::Unauthorized`]: the session guard denied the request
//! - [`NoteError::Config`]: configuration could not be loaded or validated
//!
//! # Example
//!
//! ```rust,ignore
//! match store.get(&key).await {
//!     Ok(note) => println!("{}", note.title),
//!     Err(NoteError::NotFound { table, key }) => println!("{key} missing from {table}"),
//!     Err(e) if e.is_transient() => schedule_retry(),
//!     Err(e) => return Err(e),
//! }
//! ```

use crate::core::item::PrimaryKey;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// The main error type
#[derive(Debug)]
pub enum NoteError {
    /// No item exists at the given primary key
    NotFound { table: String, key: PrimaryKey },

    /// Input had the wrong shape
    Validation(ValidationError),

    /// The storage backend failed; safe to retry with backoff
    TransientIo { backend: String, message: String },

    /// The pipeline finished without any stage producing a response
    UnhandledRequest { request_id: Uuid },

    /// The session carries no account
    ///
    /// `redirect` is set when the denial should be presented as a redirect
    /// rather than a bare 401.
    Unauthorized {
        message: String,
        redirect: Option<String>,
    },

    /// Configuration errors
    Config(ConfigError),
}

impl fmt::Display for NoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteError::NotFound { table, key } => {
                write!(f, "Item '{}' not found in table '{}'", key, table)
            }
            NoteError::Validation(e) => write!(f, "{}", e),
            NoteError::TransientIo { backend, message } => {
                write!(f, "{} I/O error: {}", backend, message)
            }
            NoteError::UnhandledRequest { request_id } => {
                write!(f, "No stage handled request {}", request_id)
            }
            NoteError::Unauthorized { message, .. } => write!(f, "Unauthorized: {}", message),
            NoteError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for NoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NoteError::Validation(e) => Some(e),
            NoteError::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl NoteError {
    /// Build a `NotFound` error for a table and key
    pub fn not_found(table: impl Into<String>, key: PrimaryKey) -> Self {
        NoteError::NotFound {
            table: table.into(),
            key,
        }
    }

    /// Build a `TransientIo` error for a storage backend
    pub fn transient(backend: impl Into<String>, message: impl fmt::Display) -> Self {
        NoteError::TransientIo {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            NoteError::NotFound { .. } => StatusCode::NOT_FOUND,
            NoteError::Validation(_) => StatusCode::BAD_REQUEST,
            NoteError::TransientIo { .. } => StatusCode::SERVICE_UNAVAILABLE,
            NoteError::UnhandledRequest { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            NoteError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            NoteError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            NoteError::NotFound { .. } => "NOT_FOUND",
            NoteError::Validation(_) => "VALIDATION_ERROR",
            NoteError::TransientIo { .. } => "TRANSIENT_IO_ERROR",
            NoteError::UnhandledRequest { .. } => "UNHANDLED_REQUEST",
            NoteError::Unauthorized { .. } => "UNAUTHORIZED",
            NoteError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether the operation may succeed if retried
    pub fn is_transient(&self) -> bool {
        matches!(self, NoteError::TransientIo { .. })
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            NoteError::NotFound { table, key } => Some(serde_json::json!({
                "table": table,
                "partition": key.partition,
                "sort": key.sort,
            })),
            NoteError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            NoteError::UnhandledRequest { request_id } => {
                Some(serde_json::json!({ "request_id": request_id.to_string() }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for NoteError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug)]
pub enum ValidationError {
    /// The key does not fit the table's key schema
    InvalidKey { table: String, message: String },

    /// Multiple field validation errors
    FieldErrors(Vec<FieldValidationError>),

    /// Body could not be read as the expected JSON shape
    InvalidJson { message: String },

    /// A required request parameter is absent
    MissingParam { param: String },
}

/// A single field validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidKey { table, message } => {
                write!(f, "Invalid key for table '{}': {}", table, message)
            }
            ValidationError::FieldErrors(errors) => {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                write!(f, "Validation errors: {}", msgs.join(", "))
            }
            ValidationError::InvalidJson { message } => write!(f, "Invalid JSON: {}", message),
            ValidationError::MissingParam { param } => {
                write!(f, "Missing required parameter: {}", param)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn invalid_key(table: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidKey {
            table: table.into(),
            message: message.into(),
        }
    }
}

impl From<ValidationError> for NoteError {
    fn from(err: ValidationError) -> Self {
        NoteError::Validation(err)
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldValidationError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

impl From<validator::ValidationErrors> for NoteError {
    fn from(errors: validator::ValidationErrors) -> Self {
        NoteError::Validation(errors.into())
    }
}

impl From<serde_json::Error> for NoteError {
    fn from(err: serde_json::Error) -> Self {
        NoteError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{f}'")).unwrap_or_default())]
    Parse {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Required environment variable is unset
    #[error("Missing environment variable: {name}")]
    MissingVariable { name: String },

    /// IO error while reading configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for NoteError {
    fn from(err: ConfigError) -> Self {
        NoteError::Config(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse {
            file: None,
            message: err.to_string(),
        }
    }
}

/// A specialized Result type for notegate operations
pub type NoteResult<T> = Result<T, NoteError>;
