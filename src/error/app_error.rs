use axum::extract::rejection::{JsonRejection, PathRejection};
use diesel_async::pooled_connection::PoolError;
use thiserror::Error;

use crate::config::error::ConfigError;
use crate::error::DatabaseErrorConverter;

/// Application-wide error type.
///
/// Each variant carries enough structure for the HTTP layer to pick a status
/// code and for logs to explain what failed. Sources are kept as
/// `anyhow::Error` so infrastructure failures never leak their concrete type
/// into handler signatures.
#[derive(Error, Debug)]
pub enum AppError {
    /// No live record matched the lookup
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Unique constraint violation
    #[error("Duplicate entry: {entity}.{field} = '{value}' already exists")]
    Duplicate {
        entity: String,
        field: String,
        value: String,
    },

    /// Business rule rejected the input
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Request could not be decoded
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Database operation error with operation context
    #[error("Database operation failed: {operation}")]
    Database {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Unit of work used after it was committed or rolled back
    #[error("Transaction error: {message}")]
    Transaction { message: String },

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// No connection could be checked out of the pool
    #[error("Connection pool error")]
    ConnectionPool {
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Shorthand for a [`AppError::NotFound`] keyed by `field`.
    pub fn not_found(entity: &str, field: &str, value: impl ToString) -> Self {
        AppError::NotFound {
            entity: entity.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Shorthand for a [`AppError::Validation`].
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`AppError::BadRequest`].
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        let key = match &error {
            ConfigError::ValidationError { field, .. } => field.clone(),
            ConfigError::FileNotFound(path) => path.clone(),
            _ => "configuration".to_string(),
        };
        AppError::Configuration {
            key,
            source: anyhow::Error::new(error),
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(error: diesel::result::Error) -> Self {
        DatabaseErrorConverter::convert_diesel_error(error, "database operation")
    }
}

impl From<bb8::RunError<PoolError>> for AppError {
    fn from(error: bb8::RunError<PoolError>) -> Self {
        AppError::ConnectionPool {
            source: anyhow::Error::msg(error.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Missing or invalid Content-Type header, expected application/json".to_string()
            }
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err.body_text()),
            JsonRejection::JsonDataError(err) => format!("Invalid JSON body: {}", err.body_text()),
            other => other.body_text(),
        };
        AppError::BadRequest { message }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::rejection::MissingJsonContentType;

    #[test]
    fn test_missing_content_type_becomes_bad_request() {
        let error = AppError::from(JsonRejection::MissingJsonContentType(
            MissingJsonContentType::default(),
        ));
        match error {
            AppError::BadRequest { message } => assert!(message.contains("Content-Type")),
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_anyhow_becomes_internal() {
        let error = AppError::from(anyhow::anyhow!("boom"));
        assert!(matches!(error, AppError::Internal { .. }));
    }

    #[test]
    fn test_display_includes_structure() {
        let error = AppError::not_found("user", "id", 42);
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "Resource not found: user with id=42");

        let error = AppError::validation("id", "User ID is invalid");
        assert_eq!(error.to_string(), "Validation failed for id: User ID is invalid");
    }

    #[test]
    fn test_config_validation_error_keeps_field() {
        let error = AppError::from(ConfigError::validation("server.port", "Port must be set"));
        match error {
            AppError::Configuration { key, .. } => assert_eq!(key, "server.port"),
            other => panic!("Expected Configuration, got {:?}", other),
        }
    }
}
