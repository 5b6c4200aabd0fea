//! Error handler for converting AppError to HTTP responses.
//!
//! This module implements the IntoResponse trait for AppError,
//! providing consistent error response formatting across the API.
//! Server-side failures are logged in full and answered with a sanitized
//! message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::dto::ErrorResponse;
use crate::error::AppError;

impl IntoResponse for AppError {
    /// Converts an AppError into an HTTP response.
    ///
    /// # Status Code Mapping
    /// - NotFound → 404 NOT_FOUND
    /// - Duplicate → 400 BAD_REQUEST
    /// - Validation → 400 BAD_REQUEST
    /// - BadRequest → 400 BAD_REQUEST
    /// - Database / Transaction / Configuration / Internal → 500 INTERNAL_SERVER_ERROR
    /// - ConnectionPool → 503 SERVICE_UNAVAILABLE
    fn into_response(self) -> Response {
        let status = error_to_status_code(&self);
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        }
        (status, Json(error_to_body(&self))).into_response()
    }
}

/// Builds the JSON body for `error`. Infrastructure details stay in the logs.
pub fn error_to_body(error: &AppError) -> ErrorResponse {
    let code = error_to_code(error);
    match error {
        AppError::NotFound { entity, field, value } => {
            ErrorResponse::not_found_error(entity, field, value)
        }
        AppError::Duplicate { entity, field, value } => {
            ErrorResponse::duplicate_error(entity, field, value)
        }
        AppError::Validation { field, reason } => ErrorResponse::validation_error(field, reason),
        AppError::BadRequest { message } => ErrorResponse::new(code, message),
        AppError::Database { operation, .. } => {
            ErrorResponse::new(code, "Database operation failed").with_details(operation)
        }
        AppError::Transaction { .. } => ErrorResponse::new(code, "Transaction failed"),
        AppError::Configuration { key, .. } => {
            ErrorResponse::new(code, "Configuration error").with_details(key)
        }
        AppError::ConnectionPool { .. } => {
            ErrorResponse::new(code, "Database connection unavailable")
        }
        AppError::Internal { .. } => ErrorResponse::new(code, "An internal error occurred"),
    }
}

/// Maps an AppError variant to its corresponding HTTP status code.
pub fn error_to_status_code(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Duplicate { .. } => StatusCode::BAD_REQUEST,
        AppError::Validation { .. } => StatusCode::BAD_REQUEST,
        AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::Transaction { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::ConnectionPool { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Maps an AppError variant to its error code string.
pub fn error_to_code(error: &AppError) -> &'static str {
    match error {
        AppError::NotFound { .. } => "NOT_FOUND",
        AppError::Duplicate { .. } => "DUPLICATE_ENTRY",
        AppError::Validation { .. } => "VALIDATION_ERROR",
        AppError::BadRequest { .. } => "BAD_REQUEST",
        AppError::Database { .. } => "DATABASE_ERROR",
        AppError::Transaction { .. } => "TRANSACTION_ERROR",
        AppError::Configuration { .. } => "CONFIGURATION_ERROR",
        AppError::ConnectionPool { .. } => "SERVICE_UNAVAILABLE",
        AppError::Internal { .. } => "INTERNAL_ERROR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status_code() {
        let error = AppError::not_found("user", "id", 123);
        assert_eq!(error_to_status_code(&error), StatusCode::NOT_FOUND);
        assert_eq!(error_to_code(&error), "NOT_FOUND");
    }

    #[test]
    fn test_duplicate_is_client_error() {
        let error = AppError::Duplicate {
            entity: "users".to_string(),
            field: "username".to_string(),
            value: "alice".to_string(),
        };
        assert_eq!(error_to_status_code(&error), StatusCode::BAD_REQUEST);
        assert_eq!(error_to_code(&error), "DUPLICATE_ENTRY");

        let body = error_to_body(&error);
        assert_eq!(body.message, "username 'alice' already exists");
    }

    #[test]
    fn test_validation_status_code() {
        let error = AppError::validation("id", "User ID is invalid");
        assert_eq!(error_to_status_code(&error), StatusCode::BAD_REQUEST);

        let body = error_to_body(&error);
        assert_eq!(body.code, "VALIDATION_ERROR");
        assert_eq!(body.message, "User ID is invalid");
        assert_eq!(body.details.as_deref(), Some("id"));
    }

    #[test]
    fn test_infrastructure_errors() {
        let error = AppError::ConnectionPool {
            source: anyhow::anyhow!("Pool exhausted"),
        };
        assert_eq!(error_to_status_code(&error), StatusCode::SERVICE_UNAVAILABLE);

        let error = AppError::Transaction {
            message: "unit of work already committed".to_string(),
        };
        assert_eq!(error_to_status_code(&error), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_to_code(&error), "TRANSACTION_ERROR");
    }

    #[test]
    fn test_database_error_body_is_sanitized() {
        let error = AppError::Database {
            operation: "list users".to_string(),
            source: anyhow::anyhow!("password authentication failed for user \"app\""),
        };

        let body = error_to_body(&error);
        assert_eq!(body.message, "Database operation failed");
        assert_eq!(body.details.as_deref(), Some("list users"));

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
