use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

use crate::error::{AppError, ConstraintParser};

/// Maps Diesel errors onto [`AppError`] variants.
///
/// Constraint violations become client-facing variants (`Duplicate`,
/// `Validation`); everything else is an infrastructure `Database` error that
/// keeps the original error as its source.
pub struct DatabaseErrorConverter;

impl DatabaseErrorConverter {
    /// Converts a Diesel error raised while performing `operation`.
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::DatabaseError(kind, info) => {
                Self::convert_database_error(kind, info.as_ref(), operation)
            }
            DieselError::NotFound => AppError::not_found("resource", "id", "unknown"),
            other => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }

    fn convert_database_error(
        kind: DatabaseErrorKind,
        info: &(dyn DatabaseErrorInformation + Send + Sync),
        operation: &str,
    ) -> AppError {
        let message = info.message();
        let details = info.details();
        let constraint_name = info.constraint_name();

        let converted = match kind {
            DatabaseErrorKind::UniqueViolation => {
                ConstraintParser::parse_unique_violation(message, details, constraint_name).map(
                    |(entity, field, value)| AppError::Duplicate {
                        entity,
                        field,
                        value,
                    },
                )
            }
            DatabaseErrorKind::NotNullViolation => {
                ConstraintParser::parse_not_null_violation(message, constraint_name).map(
                    |(entity, field)| AppError::Validation {
                        field,
                        reason: format!("Field is required for {}", entity),
                    },
                )
            }
            DatabaseErrorKind::CheckViolation => {
                ConstraintParser::parse_check_violation(message, constraint_name).map(
                    |(entity, field)| AppError::Validation {
                        field,
                        reason: format!("Check constraint failed for {} field", entity),
                    },
                )
            }
            _ => None,
        };

        converted.unwrap_or_else(|| AppError::Database {
            operation: operation.to_string(),
            source: anyhow::Error::msg(format!("{:?}: {}", kind, message)),
        })
    }
}
