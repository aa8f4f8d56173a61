use std::str::FromStr;

use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::error::{AppError, ConstraintParser};
use crate::models::Role;

/// Partial unique index over `(user_id, role, scope_id)` excluding guardians.
pub const ROLE_SCOPE_CONSTRAINT: &str = "user_roles_user_id_role_scope_id_key";

const UNKNOWN_VALUE: &str = "unknown";

/// Utility for converting database errors to structured AppError variants.
pub struct DatabaseErrorConverter;

impl DatabaseErrorConverter {
    /// Converts a Diesel error to an appropriate AppError variant.
    ///
    /// # Arguments
    /// * `error` - The Diesel error to convert
    /// * `operation` - Description of the database operation that failed
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::DatabaseError(kind, info) => {
                Self::convert_database_error(kind, info.as_ref(), operation)
            }
            DieselError::NotFound => AppError::NotFound {
                entity: "resource".to_string(),
                field: "id".to_string(),
                value: "unknown".to_string(),
            },
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
        let detail = info.details().unwrap_or_default();
        let full = format!("{message}\nDETAIL: {detail}");
        let constraint_name = info.constraint_name();

        let parsed = match kind {
            DatabaseErrorKind::UniqueViolation if constraint_name == Some(ROLE_SCOPE_CONSTRAINT) => {
                Some(Self::role_conflict(&full).unwrap_or_else(|| AppError::Duplicate {
                    entity: "user_roles".to_string(),
                    field: "user_id, role, scope_id".to_string(),
                    value: UNKNOWN_VALUE.to_string(),
                }))
            }
            DatabaseErrorKind::UniqueViolation => Some(
                ConstraintParser::parse_unique_violation(&full, constraint_name)
                    .map(|(entity, field, value)| AppError::Duplicate {
                        entity,
                        field,
                        value,
                    })
                    .unwrap_or_else(|| Self::undetailed_duplicate(constraint_name)),
            ),
            DatabaseErrorKind::NotNullViolation => {
                ConstraintParser::parse_not_null_violation(&full).map(|(entity, field)| {
                    AppError::Validation {
                        field,
                        reason: format!("Field is required for {}", entity),
                    }
                })
            }
            DatabaseErrorKind::ForeignKeyViolation => {
                ConstraintParser::parse_foreign_key_violation(&full, constraint_name).map(
                    |(entity, field, referenced_value)| AppError::Validation {
                        field,
                        reason: format!(
                            "Invalid reference from {} with value '{}'",
                            entity, referenced_value
                        ),
                    },
                )
            }
            DatabaseErrorKind::CheckViolation => {
                ConstraintParser::parse_check_violation(&full, constraint_name).map(
                    |(entity, field)| AppError::Validation {
                        field,
                        reason: format!("Check constraint failed for {} field", entity),
                    },
                )
            }
            _ => None,
        };

        parsed.unwrap_or_else(|| AppError::Database {
            operation: operation.to_string(),
            source: anyhow::Error::msg(format!("{:?}: {}", kind, message)),
        })
    }

    /// Unique violation reported without its `Key (...)=(...)` DETAIL, which
    /// PostgreSQL omits when the session cannot read the key columns.
    fn undetailed_duplicate(constraint_name: Option<&str>) -> AppError {
        let (entity, field) = constraint_name
            .and_then(ConstraintParser::split_unique_constraint)
            .unwrap_or_else(|| {
                (
                    "resource".to_string(),
                    constraint_name.unwrap_or(UNKNOWN_VALUE).to_string(),
                )
            });
        AppError::Duplicate {
            entity,
            field,
            value: UNKNOWN_VALUE.to_string(),
        }
    }

    /// Maps the role scope index violation onto [`AppError::RoleAlreadyAssigned`].
    fn role_conflict(message: &str) -> Option<AppError> {
        let (_, values) = ConstraintParser::extract_key_value_from_message(message)?;
        let parts = ConstraintParser::split_composite(&values);
        let [user_id, role, scope_id] = parts.as_slice() else {
            return None;
        };
        Some(AppError::RoleAlreadyAssigned {
            user_id: Uuid::parse_str(user_id).ok()?,
            role: Role::from_str(role).ok()?,
            scope_id: Uuid::parse_str(scope_id).ok(),
        })
    }
}
