use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::error::DatabaseErrorConverter;
use crate::models::Role;

/// Caller-facing classification of every [`AppError`].
///
/// Transport layers map these four kinds onto their own status codes; the
/// core never exposes anything finer-grained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    BadRequest,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Phase of a unit of work that failed while being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStage {
    Commit,
    Rollback,
}

impl fmt::Display for TxStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStage::Commit => f.write_str("commit"),
            TxStage::Rollback => f.write_str("rollback"),
        }
    }
}

/// Application-wide error type that represents all possible errors in the system.
///
/// Every variant reports one of four [`ErrorKind`]s through [`AppError::kind`].
/// Wrapping an error with [`AppError::context`] keeps the kind of the wrapped
/// error so the classification survives call-site annotations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Duplicate entry error for unique constraint violations
    #[error("Duplicate entry: {entity}.{field} = '{value}' already exists")]
    Duplicate {
        entity: String,
        field: String,
        value: String,
    },

    /// The user already holds this role inside the same school or organization
    #[error("User {user_id} already holds role '{role}' in scope {}", display_scope(.scope_id))]
    RoleAlreadyAssigned {
        user_id: Uuid,
        role: Role,
        scope_id: Option<Uuid>,
    },

    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Bad request error with descriptive message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Database operation error with operation context
    #[error("Database operation failed: {operation}")]
    Database {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Connection pool error
    #[error("Connection pool error")]
    ConnectionPool {
        #[source]
        source: anyhow::Error,
    },

    /// Closing a unit of work failed; `cause` holds the error that triggered a rollback
    #[error("Unit of work {stage} failed{}", describe_cause(.cause))]
    UnitOfWork {
        stage: TxStage,
        #[source]
        source: Box<AppError>,
        cause: Option<Box<AppError>>,
    },

    /// A unit of work was requested while the context already carries one
    #[error("Unit of work {open} is already open on this context")]
    NestedUnitOfWork { open: Uuid },

    /// The transaction handle was already committed or rolled back
    #[error("Unit of work {id} is already closed")]
    TransactionClosed { id: Uuid },

    /// The context deadline passed before the operation completed
    #[error("Deadline exceeded during {operation}")]
    DeadlineExceeded { operation: String },

    /// Call-site annotation around another application error
    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<AppError>,
    },

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
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

fn display_scope(scope_id: &Option<Uuid>) -> String {
    match scope_id {
        Some(id) => id.to_string(),
        None => "global".to_string(),
    }
}

fn describe_cause(cause: &Option<Box<AppError>>) -> String {
    match cause {
        Some(cause) => format!(" while handling: {cause}"),
        None => String::new(),
    }
}

impl AppError {
    pub fn not_found(
        entity: impl Into<String>,
        field: impl Into<String>,
        value: impl fmt::Display,
    ) -> Self {
        AppError::NotFound {
            entity: entity.into(),
            field: field.into(),
            value: value.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl fmt::Display) -> Self {
        AppError::Internal {
            source: anyhow::anyhow!("{message}"),
        }
    }

    /// Wraps the error with a description of the failing step.
    pub fn context(self, context: impl Into<String>) -> Self {
        AppError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classification reported to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::Duplicate { .. } | AppError::RoleAlreadyAssigned { .. } => {
                ErrorKind::Conflict
            }
            AppError::Validation { .. } | AppError::BadRequest { .. } => ErrorKind::BadRequest,
            AppError::Context { source, .. } => source.kind(),
            AppError::Database { .. }
            | AppError::ConnectionPool { .. }
            | AppError::UnitOfWork { .. }
            | AppError::NestedUnitOfWork { .. }
            | AppError::TransactionClosed { .. }
            | AppError::DeadlineExceeded { .. }
            | AppError::Configuration { .. }
            | AppError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Innermost error beneath any [`AppError::Context`] layers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Adds call-site context to fallible results.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> AppResult<T>;
}

impl<T> ResultExt<T> for AppResult<T> {
    fn context(self, context: impl Into<String>) -> AppResult<T> {
        self.map_err(|error| error.context(context))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(error: diesel::result::Error) -> Self {
        DatabaseErrorConverter::convert_diesel_error(error, "database operation")
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|key| key.to_string())
            .unwrap_or_else(|| "input".to_string());
        AppError::Validation {
            field,
            reason: errors.to_string(),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

impl From<crate::config::ConfigError> for AppError {
    fn from(error: crate::config::ConfigError) -> Self {
        let key = error.key().unwrap_or("settings").to_string();
        AppError::Configuration {
            key,
            source: anyhow::Error::from(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Contact {
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(AppError::not_found("user", "id", 1).kind(), ErrorKind::NotFound);
        assert_eq!(
            AppError::Duplicate {
                entity: "directors".into(),
                field: "email".into(),
                value: "d1@x.com".into(),
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            AppError::RoleAlreadyAssigned {
                user_id: Uuid::nil(),
                role: Role::Director,
                scope_id: None,
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(AppError::bad_request("nope").kind(), ErrorKind::BadRequest);
        assert_eq!(
            AppError::DeadlineExceeded {
                operation: "insert".into()
            }
            .kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_context_keeps_kind_and_root() {
        let error = AppError::not_found("school", "id", "x")
            .context("hydrate director")
            .context("add director");

        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(matches!(error.root(), AppError::NotFound { entity, .. } if entity == "school"));
        assert_eq!(error.to_string(), "add director");
    }

    #[test]
    fn test_unit_of_work_error_mentions_both_failures() {
        let error = AppError::UnitOfWork {
            stage: TxStage::Rollback,
            source: Box::new(AppError::internal("connection reset")),
            cause: Some(Box::new(AppError::bad_request("invalid phone"))),
        };

        let message = error.to_string();
        assert!(message.contains("rollback"));
        assert!(message.contains("invalid phone"));
        assert_eq!(error.kind(), ErrorKind::Internal);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_validation_errors_become_bad_request() {
        let contact = Contact {
            email: "not-an-email".to_string(),
        };
        let error = AppError::from(contact.validate().unwrap_err());

        match &error {
            AppError::Validation { field, .. } => assert_eq!(field, "email"),
            other => panic!("Expected Validation error, got: {:?}", other),
        }
        assert_eq!(error.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_config_errors_keep_their_key() {
        let error = AppError::from(crate::config::ConfigError::InvalidEnvVar {
            var: "CAMPUS_APP_ENV",
            value: "qa".to_string(),
            expected: "development, test, staging, production",
        });
        assert!(matches!(&error, AppError::Configuration { key, .. } if key == "CAMPUS_APP_ENV"));

        let error = AppError::from(crate::config::ConfigError::FileNotFound {
            path: "config/default.toml".into(),
        });
        assert!(matches!(&error, AppError::Configuration { key, .. } if key == "settings"));
        assert_eq!(error.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_result_ext_wraps_errors_only() {
        let ok: AppResult<u8> = Ok(1);
        assert_eq!(ok.context("never used").unwrap(), 1);

        let err: AppResult<u8> = Err(AppError::bad_request("bad"));
        let wrapped = err.context("parse filter").unwrap_err();
        assert!(matches!(wrapped, AppError::Context { .. }));
    }
}
