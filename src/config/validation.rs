//! Configuration validation logic
//!
//! Checks that loaded values are within acceptable ranges and formats
//! before any resource is built from them.

use crate::config::error::ConfigError;
use crate::config::settings::{CoreConfig, DatabaseConfig, LoggerSettings, Settings};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

const VALID_DATABASE_SCHEMES: &[&str] = &["postgres://", "postgresql://"];

impl DatabaseConfig {
    /// Validate database configuration
    ///
    /// # Validation Rules
    /// - URL must not be empty and must use a PostgreSQL scheme
    /// - Min and max connections must be greater than 0
    /// - Min connections must not exceed max connections
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL is required. Please specify a valid database connection string.",
            ));
        }

        if !VALID_DATABASE_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL format. Expected format: postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        if self.min_connections == 0 {
            return Err(ConfigError::validation(
                "database.min_connections",
                "Min connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::ValidationError {
                field: "database.min_connections".to_string(),
                message: format!(
                    "Min connections ({}) cannot exceed max connections ({}).",
                    self.min_connections, self.max_connections
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "core.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }
        Ok(())
    }
}

impl Settings {
    /// Validate all sections, stopping at the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.logger.validate()?;
        self.core.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_database() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgres://localhost/campus".to_string(),
            ..DatabaseConfig::default()
        }
    }

    fn valid_settings() -> Settings {
        Settings {
            database: valid_database(),
            ..Settings::default()
        }
    }

    fn failing_field(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_database_config_valid() {
        assert!(valid_database().validate().is_ok());
    }

    #[test]
    fn test_database_config_empty_url() {
        let config = DatabaseConfig::default();
        assert_eq!(failing_field(config.validate()), "database.url");
    }

    #[test]
    fn test_database_config_rejects_other_schemes() {
        for url in ["mysql://localhost/db", "sqlite://./campus.db", "localhost/db"] {
            let config = DatabaseConfig {
                url: url.to_string(),
                ..valid_database()
            };
            assert_eq!(failing_field(config.validate()), "database.url", "{url}");
        }
    }

    #[test]
    fn test_database_config_accepts_postgresql_scheme() {
        let config = DatabaseConfig {
            url: "postgresql://user:pass@db:5432/campus".to_string(),
            ..valid_database()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config_pool_sizes() {
        let zero_max = DatabaseConfig {
            max_connections: 0,
            ..valid_database()
        };
        assert_eq!(failing_field(zero_max.validate()), "database.max_connections");

        let zero_min = DatabaseConfig {
            min_connections: 0,
            ..valid_database()
        };
        assert_eq!(failing_field(zero_min.validate()), "database.min_connections");

        let min_over_max = DatabaseConfig {
            max_connections: 2,
            min_connections: 5,
            ..valid_database()
        };
        assert_eq!(failing_field(min_over_max.validate()), "database.min_connections");
    }

    #[test]
    fn test_logger_settings_levels_and_formats() {
        for level in VALID_LOG_LEVELS {
            let settings = LoggerSettings {
                level: level.to_uppercase(),
                ..LoggerSettings::default()
            };
            assert!(settings.validate().is_ok(), "{level}");
        }

        let bad_level = LoggerSettings {
            level: "verbose".to_string(),
            ..LoggerSettings::default()
        };
        assert_eq!(failing_field(bad_level.validate()), "logger.level");

        let bad_format = LoggerSettings {
            format: "pretty".to_string(),
            ..LoggerSettings::default()
        };
        assert_eq!(failing_field(bad_format.validate()), "logger.format");
    }

    #[test]
    fn test_core_config_zero_timeout() {
        let config = CoreConfig { request_timeout: 0 };
        assert_eq!(failing_field(config.validate()), "core.request_timeout");
    }

    #[test]
    fn test_settings_valid() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_settings_reports_first_invalid_section() {
        let settings = Settings {
            core: CoreConfig { request_timeout: 0 },
            ..valid_settings()
        };
        assert_eq!(failing_field(settings.validate()), "core.request_timeout");

        let settings = Settings {
            database: DatabaseConfig::default(),
            ..settings
        };
        assert_eq!(failing_field(settings.validate()), "database.url");
    }
}
