//! Layered configuration loading
//!
//! Sources in order of priority (lowest first):
//! 1. `default.toml` (required)
//! 2. `{environment}.toml` (optional)
//! 3. `local.toml` (optional)
//! 4. `CAMPUS_*` environment variables, `__` separating nested keys
//!
//! `CAMPUS_CONFIG_FILE` replaces the three file layers with a single file.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat};
use tracing::debug;

use crate::config::environment::Environment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

const CONFIG_DIR_ENV: &str = "CAMPUS_CONFIG_DIR";

const CONFIG_FILE_ENV: &str = "CAMPUS_CONFIG_FILE";

const DEFAULT_CONFIG_DIR: &str = "config";

const ENV_PREFIX: &str = "CAMPUS";

const ENV_SEPARATOR: &str = "__";

/// Where settings files are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Layered(PathBuf),
    SingleFile(PathBuf),
}

#[derive(Debug)]
pub struct ConfigLoader {
    source: Source,
    environment: Environment,
}

impl ConfigLoader {
    /// Creates a loader from `CAMPUS_CONFIG_DIR`, `CAMPUS_CONFIG_FILE` and
    /// `CAMPUS_APP_ENV`.
    ///
    /// # Errors
    /// `ConflictingSources` when both the directory and the file variable are set.
    pub fn new() -> Result<Self, ConfigError> {
        let dir = std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from);
        let file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        let source = match (dir, file) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::ConflictingSources {
                    dir_var: CONFIG_DIR_ENV,
                    file_var: CONFIG_FILE_ENV,
                });
            }
            (None, Some(file)) => Source::SingleFile(file),
            (dir, None) => Source::Layered(dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR))),
        };

        Ok(Self {
            source,
            environment: Environment::from_env(),
        })
    }

    /// Creates a layered loader over `dir` for an explicit environment.
    pub fn from_dir(dir: impl Into<PathBuf>, environment: Environment) -> Self {
        Self {
            source: Source::Layered(dir.into()),
            environment,
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Loads, deserializes and validates the settings.
    ///
    /// # Errors
    /// - `FileNotFound` when `default.toml` (or the single file) is missing
    /// - `Deserialize` when the merged sources do not form valid `Settings`
    /// - `ValidationError` when a value is out of range
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let builder = match &self.source {
            Source::SingleFile(path) => add_file(Config::builder(), path, true)?,
            Source::Layered(dir) => self.add_layers(Config::builder(), dir)?,
        };

        let settings: Settings = add_env(builder)
            .build()?
            .try_deserialize()
            .map_err(ConfigError::Deserialize)?;

        settings.validate()?;
        debug!(environment = %self.environment, source = ?self.source, "Configuration loaded");
        Ok(settings)
    }

    fn add_layers(
        &self,
        builder: ConfigBuilder<DefaultState>,
        dir: &Path,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = add_file(builder, &dir.join("default.toml"), true)?;
        let builder = add_file(
            builder,
            &dir.join(format!("{}.toml", self.environment.as_str())),
            false,
        )?;
        add_file(builder, &dir.join("local.toml"), false)
    }
}

fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if required && !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let name = path
        .to_str()
        .ok_or_else(|| ConfigError::NonUtf8Path {
            path: path.to_path_buf(),
        })?;
    Ok(builder.add_source(File::new(name, FileFormat::Toml).required(required)))
}

fn add_env(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR)
            .ignore_empty(true)
            .try_parsing(true),
    )
}
