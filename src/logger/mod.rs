//! Logger Module
//!
//! Console logging based on `tracing-subscriber`, rendered as full,
//! compact or JSON lines with an `EnvFilter` level directive.

pub mod config;
pub mod error;


pub use config::*;
pub use error::LoggerError;

use std::io::IsTerminal;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global subscriber with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_logger(config: LoggerConfig) -> anyhow::Result<()> {
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let use_ansi = config.colored && std::io::stdout().is_terminal();

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Full => registry
            .with(fmt::layer().with_ansi(use_ansi).with_target(true).with_level(true))
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_ansi(use_ansi)
                    .with_target(true)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().with_ansi(false).json())
            .try_init(),
    };

    installed.map_err(|e| LoggerError::init(e.to_string()))?;
    Ok(())
}
