use error_common::NicareError;
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LogOutput, LoggerConfig};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),

    #[error("Tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

impl From<LoggerError> for NicareError {
    fn from(err: LoggerError) -> Self {
        NicareError::Configuration(err.to_string())
    }
}

/// Build the filter: `RUST_LOG` wins over the configured level.
pub fn build_filter(config: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|_| LoggerError::InvalidFilter(config.level.clone())),
    }
}

/// Install the global tracing subscriber
pub fn init_tracing(config: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = build_filter(config)?;
    let writer = match config.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .json()
            .with_current_span(true)
            .try_init(),
    };

    result.map_err(|e| LoggerError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(
        level = %config.level,
        redaction = config.redaction_enabled,
        "tracing initialized"
    );
    Ok(())
}
