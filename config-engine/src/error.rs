use error_common::NicareError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration source could not be loaded: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Configuration could not be rendered: {0}")]
    Render(#[from] serde_yaml::Error),
}

impl From<ConfigError> for NicareError {
    fn from(err: ConfigError) -> Self {
        NicareError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
