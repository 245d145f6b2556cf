use config::{Config, Environment, File, FileFormat};
use std::path::Path;

use crate::error::Result;
use crate::settings::NicareConfig;

pub const ENV_PREFIX: &str = "NICARE";
pub const ENV_SEPARATOR: &str = "__";

/// Builds a `NicareConfig` from layered sources.
///
/// Later sources override earlier ones: built-in defaults, then YAML files
/// in the order added, then `NICARE__*` environment variables.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    files: Vec<FileSource>,
    use_env: bool,
    use_dotenv: bool,
}

#[derive(Debug)]
enum FileSource {
    Path { path: String, required: bool },
    Inline(String),
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.files.push(FileSource::Path {
            path: path.as_ref().to_string_lossy().into_owned(),
            required,
        });
        self
    }

    pub fn with_yaml(mut self, yaml: impl Into<String>) -> Self {
        self.files.push(FileSource::Inline(yaml.into()));
        self
    }

    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    /// Read `.env` into the process environment before loading
    pub fn with_dotenv(mut self) -> Self {
        self.use_dotenv = true;
        self
    }

    pub fn load(self) -> Result<NicareConfig> {
        if self.use_dotenv {
            match dotenvy::dotenv() {
                Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
                Err(e) if e.not_found() => {}
                Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env"),
            }
        }

        let mut builder = Config::builder().add_source(Config::try_from(&NicareConfig::default())?);

        for file in self.files {
            builder = match file {
                FileSource::Path { path, required } => {
                    builder.add_source(File::new(&path, FileFormat::Yaml).required(required))
                }
                FileSource::Inline(yaml) => builder.add_source(File::from_str(&yaml, FileFormat::Yaml)),
            };
        }

        if self.use_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        let config: NicareConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

impl NicareConfig {
    /// Standard load path: `.env`, optional config file, environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut loader = ConfigLoader::new().with_dotenv();
        if let Some(path) = path {
            loader = loader.with_file(path, true);
        }
        loader.with_env().load()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logger_redacted::LogFormat;

    #[test]
    fn test_defaults_without_sources() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.claims.referral_validity_days, 30);
        assert_eq!(config.enrollment.pin_length, 12);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let yaml = r#"
claims:
  pa_code_validity_days: 7
  utn_prefix: NGS
logging:
  level: debug
  format: json
"#;
        let config = ConfigLoader::new().with_yaml(yaml).load().unwrap();
        assert_eq!(config.claims.pa_code_validity_days, 7);
        assert_eq!(config.claims.utn_prefix, "NGS");
        // untouched keys keep their defaults
        assert_eq!(config.claims.referral_validity_days, 30);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let yaml = "enrollment:\n  pin_length: 3\n";
        assert!(ConfigLoader::new().with_yaml(yaml).load().is_err());
    }

    #[test]
    fn test_missing_required_file_fails() {
        let result = ConfigLoader::new()
            .with_file("/nonexistent/nicare.yaml", true)
            .load();
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_rendering_round_trips_keys() {
        let rendered = NicareConfig::default().to_yaml().unwrap();
        assert!(rendered.contains("referral_validity_days: 30"));
        assert!(rendered.contains("enrollee_number_prefix: NGSCHA"));
    }
}
