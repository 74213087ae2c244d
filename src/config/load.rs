//! Configuration loading from files.
//!
//! The YAML file is layered under environment overrides prefixed with
//! `STATICWEB__` (nesting separated by `__`, e.g. `STATICWEB__SITE__NAME`).

use std::path::{Path, PathBuf};

use config::{Environment, File, FileFormat};

use super::{Config, ConfigError};

pub const CONFIG_FILE_NAME: &str = "staticweb.yaml";

const ENV_PREFIX: &str = "STATICWEB";

/// Resolve the config file argument to an absolute path, defaulting to
/// `staticweb.yaml` in the current directory.
pub fn resolve_config_path(config_file: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let config_file = config_file.unwrap_or(Path::new(CONFIG_FILE_NAME));
    if config_file.is_relative() {
        Ok(std::env::current_dir()
            .map_err(ConfigError::CwdFailure)?
            .join(config_file))
    } else {
        Ok(config_file.to_path_buf())
    }
}

impl Config {
    /// Load the config from a file path, applying environment overrides.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let settings = config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load the config from YAML text, without environment overrides.
    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(File::from_str(content, FileFormat::Yaml))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
