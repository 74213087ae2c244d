//! Configuration loading and types for staticweb.
//!
//! This module handles all aspects of configuration:
//! - Type definitions for config structures (`types`)
//! - Loading configs from files and the environment (`load`)

mod load;
mod types;

use std::collections::HashSet;

// Re-export all types for convenient access
pub use load::{CONFIG_FILE_NAME, resolve_config_path};
pub use types::{
    ActionConfig, Config, DevConfig, Freshness, LintTask, MarkdownConfig, PipelineConfig,
    SiteConfig, TagsConfig, ThemeConfig, WatchConfig,
};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to get current working directory: {0}")]
    CwdFailure(std::io::Error),

    #[error("config file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("invalid config: {0}")]
    Validation(String),

    #[error("invalid pipeline: {0}")]
    Graph(#[from] crate::build::pipeline::GraphError),
}

// =============================================================================
// Validation
// =============================================================================

impl Config {
    /// Check the invariants serde cannot express.
    ///
    /// Graph-level problems (cycles, unknown `after` references) are
    /// reported by the pipeline when it is assembled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.theme.default_layout.trim().is_empty() {
            return Err(ConfigError::Validation(
                "'theme.default_layout' must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for stage in self.stages() {
            if stage.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "every stage needs a non-empty 'name'".to_string(),
                ));
            }
            if !seen.insert(stage.name.clone()) {
                return Err(ConfigError::Validation(format!(
                    "stage '{}' is declared more than once",
                    stage.name
                )));
            }
            let argv = match &stage.action {
                ActionConfig::Command(command) => command.argv(),
                ActionConfig::Prettify(prettify) => prettify.command.as_slice(),
                ActionConfig::Render => continue,
            };
            if argv.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "stage '{}' has an empty command",
                    stage.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for task in &self.lint {
            if !seen.insert(task.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "lint task '{}' is declared more than once",
                    task.name
                )));
            }
            if task.command.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "lint task '{}' has an empty command",
                    task.name
                )));
            }
        }

        Ok(())
    }
}
