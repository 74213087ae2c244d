pub mod build;
pub mod clean;
pub mod init;
pub mod lint;
pub mod serve;
pub mod status;

use std::path::{Path, PathBuf};

use crate::build::base_path_from_config;
use crate::build::pipeline::{Pipeline, PipelineContext};
use crate::config::{Config, resolve_config_path};

/// A loaded config together with the pipeline it declares.
pub struct Project {
    pub config: Config,
    pub config_path: PathBuf,
    pub ctx: PipelineContext,
    pub pipeline: Pipeline,
}

impl Project {
    /// Load the config file (defaulting to `staticweb.yaml`) and assemble
    /// its pipeline. Relative paths resolve against the config's directory.
    pub fn load(config_file: Option<&Path>) -> Result<Self, anyhow::Error> {
        let config_path = resolve_config_path(config_file)?;
        let config = Config::load_from_file(&config_path)?;
        // Watcher events carry canonical paths
        let config_path = config_path.canonicalize()?;

        // Get the base path for resolving relative paths
        let base_path = base_path_from_config(&config_path);

        let ctx = PipelineContext::from_config(&config, &base_path);
        let pipeline = Pipeline::from_config(&config)?;

        Ok(Self {
            config,
            config_path,
            ctx,
            pipeline,
        })
    }

    pub fn output_dir(&self) -> PathBuf {
        self.ctx.resolve(&self.config.site.output)
    }
}
