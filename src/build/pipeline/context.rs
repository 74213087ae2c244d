//! Explicit execution context handed to every stage action.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{Config, Freshness};

/// Everything a stage may depend on besides its declared files.
///
/// Actions resolve paths against `root` and pass `env` to child
/// processes; they never consult the process's working directory.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Project root; relative stage paths are resolved against it
    pub root: PathBuf,
    /// Absolute directory holding the sentinels
    pub stamp_dir: PathBuf,
    pub freshness: Freshness,
    /// Extra environment for external programs
    pub env: BTreeMap<String, String>,
}

impl PipelineContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            stamp_dir: root.join(".stamps"),
            root,
            freshness: Freshness::default(),
            env: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &Config, root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            stamp_dir: root.join(&config.pipeline.stamp_dir),
            freshness: config.pipeline.freshness,
            env: config.pipeline.env.clone(),
        }
    }

    pub fn with_freshness(mut self, freshness: Freshness) -> Self {
        self.freshness = freshness;
        self
    }

    /// Resolve a project-relative path.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}
