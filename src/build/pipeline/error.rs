//! Pipeline error types.

use std::path::PathBuf;
use std::process::ExitStatus;

use crate::build::BuildError;
use crate::config::ConfigError;

/// Problems with the shape of the stage graph, found before anything runs.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("stage '{0}' is declared more than once")]
    DuplicateStage(String),

    #[error("stage '{stage}' runs after unknown stage '{after}'")]
    UnknownDependency { stage: String, after: String },

    #[error("dependency cycle between stages: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("no stage named '{0}'")]
    UnknownTarget(String),
}

/// Why a stage's action failed.
#[derive(thiserror::Error, Debug)]
pub enum ActionError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{program}` failed ({status}){}", format_output(.output))]
    Exit {
        program: String,
        status: ExitStatus,
        /// Captured stdout and stderr
        output: String,
    },

    #[error("formatter produced no output for {0}")]
    EmptyOutput(PathBuf),

    #[error(transparent)]
    Render(#[from] BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

fn format_output(output: &str) -> String {
    let output = output.trim_end();
    if output.is_empty() {
        String::new()
    } else {
        format!(":\n{}", output)
    }
}

/// Errors that can occur while planning or running the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("stage '{stage}' failed: {source}")]
    StageAction {
        stage: String,
        #[source]
        source: ActionError,
    },

    #[error("failed to access sentinel {path}: {source}")]
    Stamp {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GraphError> for PipelineError {
    fn from(err: GraphError) -> Self {
        Self::Config(ConfigError::Graph(err))
    }
}

impl PipelineError {
    /// Name of the stage whose action failed, if that is what happened.
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            Self::StageAction { stage, .. } => Some(stage),
            _ => None,
        }
    }
}
