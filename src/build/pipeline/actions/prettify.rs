//! Reformat every HTML file of the output tree in place.

use std::path::PathBuf;

use walkdir::WalkDir;

use super::command::run_captured;
use crate::build::pipeline::{ActionError, PipelineContext, StageAction};

/// Pipes each `*.html` file under `html_dir` through a formatter reading
/// stdin and writing stdout, then replaces the file with the result.
#[derive(Debug, Clone)]
pub struct PrettifyAction {
    html_dir: PathBuf,
    command: Vec<String>,
    accept_exit_codes: Vec<i32>,
}

impl PrettifyAction {
    pub fn new(html_dir: PathBuf, command: Vec<String>, accept_exit_codes: Vec<i32>) -> Self {
        Self {
            html_dir,
            command,
            accept_exit_codes,
        }
    }
}

impl StageAction for PrettifyAction {
    fn run(&self, ctx: &PipelineContext) -> Result<(), ActionError> {
        let root = ctx.resolve(&self.html_dir);
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(&root) {
            let entry = entry.map_err(std::io::Error::from)?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "html") {
                files.push(entry.into_path());
            }
        }
        files.sort();

        for path in &files {
            let original = std::fs::read(path)?;
            let output = run_captured(
                ctx,
                &self.command,
                Some(original.as_slice()),
                &self.accept_exit_codes,
            )?;

            if output.stdout.is_empty() && !original.is_empty() {
                return Err(ActionError::EmptyOutput(path.clone()));
            }
            if output.stdout != original {
                std::fs::write(path, &output.stdout)?;
            }
        }

        tracing::debug!(files = files.len(), dir = %root.display(), "prettified HTML");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("prettify {} with {}", self.html_dir.display(), self.command.join(" "))
    }
}
