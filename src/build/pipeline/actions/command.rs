//! External program execution for stage actions and lint tasks.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use crate::build::pipeline::{ActionError, PipelineContext, StageAction};

/// Run an external program with the project root as working directory.
#[derive(Debug, Clone)]
pub struct CommandAction {
    argv: Vec<String>,
    accept_exit_codes: Vec<i32>,
}

impl CommandAction {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            accept_exit_codes: vec![0],
        }
    }

    pub fn accept_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.accept_exit_codes = codes;
        self
    }
}

impl StageAction for CommandAction {
    fn run(&self, ctx: &PipelineContext) -> Result<(), ActionError> {
        let output = run_captured(ctx, &self.argv, None, &self.accept_exit_codes)?;
        let text = combined_output(&output);
        if !text.trim().is_empty() {
            tracing::debug!(command = %self.describe(), "{}", text.trim_end());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.argv.join(" ")
    }
}

/// Spawn `argv` in the context's root with its environment, optionally
/// feeding `stdin`, and wait for it.
///
/// An exit code outside `accept_exit_codes` (or death by signal) is an
/// error carrying the captured output.
pub fn run_captured(
    ctx: &PipelineContext,
    argv: &[String],
    stdin: Option<&[u8]>,
    accept_exit_codes: &[i32],
) -> Result<Output, ActionError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ActionError::Other("empty command".to_string()));
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(&ctx.root)
        .envs(&ctx.env)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|source| ActionError::Spawn {
        program: program.clone(),
        source,
    })?;

    // Feed stdin from a separate thread so a chatty child cannot deadlock
    // on a full stdout pipe.
    let writer = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => {
            let input = input.to_vec();
            Some(std::thread::spawn(move || pipe.write_all(&input)))
        }
        _ => None,
    };

    let output = child.wait_with_output()?;

    if let Some(writer) = writer {
        match writer.join() {
            Ok(Ok(())) => {}
            // The child may legitimately stop reading early
            Ok(Err(err)) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => return Err(ActionError::Other("stdin writer panicked".to_string())),
        }
    }

    let accepted = output
        .status
        .code()
        .is_some_and(|code| accept_exit_codes.contains(&code));
    if !accepted {
        return Err(ActionError::Exit {
            program: argv.join(" "),
            status: output.status,
            output: combined_output(&output),
        });
    }

    Ok(output)
}

/// stdout followed by stderr, lossily decoded.
pub fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}
