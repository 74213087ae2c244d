//! Sentinel files and staleness checks.
//!
//! Every stage owns `<stamp_dir>/<name>.stamp`, written only after its
//! action succeeds. In mtime mode the sentinel's modification time is
//! compared with the newest input file; in hash mode the sentinel body
//! carries a digest of the input contents.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use super::context::PipelineContext;
use super::error::PipelineError;
use super::stage::Stage;
use crate::config::Freshness;

const SENTINEL_EXTENSION: &str = "stamp";
const DIGEST_PREFIX: &str = "digest: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    MissingSentinel,
    InputsChanged,
    UpstreamChanged,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StaleReason::MissingSentinel => "never completed",
            StaleReason::InputsChanged => "inputs changed",
            StaleReason::UpstreamChanged => "upstream changed",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    Stale(StaleReason),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Staleness::Stale(_))
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Staleness::Fresh => f.write_str("fresh"),
            Staleness::Stale(reason) => write!(f, "stale ({})", reason),
        }
    }
}

/// Reads and writes the sentinels of one pipeline context.
pub struct StampStore<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> StampStore<'a> {
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }

    pub fn sentinel_path(&self, stage_name: &str) -> PathBuf {
        self.ctx
            .stamp_dir
            .join(format!("{}.{}", stage_name, SENTINEL_EXTENSION))
    }

    /// Compare a stage's inputs against its sentinel. Upstream propagation
    /// is the caller's concern.
    pub fn check(&self, stage: &Stage) -> Result<Staleness, PipelineError> {
        let sentinel = self.sentinel_path(&stage.name);
        let sentinel_mtime = match std::fs::metadata(&sentinel) {
            Ok(meta) => meta.modified().map_err(|source| PipelineError::Stamp {
                path: sentinel.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Staleness::Stale(StaleReason::MissingSentinel));
            }
            Err(source) => {
                return Err(PipelineError::Stamp {
                    path: sentinel,
                    source,
                });
            }
        };

        let files = input_files(&self.ctx.root, &stage.inputs)?;
        let changed = match self.ctx.freshness {
            Freshness::Mtime => match newest_mtime(&files)? {
                Some(newest) => newest > sentinel_mtime,
                None => false,
            },
            Freshness::Hash => {
                let body = std::fs::read_to_string(&sentinel).map_err(|source| {
                    PipelineError::Stamp {
                        path: sentinel.clone(),
                        source,
                    }
                })?;
                let recorded = body
                    .lines()
                    .find_map(|line| line.strip_prefix(DIGEST_PREFIX))
                    .map(str::trim);
                recorded != Some(content_digest(&files)?.as_str())
            }
        };

        Ok(if changed {
            Staleness::Stale(StaleReason::InputsChanged)
        } else {
            Staleness::Fresh
        })
    }

    /// Mark a stage complete. The sentinel's mtime becomes "now".
    pub fn record(&self, stage: &Stage) -> Result<(), PipelineError> {
        let sentinel = self.sentinel_path(&stage.name);
        let mut body = format!("completed: {}\n", chrono::Local::now().to_rfc3339());
        if self.ctx.freshness == Freshness::Hash {
            let files = input_files(&self.ctx.root, &stage.inputs)?;
            body.push_str(DIGEST_PREFIX);
            body.push_str(&content_digest(&files)?);
            body.push('\n');
        }

        std::fs::create_dir_all(&self.ctx.stamp_dir).map_err(|source| PipelineError::Stamp {
            path: self.ctx.stamp_dir.clone(),
            source,
        })?;
        std::fs::write(&sentinel, body).map_err(|source| PipelineError::Stamp {
            path: sentinel,
            source,
        })
    }

    /// Forget that a stage ever completed.
    pub fn invalidate(&self, stage_name: &str) -> Result<(), PipelineError> {
        let sentinel = self.sentinel_path(stage_name);
        match std::fs::remove_file(&sentinel) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PipelineError::Stamp {
                path: sentinel,
                source,
            }),
        }
    }
}

/// Every file below the declared inputs, keyed by its project-relative
/// path. A declared input that does not exist contributes nothing; any
/// other failure to read the tree is an error.
pub fn input_files(
    root: &Path,
    inputs: &[PathBuf],
) -> Result<BTreeMap<PathBuf, PathBuf>, PipelineError> {
    let mut files = BTreeMap::new();
    for input in inputs {
        let path = root.join(input);
        let meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err.into()),
        };
        if meta.is_file() {
            files.insert(input.clone(), path);
        } else if meta.is_dir() {
            for entry in WalkDir::new(&path) {
                let entry = entry.map_err(std::io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry
                    .path()
                    .strip_prefix(root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| entry.path().to_path_buf());
                files.insert(relative, entry.into_path());
            }
        }
    }
    Ok(files)
}

fn newest_mtime(files: &BTreeMap<PathBuf, PathBuf>) -> Result<Option<SystemTime>, PipelineError> {
    let mut newest: Option<SystemTime> = None;
    for path in files.values() {
        let modified = std::fs::metadata(path)?.modified()?;
        newest = Some(newest.map_or(modified, |n| n.max(modified)));
    }
    Ok(newest)
}

/// BLAKE3 over the sorted (relative path, content) pairs.
fn content_digest(files: &BTreeMap<PathBuf, PathBuf>) -> Result<String, PipelineError> {
    let mut hasher = blake3::Hasher::new();
    for (relative, path) in files {
        let contents = std::fs::read(path)?;
        let name = relative.to_string_lossy();
        hasher.update(&(name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update(&(contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
