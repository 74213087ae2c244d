//! File watching for automatic rebuilds.
//!
//! Uses `notify-debouncer-full` to watch every declared stage input plus the
//! config file. Stage outputs and the sentinel directory are ignored so a
//! rebuild never triggers itself.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{
    Config as NotifyConfig, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
};
use notify_debouncer_full::{
    DebounceEventResult, Debouncer, RecommendedCache, new_debouncer, new_debouncer_opt,
};

use super::pipeline::{Pipeline, PipelineContext, is_within};
use crate::config::WatchConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

// =============================================================================
// Watch events
// =============================================================================

/// What kind of file changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// The config file; the pipeline must be reassembled
    Config,
    /// A file below a declared stage input
    Input(PathBuf),
}

/// Events sent from the file watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// Files changed, rebuild needed.
    FilesChanged(Vec<ChangeKind>),
    /// Watcher error occurred.
    Error(String),
}

// =============================================================================
// Path classification
// =============================================================================

/// Paths to watch for changes, all absolute.
#[derive(Debug, Clone)]
pub struct WatchPaths {
    pub root: PathBuf,
    /// Declared stage inputs
    pub inputs: Vec<PathBuf>,
    /// Declared stage outputs and the sentinel directory
    pub ignored: Vec<PathBuf>,
    pub config_path: PathBuf,
}

impl WatchPaths {
    pub fn from_pipeline(pipeline: &Pipeline, ctx: &PipelineContext, config_path: &Path) -> Self {
        let mut ignored: Vec<PathBuf> = pipeline.outputs().iter().map(|p| ctx.resolve(p)).collect();
        ignored.push(ctx.stamp_dir.clone());

        Self {
            root: ctx.root.clone(),
            inputs: pipeline.inputs().iter().map(|p| ctx.resolve(p)).collect(),
            ignored,
            config_path: config_path.to_path_buf(),
        }
    }
}

/// Classifies file paths into change types.
#[derive(Clone)]
pub struct PathClassifier {
    paths: WatchPaths,
}

impl PathClassifier {
    pub fn new(paths: WatchPaths) -> Self {
        Self { paths }
    }

    /// Classify a changed path, or `None` when it should not trigger a rebuild.
    pub fn classify(&self, path: &Path) -> Option<ChangeKind> {
        if path == self.paths.config_path {
            return Some(ChangeKind::Config);
        }

        if is_within(path, &self.paths.ignored) {
            return None;
        }

        // Skip hidden files and directories (editor swap files, VCS metadata)
        let relative = path.strip_prefix(&self.paths.root).unwrap_or(path);
        if relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        {
            return None;
        }

        if is_within(path, &self.paths.inputs) {
            return Some(ChangeKind::Input(path.to_path_buf()));
        }

        None // Unknown path, ignore
    }
}

// =============================================================================
// File watcher
// =============================================================================

/// A file watcher that can use either native or polling backend.
pub enum FileWatcher {
    /// Native file system watcher (recommended for local development).
    Native {
        _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
    /// Polling-based watcher (for network filesystems, Docker, etc.).
    Polling {
        _debouncer: Debouncer<PollWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
}

impl FileWatcher {
    /// Create a new file watcher.
    pub fn new(config: &WatchConfig, classifier: PathClassifier) -> Result<Self, WatchError> {
        let debounce_timeout = Duration::from_millis(config.debounce_ms);
        let paths = classifier.paths.clone();

        // Create channel for events
        let (tx, rx) = mpsc::channel();

        // Callback to convert notify events to our WatchEvent type
        let callback = move |result: DebounceEventResult| match result {
            Ok(events) => {
                let mut changes: Vec<ChangeKind> = events
                    .iter()
                    .filter(|event| is_relevant_event(&event.kind))
                    .flat_map(|event| event.paths.iter())
                    .filter_map(|p| classifier.classify(p))
                    .collect();
                changes.dedup();

                if !changes.is_empty() {
                    let _ = tx.send(WatchEvent::FilesChanged(changes));
                }
            }
            Err(errors) => {
                for e in errors {
                    let _ = tx.send(WatchEvent::Error(e.to_string()));
                }
            }
        };

        if config.poll {
            // Use polling watcher
            let poll_interval = Duration::from_millis(config.poll_interval_ms);
            let notify_config = NotifyConfig::default().with_poll_interval(poll_interval);

            let mut debouncer = new_debouncer_opt::<_, PollWatcher, RecommendedCache>(
                debounce_timeout,
                None,
                callback,
                RecommendedCache::default(),
                notify_config,
            )?;

            add_watch_paths_to_debouncer(&mut debouncer, &paths)?;

            Ok(FileWatcher::Polling {
                _debouncer: debouncer,
                rx,
            })
        } else {
            // Use native watcher
            let mut debouncer = new_debouncer(debounce_timeout, None, callback)?;

            add_watch_paths_to_debouncer(&mut debouncer, &paths)?;

            Ok(FileWatcher::Native {
                _debouncer: debouncer,
                rx,
            })
        }
    }

    /// Receive the next watch event (blocking).
    pub fn recv(&self) -> Option<WatchEvent> {
        match self {
            FileWatcher::Native { rx, .. } => rx.recv().ok(),
            FileWatcher::Polling { rx, .. } => rx.recv().ok(),
        }
    }
}

/// Add watch paths to a debouncer.
fn add_watch_paths_to_debouncer<W: Watcher, C: notify_debouncer_full::FileIdCache>(
    debouncer: &mut Debouncer<W, C>,
    paths: &WatchPaths,
) -> Result<(), WatchError> {
    for input in &paths.inputs {
        // Inputs produced by other stages change on every rebuild
        if is_within(input, &paths.ignored) {
            continue;
        }
        if input.is_dir() {
            debouncer.watch(input, RecursiveMode::Recursive)?;
        } else if input.is_file() {
            // Editors often replace files, so watch the directory holding them
            if let Some(parent) = input.parent() {
                debouncer.watch(parent, RecursiveMode::NonRecursive)?;
            }
        }
    }

    // Watch config file's parent directory (to catch config changes)
    if let Some(parent) = paths.config_path.parent()
        && parent.exists()
    {
        debouncer.watch(parent, RecursiveMode::NonRecursive)?;
    }

    Ok(())
}

/// Check if an event kind is relevant for rebuilds.
fn is_relevant_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PathClassifier {
        let root = PathBuf::from("/site");
        PathClassifier::new(WatchPaths {
            inputs: vec![
                root.join("content"),
                root.join("theme/templates"),
                root.join("theme/sass"),
                root.join("build/html"),
            ],
            ignored: vec![root.join("build/html"), root.join("build/.stamps")],
            config_path: root.join("staticweb.yaml"),
            root,
        })
    }

    #[test]
    fn test_config_change() {
        assert_eq!(
            classifier().classify(Path::new("/site/staticweb.yaml")),
            Some(ChangeKind::Config)
        );
    }

    #[test]
    fn test_input_change() {
        let path = Path::new("/site/content/posts/hello.md");
        assert_eq!(
            classifier().classify(path),
            Some(ChangeKind::Input(path.to_path_buf()))
        );
        assert!(classifier()
            .classify(Path::new("/site/theme/sass/_vars.scss"))
            .is_some());
    }

    #[test]
    fn test_outputs_ignored() {
        // build/html is both an output and the prettifier's input
        assert_eq!(classifier().classify(Path::new("/site/build/html/index.html")), None);
        assert_eq!(
            classifier().classify(Path::new("/site/build/.stamps/render_html.stamp")),
            None
        );
    }

    #[test]
    fn test_hidden_and_unknown_ignored() {
        assert_eq!(
            classifier().classify(Path::new("/site/content/.hello.md.swp")),
            None
        );
        assert_eq!(classifier().classify(Path::new("/site/README.md")), None);
    }
}
