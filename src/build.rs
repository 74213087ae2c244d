mod builder;
mod document;
mod layout;
mod markdown;
mod paths;
pub mod pipeline;
mod render;
mod source;
mod tags;
mod watch;

pub use builder::{BuildError, BuildResult, SiteBuilder};
pub use paths::base_path_from_config;
pub use watch::{ChangeKind, FileWatcher, PathClassifier, WatchEvent, WatchPaths};
