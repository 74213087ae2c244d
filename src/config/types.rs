//! Configuration type definitions.
//!
//! This module contains all the data structures used in `staticweb.yaml`.
//! These types are pure data - no I/O or complex logic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// =============================================================================
// Root config
// =============================================================================

/// The whole project configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub tags: TagsConfig,
    #[serde(default)]
    pub markdown: MarkdownConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Standalone static-analysis tasks (`staticweb lint`)
    #[serde(default)]
    pub lint: Vec<LintTask>,
    /// Development-specific settings (watch mode, etc.)
    #[serde(default)]
    pub dev: DevConfig,
}

impl Config {
    /// The declared stages, or the default pipeline derived from the
    /// site and theme paths when none are configured.
    pub fn stages(&self) -> Vec<StageConfig> {
        match &self.pipeline.stages {
            Some(stages) => stages.clone(),
            None => default_stages(&self.site, &self.theme),
        }
    }

    /// Look up a lint task by name.
    pub fn lint_task(&self, name: &str) -> Option<&LintTask> {
        self.lint.iter().find(|task| task.name == name)
    }
}

// =============================================================================
// Site configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub url: Option<String>,
    /// Directory holding the Markdown sources
    #[serde(default = "default_content")]
    pub content: PathBuf,
    /// Directory the rendered HTML tree is written to
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_content() -> PathBuf {
    PathBuf::from("content")
}

fn default_output() -> PathBuf {
    PathBuf::from("build/html")
}

// =============================================================================
// Theme configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Theme directory; templates are loaded from `<path>/templates`
    #[serde(default = "default_theme_path")]
    pub path: PathBuf,
    /// Layout used by documents that do not select one
    #[serde(default = "default_layout")]
    pub default_layout: String,
    /// Arbitrary settings passed to templates as `theme.*`
    #[serde(default)]
    pub settings: serde_json::Value,
    /// Compiled stylesheet to publish alongside the HTML
    #[serde(default = "default_stylesheet")]
    pub stylesheet: Option<PathBuf>,
}

fn default_theme_path() -> PathBuf {
    PathBuf::from("theme")
}

fn default_layout() -> String {
    "page".to_string()
}

fn default_stylesheet() -> Option<PathBuf> {
    Some(PathBuf::from("build/css/style.css"))
}

impl ThemeConfig {
    pub fn templates_dir(&self) -> PathBuf {
        self.path.join("templates")
    }

    pub fn sass_dir(&self) -> PathBuf {
        self.path.join("sass")
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            path: default_theme_path(),
            default_layout: default_layout(),
            settings: serde_json::Value::Null,
            stylesheet: default_stylesheet(),
        }
    }
}

// =============================================================================
// Content tags
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsConfig {
    /// URL of the page listing every tag
    #[serde(default = "default_tag_overview_url")]
    pub overview_url: String,
    /// URL prefix for the per-tag pages (`<prefix>/<tag>`)
    #[serde(default = "default_tag_page_prefix")]
    pub page_prefix: String,
}

fn default_tag_overview_url() -> String {
    "tags".to_string()
}

fn default_tag_page_prefix() -> String {
    "tags".to_string()
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            overview_url: default_tag_overview_url(),
            page_prefix: default_tag_page_prefix(),
        }
    }
}

// =============================================================================
// Markdown configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Extensions to enable for markdown processing
    #[serde(default = "default_markdown_extensions")]
    pub extensions: Vec<String>,
}

fn default_markdown_extensions() -> Vec<String> {
    vec![
        "definition_lists".to_string(),
        "footnotes".to_string(),
        "heading_attributes".to_string(),
        "strikethrough".to_string(),
        "tables".to_string(),
        "tasklists".to_string(),
    ]
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            extensions: default_markdown_extensions(),
        }
    }
}

// =============================================================================
// Pipeline configuration
// =============================================================================

/// How a stage decides whether its inputs changed since its last run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Compare input modification times against the sentinel's.
    #[default]
    Mtime,
    /// Compare a digest of the input contents against the one recorded
    /// in the sentinel.
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding one sentinel file per stage
    #[serde(default = "default_stamp_dir")]
    pub stamp_dir: PathBuf,
    #[serde(default)]
    pub freshness: Freshness,
    /// Extra environment for command actions
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Stage declarations; the default pipeline is used when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<StageConfig>>,
}

fn default_stamp_dir() -> PathBuf {
    PathBuf::from("build/.stamps")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stamp_dir: default_stamp_dir(),
            freshness: Freshness::default(),
            env: BTreeMap::new(),
            stages: None,
        }
    }
}

/// A declared pipeline stage.
///
/// ```yaml
/// - name: compile_style
///   inputs: [theme/sass]
///   outputs: [build/css/style.css]
///   action:
///     command: [sass, --no-source-map, theme/sass/style.scss, build/css/style.css]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
    /// Stages that must complete first even without a file relationship
    #[serde(default)]
    pub after: Vec<String>,
    /// Only run when named explicitly as a build target
    #[serde(default)]
    pub on_demand: bool,
    pub action: ActionConfig,
}

/// What a stage does when it is stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionConfig {
    /// The built-in content renderer
    Render,
    /// Pipe every HTML file of the output tree through a formatter
    Prettify(PrettifyConfig),
    /// Run an external program
    Command(CommandConfig),
}

/// An external command, either as a bare argv list or with options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandConfig {
    Argv(Vec<String>),
    Detailed {
        argv: Vec<String>,
        #[serde(default = "default_accept_exit_codes")]
        accept_exit_codes: Vec<i32>,
    },
}

fn default_accept_exit_codes() -> Vec<i32> {
    vec![0]
}

impl CommandConfig {
    pub fn argv(&self) -> &[String] {
        match self {
            CommandConfig::Argv(argv) => argv,
            CommandConfig::Detailed { argv, .. } => argv,
        }
    }

    pub fn accept_exit_codes(&self) -> Vec<i32> {
        match self {
            CommandConfig::Argv(_) => default_accept_exit_codes(),
            CommandConfig::Detailed {
                accept_exit_codes, ..
            } => accept_exit_codes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrettifyConfig {
    /// HTML tree to rewrite (defaults to `site.output`)
    #[serde(default)]
    pub html_dir: Option<PathBuf>,
    /// Formatter reading HTML on stdin and writing it to stdout
    #[serde(default = "default_prettify_command")]
    pub command: Vec<String>,
    /// tidy exits with 1 when it only emitted warnings
    #[serde(default = "default_prettify_exit_codes")]
    pub accept_exit_codes: Vec<i32>,
}

fn default_prettify_command() -> Vec<String> {
    [
        "tidy",
        "-q",
        "--doctype",
        "html5",
        "--indent",
        "auto",
        "--indent-spaces",
        "2",
        "--indent-attributes",
        "no",
        "--sort-attributes",
        "alpha",
        "--tidy-mark",
        "no",
        "--wrap",
        "0",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_prettify_exit_codes() -> Vec<i32> {
    vec![0, 1]
}

impl Default for PrettifyConfig {
    fn default() -> Self {
        Self {
            html_dir: None,
            command: default_prettify_command(),
            accept_exit_codes: default_prettify_exit_codes(),
        }
    }
}

/// The stylesheet → HTML → prettified HTML chain used when no stages
/// are configured.
pub fn default_stages(site: &SiteConfig, theme: &ThemeConfig) -> Vec<StageConfig> {
    let mut stages = Vec::new();
    let mut render_inputs = vec![site.content.clone(), theme.templates_dir()];

    if let Some(stylesheet) = &theme.stylesheet {
        let entry = theme.sass_dir().join("style.scss");
        stages.push(StageConfig {
            name: "compile_style".to_string(),
            inputs: vec![theme.sass_dir()],
            outputs: vec![stylesheet.clone()],
            after: Vec::new(),
            on_demand: false,
            action: ActionConfig::Command(CommandConfig::Argv(vec![
                "sass".to_string(),
                "--no-source-map".to_string(),
                path_arg(&entry),
                path_arg(stylesheet),
            ])),
        });
        render_inputs.push(stylesheet.clone());
    }

    stages.push(StageConfig {
        name: "render_html".to_string(),
        inputs: render_inputs,
        outputs: vec![site.output.clone()],
        after: Vec::new(),
        on_demand: false,
        action: ActionConfig::Render,
    });

    stages.push(StageConfig {
        name: "prettify".to_string(),
        inputs: vec![site.output.clone()],
        outputs: vec![site.output.clone()],
        after: Vec::new(),
        on_demand: false,
        action: ActionConfig::Prettify(PrettifyConfig::default()),
    });

    stages
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// =============================================================================
// Lint tasks
// =============================================================================

/// A single static-analysis tool invocation. Lint tasks have no sentinel
/// and always run when requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintTask {
    pub name: String,
    pub command: Vec<String>,
    /// Run the build pipeline first (link checkers need the HTML tree)
    #[serde(default)]
    pub requires_build: bool,
    #[serde(default = "default_accept_exit_codes")]
    pub accept_exit_codes: Vec<i32>,
}

// =============================================================================
// Development configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevConfig {
    /// File watching configuration
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration for file watching during development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Use polling-based watcher instead of native file system events.
    /// Useful for network filesystems, Docker volumes, or other situations
    /// where native events are unreliable.
    #[serde(default)]
    pub poll: bool,
    /// Poll interval in milliseconds (only used if poll=true).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Debounce timeout in milliseconds.
    /// Changes within this window are batched together.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll: false,
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}
