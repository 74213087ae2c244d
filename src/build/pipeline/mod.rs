//! Incremental build pipeline.
//!
//! Stages form an acyclic graph ordered by how their declared outputs feed
//! other stages' inputs. Each stage leaves a sentinel when it completes; a
//! run executes only the stages whose sentinel is missing or older than an
//! input, plus everything downstream of a stage that ran.
//!
//! Execution is sequential and synchronous. A failing action halts the run
//! before any downstream stage starts.

pub mod actions;
mod context;
mod error;
mod freshness;
mod graph;
mod stage;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub use context::PipelineContext;
pub use error::{ActionError, GraphError, PipelineError};
pub use freshness::{StaleReason, Staleness, StampStore};
pub use graph::{StageGraph, paths_overlap};
pub use stage::{Stage, StageAction};

use crate::config::{Config, ConfigError};

/// The planned state of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStage {
    pub name: String,
    pub status: Staleness,
    pub description: String,
}

/// What a run did, in execution order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
}

/// An ordered, validated set of stages.
pub struct Pipeline {
    stages: Vec<Stage>,
    graph: StageGraph,
}

impl Pipeline {
    /// Assemble a pipeline, rejecting duplicate names, unknown `after`
    /// references and cycles.
    pub fn new(stages: Vec<Stage>) -> Result<Self, GraphError> {
        let graph = StageGraph::build(&stages)?;
        Ok(Self { stages, graph })
    }

    /// Build the declared (or default) stages of a config.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let stages = config
            .stages()
            .into_iter()
            .map(|declared| {
                Stage::boxed(
                    declared.name.clone(),
                    actions::from_config(&declared.action, config),
                )
                .inputs(declared.inputs)
                .outputs(declared.outputs)
                .after(declared.after)
                .on_demand(declared.on_demand)
            })
            .collect();

        Ok(Self::new(stages)?)
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.graph
            .order()
            .iter()
            .map(|&i| self.stages[i].name.as_str())
            .collect()
    }

    /// Every declared input path, deduplicated.
    pub fn inputs(&self) -> Vec<PathBuf> {
        self.collect_paths(|stage| &stage.inputs)
    }

    /// Every declared output path, deduplicated.
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.collect_paths(|stage| &stage.outputs)
    }

    fn collect_paths(&self, pick: impl Fn(&Stage) -> &Vec<PathBuf>) -> Vec<PathBuf> {
        self.stages
            .iter()
            .flat_map(|stage| pick(stage).iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Indices of the stages a run covers, in execution order.
    ///
    /// With targets: the targets and their upstream closure. Without: every
    /// stage not marked on-demand, plus its upstream closure.
    pub fn select(&self, targets: &[String]) -> Result<Vec<usize>, GraphError> {
        let seeds: Vec<usize> = if targets.is_empty() {
            self.stages
                .iter()
                .enumerate()
                .filter(|(_, stage)| !stage.on_demand)
                .map(|(i, _)| i)
                .collect()
        } else {
            targets
                .iter()
                .map(|target| {
                    self.stages
                        .iter()
                        .position(|s| &s.name == target)
                        .ok_or_else(|| GraphError::UnknownTarget(target.clone()))
                })
                .collect::<Result<_, _>>()?
        };

        let included = self.graph.upstream_closure(seeds);
        Ok(self
            .graph
            .order()
            .iter()
            .copied()
            .filter(|i| included.contains(i))
            .collect())
    }

    /// Predict what a run would do without executing anything.
    ///
    /// A fresh stage is predicted `UpstreamChanged` when a stage it depends
    /// on is itself stale.
    pub fn plan(
        &self,
        ctx: &PipelineContext,
        targets: &[String],
    ) -> Result<Vec<PlannedStage>, PipelineError> {
        let store = StampStore::new(ctx);
        let mut stale: BTreeSet<usize> = BTreeSet::new();
        let mut planned = Vec::new();

        for index in self.select(targets)? {
            let stage = &self.stages[index];
            let upstream_stale = self.graph.upstream(index).iter().any(|u| stale.contains(u));
            let status = propagate(store.check(stage)?, upstream_stale);
            if status.is_stale() {
                stale.insert(index);
            }
            planned.push(PlannedStage {
                name: stage.name.clone(),
                status,
                description: stage.action().describe(),
            });
        }

        Ok(planned)
    }

    /// Execute every stale stage of the selection in order.
    pub fn run(&self, ctx: &PipelineContext, targets: &[String]) -> Result<RunReport, PipelineError> {
        let store = StampStore::new(ctx);
        let mut executed: BTreeSet<usize> = BTreeSet::new();
        let mut report = RunReport::default();

        for index in self.select(targets)? {
            let stage = &self.stages[index];
            let upstream_ran = self.graph.upstream(index).iter().any(|u| executed.contains(u));
            let status = propagate(store.check(stage)?, upstream_ran);

            let Staleness::Stale(reason) = status else {
                tracing::debug!(stage = %stage.name, "fresh, skipping");
                report.skipped.push(stage.name.clone());
                continue;
            };

            tracing::info!(stage = %stage.name, %reason, "running");
            // An interrupted or failed action must not leave an old
            // sentinel claiming the stage is complete.
            store.invalidate(&stage.name)?;
            stage
                .action()
                .run(ctx)
                .map_err(|source| PipelineError::StageAction {
                    stage: stage.name.clone(),
                    source,
                })?;
            store.record(stage)?;

            executed.insert(index);
            report.executed.push(stage.name.clone());
        }

        Ok(report)
    }

    /// Delete every sentinel of this pipeline.
    pub fn invalidate_all(&self, ctx: &PipelineContext) -> Result<(), PipelineError> {
        let store = StampStore::new(ctx);
        for stage in &self.stages {
            store.invalidate(&stage.name)?;
        }
        Ok(())
    }
}

/// A stage's own staleness wins; otherwise a changed upstream makes it stale.
fn propagate(own: Staleness, upstream_changed: bool) -> Staleness {
    match own {
        Staleness::Fresh if upstream_changed => Staleness::Stale(StaleReason::UpstreamChanged),
        other => other,
    }
}

/// Whether `path` lies inside one of `roots`.
pub fn is_within(path: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| path.starts_with(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Freshness;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, SystemTime};

    type Log = Arc<Mutex<Vec<String>>>;

    /// A stage whose action records its name and writes `contents` to its
    /// first output (as a file, or `index.html` inside it for directories).
    fn recording(log: &Log, name: &str, inputs: &[&str], outputs: &[&str]) -> Stage {
        let log = Arc::clone(log);
        let stage_name = name.to_string();
        let target = outputs.first().map(|o| o.to_string());
        let action = move |ctx: &PipelineContext| -> Result<(), ActionError> {
            log.lock().unwrap().push(stage_name.clone());
            if let Some(target) = &target {
                let path = ctx.resolve(Path::new(target));
                let file = if path.extension().is_some() {
                    path
                } else {
                    path.join("index.html")
                };
                std::fs::create_dir_all(file.parent().unwrap())?;
                std::fs::write(file, &stage_name)?;
            }
            Ok(())
        };
        Stage::new(name, action)
            .inputs(inputs.iter().copied())
            .outputs(outputs.iter().copied())
    }

    fn failing(name: &str, inputs: &[&str]) -> Stage {
        let action = |_: &PipelineContext| -> Result<(), ActionError> {
            Err(ActionError::Other("boom".to_string()))
        };
        Stage::new(name, action).inputs(inputs.iter().copied())
    }

    fn taken(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    /// Move every file's mtime into the past so a later write is newer.
    fn rewind_tree(dir: &Path) {
        let past = SystemTime::now() - Duration::from_secs(60);
        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            std::fs::File::options()
                .write(true)
                .open(entry.path())
                .unwrap()
                .set_modified(past)
                .unwrap();
        }
    }

    fn touch(path: &Path) {
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now())
            .unwrap();
    }

    /// compile_style → render_html → prettify, plus an unrelated stage.
    fn site_pipeline(log: &Log) -> (tempfile::TempDir, PipelineContext, Pipeline) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("theme/sass")).unwrap();
        std::fs::create_dir_all(root.join("content")).unwrap();
        std::fs::create_dir_all(root.join("images")).unwrap();
        std::fs::write(root.join("theme/sass/style.scss"), "body {}").unwrap();
        std::fs::write(root.join("content/index.md"), "# Home").unwrap();
        std::fs::write(root.join("images/logo.svg"), "<svg/>").unwrap();

        let pipeline = Pipeline::new(vec![
            recording(log, "compile_style", &["theme/sass"], &["build/css/style.css"]),
            recording(
                log,
                "render_html",
                &["content", "build/css/style.css"],
                &["build/html"],
            ),
            recording(log, "prettify", &["build/html"], &["build/html"]),
            recording(log, "optimize_images", &["images"], &["build/img/logo.svg"]),
        ])
        .unwrap();

        let ctx = PipelineContext::new(root).with_freshness(Freshness::Mtime);
        (dir, ctx, pipeline)
    }

    #[test]
    fn test_first_run_executes_everything() {
        let log: Log = Log::default();
        let (dir, ctx, pipeline) = site_pipeline(&log);

        let report = pipeline.run(&ctx, &[]).unwrap();

        assert_eq!(
            report.executed,
            vec!["compile_style", "render_html", "prettify", "optimize_images"]
        );
        assert!(report.skipped.is_empty());
        assert!(dir.path().join(".stamps/prettify.stamp").is_file());
    }

    #[test]
    fn test_second_run_executes_nothing() {
        let log: Log = Log::default();
        let (_dir, ctx, pipeline) = site_pipeline(&log);
        pipeline.run(&ctx, &[]).unwrap();
        taken(&log);

        let report = pipeline.run(&ctx, &[]).unwrap();

        assert!(report.executed.is_empty());
        assert_eq!(report.skipped.len(), 4);
        assert!(taken(&log).is_empty());
    }

    #[test]
    fn test_touching_stylesheet_source_reruns_its_chain_only() {
        let log: Log = Log::default();
        let (dir, ctx, pipeline) = site_pipeline(&log);
        pipeline.run(&ctx, &[]).unwrap();
        taken(&log);

        rewind_tree(dir.path());
        touch(&dir.path().join("theme/sass/style.scss"));
        let report = pipeline.run(&ctx, &[]).unwrap();

        assert_eq!(
            report.executed,
            vec!["compile_style", "render_html", "prettify"]
        );
        assert_eq!(report.skipped, vec!["optimize_images"]);
    }

    #[test]
    fn test_touching_content_skips_upstream() {
        let log: Log = Log::default();
        let (dir, ctx, pipeline) = site_pipeline(&log);
        pipeline.run(&ctx, &[]).unwrap();

        rewind_tree(dir.path());
        touch(&dir.path().join("content/index.md"));
        let report = pipeline.run(&ctx, &[]).unwrap();

        assert_eq!(report.executed, vec!["render_html", "prettify"]);
    }

    #[test]
    fn test_missing_sentinel_reruns_stage_and_dependents() {
        let log: Log = Log::default();
        let (dir, ctx, pipeline) = site_pipeline(&log);
        pipeline.run(&ctx, &[]).unwrap();

        std::fs::remove_file(dir.path().join(".stamps/render_html.stamp")).unwrap();
        let report = pipeline.run(&ctx, &[]).unwrap();

        assert_eq!(report.executed, vec!["render_html", "prettify"]);
    }

    #[test]
    fn test_failure_halts_and_leaves_no_sentinel() {
        let log: Log = Log::default();
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a"), "a").unwrap();
        let pipeline = Pipeline::new(vec![
            failing("generate", &["src"]).outputs(["gen"]),
            recording(&log, "publish", &["gen"], &["out/site.txt"]),
        ])
        .unwrap();
        let ctx = PipelineContext::new(dir.path());

        let err = pipeline.run(&ctx, &[]).unwrap_err();

        assert_eq!(err.failed_stage(), Some("generate"));
        assert!(err.to_string().contains("boom"));
        assert!(taken(&log).is_empty());
        assert!(!dir.path().join(".stamps/generate.stamp").exists());

        // The next invocation retries it
        let err = pipeline.run(&ctx, &[]).unwrap_err();
        assert_eq!(err.failed_stage(), Some("generate"));
    }

    #[test]
    fn test_failure_removes_previous_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("links.txt"), "a").unwrap();
        let ctx = PipelineContext::new(dir.path());
        let ok = |_: &PipelineContext| -> Result<(), ActionError> { Ok(()) };
        Pipeline::new(vec![Stage::new("check", ok).inputs(["links.txt"])])
            .unwrap()
            .run(&ctx, &[])
            .unwrap();
        assert!(dir.path().join(".stamps/check.stamp").exists());

        rewind_tree(dir.path());
        touch(&dir.path().join("links.txt"));
        let broken = Pipeline::new(vec![failing("check", &["links.txt"])]).unwrap();
        assert!(broken.run(&ctx, &[]).is_err());

        assert!(!dir.path().join(".stamps/check.stamp").exists());
    }

    #[test]
    fn test_on_demand_runs_only_when_targeted() {
        let log: Log = Log::default();
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(vec![
            recording(&log, "render", &["content"], &["build/html"]),
            recording(&log, "validate", &["build/html"], &[]).on_demand(true),
        ])
        .unwrap();
        let ctx = PipelineContext::new(dir.path());

        let report = pipeline.run(&ctx, &[]).unwrap();
        assert_eq!(report.executed, vec!["render"]);

        let report = pipeline.run(&ctx, &["validate".to_string()]).unwrap();
        assert_eq!(report.executed, vec!["validate"]);
        assert_eq!(report.skipped, vec!["render"]);
    }

    #[test]
    fn test_target_selects_upstream_closure() {
        let log: Log = Log::default();
        let (_dir, ctx, pipeline) = site_pipeline(&log);

        let report = pipeline.run(&ctx, &["render_html".to_string()]).unwrap();

        assert_eq!(report.executed, vec!["compile_style", "render_html"]);
    }

    #[test]
    fn test_unknown_target_rejected() {
        let log: Log = Log::default();
        let (_dir, ctx, pipeline) = site_pipeline(&log);

        let err = pipeline.run(&ctx, &["deploy".to_string()]).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::Graph(GraphError::UnknownTarget(_)))
        ));
        assert!(taken(&log).is_empty());
    }

    #[test]
    fn test_cycle_rejected_before_running() {
        let log: Log = Log::default();
        let result = Pipeline::new(vec![
            recording(&log, "a", &["x"], &["y"]),
            recording(&log, "b", &["y"], &["x"]),
        ]);

        assert!(matches!(result, Err(GraphError::Cycle(_))));
        assert!(taken(&log).is_empty());
    }

    #[test]
    fn test_plan_predicts_without_running() {
        let log: Log = Log::default();
        let (dir, ctx, pipeline) = site_pipeline(&log);

        let plan = pipeline.plan(&ctx, &[]).unwrap();
        assert!(plan
            .iter()
            .all(|p| p.status == Staleness::Stale(StaleReason::MissingSentinel)));
        assert!(taken(&log).is_empty());

        pipeline.run(&ctx, &[]).unwrap();
        rewind_tree(dir.path());
        touch(&dir.path().join("theme/sass/style.scss"));

        let statuses: Vec<(String, Staleness)> = pipeline
            .plan(&ctx, &[])
            .unwrap()
            .into_iter()
            .map(|p| (p.name, p.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                (
                    "compile_style".to_string(),
                    Staleness::Stale(StaleReason::InputsChanged)
                ),
                (
                    "render_html".to_string(),
                    Staleness::Stale(StaleReason::UpstreamChanged)
                ),
                (
                    "prettify".to_string(),
                    Staleness::Stale(StaleReason::UpstreamChanged)
                ),
                ("optimize_images".to_string(), Staleness::Fresh),
            ]
        );
    }

    #[test]
    fn test_hash_mode_ignores_touch_without_change() {
        let log: Log = Log::default();
        let (dir, ctx, pipeline) = site_pipeline(&log);
        let ctx = ctx.with_freshness(Freshness::Hash);
        pipeline.run(&ctx, &[]).unwrap();
        taken(&log);

        rewind_tree(dir.path());
        touch(&dir.path().join("theme/sass/style.scss"));
        let report = pipeline.run(&ctx, &[]).unwrap();
        assert!(report.executed.is_empty());

        std::fs::write(dir.path().join("theme/sass/style.scss"), "p {}").unwrap();
        let report = pipeline.run(&ctx, &[]).unwrap();
        assert_eq!(
            report.executed,
            vec!["compile_style", "render_html", "prettify"]
        );
    }

    #[test]
    fn test_from_config_default_stages() {
        let config = Config::load_from_str("site:\n  name: x\n").unwrap();

        let pipeline = Pipeline::from_config(&config).unwrap();

        assert_eq!(
            pipeline.stage_names(),
            vec!["compile_style", "render_html", "prettify"]
        );
        assert!(pipeline.outputs().contains(&PathBuf::from("build/html")));
        assert!(pipeline.inputs().contains(&PathBuf::from("content")));
    }

    #[test]
    fn test_from_config_rejects_unknown_after() {
        let yaml = r#"
site:
  name: x
pipeline:
  stages:
    - name: a
      after: [ghost]
      action: render
"#;
        let config = Config::load_from_str(yaml).unwrap();

        let err = Pipeline::from_config(&config).err().unwrap();

        assert!(matches!(
            err,
            ConfigError::Graph(GraphError::UnknownDependency { .. })
        ));
    }
}
