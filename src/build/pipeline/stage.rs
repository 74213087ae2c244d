use std::fmt;
use std::path::PathBuf;

use super::context::PipelineContext;
use super::error::ActionError;

/// The work a stage performs when it is stale.
///
/// Actions are assumed idempotent: a stage interrupted midway is simply
/// run again on the next invocation.
pub trait StageAction: Send + Sync {
    fn run(&self, ctx: &PipelineContext) -> Result<(), ActionError>;

    /// Short human-readable description for `status` output.
    fn describe(&self) -> String {
        "custom action".to_string()
    }
}

impl<F> StageAction for F
where
    F: Fn(&PipelineContext) -> Result<(), ActionError> + Send + Sync,
{
    fn run(&self, ctx: &PipelineContext) -> Result<(), ActionError> {
        self(ctx)
    }
}

/// A named unit of work with declared inputs and outputs.
///
/// Paths are relative to the pipeline root. Edges between stages are
/// derived from outputs feeding inputs, plus explicit `after` names.
pub struct Stage {
    pub name: String,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub after: Vec<String>,
    /// Only runs when named as a target
    pub on_demand: bool,
    action: Box<dyn StageAction>,
}

impl Stage {
    pub fn new(name: impl Into<String>, action: impl StageAction + 'static) -> Self {
        Self::boxed(name, Box::new(action))
    }

    pub fn boxed(name: impl Into<String>, action: Box<dyn StageAction>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            after: Vec::new(),
            on_demand: false,
            action,
        }
    }

    pub fn inputs<I, P>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn outputs<I, P>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn after<I, S>(mut self, after: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after = after.into_iter().map(Into::into).collect();
        self
    }

    pub fn on_demand(mut self, on_demand: bool) -> Self {
        self.on_demand = on_demand;
        self
    }

    pub fn action(&self) -> &dyn StageAction {
        self.action.as_ref()
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("after", &self.after)
            .field("on_demand", &self.on_demand)
            .field("action", &self.action.describe())
            .finish()
    }
}
