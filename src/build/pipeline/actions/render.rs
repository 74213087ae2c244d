use crate::build::SiteBuilder;
use crate::build::pipeline::{ActionError, PipelineContext, StageAction};
use crate::config::Config;

/// The built-in content renderer as a stage action.
pub struct RenderAction {
    config: Config,
}

impl RenderAction {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl StageAction for RenderAction {
    fn run(&self, ctx: &PipelineContext) -> Result<(), ActionError> {
        SiteBuilder::new(self.config.clone(), ctx.root.clone()).build()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "render {} into {}",
            self.config.site.content.display(),
            self.config.site.output.display()
        )
    }
}
