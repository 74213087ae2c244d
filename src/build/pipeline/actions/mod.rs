//! Built-in stage actions and their construction from configuration.

mod command;
mod prettify;
mod render;

pub use command::{CommandAction, combined_output, run_captured};
pub use prettify::PrettifyAction;
pub use render::RenderAction;

use super::StageAction;
use crate::config::{ActionConfig, Config};

/// Instantiate the action a stage declares.
pub fn from_config(action: &ActionConfig, config: &Config) -> Box<dyn StageAction> {
    match action {
        ActionConfig::Render => Box::new(RenderAction::new(config.clone())),
        ActionConfig::Prettify(prettify) => Box::new(PrettifyAction::new(
            prettify
                .html_dir
                .clone()
                .unwrap_or_else(|| config.site.output.clone()),
            prettify.command.clone(),
            prettify.accept_exit_codes.clone(),
        )),
        ActionConfig::Command(command) => Box::new(
            CommandAction::new(command.argv().to_vec())
                .accept_exit_codes(command.accept_exit_codes()),
        ),
    }
}
