use crate::{
    LintArgs,
    build::pipeline::actions::{combined_output, run_captured},
    commands::Project,
    config::LintTask,
};

pub async fn run(args: &LintArgs) -> Result<(), anyhow::Error> {
    let project = Project::load(args.config_file.as_deref())?;
    let tasks = select_tasks(&project.config.lint, &args.tasks)?;

    if tasks.is_empty() {
        println!("No lint tasks configured");
        return Ok(());
    }

    if tasks.iter().any(|task| task.requires_build) {
        let report = project.pipeline.run(&project.ctx, &[])?;
        if !report.executed.is_empty() {
            println!("Built {}", report.executed.join(", "));
        }
    }

    for task in tasks {
        tracing::info!(task = %task.name, command = %task.command.join(" "), "running lint task");
        let output = run_captured(
            &project.ctx,
            &task.command,
            None,
            &task.accept_exit_codes,
        )
        .map_err(|e| anyhow::anyhow!("lint task '{}' failed: {}", task.name, e))?;

        let text = combined_output(&output);
        if !text.trim().is_empty() {
            println!("{}", text.trim_end());
        }
        println!("{}: ok", task.name);
    }

    Ok(())
}

/// The named tasks in the order given, or every configured task.
fn select_tasks<'a>(
    configured: &'a [LintTask],
    names: &[String],
) -> Result<Vec<&'a LintTask>, anyhow::Error> {
    if names.is_empty() {
        return Ok(configured.iter().collect());
    }
    names
        .iter()
        .map(|name| {
            configured
                .iter()
                .find(|task| &task.name == name)
                .ok_or_else(|| anyhow::anyhow!("unknown lint task: {}", name))
        })
        .collect()
}
