use crate::{StatusArgs, commands::Project};

pub async fn run(args: &StatusArgs) -> Result<(), anyhow::Error> {
    let project = Project::load(args.config_file.as_deref())?;

    let plan = project.pipeline.plan(&project.ctx, &args.stages)?;
    let width = plan.iter().map(|p| p.name.len()).max().unwrap_or(0);

    for stage in &plan {
        println!(
            "{:width$}  {:24}  {}",
            stage.name,
            stage.status.to_string(),
            stage.description,
            width = width
        );
    }

    let stale = plan.iter().filter(|p| p.status.is_stale()).count();
    println!("\n{} of {} stage(s) would run", stale, plan.len());

    Ok(())
}
