use crate::{BuildArgs, commands::Project};

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let project = Project::load(args.config_file.as_deref())?;

    let report = project.pipeline.run(&project.ctx, &args.stages)?;

    if report.executed.is_empty() {
        println!("Everything is up to date");
    } else {
        println!(
            "Ran {} stage(s): {}",
            report.executed.len(),
            report.executed.join(", ")
        );
    }
    if !report.skipped.is_empty() {
        println!("Up to date: {}", report.skipped.join(", "));
    }

    Ok(())
}
