use std::path::{Path, PathBuf};

use crate::{CleanArgs, commands::Project};

pub async fn run(args: &CleanArgs) -> Result<(), anyhow::Error> {
    let project = Project::load(args.config_file.as_deref())?;

    if !args.dry_run {
        // Covers a stamp directory configured outside the project root
        project.pipeline.invalidate_all(&project.ctx)?;
    }

    for path in removal_targets(&project) {
        if args.dry_run {
            println!("Would delete {}", path.display());
        } else {
            if path.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
            println!("Deleted {}", path.display());
        }
    }

    Ok(())
}

/// Existing stage outputs plus the sentinel directory, restricted to paths
/// strictly inside the project root.
fn removal_targets(project: &Project) -> Vec<PathBuf> {
    let root = &project.ctx.root;
    let mut targets: Vec<PathBuf> = project
        .pipeline
        .outputs()
        .iter()
        .map(|output| project.ctx.resolve(output))
        .chain(std::iter::once(project.ctx.stamp_dir.clone()))
        .filter(|path| is_strictly_inside(path, root))
        .filter(|path| path.exists())
        .collect();

    targets.sort();
    targets.dedup();
    // A nested output disappears with its parent
    let parents = targets.clone();
    targets.retain(|path| !parents.iter().any(|p| p != path && path.starts_with(p)));
    targets
}

fn is_strictly_inside(path: &Path, root: &Path) -> bool {
    match path.strip_prefix(root) {
        Ok(rest) => rest
            .components()
            .any(|c| matches!(c, std::path::Component::Normal(_)))
            && !rest
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir)),
        Err(_) => false,
    }
}
