use std::net::SocketAddr;

use axum::Router;
use tower_http::services::ServeDir;

use crate::{
    ServeArgs,
    build::{ChangeKind, FileWatcher, PathClassifier, WatchEvent, WatchPaths},
    commands::Project,
};

pub async fn run(args: &ServeArgs) -> Result<(), anyhow::Error> {
    let project = Project::load(args.config_file.as_deref())?;

    // Build the site first
    println!("Building site...");
    let report = project.pipeline.run(&project.ctx, &[])?;
    println!(
        "Ran {} stage(s), {} up to date",
        report.executed.len(),
        report.skipped.len()
    );

    let output_dir = project.output_dir();

    // Set up file watcher if enabled
    let _watcher_handle = if args.watch {
        let watch_paths =
            WatchPaths::from_pipeline(&project.pipeline, &project.ctx, &project.config_path);

        match FileWatcher::new(&project.config.dev.watch, PathClassifier::new(watch_paths)) {
            Ok(watcher) => {
                println!("Watching for changes...");
                Some(tokio::task::spawn_blocking(move || {
                    watch_loop(watcher, project)
                }))
            }
            Err(e) => {
                eprintln!("Warning: Failed to start file watcher: {}", e);
                None
            }
        }
    } else {
        None
    };

    // Create the static file server
    let serve_dir = ServeDir::new(&output_dir).append_index_html_on_directories(true);
    let app = Router::new().fallback_service(serve_dir);

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;

    // Determine the URL to display
    let display_host = if args.bind == "0.0.0.0" {
        "localhost"
    } else {
        &args.bind
    };
    let url = format!("http://{}:{}", display_host, args.port);

    println!("\nServing {} at {}", output_dir.display(), url);
    println!("Press Ctrl+C to stop\n");

    // Open browser if requested
    if args.open
        && let Err(e) = open::that(&url)
    {
        eprintln!("Failed to open browser: {}", e);
    }

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Re-run the pipeline for every batch of changes. A changed config file
/// reloads the stage declarations before running.
fn watch_loop(watcher: FileWatcher, mut project: Project) {
    while let Some(event) = watcher.recv() {
        match event {
            WatchEvent::FilesChanged(changes) => {
                println!("\nDetected {} change(s), rebuilding...", changes.len());

                if changes.contains(&ChangeKind::Config) {
                    match Project::load(Some(project.config_path.as_path())) {
                        Ok(reloaded) => {
                            tracing::info!("reloaded configuration");
                            project = reloaded;
                        }
                        Err(e) => {
                            eprintln!("Config error: {:#}", e);
                            continue;
                        }
                    }
                }

                match project.pipeline.run(&project.ctx, &[]) {
                    Ok(report) if report.executed.is_empty() => {
                        println!("Everything is up to date");
                    }
                    Ok(report) => println!("Rebuilt {}", report.executed.join(", ")),
                    Err(e) => eprintln!("Build error: {}", e),
                }
            }
            WatchEvent::Error(e) => {
                eprintln!("Watch error: {}", e);
            }
        }
    }
}
