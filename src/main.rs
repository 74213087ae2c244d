use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

mod build;
mod commands;
mod config;
mod logging;
mod util;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// The command to execute
    #[command(subcommand)]
    command: StaticwebCommand,
}

#[derive(Parser)]
struct InitArgs {
    /// The path to initialize the project in
    path: PathBuf,

    /// Whether to create the directory if it doesn't exist
    #[arg(short, long, default_value = "false")]
    create: bool,
}

#[derive(Parser)]
struct BuildArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "staticweb.yaml")]
    config_file: Option<PathBuf>,

    /// Stages to bring up to date (with their prerequisites); all
    /// non-on-demand stages when omitted
    stages: Vec<String>,
}

#[derive(Parser)]
struct StatusArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "staticweb.yaml")]
    config_file: Option<PathBuf>,

    /// Stages to report on; all non-on-demand stages when omitted
    stages: Vec<String>,
}

#[derive(Parser)]
struct ServeArgs {
    /// The address to bind to
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// The port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Open the project in the default browser
    #[arg(short, long, default_value = "false")]
    open: bool,

    /// The path to the configuration file
    #[arg(short, long, default_value = "staticweb.yaml")]
    config_file: Option<PathBuf>,

    /// Re-run the pipeline when stage inputs change
    #[arg(short, long, default_value = "false")]
    watch: bool,
}

#[derive(Parser)]
struct CleanArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "staticweb.yaml")]
    config_file: Option<PathBuf>,

    /// List what would be deleted without deleting it
    #[arg(short = 'n', long, default_value = "false")]
    dry_run: bool,
}

#[derive(Parser)]
struct LintArgs {
    /// The path to the configuration file
    #[arg(short, long, default_value = "staticweb.yaml")]
    config_file: Option<PathBuf>,

    /// Lint tasks to run; all configured tasks when omitted
    tasks: Vec<String>,
}

#[derive(Subcommand)]
enum StaticwebCommand {
    /// Initialize a new project
    Init(InitArgs),

    /// Run the stale stages of the build pipeline
    Build(BuildArgs),

    /// Show which stages are stale and why
    Status(StatusArgs),

    /// Build, then serve the HTML output on a local port
    #[command(visible_aliases = ["dev", "srv"])]
    Serve(ServeArgs),

    /// Delete stage outputs and sentinels
    Clean(CleanArgs),

    /// Run the configured lint tasks
    Lint(LintArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    logging::init(args.verbose);

    match args.command {
        StaticwebCommand::Init(args) => {
            commands::init::run(&args).await?;
        }
        StaticwebCommand::Build(args) => {
            commands::build::run(&args).await?;
        }
        StaticwebCommand::Status(args) => {
            commands::status::run(&args).await?;
        }
        StaticwebCommand::Serve(args) => {
            commands::serve::run(&args).await?;
        }
        StaticwebCommand::Clean(args) => {
            commands::clean::run(&args).await?;
        }
        StaticwebCommand::Lint(args) => {
            commands::lint::run(&args).await?;
        }
    }

    Ok(())
}
