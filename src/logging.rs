//! Diagnostic logging setup.
//!
//! Diagnostics go to stderr through `tracing`; command summaries are
//! printed to stdout by the commands themselves.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows the number of
/// `-v` flags (info, debug, trace).
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "staticweb=info",
        1 => "staticweb=debug",
        _ => "staticweb=trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
