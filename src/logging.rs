use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes console logging on stderr.
///
/// Stdout carries tables and JSON, so log lines must stay off it. `RUST_LOG`
/// takes precedence over the verbosity flags.
pub fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("saleyard_reports={default_level}")));

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();
}
