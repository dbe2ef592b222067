//! Diagnostics go to stderr through `tracing`; stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "A11Y_INSPECTOR_LOG";

/// Filter used when `A11Y_INSPECTOR_LOG` is unset or unparseable.
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Installs the global subscriber. Calling it twice is harmless.
pub fn init(verbose: bool, quiet: bool, color: bool) {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(verbose, quiet)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(verbose)
        .try_init();
}
