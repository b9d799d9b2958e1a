//! Tracing setup shared by the CLI and tests.
//!
//! Log lines go to stderr so stdout stays parseable for `stats --json`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset and output should stay quiet
pub const QUIET_FILTER: &str = "warn";

/// Filter used for `--verbose`: debug for our crates, info for the rest
pub const VERBOSE_FILTER: &str = "gluco_core=debug,gluco=debug,info";

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `verbose`. Calling this more than once is a no-op.
pub fn init(verbose: bool) {
    init_with_filter(if verbose { VERBOSE_FILTER } else { QUIET_FILTER })
}

/// Install the global subscriber with an explicit default filter directive
pub fn init_with_filter(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Route logs into the test harness output
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("gluco_core=debug"))
        .try_init();
}
