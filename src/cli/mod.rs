//! CLI command handlers

pub mod commands;

pub use commands::{calculate, functions, import, validate, watch, CalculateOptions};

/// Install the tracing subscriber for CLI runs. `RUST_LOG` overrides the default.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { "sheetmacro=debug" } else { "sheetmacro=warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
