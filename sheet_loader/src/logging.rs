//! Tracing setup for the CLI.
//!
//! Logs go to stderr so that JSON echoed to stdout stays machine-readable.
//! `RUST_LOG` overrides the default filter.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> String {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    format!("sheet_loader={}", level)
}

/// Install the global subscriber. Call once at startup.
pub fn init_tracing(verbose: bool) -> Result<(), TracingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(verbose))?,
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .compact()
            .with_target(verbose)
            .with_writer(std::io::stderr),
    );
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
