use std::io;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Logs go to stderr so stdout carries only the progress lines. `RUST_LOG`
/// directives take precedence over `level`.
pub fn init_logger(level: LevelFilter) {
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false).without_time())
        .with(filter)
        .init();
}
