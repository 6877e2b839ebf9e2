use std::env;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout carries the IPC stream.
pub fn init_logging(level: &str) {
    let filter = match env::var("RUST_LOG") {
        Ok(rust_log) => EnvFilter::new(rust_log),
        Err(_) => EnvFilter::new(level),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
