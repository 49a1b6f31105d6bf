//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level
//! - Events go to stderr; stdout is left for command output

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a configured level.
pub fn default_directive(level: &str) -> String {
    format!("response_headers={level},tower_http={level}")
}

/// Initialize the global tracing subscriber. Later calls are ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
