//! Logging setup and log-safe formatting helpers.
//!
//! Logs go to stderr so an embedding process keeps stdout for its own protocol.

use crate::constants::{DEFAULT_LOG_FILTER, LOG_QUERY_TRUNCATE_LENGTH};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with stderr output.
///
/// Panics if a global subscriber is already installed; use
/// [`try_init_logging`] when that may be the case.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

/// Initialize the tracing subscriber unless one is already installed.
///
/// Returns `true` if this call installed it.
pub fn try_init_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .is_ok()
}

fn env_filter() -> EnvFilter {
    std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Truncate a query for logging, on a character boundary.
pub fn truncate_for_log(query: &str) -> String {
    truncate_chars(query, LOG_QUERY_TRUNCATE_LENGTH)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
