//! Logging initialization for the panel.
//!
//! Thin wrapper over the observability package: structured JSONL to
//! `~/.dbpanel/logs/dbpanel.jsonl` plus compact stderr output.

use observability::LogConfig;
use std::path::PathBuf;

/// Initialize logging for a panel process.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// ```ignore
/// init_logging("dbpanel", "info", None);
/// tracing::info!("panel started");
/// ```
pub fn init_logging(service_name: &str, level: &str, log_path: Option<PathBuf>) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).to_string().to_ascii_lowercase(),
        log_path,
        also_stderr: true,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
