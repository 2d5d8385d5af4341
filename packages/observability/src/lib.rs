//! # Observability
//!
//! Centralized logging layer for dbpanel.
//!
//! Services call `observability::init_with_config()` once at startup and use the standard
//! `tracing` macros everywhere else. They never decide where logs go.
//!
//! ## JSONL file
//!
//! Every event is written as one structured JSON line to
//! `~/.dbpanel/logs/dbpanel.jsonl`:
//!
//! - `tail -f ~/.dbpanel/logs/dbpanel.jsonl | jq` for pretty JSON
//! - `lnav ~/.dbpanel/logs/dbpanel.jsonl` for interactive exploration
//!
//! Fields whose names look like credentials (`password`, `token`,
//! `authorization`, ...) are redacted before they reach the file. The panel
//! handles bearer tokens that are equal to stored secrets, so this is not
//! optional.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "dbpanel".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!     tracing::info!("ready");
//! }
//! ```

mod file_sink;
mod json_layer;
mod redact;

use std::path::PathBuf;

pub use json_layer::LogEntry;
pub use redact::{is_sensitive_key, redact_value, REDACTED};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "dbpanel", "create-admin").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.dbpanel/logs/dbpanel.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize the observability layer with custom configuration.
///
/// Calling this more than once is harmless: the first subscriber wins.
pub fn init_with_config(config: LogConfig) {
    file_sink::init_file_subscriber(&config);
}
