use serde::{Deserialize, Serialize};

/// Structured logging configuration (SPEC_FULL §4.10).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Passed through to `tracing_subscriber::EnvFilter` when `RUST_LOG`
    /// is unset.
    #[serde(default = "d_filter")]
    pub default_filter: String,
    /// Emit newline-delimited JSON instead of human-readable text. The
    /// `DebugDaemon` always runs with this on regardless of this setting,
    /// since it is a long-running process whose logs are typically
    /// machine-consumed.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: d_filter(),
            json: false,
        }
    }
}

fn d_filter() -> String {
    "info,adt=debug".into()
}
