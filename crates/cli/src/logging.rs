//! Structured logging setup (SPEC_FULL §4.10). `serve-debug` is a
//! long-running process whose logs are machine-consumed, so it always
//! emits newline-delimited JSON regardless of `logging.json`; one-shot
//! subcommands default to human-readable text unless the config opts in.

use adt_domain::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

pub fn init(logging: &LoggingConfig, daemon: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.default_filter.clone()));

    if daemon || logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
