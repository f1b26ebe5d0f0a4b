//! Argument parsing and config-file loading (SPEC_FULL §4.11).

use adt_domain::Config;
use clap::{Parser, Subcommand};

/// A local client and service facade for the ABAP Development Tools REST API.
#[derive(Debug, Parser)]
#[command(name = "adt", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the local debug daemon (default when no subcommand is given).
    ServeDebug,
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Invoke a single Dispatcher operation and print the resulting envelope.
    Run {
        /// Operation name, e.g. "GetSource" or "SearchObject".
        op: String,
        /// JSON object of arguments for the operation.
        #[arg(long, default_value = "{}")]
        args: String,
        /// Use the Expert profile (per-kind aliases, raw atomics) instead of Focused.
        #[arg(long)]
        expert: bool,
        /// Print the raw envelope JSON instead of a human summary.
        #[arg(long)]
        json: bool,
    },
    /// Fetch an object's source and write it to a local file named per
    /// spec.md §6 (`<name>.<kind-extension>`, `/` mapped to `#`).
    Pull {
        /// Object kind, e.g. "program", "class".
        kind: String,
        /// Object name.
        name: String,
        /// Directory to write the file into (default: current directory).
        #[arg(long, default_value = ".")]
        dir: String,
    },
    /// Read a local source file (named per `Pull`'s convention) and write
    /// it back to the ABAP system.
    Push {
        /// Path to the local source file.
        path: String,
        /// "create" or "update".
        #[arg(long)]
        mode: String,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// Load configuration from the path named by `ADT_CONFIG` (default
/// `adt.toml`). A missing file falls back to [`Config::default`], a
/// placeholder that `validate`/`doctor` will immediately flag rather than
/// silently running against an empty `base_url`.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("ADT_CONFIG").unwrap_or_else(|_| "adt.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}
