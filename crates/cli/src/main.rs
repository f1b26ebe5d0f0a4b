mod cli;
mod config_cmd;
mod credentials;
mod doctor;
mod files;
mod logging;

use std::sync::Arc;

use adt_debug::DebugCoordinator;
use adt_dispatcher::{Dispatcher, Profile};
use adt_domain::config::Severity;
use adt_domain::Config;
use adt_transport::Transport;
use anyhow::Context;
use clap::Parser;

use cli::{Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = Cli::parse();

    match parsed.command {
        None | Some(Command::ServeDebug) => {
            let (config, _config_path) = cli::load_config()?;
            logging::init(&config.logging, true);
            serve_debug(config).await
        }
        Some(Command::Doctor) => {
            let (config, config_path) = cli::load_config()?;
            logging::init(&config.logging, false);
            let passed = doctor::run(&config, &config_path).await?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config()?;
            let valid = config_cmd::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = cli::load_config()?;
            config_cmd::show(&config);
            Ok(())
        }
        Some(Command::Run { op, args, expert, json }) => {
            let (config, _config_path) = cli::load_config()?;
            logging::init(&config.logging, false);
            run_operation(config, &op, &args, expert, json).await
        }
        Some(Command::Pull { kind, name, dir }) => {
            let (config, _config_path) = cli::load_config()?;
            logging::init(&config.logging, false);
            pull(config, &kind, &name, &dir).await
        }
        Some(Command::Push { path, mode }) => {
            let (config, _config_path) = cli::load_config()?;
            logging::init(&config.logging, false);
            push(config, &path, &mode).await
        }
        Some(Command::Version) => {
            println!("adt-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn build_transport(config: &Config) -> anyhow::Result<Transport> {
    let password = if config.credential.session_cookie.is_some() {
        None
    } else {
        Some(credentials::resolve_password(&config.credential).context("resolving credential")?)
    };
    Transport::new(config, password).context("constructing Transport")
}

/// Start the local debug daemon: a `DebugCoordinator` fronted by the
/// `adt-debug` axum router, bound to `config.daemon.host:port`.
async fn serve_debug(config: Config) -> anyhow::Result<()> {
    tracing::info!("adt-cli starting debug daemon");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            Severity::Warning => tracing::warn!("config: {issue}"),
            Severity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == Severity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == Severity::Error).count()
        );
    }

    let transport = Arc::new(build_transport(&config)?);
    let policy = config.safety.clone();
    let coordinator = Arc::new(DebugCoordinator::new(transport, policy));
    let app = adt_debug::daemon::router(coordinator);

    let addr = format!("{}:{}", config.daemon.host, config.daemon.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, "debug daemon listening");

    axum::serve(listener, app).await.context("axum server error")?;
    Ok(())
}

/// Build a `Dispatcher` and run a single operation, rendering the
/// resulting envelope either as raw JSON or a short human summary
/// (SPEC_FULL §4.13). This is the only crate allowed to `println!`.
async fn run_operation(
    config: Config,
    op: &str,
    args: &str,
    expert: bool,
    json_output: bool,
) -> anyhow::Result<()> {
    let args: serde_json::Value =
        serde_json::from_str(args).with_context(|| format!("parsing --args as JSON: {args}"))?;

    let transport = Arc::new(build_transport(&config)?);
    let policy = config.safety.clone();
    let profile = if expert { Profile::Expert } else { Profile::Focused };
    let dispatcher = Dispatcher::new(transport, policy, profile);

    let envelope = dispatcher.dispatch(op, args).await;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else if envelope.success {
        println!("ok");
        if let Some(data) = &envelope.data {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
    } else {
        println!(
            "error [{}]: {}",
            envelope.error_kind.unwrap_or("unknown"),
            envelope.error.as_deref().unwrap_or("")
        );
    }

    if !envelope.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Fetch an object's source via `GetSource` and write it to a local file
/// named per spec.md §6's on-disk convention.
async fn pull(config: Config, kind: &str, name: &str, dir: &str) -> anyhow::Result<()> {
    let object_kind = files::parse_kind(kind)?;
    let transport = Arc::new(build_transport(&config)?);
    let dispatcher = Dispatcher::new(transport, config.safety.clone(), Profile::Focused);

    let envelope = dispatcher
        .dispatch("GetSource", serde_json::json!({"kind": kind, "name": name}))
        .await;
    if !envelope.success {
        anyhow::bail!(
            "GetSource failed [{}]: {}",
            envelope.error_kind.unwrap_or("unknown"),
            envelope.error.as_deref().unwrap_or("")
        );
    }
    let source = envelope
        .data
        .as_ref()
        .and_then(|d| d.get("source"))
        .and_then(|s| s.as_str())
        .context("GetSource response carried no source field")?;

    let file_name = files::local_filename(object_kind, name);
    let path = std::path::Path::new(dir).join(&file_name);
    std::fs::write(&path, source).with_context(|| format!("writing {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

/// Read a local source file (named per [`pull`]'s convention) and push it
/// back via `WriteSource`.
async fn push(config: Config, path: &str, mode: &str) -> anyhow::Result<()> {
    let file_name = std::path::Path::new(path)
        .file_name()
        .and_then(|f| f.to_str())
        .with_context(|| format!("{path} has no file name"))?;
    let (kind, name) = files::parse_local_filename(file_name)?;
    let source = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;

    let transport = Arc::new(build_transport(&config)?);
    let dispatcher = Dispatcher::new(transport, config.safety.clone(), Profile::Focused);

    let kind_wire_name = serde_json::to_value(kind)?
        .as_str()
        .map(str::to_string)
        .context("serializing object kind")?;
    let envelope = dispatcher
        .dispatch(
            "WriteSource",
            serde_json::json!({
                "kind": kind_wire_name,
                "name": name,
                "mode": mode,
                "source": source,
            }),
        )
        .await;

    if !envelope.success {
        anyhow::bail!(
            "WriteSource failed [{}]: {}",
            envelope.error_kind.unwrap_or("unknown"),
            envelope.error.as_deref().unwrap_or("")
        );
    }
    println!("pushed {path}");
    Ok(())
}
