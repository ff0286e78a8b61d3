//! # sym
//!
//! Command-line entry point. `sym serve` runs the protocol server over stdio
//! or HTTP; the other subcommands run one tool call in-process and print
//! its result.

#![deny(unsafe_code)]

mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sym_llm::ClientFactory;
use sym_logging::{LogFormat, LogLevel};
use sym_rpc::{MethodRegistry, RpcContext, register_all};
use sym_server::{HttpServer, ShutdownCoordinator, StdioTransport};
use sym_settings::{SymSettings, Transport, load_settings_from_path};

/// Policy conversion and validation engine.
#[derive(Parser, Debug)]
#[command(name = "sym", version, about = "Policy conversion and validation engine")]
struct Cli {
    /// Repository root.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Settings file (defaults to `<root>/.sym/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Act as this role instead of looking it up.
    #[arg(long, global = true)]
    role: Option<String>,

    /// Log level (overrides settings).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the protocol server.
    Serve {
        /// `stdio` or `http` (overrides settings).
        #[arg(long, value_parser = parse_transport)]
        transport: Option<Transport>,
        /// HTTP bind host.
        #[arg(long)]
        host: Option<String>,
        /// HTTP bind port.
        #[arg(long)]
        port: Option<u16>,
        /// Route inference through the stdio host.
        #[arg(long)]
        host_sampling: bool,
    },
    /// Compile the user policy into the code policy and linter configs.
    Convert,
    /// Validate changed files.
    Validate {
        /// Only staged changes.
        #[arg(long)]
        staged: bool,
        /// Limit to these files or directories.
        files: Vec<String>,
    },
    /// List rule conventions.
    Conventions {
        /// Category filter.
        #[arg(long)]
        category: Option<String>,
        /// Language filter.
        #[arg(long = "language")]
        languages: Vec<String>,
    },
    /// List categories.
    Categories,
    /// Import conventions from a document.
    Import {
        /// Document path.
        path: PathBuf,
        /// `append` or `clear`.
        #[arg(long, default_value = "append")]
        mode: String,
    },
    /// Show validation history.
    History {
        /// Newest N records.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Call any protocol method with JSON params.
    Call {
        /// Method name.
        method: String,
        /// Params object as JSON.
        params: Option<String>,
    },
}

fn parse_transport(s: &str) -> Result<Transport, String> {
    match s.to_lowercase().as_str() {
        "stdio" => Ok(Transport::Stdio),
        "http" => Ok(Transport::Http),
        other => Err(format!("unknown transport '{other}' (expected stdio or http)")),
    }
}

fn settings_path(cli: &Cli) -> PathBuf {
    cli.settings
        .clone()
        .unwrap_or_else(|| cli.root.join(".sym").join("settings.json"))
}

fn load_settings(cli: &Cli) -> Result<SymSettings> {
    let path = settings_path(cli);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings: {}", path.display()))?;
    if let Some(role) = &cli.role {
        settings.access.role.clone_from(role);
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    if let Command::Serve {
        transport,
        host,
        port,
        host_sampling,
    } = &cli.command
    {
        if let Some(t) = transport {
            settings.server.transport = *t;
        }
        if let Some(h) = host {
            settings.server.host.clone_from(h);
        }
        if let Some(p) = port {
            settings.server.port = *p;
        }
        settings.server.host_sampling |= *host_sampling;
    }
    Ok(settings)
}

fn build_registry(settings: &SymSettings) -> MethodRegistry {
    let mut registry = MethodRegistry::new()
        .with_timeout(Duration::from_secs(settings.server.handler_timeout_secs));
    register_all(&mut registry);
    registry
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize()
        .with_context(|| format!("Repository root not found: {}", root.display()))
}

async fn serve(root: PathBuf, settings: SymSettings, registry: MethodRegistry) -> Result<()> {
    let shutdown = ShutdownCoordinator::new();
    let _signals = shutdown.listen_for_signals();
    let server = settings.server.clone();
    let ctx = RpcContext::new(root, settings);

    match server.transport {
        Transport::Stdio => {
            let transport = StdioTransport::new();
            let ctx = if server.host_sampling {
                tracing::info!("inference routed through the host session");
                let clients = ClientFactory::new(ctx.settings.llm.clone())
                    .with_session(transport.host_session());
                ctx.with_clients(clients)
            } else {
                ctx
            };
            transport.serve_stdio(registry, ctx, shutdown.token()).await?;
        }
        Transport::Http => {
            if server.host_sampling {
                tracing::warn!(
                    "host sampling needs the stdio transport, using the standalone backend"
                );
            }
            let http = HttpServer::new(registry, ctx);
            tracing::info!(
                host = %server.host,
                port = server.port,
                methods = http.registry().methods().len(),
                "starting http server"
            );
            http.serve(&server.host, server.port, shutdown.token()).await?;
        }
    }
    shutdown.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    sym_logging::init_subscriber(
        LogLevel::from_str_lossy(&settings.logging.level),
        LogFormat::from_str_lossy(&settings.logging.format),
    );

    let root = resolve_root(&cli.root)?;
    let registry = build_registry(&settings);

    if matches!(cli.command, Command::Serve { .. }) {
        serve(root, settings, registry).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let (method, params) = commands::request_for(&cli.command)?;
    let ctx = RpcContext::new(root, settings);
    let outcome = commands::run(&registry, &ctx, &method, params).await;
    Ok(commands::report(&outcome))
}
