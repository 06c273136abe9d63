// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use panssari::bootstrap;
use panssari::cli;
use panssari::config::AppConfig;
use panssari::health::HealthChecker;
use panssari::ledger::ComplianceLedger;
use panssari::server::{run_server, AppState};
use panssari::session::{SessionConfig, SessionRegistry};

#[derive(Parser)]
#[command(
    name = "panssari",
    version,
    about = "AI-assisted DISA STIG compliance hardening for RHEL 9"
)]
struct Cli {
    /// Path to a YAML or JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an interactive hardening session with in-process engines
    Run(RunArgs),
    /// Host the orchestrator HTTP API
    Serve(ServeArgs),
    /// Drive a session on a remote orchestrator
    Remote(RemoteArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Show changes without applying
    #[arg(long)]
    dry_run: bool,

    /// Scan and report only
    #[arg(long)]
    scan_only: bool,

    /// Parse an existing scan results XML instead of scanning
    #[arg(long)]
    results: Option<PathBuf>,

    /// SCAP profile (e.g. stig, cis)
    #[arg(long)]
    profile: Option<String>,

    /// Severity floor: CAT_I | CAT_II | CAT_III | ALL
    #[arg(long)]
    min_severity: Option<String>,

    /// Auto-apply CAT III fixes without an approval gate
    #[arg(long)]
    auto_cat3: bool,

    /// Override the LLM model
    #[arg(long)]
    model: Option<String>,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address override
    #[arg(long)]
    host: Option<String>,

    /// Port override
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args)]
struct RemoteArgs {
    /// Orchestrator URL (defaults to ORCHESTRATOR_URL or localhost)
    #[arg(long)]
    api: Option<String>,

    /// Show changes without applying
    #[arg(long)]
    dry_run: bool,

    /// Scan and report only
    #[arg(long)]
    scan_only: bool,

    /// SCAP profile (e.g. stig, cis)
    #[arg(long)]
    profile: Option<String>,

    /// Severity floor: CAT_I | CAT_II | CAT_III | ALL
    #[arg(long)]
    min_severity: Option<String>,

    /// Auto-apply CAT III fixes without an approval gate
    #[arg(long)]
    auto_cat3: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("panssari-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

fn session_config_from(
    config: &AppConfig,
    profile: Option<String>,
    min_severity: Option<String>,
    dry_run: bool,
    auto_cat3: bool,
    results: Option<PathBuf>,
    scan_only: bool,
) -> Result<SessionConfig> {
    let min_severity = match min_severity {
        Some(raw) => raw.parse().map_err(anyhow::Error::msg)?,
        None => config.scanner.min_severity,
    };
    Ok(SessionConfig {
        profile: profile.unwrap_or_else(|| config.scanner.profile.clone()),
        min_severity,
        dry_run,
        auto_apply_low_severity: auto_cat3,
        results_xml: results,
        scan_only,
    })
}

async fn async_main(cli: Cli) -> Result<()> {
    cli::print_banner();

    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => {
            if let Some(model) = args.model {
                config.analyst.model = Some(model);
            }
            let session_config = session_config_from(
                &config,
                args.profile,
                args.min_severity,
                args.dry_run,
                args.auto_cat3,
                args.results,
                args.scan_only,
            )?;
            cli::run_local(config, session_config).await
        }
        Command::Serve(args) => {
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }

            let config = Arc::new(config);
            let analyst = bootstrap::build_analyst(&config)?;
            let engines = bootstrap::build_local_engines(&config, Arc::clone(&analyst))?;
            let ledger = Arc::new(ComplianceLedger::load(&config.scanner.reports_dir)?);
            let health = Arc::new(HealthChecker::new(Arc::clone(&config), analyst));

            info!(
                profile = %config.scanner.profile,
                reports = ?config.scanner.reports_dir,
                "Orchestrator starting"
            );

            run_server(AppState {
                config,
                registry: Arc::new(SessionRegistry::new()),
                ledger,
                engines,
                health,
            })
            .await
        }
        Command::Remote(args) => {
            let api_url = args
                .api
                .or_else(|| std::env::var("ORCHESTRATOR_URL").ok())
                .unwrap_or_else(|| "http://localhost:8080".to_string());
            let session_config = session_config_from(
                &config,
                args.profile,
                args.min_severity,
                args.dry_run,
                args.auto_cat3,
                None,
                args.scan_only,
            )?;
            cli::run_remote(&api_url, session_config).await
        }
    }
}
