use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use accounts::{Accounts, AccountsConfig};
use apikit::ApiSettings;
use runtime::{AppConfig, CliArgs};

mod app;
mod db;
mod http_trace;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// webBase Server - user records behind a generic REST API
#[derive(Parser)]
#[command(name = "webbase-server")]
#[command(about = "webBase Server - user records behind a generic REST API")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // home_dir is normalized and created by the loader
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("webBase Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config).await,
    }
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    let settings: ApiSettings = config.module_config("api")?;
    let accounts_cfg: AccountsConfig = config.module_config("accounts")?;

    let db_config = match config.database.clone() {
        Some(db) => db,
        None if args.mock => runtime::DatabaseConfig {
            url: db::MEMORY_DSN.to_string(),
            max_conns: None,
            busy_timeout_ms: None,
        },
        None => anyhow::bail!("No database configuration found (use --mock for an in-memory database)"),
    };
    let conn = db::connect(&db_config, Path::new(&config.server.home_dir), args.mock).await?;

    let accounts = Accounts::new(conn, accounts_cfg);
    accounts.migrate().await?;

    if settings.debug {
        tracing::warn!("API debug mode is on: error bodies carry tracebacks");
    }
    let router = app::build_router(&accounts, Arc::new(settings), config.server.timeout_sec);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.server.host, config.server.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}

async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    config.module_config::<ApiSettings>("api")?;
    config.module_config::<AccountsConfig>("accounts")?;
    if let Some(db_config) = &config.database {
        db::check_backend(db_config)?;
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}
