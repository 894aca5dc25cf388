use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use rewards::config::RewardsConfig;
use rewards::RewardsModule;
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

mod request_id;
mod web;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const MEMORY_DSN: &str = "sqlite::memory:";

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if is_memory_dsn(dsn) {
        return Ok(MEMORY_DSN.to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    // sqlx refuses to create a missing file unless asked to
    match query {
        Some(q) => {
            out.push('?');
            out.push_str(q);
        }
        None => out.push_str("?mode=rwc"),
    }
    Ok(out)
}

fn is_memory_dsn(dsn: &str) -> bool {
    dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
}

/// EcoCycle Server - points, rewards and progression engine
#[derive(Parser)]
#[command(name = "ecocycle-server")]
#[command(about = "EcoCycle Server - points, rewards and progression engine")]
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

    /// Use an in-memory SQLite database
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
    /// Apply database migrations and exit
    Migrate,
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

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("EcoCycle Server starting");
    tracing::debug!("Effective server configuration: {:?}", config.server);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config, args),
        Commands::Migrate => migrate(config, args).await,
    }
}

/// Detect DB backend from URL scheme (sqlite/postgres).
fn detect_from_dsn(cfg: &DatabaseConfig) -> Result<&'static str> {
    let raw = cfg.url.trim().to_owned();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }

    let url = Url::parse(&raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;

    match url.scheme() {
        "sqlite" | "sqlite3" => Ok("sqlite"),
        "postgres" | "postgresql" => Ok("postgres"),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

/// Final DSN for the configured database; `--mock` swaps in in-memory SQLite.
fn resolve_dsn(config: &AppConfig, args: &CliArgs) -> Result<String> {
    if args.mock {
        return Ok(MEMORY_DSN.to_string());
    }
    let db_config = config.database.as_ref().ok_or_else(|| {
        anyhow!("No database configuration found (set `database.url` or pass --mock)")
    })?;
    let backend = detect_from_dsn(db_config)?;
    let dsn = db_config.url.trim();
    if backend == "sqlite" && dsn.starts_with("sqlite://") {
        // Relative sqlite paths live under home_dir, not the cwd
        return absolutize_sqlite_dsn(dsn, Path::new(&config.server.home_dir), true);
    }
    Ok(dsn.to_string())
}

async fn connect_database(config: &AppConfig, args: &CliArgs) -> Result<DatabaseConnection> {
    let dsn = resolve_dsn(config, args)?;
    let defaults = config.database.clone();
    let max_conns = defaults.as_ref().and_then(|d| d.max_conns).unwrap_or(10);
    let busy_timeout = Duration::from_millis(
        defaults
            .as_ref()
            .and_then(|d| d.busy_timeout_ms)
            .unwrap_or(5000) as u64,
    );

    let mut opts = ConnectOptions::new(dsn.clone());
    opts.acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    if is_memory_dsn(&dsn) {
        // Every pooled connection would get its own empty in-memory database
        opts.max_connections(1)
            .min_connections(1)
            .max_lifetime(Duration::from_secs(u32::MAX as u64));
    } else {
        opts.max_connections(max_conns);
    }
    if dsn.starts_with("sqlite") {
        opts.map_sqlx_sqlite_opts(move |o| o.busy_timeout(busy_timeout));
    }

    tracing::info!("Connecting to database: {}", dsn);
    let db = Database::connect(opts)
        .await
        .with_context(|| format!("failed to connect to {dsn}"))?;
    tracing::info!("Connected DB backend: {:?}", db.get_database_backend());
    Ok(db)
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");
    let rewards_cfg: RewardsConfig = config.module_config("rewards")?;

    let db = connect_database(&config, &args).await?;
    RewardsModule::migrate(&db).await?;
    let rewards = RewardsModule::init(&rewards_cfg, db)?;

    let router = web::build_router(&config.server, &rewards);

    let host = config.server.host.as_str();
    let port = config.server.port;
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind address {host}:{port}"))?;
    tracing::info!("HTTP server bound on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow!(e))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("HTTP server shutting down gracefully");
}

async fn migrate(config: AppConfig, args: CliArgs) -> Result<()> {
    let db = connect_database(&config, &args).await?;
    RewardsModule::migrate(&db).await?;
    println!("Migrations applied");
    Ok(())
}

fn check_config(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    if !args.mock {
        if let Some(db) = config.database.as_ref() {
            detect_from_dsn(db)?;
        }
    }

    let rewards_cfg: RewardsConfig = config.module_config("rewards")?;
    rewards_cfg.service_config()?;
    rewards_cfg.spin_resolver()?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}
