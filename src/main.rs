use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tanuki_bot::application::errors::BotError;
use tanuki_bot::application::router::MessageRouter;
use tanuki_bot::application::schedule::ScheduleEngine;
use tanuki_bot::application::ticker::{self, HeartbeatWatch};
use tanuki_bot::domain::traits::ChatApi;
use tanuki_bot::infrastructure::config::Config;
use tanuki_bot::infrastructure::database::ScheduleStore;
use tanuki_bot::infrastructure::gateway::GatewayClient;
use tanuki_bot::infrastructure::report::Reporter;
use tanuki_bot::infrastructure::storage::JsonStore;
use tanuki_bot::infrastructure::transport::{self, AppState};
use tanuki_bot::plugins::{self, AuthorizationGate, PluginRegistry};

#[derive(Parser)]
#[command(name = "tanuki-bot")]
#[command(about = "Webhook message router with plugin dispatch and scheduled sends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_bot(cli.config),
        Commands::Version => println!("tanuki-bot v{}", env!("CARGO_PKG_VERSION")),
        Commands::InitConfig => init_config(cli.config),
    }
}

fn init_config(path: String) {
    if std::path::Path::new(&path).exists() {
        eprintln!("Refusing to overwrite existing {path}");
        std::process::exit(1);
    }
    match Config::default().save(&path) {
        Ok(()) => println!("Wrote default config to {path}"),
        Err(e) => {
            eprintln!("Failed to write config: {e}");
            std::process::exit(1);
        }
    }
}

fn run_bot(config_path: String) {
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {config_path}: {e}");
            eprintln!("Run `tanuki-bot init-config` to create a default one.");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    tracing::info!("Starting {}", config.bot.name);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(serve(config)) {
        tracing::error!("Fatal: {e}");
        std::process::exit(1);
    }
}

async fn serve(config: Config) -> Result<(), BotError> {
    let json_store = JsonStore::new(config.bot.data_dir.join("json"))?;
    let store = ScheduleStore::new(config.bot.data_dir.join("sqlite").join("schedule.db"))?;
    let api: Arc<dyn ChatApi> = Arc::new(GatewayClient::new(
        &config.server.post_url,
        &config.server.access_token,
    )?);
    let reporter = Arc::new(Reporter::new(
        config.bot.admin_users.clone(),
        config.bot.admin_groups.clone(),
        api.clone(),
    ));
    let gate = AuthorizationGate::new(json_store);
    let registry = Arc::new(PluginRegistry::new(gate, reporter.clone()));
    let router = Arc::new(MessageRouter::new(
        config.prefix_char(),
        config.bot.blocked_payloads.clone(),
        registry.clone(),
        api.clone(),
    ));
    let offset = config
        .utc_offset()
        .ok_or_else(|| BotError::Internal("invalid timezone offset".to_string()))?;
    let engine = Arc::new(ScheduleEngine::new(
        store,
        config.schedule.reload_ticks,
        offset,
        config.prefix_char(),
        registry.clone(),
        router.clone(),
        api.clone(),
        reporter.clone(),
    )?);
    plugins::register_builtin(&registry, &engine);
    tracing::info!("{} plugins registered", registry.names().len());

    let heartbeat = Arc::new(HeartbeatWatch::new(config.server.heartbeat_watch));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let ticker = ticker::spawn(engine.clone(), heartbeat.clone(), shutdown_rx);

    let state = Arc::new(AppState { router, heartbeat });
    let app = transport::build_router(state);
    let addr = format!(
        "{}:{}",
        config.server.listen_host, config.server.listen_port
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BotError::Network(e.to_string()))?;
    tracing::info!("Listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BotError::Network(e.to_string()))?;

    // Ticker first (bounded wait), then plugin teardown, before any
    // storage is dropped.
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(Duration::from_secs(60), ticker)
        .await
        .is_err()
    {
        tracing::warn!("Ticker did not stop within 60s; continuing shutdown");
    }
    registry.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
