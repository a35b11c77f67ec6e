use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

use cadence_core::{AutomationId, ScheduledEmailId};
use cadence_email::EmailProvider;
use cadence_reactor::{Reactor, RunSummary};
use cadence_rules::{GeocodeCache, GeocoderClient};
use cadence_server::api::{AppState, router};
use cadence_server::config::CadenceConfig;
use cadence_server::memory_datasource::MemoryDataSource;
use cadence_store::MemoryScheduledEmailStore;

/// Cadence marketing-email automation engine: HTTP server and scheduler CLI.
#[derive(Parser, Debug)]
#[command(name = "cadence-server", about = "Standalone HTTP server for the Cadence email automation engine")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "automail.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a single scheduler RPC action against the configured store and exit.
    RunOnce {
        /// One of daily, refresh, verify, send, process, activate, deactivate.
        action: String,
        #[arg(long)]
        automation_id: Option<Uuid>,
        #[arg(long)]
        scheduled_email_id: Option<Uuid>,
        #[arg(long)]
        account_offset: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config);
            std::process::exit(2);
        }
    };

    let store = MemoryScheduledEmailStore::new();
    let datasource = MemoryDataSource::new();
    let email_config = config.email_provider_config();
    let email_provider = EmailProvider::new(&email_config);
    let geocodes = GeocodeCache::new();
    let geocoder = GeocoderClient::new(
        config
            .provider
            .base_url
            .clone()
            .unwrap_or_else(|| "https://maps.googleapis.com/maps/api/geocode/json".to_string()),
        config.geocoder_api_key(),
    );
    let reactor_config = config.reactor_config();

    if let Some(Commands::RunOnce { action, automation_id, scheduled_email_id, account_offset }) = cli.command {
        let reactor = Reactor {
            store: &store,
            data: &datasource,
            verifier_data: &datasource,
            sender_data: &datasource,
            email_provider: &email_provider,
            email_config: &email_config,
            geocodes: &geocodes,
            geocoder: &geocoder,
            config: &reactor_config,
        };

        let summary = run_once(
            &reactor,
            &action,
            automation_id.map(AutomationId::from),
            scheduled_email_id.map(ScheduledEmailId::from),
            account_offset,
        )
        .await;

        let exit_code = if summary.errors.is_empty() { 0 } else { 1 };
        println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string()));
        std::process::exit(exit_code);
    }

    let state = AppState {
        store: Arc::new(store),
        datasource: Arc::new(datasource),
        email_provider: Arc::new(email_provider),
        email_config: Arc::new(email_config),
        geocodes: Arc::new(geocodes),
        geocoder: Arc::new(geocoder),
        reactor_config: Arc::new(reactor_config),
    };
    let app = router(state);

    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("failed to bind {addr}: {e}");
            std::process::exit(2);
        }
    };
    info!(address = %addr, "cadence-server listening");

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        eprintln!("server error: {e}");
        std::process::exit(2);
    }

    info!("cadence-server shut down");
}

fn load_config(path: &str) -> Result<CadenceConfig, Box<dyn std::error::Error>> {
    if Path::new(path).exists() {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        info!(path, "config file not found, using defaults");
        Ok(toml::from_str("")?)
    }
}

/// Dispatch one scheduler RPC action for the `run-once` subcommand (§6 "CLI
/// / exit codes"), mirroring `api::run`'s action matching without the HTTP
/// request/response wrapping.
async fn run_once(
    reactor: &Reactor<'_>,
    action: &str,
    automation_id: Option<AutomationId>,
    scheduled_email_id: Option<ScheduledEmailId>,
    account_offset: Option<usize>,
) -> RunSummary {
    match action {
        "daily" => reactor.daily().await,
        "refresh" => match automation_id {
            Some(id) => reactor.refresh(id, account_offset.unwrap_or(0)).await,
            None => error_summary("refresh", "--automation-id is required"),
        },
        "verify" => reactor.verify().await,
        "send" => match scheduled_email_id {
            Some(id) => reactor.send_specific(id).await,
            None => reactor.send().await,
        },
        "process" => reactor.process().await,
        "activate" => match automation_id {
            Some(id) => reactor_result(reactor.activate(id).await),
            None => error_summary("activate", "--automation-id is required"),
        },
        "deactivate" => match automation_id {
            Some(id) => reactor_result(reactor.deactivate(id).await),
            None => error_summary("deactivate", "--automation-id is required"),
        },
        other => error_summary(other, &format!("unknown action {other:?}")),
    }
}

fn error_summary(action: &str, message: &str) -> RunSummary {
    let mut summary = RunSummary::for_action(action);
    summary.errors.push(message.to_string());
    summary
}

fn reactor_result(result: Result<RunSummary, cadence_reactor::ReactorError>) -> RunSummary {
    match result {
        Ok(summary) => summary,
        Err(e) => error_summary("error", &e.to_string()),
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
