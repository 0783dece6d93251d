use std::path::PathBuf;

use axum::routing::get;
use clap::Parser;
use egglink_prime::{
    AppState, api,
    config::Config,
    forward::Forwarder,
    store::{DeviceStore, InMemoryDeviceStore},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "egglink-prime")]
#[command(about = "EggLink sensor ingestion and dashboard server")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "egglink.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "tracing=info,egglink_prime=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    info!(
        http_addr = %config.server.http_addr,
        max_history = config.store.max_history,
        online_window_secs = config.status.online_window_secs,
        alarm_threshold = config.status.alarm_threshold,
        "Starting egglink-prime"
    );

    let store = InMemoryDeviceStore::new(config.max_history());
    run_server(store, config).await
}

async fn run_server<S>(store: S, config: Config) -> color_eyre::Result<()>
where
    S: DeviceStore,
{
    let cancel = CancellationToken::new();

    let (forwarder, forward_handle) = match &config.forward.url {
        Some(url) => {
            let (forwarder, handle) = Forwarder::spawn(
                url.clone(),
                config.forward.timeout(),
                config.forward.queue_capacity,
                cancel.clone(),
            )?;
            (forwarder, Some(handle))
        }
        None => {
            info!("No webhook configured, forwarding disabled");
            (Forwarder::disabled(), None)
        }
    };

    let state = AppState::new(store)
        .with_forwarder(forwarder)
        .with_status_policy(config.status_policy())
        .with_coercion(config.normalizer.on_parse_failure);

    let axum_app = api::api_router(state).route("/health", get(health_handler));

    let http_addr = config.server.http_addr;
    let axum_listener = TcpListener::bind(http_addr).await?;
    info!(%http_addr, "HTTP server listening");

    let cancel_for_http = cancel.clone();
    tokio::select! {
        result = axum::serve(axum_listener, axum_app).with_graceful_shutdown(async move {
            cancel_for_http.cancelled().await;
        }) => {
            if let Err(e) = result {
                error!(error = ?e, "HTTP server error");
            }
            info!("HTTP server shut down");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    cancel.cancel();
    if let Some(handle) = forward_handle {
        let _ = handle.await;
    }

    info!("egglink-prime shut down complete");
    Ok(())
}

async fn health_handler() -> &'static str {
    "OK"
}
