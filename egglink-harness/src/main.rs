use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "egglink-harness")]
#[command(about = "Simulate a swarm of EggLink devices posting readings")]
struct Cli {
    /// Path to the harness configuration file
    #[arg(short, long, default_value = "egglink-harness.toml")]
    config: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct HarnessConfig {
    /// Ingestion endpoint of egglink-prime.
    url: String,
    devices: Vec<String>,
    request_timeout_secs: u64,
    device_interval_secs: u64,
    cycle_interval_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5000/data".to_owned(),
            devices: vec![
                "fd00::a1b2:0001".to_owned(),
                "fd00::a1b2:0002".to_owned(),
                "fd00::a1b2:00ff".to_owned(),
            ],
            request_timeout_secs: 5,
            device_interval_secs: 2,
            cycle_interval_secs: 5,
        }
    }
}

impl HarnessConfig {
    fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HarnessConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Build one reading the way a field module reports it.
fn generate_payload(device: &str) -> Value {
    let mut rng = rand::rng();
    let round = |v: f64| (v * 10.0).round() / 10.0;

    json!({
        "e": device,
        "d": jiff::Timestamp::now().to_string(),
        "t": round(rng.random_range(20.0..35.0)),
        "uA": round(rng.random_range(40.0..80.0)),
        "uS": round(rng.random_range(30.0..60.0)),
        "p": rng.random_range(0_u32..60),
    })
}

async fn send_reading(client: &reqwest::Client, url: &str, device: &str) {
    let payload = generate_payload(device);

    match client.post(url).json(&payload).send().await {
        Ok(response) if response.status().is_success() => {
            info!(device, p = %payload["p"], "Reading sent");
        }
        Ok(response) => {
            warn!(device, status = %response.status(), "Reading rejected");
        }
        Err(e) => {
            warn!(device, error = %e, "Failed to reach server, skipping device");
        }
    }
}

async fn run(config: HarnessConfig) -> color_eyre::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    let device_pause = Duration::from_secs(config.device_interval_secs);
    let cycle_pause = Duration::from_secs(config.cycle_interval_secs);

    let mut cycle = 0u64;
    loop {
        cycle += 1;
        info!(cycle, devices = config.devices.len(), "Starting cycle");

        for device in &config.devices {
            send_reading(&client, &config.url, device).await;
            tokio::time::sleep(device_pause).await;
        }

        tokio::time::sleep(cycle_pause).await;
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tracing=info,egglink_harness=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading harness configuration");
        HarnessConfig::load(&cli.config)?
    } else {
        info!("No harness configuration found, using defaults");
        HarnessConfig::default()
    };

    info!(
        url = %config.url,
        devices = config.devices.len(),
        "Starting harness"
    );

    tokio::select! {
        result = run(config) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping harness");
        }
    }

    info!("Harness shutdown complete");
    Ok(())
}
