// Simulated device. Reads the [simulator] section of CONFIG_FILE (defaults when
// absent); SERVER_URL overrides the target.

use anyhow::Result;
use occupancy_relay::config::AppConfig;
use occupancy_relay::simulator::{RelayClient, Simulator};
use occupancy_relay::{logging, shutdown};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = AppConfig::load_or_default()?.simulator;
    let client = RelayClient::new(
        &config.server_url,
        Duration::from_millis(config.request_timeout_ms),
    )?;
    tracing::info!(
        target_url = %config.server_url,
        interval_ms = config.interval_ms,
        "Starting device simulator"
    );

    let simulator = Simulator::new(client, &config, StdRng::from_os_rng());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(simulator.run(shutdown_rx));

    shutdown::signal().await;
    let _ = shutdown_tx.send(());
    handle.await?;
    tracing::info!("Simulator stopped");
    Ok(())
}
