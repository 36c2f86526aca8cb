// Simulated counting device: generates entries/exits, pushes them to /update,
// polls /get_command and zeroes itself when told to.

use std::time::Duration;

use rand::Rng;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::Instrument;

use crate::config::SimulatorConfig;
use crate::models::{CommandSignal, Snapshot};

/// Sensor side of the device: running totals driven by random arrivals/departures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorModel {
    entered: u64,
    departed: u64,
}

impl SensorModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// One tick: 30% chance of 1-3 arrivals, then 20% chance of 1-2 departures
    /// if anyone has arrived that has not left.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Snapshot {
        if rng.random::<f64>() > 0.7 {
            self.entered += rng.random_range(1..=3u64);
        }
        if rng.random::<f64>() > 0.8 && self.entered > self.departed {
            self.departed += rng.random_range(1..=2u64);
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> Snapshot {
        let inside = i128::from(self.entered) - i128::from(self.departed);
        let inside = i64::try_from(inside).unwrap_or(if inside < 0 { i64::MIN } else { i64::MAX });
        Snapshot::new(self.entered, self.departed, inside)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server returned {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected command payload: {0:?}")]
    UnexpectedCommand(String),
}

/// HTTP side of the device. Every call is bounded by the client timeout.
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    update_url: String,
    command_url: String,
}

impl RelayClient {
    pub fn new(server_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base = server_url.trim_end_matches('/');
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("building HTTP client: {}", e))?;
        Ok(Self {
            http,
            update_url: format!("{}/update", base),
            command_url: format!("{}/get_command", base),
        })
    }

    pub async fn push_update(&self, snapshot: &Snapshot) -> Result<(), ClientError> {
        let response = self.http.post(&self.update_url).json(snapshot).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        Ok(())
    }

    pub async fn poll_command(&self) -> Result<CommandSignal, ClientError> {
        let response = self.http.get(&self.command_url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        let body = response.text().await?;
        CommandSignal::from_wire(&body).ok_or(ClientError::UnexpectedCommand(body))
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Snapshot generated this cycle (before any reset).
    pub snapshot: Snapshot,
    /// The update was accepted by the server.
    pub sent: bool,
    /// A reset command was received and applied.
    pub reset: bool,
}

pub struct Simulator<R> {
    client: RelayClient,
    sensor: SensorModel,
    rng: R,
    interval: Duration,
    backoff_max: Duration,
    consecutive_failures: u32,
}

impl<R: Rng + Send> Simulator<R> {
    pub fn new(client: RelayClient, config: &SimulatorConfig, rng: R) -> Self {
        Self {
            client,
            sensor: SensorModel::new(),
            rng,
            interval: Duration::from_millis(config.interval_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
            consecutive_failures: 0,
        }
    }

    pub fn sensor(&self) -> &SensorModel {
        &self.sensor
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Generate, push, poll. Network failures are logged (update) or ignored
    /// (command poll); they never end the loop.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let snapshot = self.sensor.step(&mut self.rng);

        let sent = match self.client.push_update(&snapshot).await {
            Ok(()) => {
                self.consecutive_failures = 0;
                tracing::info!(
                    entered = snapshot.entered,
                    departed = snapshot.departed,
                    inside = snapshot.inside,
                    "data sent"
                );
                true
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                tracing::warn!(
                    error = %e,
                    operation = "push_update",
                    consecutive_failures = self.consecutive_failures,
                    "update failed"
                );
                false
            }
        };

        let reset = match self.client.poll_command().await {
            Ok(CommandSignal::Reset) => {
                tracing::info!("reset command received, clearing counters");
                self.sensor.reset();
                if let Err(e) = self.client.push_update(&self.sensor.snapshot()).await {
                    tracing::warn!(error = %e, operation = "push_reset", "zeroed update failed");
                }
                true
            }
            Ok(CommandSignal::Idle) => false,
            Err(e) => {
                tracing::debug!(error = %e, operation = "poll_command", "command poll failed");
                false
            }
        };

        CycleReport {
            snapshot,
            sent,
            reset,
        }
    }

    /// Delay before the next cycle: the fixed interval, doubled per consecutive
    /// failed update and capped at `backoff_max` (backoff off when the cap is zero).
    pub fn next_delay(&self) -> Duration {
        if self.consecutive_failures == 0 || self.backoff_max.is_zero() {
            return self.interval;
        }
        let factor = 1u32 << self.consecutive_failures.min(16);
        self.interval
            .saturating_mul(factor)
            .min(self.backoff_max)
            .max(self.interval)
    }

    /// Cycle until `shutdown` fires (or its sender is dropped).
    pub async fn run(self, shutdown: oneshot::Receiver<()>) {
        let span = tracing::span!(
            tracing::Level::DEBUG,
            "simulator",
            interval_ms = self.interval.as_millis() as u64
        );
        self.run_loop(shutdown).instrument(span).await;
    }

    async fn run_loop(mut self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                _ = self.run_cycle() => {}
                _ = &mut shutdown => break,
            }
            tokio::select! {
                _ = sleep(self.next_delay()) => {}
                _ = &mut shutdown => break,
            }
        }
        tracing::debug!("Simulator shutting down");
    }
}
