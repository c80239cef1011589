//! Background service loop.
//!
//! Runs beside the HTTP server as its own tokio task. On a fixed tick it
//! refreshes the trusted registry and logs a status line. A failed tick is
//! logged and the loop carries on; only [`ServiceHandle::stop`] ends it.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use veridex_core::{CallerIdentity, RegistrySnapshot};

use crate::registry::{RegistryError, RegistrySource, TrustedRegistry};

/// Default tick interval.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Default number of ticks between registry refreshes.
pub const DEFAULT_REFRESH_EVERY: u64 = 60;

/// Errors from the service loop.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Registry refresh failed: {0}")]
    Refresh(#[from] RegistryError),

    #[error("Identity {0} is not registered")]
    NotRegistered(CallerIdentity),

    #[error("Invalid service configuration: {0}")]
    InvalidConfig(String),

    #[error("Service task failed: {0}")]
    Task(String),
}

/// Lifecycle state of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Running,
    Stopped,
}

impl ServiceState {
    /// Lowercase name, as reported by `/health`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
        }
    }
}

/// Service loop settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Time between ticks
    pub tick: Duration,

    /// Refresh the registry every this many ticks, starting at tick 0
    pub refresh_every: u64,

    /// Our own identity, reported in the status line
    pub own_identity: Option<CallerIdentity>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            refresh_every: DEFAULT_REFRESH_EVERY,
            own_identity: None,
        }
    }
}

impl ServiceConfig {
    /// Parse a tick interval such as `1s` or `500ms`.
    pub fn parse_tick(value: &str) -> Result<Duration, ServiceError> {
        humantime::parse_duration(value)
            .map_err(|e| ServiceError::InvalidConfig(format!("tick '{}': {}", value, e)))
    }

    fn validate(&self) -> Result<(), ServiceError> {
        if self.tick.is_zero() {
            return Err(ServiceError::InvalidConfig(
                "tick must be greater than zero".to_string(),
            ));
        }
        if self.refresh_every == 0 {
            return Err(ServiceError::InvalidConfig(
                "refresh_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// What the status line reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceStatus {
    pub block: u64,
    pub uid: Option<u16>,
    pub incentive: Option<f64>,
}

impl ServiceStatus {
    fn from_snapshot(snapshot: &RegistrySnapshot, own: Option<&CallerIdentity>) -> Self {
        let peer = own.and_then(|id| snapshot.peer(id));
        Self {
            block: snapshot.block(),
            uid: peer.map(|p| p.uid),
            incentive: peer.map(|p| p.incentive),
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.incentive {
            Some(incentive) => write!(f, "Block: {} | Incentive: {}", self.block, incentive),
            None => write!(f, "Block: {} | Incentive: n/a", self.block),
        }
    }
}

/// Timer-driven registry refresher.
pub struct ServiceLoop {
    config: ServiceConfig,
    registry: Arc<TrustedRegistry>,
    source: Arc<dyn RegistrySource>,
    first_step: u64,
}

impl ServiceLoop {
    /// Create a loop refreshing `registry` from `source`.
    pub fn new(
        config: ServiceConfig,
        registry: Arc<TrustedRegistry>,
        source: Arc<dyn RegistrySource>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self {
            config,
            registry,
            source,
            first_step: 0,
        })
    }

    /// Load the first snapshot and confirm our own identity is registered.
    ///
    /// Call once before serving. Any error here should stop startup. After a
    /// successful load the spawned loop skips its tick 0 refresh.
    pub async fn initialize(&mut self) -> Result<ServiceStatus, ServiceError> {
        let snapshot = self.registry.refresh_from(self.source.as_ref()).await?;

        if let Some(own) = &self.config.own_identity {
            if !snapshot.contains(own) {
                return Err(ServiceError::NotRegistered(own.clone()));
            }
        }

        self.first_step = 1;
        let status = self.status();
        tracing::info!(
            source = %self.source.describe(),
            peers = snapshot.len(),
            uid = ?status.uid,
            "Registry loaded"
        );
        Ok(status)
    }

    /// Status computed from the current snapshot.
    pub fn status(&self) -> ServiceStatus {
        ServiceStatus::from_snapshot(
            &self.registry.snapshot(),
            self.config.own_identity.as_ref(),
        )
    }

    /// Run one tick. Returns a status on refresh ticks.
    pub async fn tick(&self, step: u64) -> Result<Option<ServiceStatus>, ServiceError> {
        if step % self.config.refresh_every != 0 {
            return Ok(None);
        }
        self.registry.refresh_from(self.source.as_ref()).await?;
        Ok(Some(self.status()))
    }

    /// Start the loop on the current tokio runtime.
    pub fn spawn(self) -> ServiceHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ServiceState::Running);
        let task = tokio::spawn(self.run(stop_rx, state_tx));

        ServiceHandle {
            stop: stop_tx,
            state: state_rx,
            task,
        }
    }

    async fn run(
        self,
        mut stop: watch::Receiver<bool>,
        state: watch::Sender<ServiceState>,
    ) {
        let mut interval = tokio::time::interval(self.config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            tick = %humantime::format_duration(self.config.tick),
            refresh_every = self.config.refresh_every,
            "Service loop running"
        );

        let mut step = self.first_step;
        loop {
            tokio::select! {
                biased;

                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    match self.tick(step).await {
                        Ok(Some(status)) => tracing::info!(
                            block = status.block,
                            uid = ?status.uid,
                            "{}",
                            status
                        ),
                        Ok(None) => {}
                        Err(e) => tracing::error!(step, error = %e, "Service tick failed"),
                    }
                    step = step.wrapping_add(1);
                }
            }
        }

        state.send_replace(ServiceState::Stopped);
        tracing::info!(ticks = step, "Service loop stopped");
    }
}

/// Control handle for a spawned [`ServiceLoop`].
#[derive(Debug)]
pub struct ServiceHandle {
    stop: watch::Sender<bool>,
    state: watch::Receiver<ServiceState>,
    task: JoinHandle<()>,
}

impl ServiceHandle {
    /// Ask the loop to stop. Returns immediately.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Current loop state.
    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// A receiver that observes state changes.
    pub fn state_watch(&self) -> watch::Receiver<ServiceState> {
        self.state.clone()
    }

    /// Wait for the loop task to finish.
    pub async fn join(self) -> Result<(), ServiceError> {
        self.task
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        self.stop();
        self.join().await
    }
}
