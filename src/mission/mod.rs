//! Mission engine: runs one operator mission at a time against the link.
//!
//! A mission only ever sees a [`GuardedVehicle`], so stopping it is
//! cooperative: the next vehicle call after a stop request fails with
//! [`Error::MissionCancelled`]. Independently of whether the mission notices,
//! a stop request puts the vehicle at rest directly through the link.

pub mod builtin;
mod guard;
mod log;

pub use guard::{GuardedVehicle, StopSignal};
pub use log::{MissionLog, MissionLogStream, DEFAULT_LOG_CAPACITY};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::link::{VehicleControl, VehicleLink};
use crate::types::VehicleMode;

/// A sequential script driven against the vehicle.
#[async_trait]
pub trait Mission: Send + Sync {
    /// Name shown in the mission log.
    fn name(&self) -> &str;

    /// Run to completion. Returning `Err(MissionCancelled)` marks the run as stopped.
    async fn run(&self, vehicle: &GuardedVehicle) -> Result<()>;
}

/// Lifecycle of the current mission run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl MissionState {
    /// Check if the run has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }
}

impl fmt::Display for MissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Mission engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfig {
    /// Mission log lines retained before the oldest are dropped.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
        }
    }
}

/// Runs at most one mission at a time.
pub struct MissionEngine {
    state: Arc<RwLock<MissionState>>,
    stop: Arc<StopSignal>,
    log: Arc<MissionLog>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MissionEngine {
    pub fn new(config: &MissionConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(MissionState::Idle)),
            stop: Arc::new(StopSignal::new()),
            log: Arc::new(MissionLog::new(config.log_capacity)),
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> MissionState {
        *self.state.read()
    }

    pub fn log(&self) -> &Arc<MissionLog> {
        &self.log
    }

    /// Launch `mission` on its own task. Must be called within a tokio runtime.
    pub fn start(&self, link: Arc<VehicleLink>, mission: Box<dyn Mission>) -> Result<()> {
        {
            let mut state = self.state.write();
            if *state == MissionState::Running {
                return Err(Error::MissionAlreadyRunning);
            }
            *state = MissionState::Running;
        }

        self.stop.reset();
        self.log.clear();
        self.log.append(format!("mission started: {}", mission.name()));

        let vehicle = GuardedVehicle::new(Arc::clone(&link), Arc::clone(&self.stop), Arc::clone(&self.log));
        let script = tokio::spawn(async move { mission.run(&vehicle).await });

        let supervisor = tokio::spawn(supervise(
            script,
            link,
            Arc::clone(&self.state),
            Arc::clone(&self.stop),
            Arc::clone(&self.log),
        ));

        // Any previous handle belongs to a run that already reached a terminal state
        *self.task.lock() = Some(supervisor);

        Ok(())
    }

    /// Set the stop flag and put the vehicle at rest directly.
    ///
    /// A zero Move goes out immediately; Manual mode is queued behind
    /// whatever the mission already queued. Does not wait for the mission
    /// to observe the flag. Safe to call repeatedly; each call reissues the
    /// safety commands.
    pub fn request_stop(&self, link: &VehicleLink) {
        self.stop.trigger();
        if self.state() == MissionState::Running {
            self.log.append("stop requested");
        }

        halt(link, "Safety stop");
        if let Err(e) = link.set_mode(VehicleMode::Manual) {
            warn!(error = %e, "Safety stop: manual mode not sent");
        }
    }

    /// Wait for the current mission task, if any, to finish.
    pub async fn wait(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Mission supervisor ended abnormally");
            }
        }
    }
}

fn halt(link: &VehicleLink, context: &str) {
    match link.halt() {
        Ok(()) => {}
        Err(e) if e.is_recoverable() => {
            warn!(error = %e, "{context}: zero move not sent now, next heartbeat carries it");
        }
        Err(e) => warn!(error = %e, "{context}: zero movement not sent"),
    }
}

async fn supervise(
    script: JoinHandle<Result<()>>,
    link: Arc<VehicleLink>,
    state: Arc<RwLock<MissionState>>,
    stop: Arc<StopSignal>,
    log: Arc<MissionLog>,
) {
    let outcome = match script.await {
        Ok(Ok(())) => {
            log.append("mission completed");
            MissionState::Completed
        }
        Ok(Err(e)) if e.is_cancellation() => {
            log.append(format!("mission stopped: {e}"));
            MissionState::Stopped
        }
        Ok(Err(e)) => {
            log.append(format!("mission failed: {e}"));
            MissionState::Failed
        }
        Err(e) => {
            log.append(format!("mission aborted: {e}"));
            MissionState::Failed
        }
    };

    // A move that slipped past the stop check may have replaced the zero setpoint
    if outcome != MissionState::Completed || stop.is_set() {
        halt(&link, "Terminal safety stop");
    }

    debug!(%outcome, "Mission finished");
    *state.write() = outcome;
}
