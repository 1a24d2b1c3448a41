//! Vehicle link: the public entry point for commanding the vehicle.
//!
//! Movement is not queued. It is held as a setpoint and resent on every
//! dispatch tick, so the latest intent always wins. All other commands are
//! encoded immediately and queued for the next tick.

mod channel;
mod queue;
mod socket;
mod stats;
mod telemetry;

pub use channel::DuplexChannel;
pub use queue::{CommandQueue, DEFAULT_QUEUE_CAPACITY};
pub use socket::{bind_udp, create_udp_socket, SocketConfig};
pub use stats::{LinkStats, LinkStatsSnapshot};
pub use telemetry::TelemetryStore;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::mission::{Mission, MissionConfig, MissionEngine, MissionLogStream, MissionState};
use crate::protocol::Command;
use crate::types::{
    LedMode, MovementSetpoint, PidGains, ProbeAction, TelemetrySnapshot, VehicleMode,
};
use crate::{DEFAULT_COMMAND_PORT, DEFAULT_TELEMETRY_PORT};

/// Link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Vehicle command endpoint.
    #[serde(default = "default_vehicle_addr")]
    pub vehicle_addr: SocketAddr,

    /// Local address for the outbound command socket.
    #[serde(default = "default_command_bind")]
    pub command_bind: SocketAddr,

    /// Local address the vehicle sends telemetry to.
    #[serde(default = "default_telemetry_bind")]
    pub telemetry_bind: SocketAddr,

    /// Pause after every send in the dispatch loop.
    #[serde(default = "default_tick", with = "humantime_serde")]
    pub tick_interval: Duration,

    /// How long the dispatch loop waits for a queued command before
    /// falling back to a heartbeat.
    #[serde(default = "default_tick", with = "humantime_serde")]
    pub dequeue_wait: Duration,

    /// Receive timeout of the ingestion loop.
    #[serde(default = "default_recv_timeout", with = "humantime_serde")]
    pub recv_timeout: Duration,

    /// Queued commands held before the oldest is evicted.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Send buffer size in bytes.
    #[serde(default = "default_buffer_size")]
    pub send_buffer_size: usize,

    /// Receive buffer size in bytes.
    #[serde(default = "default_buffer_size")]
    pub recv_buffer_size: usize,

    /// Enable SO_REUSEADDR.
    #[serde(default = "default_reuse_addr")]
    pub reuse_addr: bool,
}

fn default_vehicle_addr() -> SocketAddr {
    SocketAddr::from(([192, 168, 4, 1], DEFAULT_COMMAND_PORT))
}
fn default_command_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 0))
}
fn default_telemetry_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_TELEMETRY_PORT))
}
fn default_tick() -> Duration {
    Duration::from_millis(100)
}
fn default_recv_timeout() -> Duration {
    Duration::from_secs(1)
}
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_buffer_size() -> usize {
    64 * 1024
}
fn default_reuse_addr() -> bool {
    true
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            vehicle_addr: default_vehicle_addr(),
            command_bind: default_command_bind(),
            telemetry_bind: default_telemetry_bind(),
            tick_interval: default_tick(),
            dequeue_wait: default_tick(),
            recv_timeout: default_recv_timeout(),
            queue_capacity: default_queue_capacity(),
            send_buffer_size: default_buffer_size(),
            recv_buffer_size: default_buffer_size(),
            reuse_addr: default_reuse_addr(),
        }
    }
}

impl LinkConfig {
    /// Config for talking to `vehicle_addr`, receiving telemetry on `telemetry_bind`.
    pub fn new(vehicle_addr: SocketAddr, telemetry_bind: SocketAddr) -> Self {
        Self {
            vehicle_addr,
            telemetry_bind,
            ..Default::default()
        }
    }
}

/// Vehicle-facing operations shared by the link and mission wrappers.
pub trait VehicleControl: Send + Sync {
    /// Replace the movement setpoint resent on every heartbeat.
    fn set_movement(&self, forward: f32, lateral: f32, yaw: f32) -> Result<()>;

    /// Queue a PID gain update.
    fn set_pid(&self, gains: PidGains) -> Result<()>;

    /// Queue a mode switch.
    fn set_mode(&self, mode: VehicleMode) -> Result<()>;

    /// Queue an LED strip command.
    fn set_led(&self, mode: LedMode, r: u8, g: u8, b: u8) -> Result<()>;

    /// Queue a GPIO state change.
    fn set_gpio(&self, state: u8) -> Result<()>;

    /// Queue a probe command; the probe halts by itself after `timeout_secs`.
    fn set_probe(&self, action: ProbeAction, timeout_secs: u16) -> Result<()>;

    /// Latest telemetry.
    fn telemetry(&self) -> Result<TelemetrySnapshot>;
}

/// Link facade composing the duplex channel, the telemetry store and the
/// mission engine.
///
/// Share it as `Arc<VehicleLink>`; mission control needs the `Arc`.
pub struct VehicleLink {
    channel: DuplexChannel,
    mode: RwLock<VehicleMode>,
    missions: MissionEngine,
}

impl VehicleLink {
    /// Create a stopped link with default mission settings.
    pub fn new(config: LinkConfig) -> Self {
        Self::with_missions(config, MissionConfig::default())
    }

    /// Create a stopped link.
    pub fn with_missions(config: LinkConfig, missions: MissionConfig) -> Self {
        Self {
            channel: DuplexChannel::new(config),
            mode: RwLock::new(VehicleMode::default()),
            missions: MissionEngine::new(&missions),
        }
    }

    /// Start the dispatch and ingestion loops.
    pub async fn start(&self) -> Result<()> {
        self.channel.start().await
    }

    /// Stop both loops and wait for them to exit.
    pub async fn stop(&self) {
        self.channel.stop().await;
    }

    /// Stop any running mission, wait for it, then stop the link.
    ///
    /// The link's final flush carries the safety stop's Manual-mode packet
    /// and a zero Move to the vehicle.
    pub async fn close(&self) {
        if self.missions.state() == MissionState::Running {
            self.missions.request_stop(self);
        }
        self.missions.wait().await;
        self.channel.stop().await;
    }

    /// Zero the movement setpoint and send a zero Move right away.
    ///
    /// The setpoint is cleared first, so if the immediate send fails the
    /// next heartbeat still carries the stop.
    pub fn halt(&self) -> Result<()> {
        self.ensure_started()?;
        self.channel.set_setpoint(MovementSetpoint::ZERO);
        self.channel
            .send_now(&Command::Move(MovementSetpoint::ZERO).encode())
    }

    /// Check whether the link has been started.
    pub fn is_started(&self) -> bool {
        self.channel.is_running()
    }

    /// Latest telemetry; never blocks, zero-valued before any arrives.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.channel.telemetry().read()
    }

    /// Time since the last telemetry packet.
    pub fn telemetry_age(&self) -> Option<Duration> {
        self.channel.telemetry().age()
    }

    /// Locally mirrored mode; set on send, not on acknowledgment.
    pub fn mode(&self) -> VehicleMode {
        *self.mode.read()
    }

    /// Current movement setpoint.
    pub fn setpoint(&self) -> MovementSetpoint {
        self.channel.setpoint()
    }

    /// Local telemetry address, while started.
    pub fn telemetry_addr(&self) -> Option<SocketAddr> {
        self.channel.telemetry_addr()
    }

    /// Traffic counters.
    pub fn stats(&self) -> LinkStatsSnapshot {
        self.channel.stats().snapshot(self.channel.queue().dropped())
    }

    pub fn config(&self) -> &LinkConfig {
        self.channel.config()
    }

    /// Start a mission against this link.
    ///
    /// Fails with [`Error::MissionAlreadyRunning`] while another mission runs.
    pub fn start_mission<M>(self: &Arc<Self>, mission: M) -> Result<()>
    where
        M: Mission + 'static,
    {
        self.missions.start(Arc::clone(self), Box::new(mission))
    }

    /// Ask the running mission to stop and put the vehicle at rest.
    ///
    /// Returns without waiting for the mission task; see [`Self::wait_mission`].
    pub fn request_stop_mission(&self) {
        self.missions.request_stop(self);
    }

    /// Wait until the current mission task has finished.
    pub async fn wait_mission(&self) {
        self.missions.wait().await;
    }

    pub fn mission_state(&self) -> MissionState {
        self.missions.state()
    }

    /// Mission log lines from `cursor` up to the current end.
    pub fn mission_log(&self, cursor: u64) -> MissionLogStream {
        self.missions.log().stream(cursor)
    }

    fn ensure_started(&self) -> Result<()> {
        if self.channel.is_running() {
            Ok(())
        } else {
            Err(Error::LinkNotStarted)
        }
    }

    fn enqueue(&self, command: Command) -> Result<()> {
        self.ensure_started()?;
        debug!(kind = command.kind(), "Queueing command");
        self.channel.enqueue(command.encode());
        Ok(())
    }
}

impl VehicleControl for VehicleLink {
    fn set_movement(&self, forward: f32, lateral: f32, yaw: f32) -> Result<()> {
        self.ensure_started()?;
        self.channel
            .set_setpoint(MovementSetpoint::new(forward, lateral, yaw));
        Ok(())
    }

    fn set_pid(&self, gains: PidGains) -> Result<()> {
        self.enqueue(Command::Pid(gains))
    }

    fn set_mode(&self, mode: VehicleMode) -> Result<()> {
        self.enqueue(Command::Mode(mode))?;
        *self.mode.write() = mode;
        Ok(())
    }

    fn set_led(&self, mode: LedMode, r: u8, g: u8, b: u8) -> Result<()> {
        self.enqueue(Command::Led { mode, r, g, b })
    }

    fn set_gpio(&self, state: u8) -> Result<()> {
        self.enqueue(Command::Gpio(state))
    }

    fn set_probe(&self, action: ProbeAction, timeout_secs: u16) -> Result<()> {
        self.enqueue(Command::Probe {
            action,
            timeout_secs,
        })
    }

    fn telemetry(&self) -> Result<TelemetrySnapshot> {
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_before_start_fail() {
        let link = VehicleLink::new(LinkConfig::default());

        assert!(matches!(link.set_movement(1.0, 0.0, 0.0), Err(Error::LinkNotStarted)));
        assert!(matches!(link.set_pid(PidGains::default()), Err(Error::LinkNotStarted)));
        assert!(matches!(link.set_mode(VehicleMode::Stabilize), Err(Error::LinkNotStarted)));
        assert_eq!(link.mode(), VehicleMode::Manual);
        assert!(link.setpoint().is_zero());

        // Reads never fail
        assert_eq!(link.telemetry().unwrap(), TelemetrySnapshot::default());
        assert!(link.telemetry_addr().is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.vehicle_addr.port(), 5005);
        assert_eq!(config.telemetry_bind.port(), 5006);
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.recv_timeout, Duration::from_secs(1));
    }
}
