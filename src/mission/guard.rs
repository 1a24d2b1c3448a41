//! Cancellation-aware wrapper handed to running missions.
//!
//! Every vehicle-facing call first checks the stop signal and fails with
//! [`Error::MissionCancelled`] once a stop was requested. The check and the
//! forwarded call are not atomic: a stop requested in between lets one more
//! call through. A queued command that slips through lands ahead of the
//! Manual-mode packet `request_stop` queues, so Manual still wins. A
//! `set_movement` that slips through can overwrite the zero setpoint; the
//! mission supervisor halts the vehicle again whenever the stop flag was
//! set, whatever the mission's outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use super::log::MissionLog;
use crate::error::{Error, Result};
use crate::link::{VehicleControl, VehicleLink};
use crate::types::{LedMode, PidGains, ProbeAction, TelemetrySnapshot, VehicleMode};

/// Shared stop flag with wake-up for sleeping missions.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Set the flag and wake every waiter.
    pub fn trigger(&self) {
        self.stopped.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn reset(&self) {
        self.stopped.store(false, Ordering::Release);
    }

    /// Resolve once the flag is set.
    pub async fn triggered(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

/// The vehicle as seen from inside a mission.
pub struct GuardedVehicle {
    link: Arc<VehicleLink>,
    stop: Arc<StopSignal>,
    log: Arc<MissionLog>,
}

impl GuardedVehicle {
    pub(crate) fn new(link: Arc<VehicleLink>, stop: Arc<StopSignal>, log: Arc<MissionLog>) -> Self {
        Self { link, stop, log }
    }

    /// Write a line to the mission log.
    pub fn log(&self, line: impl Into<String>) {
        self.log.append(line);
    }

    /// Check whether a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_set()
    }

    /// Wait for `duration`, returning early with `MissionCancelled` on stop.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.check("sleep")?;
        tokio::select! {
            () = tokio::time::sleep(duration) => Ok(()),
            () = self.stop.triggered() => self.check("sleep"),
        }
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.stop.is_set() {
            self.log
                .append(format!("{operation} rejected: mission stopped or not running"));
            return Err(Error::MissionCancelled);
        }
        Ok(())
    }
}

impl VehicleControl for GuardedVehicle {
    fn set_movement(&self, forward: f32, lateral: f32, yaw: f32) -> Result<()> {
        self.check("set_movement")?;
        self.link.set_movement(forward, lateral, yaw)
    }

    fn set_pid(&self, gains: PidGains) -> Result<()> {
        self.check("set_pid")?;
        self.link.set_pid(gains)
    }

    fn set_mode(&self, mode: VehicleMode) -> Result<()> {
        self.check("set_mode")?;
        self.link.set_mode(mode)
    }

    fn set_led(&self, mode: LedMode, r: u8, g: u8, b: u8) -> Result<()> {
        self.check("set_led")?;
        self.link.set_led(mode, r, g, b)
    }

    fn set_gpio(&self, state: u8) -> Result<()> {
        self.check("set_gpio")?;
        self.link.set_gpio(state)
    }

    fn set_probe(&self, action: ProbeAction, timeout_secs: u16) -> Result<()> {
        self.check("set_probe")?;
        self.link.set_probe(action, timeout_secs)
    }

    fn telemetry(&self) -> Result<TelemetrySnapshot> {
        self.check("telemetry")?;
        Ok(self.link.snapshot())
    }
}
