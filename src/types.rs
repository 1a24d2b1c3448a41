//! Core types shared by the codec, the link and missions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Desired body-frame velocities, resent on every heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MovementSetpoint {
    pub forward: f32,
    pub lateral: f32,
    pub yaw: f32,
}

impl MovementSetpoint {
    /// All axes at rest.
    pub const ZERO: Self = Self {
        forward: 0.0,
        lateral: 0.0,
        yaw: 0.0,
    };

    pub fn new(forward: f32, lateral: f32, yaw: f32) -> Self {
        Self {
            forward,
            lateral,
            yaw,
        }
    }

    /// Scale every axis by a speed multiplier given in percent.
    pub fn scaled(self, percent: u8) -> Self {
        let factor = f32::from(percent) / 100.0;
        Self {
            forward: self.forward * factor,
            lateral: self.lateral * factor,
            yaw: self.yaw * factor,
        }
    }

    /// Check whether all axes are at rest.
    pub fn is_zero(&self) -> bool {
        self.forward == 0.0 && self.lateral == 0.0 && self.yaw == 0.0
    }
}

impl fmt::Display for MovementSetpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "forward={:.3} lateral={:.3} yaw={:.3}",
            self.forward, self.lateral, self.yaw
        )
    }
}

/// PID controller gains.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

impl PidGains {
    pub fn new(p: f32, i: f32, d: f32) -> Self {
        Self { p, i, d }
    }
}

impl fmt::Display for PidGains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P={} I={} D={}", self.p, self.i, self.d)
    }
}

/// Latest telemetry reported by the vehicle.
///
/// Replaced wholesale on every decoded telemetry datagram, never patched
/// field by field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub adc_value: f32,
    pub motor_pwm: [f32; 4],
    /// Gains currently active on the vehicle.
    pub pid: PidGains,
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "roll={:.2} pitch={:.2} yaw={:.2} adc={:.3} pwm=[{:.2}, {:.2}, {:.2}, {:.2}] pid=({})",
            self.roll,
            self.pitch,
            self.yaw,
            self.adc_value,
            self.motor_pwm[0],
            self.motor_pwm[1],
            self.motor_pwm[2],
            self.motor_pwm[3],
            self.pid
        )
    }
}

/// Vehicle operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum VehicleMode {
    /// Raw operator control.
    #[default]
    Manual = 0,
    /// On-board attitude stabilization.
    Stabilize = 1,
}

impl TryFrom<u8> for VehicleMode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Manual),
            1 => Ok(Self::Stabilize),
            _ => Err(ProtocolError::InvalidField {
                field: "mode",
                value,
            }),
        }
    }
}

impl From<VehicleMode> for u8 {
    fn from(mode: VehicleMode) -> Self {
        mode as u8
    }
}

impl fmt::Display for VehicleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Stabilize => write!(f, "stabilize"),
        }
    }
}

/// LED strip animation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LedMode {
    #[default]
    Off = 0,
    Static = 1,
    Blink = 2,
    Rainbow = 3,
}

impl TryFrom<u8> for LedMode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::Static),
            2 => Ok(Self::Blink),
            3 => Ok(Self::Rainbow),
            _ => Err(ProtocolError::InvalidField {
                field: "led mode",
                value,
            }),
        }
    }
}

impl From<LedMode> for u8 {
    fn from(mode: LedMode) -> Self {
        mode as u8
    }
}

impl fmt::Display for LedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Static => write!(f, "static"),
            Self::Blink => write!(f, "blink"),
            Self::Rainbow => write!(f, "rainbow"),
        }
    }
}

/// Water sampling probe action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ProbeAction {
    Up = 1,
    Down = 2,
    Stop = 3,
}

impl TryFrom<u8> for ProbeAction {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Up),
            2 => Ok(Self::Down),
            3 => Ok(Self::Stop),
            _ => Err(ProtocolError::InvalidField {
                field: "probe action",
                value,
            }),
        }
    }
}

impl From<ProbeAction> for u8 {
    fn from(action: ProbeAction) -> Self {
        action as u8
    }
}

impl fmt::Display for ProbeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
            Self::Stop => write!(f, "stop"),
        }
    }
}
