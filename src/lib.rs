//! # boatlink
//!
//! Link layer for remotely operating an unmanned surface vehicle over UDP.
//!
//! The ground station keeps one movement setpoint that is resent every tick
//! as a heartbeat, queues one-off commands (PID gains, mode, LED, GPIO,
//! sampling probe) in between, and decodes telemetry into a shared snapshot.
//! Missions run on their own task behind a cancellation-aware wrapper.
//!
//! ## Architecture
//!
//! ┌─────────────────────────────────────────────────────────────────┐
//! │           Callers (CLI, HTTP/WebSocket front end, ...)          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Mission Engine ──► GuardedVehicle ──┐                          │
//! │                                      ▼                          │
//! │                   VehicleLink (facade)                          │
//! ├──────────────────────────────┬──────────────────────────────────┤
//! │ Setpoint + Command Queue     │ Telemetry Store                  │
//! │        │                     │        ▲                         │
//! │  Dispatch loop (100 ms)      │  Ingestion loop (1 s timeout)    │
//! ├──────────────────────────────┴──────────────────────────────────┤
//! │       Protocol codec (fixed little-endian packets over UDP)     │
//! └─────────────────────────────────────────────────────────────────┘

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow stylistic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]              // ASCII diagrams in docs
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::float_cmp)]                 // Wire values are compared bit-exact
#![allow(clippy::many_single_char_names)]    // r, g, b and p, i, d
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::use_self)]
#![allow(clippy::future_not_send)]
#![allow(clippy::match_same_arms)]

pub mod config;
pub mod error;
pub mod link;
pub mod mission;
pub mod protocol;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::Config;
pub use error::{Error, Result};
pub use link::{LinkConfig, VehicleControl, VehicleLink};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default UDP port the vehicle receives commands on.
pub const DEFAULT_COMMAND_PORT: u16 = 5005;

/// Default local UDP port telemetry is received on.
pub const DEFAULT_TELEMETRY_PORT: u16 = 5006;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::link::{LinkConfig, VehicleControl, VehicleLink};
    pub use crate::mission::{GuardedVehicle, Mission, MissionState};
    pub use crate::protocol::Command;
    pub use crate::types::*;
}
