//! Link traffic counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live counters updated by the dispatch and ingestion loops.
#[derive(Debug, Default)]
pub struct LinkStats {
    heartbeats_sent: AtomicU64,
    commands_sent: AtomicU64,
    send_errors: AtomicU64,
    telemetry_received: AtomicU64,
    telemetry_malformed: AtomicU64,
    datagrams_ignored: AtomicU64,
    receive_errors: AtomicU64,
}

impl LinkStats {
    pub fn record_heartbeat(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self) {
        self.commands_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_telemetry(&self) {
        self.telemetry_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.telemetry_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.datagrams_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self, commands_dropped: u64) -> LinkStatsSnapshot {
        LinkStatsSnapshot {
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            commands_dropped,
            send_errors: self.send_errors.load(Ordering::Relaxed),
            telemetry_received: self.telemetry_received.load(Ordering::Relaxed),
            telemetry_malformed: self.telemetry_malformed.load(Ordering::Relaxed),
            datagrams_ignored: self.datagrams_ignored.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`LinkStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatsSnapshot {
    pub heartbeats_sent: u64,
    pub commands_sent: u64,
    /// Commands evicted from a full queue before they could be sent.
    pub commands_dropped: u64,
    pub send_errors: u64,
    pub telemetry_received: u64,
    pub telemetry_malformed: u64,
    pub datagrams_ignored: u64,
    pub receive_errors: u64,
}

impl LinkStatsSnapshot {
    /// Total datagrams sent, heartbeats included.
    pub fn packets_sent(&self) -> u64 {
        self.heartbeats_sent + self.commands_sent
    }
}
