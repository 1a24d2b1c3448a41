//! Latest telemetry snapshot shared between the ingestion loop and readers.

use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::types::TelemetrySnapshot;

#[derive(Debug, Default)]
struct Latest {
    snapshot: TelemetrySnapshot,
    updated_at: Option<Instant>,
}

/// Holds exactly one snapshot, replaced wholesale on each write.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    latest: RwLock<Latest>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot. Only the ingestion loop writes.
    pub fn write(&self, snapshot: TelemetrySnapshot) {
        *self.latest.write() = Latest {
            snapshot,
            updated_at: Some(Instant::now()),
        };
    }

    /// Copy of the latest snapshot; zero-valued until telemetry arrives.
    pub fn read(&self) -> TelemetrySnapshot {
        self.latest.read().snapshot
    }

    /// When the snapshot was last replaced.
    pub fn last_update(&self) -> Option<Instant> {
        self.latest.read().updated_at
    }

    /// Time since the last telemetry packet, if any has been received.
    pub fn age(&self) -> Option<Duration> {
        self.last_update().map(|at| at.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::PidGains;

    #[test]
    fn test_zero_before_first_write() {
        let store = TelemetryStore::new();
        assert_eq!(store.read(), TelemetrySnapshot::default());
        assert!(store.last_update().is_none());
        assert!(store.age().is_none());
    }

    #[test]
    fn test_write_replaces_wholesale() {
        let store = TelemetryStore::new();
        store.write(TelemetrySnapshot {
            roll: 4.0,
            motor_pwm: [1.0; 4],
            pid: PidGains::new(2.0, 0.1, 0.0),
            ..Default::default()
        });
        store.write(TelemetrySnapshot {
            pitch: 1.0,
            ..Default::default()
        });

        let read = store.read();
        assert_eq!(read.roll, 0.0);
        assert_eq!(read.pitch, 1.0);
        assert_eq!(read.motor_pwm, [0.0; 4]);
        assert!(store.age().is_some());
    }

    #[test]
    fn test_readers_never_see_torn_snapshots() {
        let store = Arc::new(TelemetryStore::new());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for n in 0..2000u16 {
                    let v = f32::from(n);
                    store.write(TelemetrySnapshot {
                        roll: v,
                        pitch: v,
                        yaw: v,
                        adc_value: v,
                        motor_pwm: [v; 4],
                        pid: PidGains::new(v, v, v),
                    });
                }
            })
        };

        for _ in 0..2000 {
            let s = store.read();
            assert!(s.motor_pwm.iter().all(|&pwm| pwm == s.roll));
            assert_eq!(s.pid.d, s.roll);
        }
        writer.join().unwrap();
    }
}
