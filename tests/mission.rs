//! Mission engine tests against a loopback mock vehicle.
//!
//! Covers:
//! - Completion, failure and cooperative cancellation
//! - Safety commands issued on stop
//! - Single-mission exclusivity
//! - Log streaming with cursors

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use boatlink::error::{Error, Result};
use boatlink::mission::builtin::ForwardSweep;
use boatlink::mission::{GuardedVehicle, Mission, MissionState};
use boatlink::protocol::Command;
use boatlink::types::{MovementSetpoint, VehicleMode};
use boatlink::{VehicleControl, VehicleLink};

use common::{eventually, loopback_config, started_link, MockVehicle};

fn quick_sweep(steps: u32) -> ForwardSweep {
    ForwardSweep {
        steps,
        speed: 10.0,
        step_interval: Duration::from_millis(20),
    }
}

fn long_sweep() -> ForwardSweep {
    ForwardSweep {
        steps: 10_000,
        speed: 10.0,
        step_interval: Duration::from_millis(50),
    }
}

fn log_lines(link: &VehicleLink) -> Vec<String> {
    link.mission_log(0).collect()
}

/// Fails after commanding movement.
struct Faulty;

#[async_trait]
impl Mission for Faulty {
    fn name(&self) -> &str {
        "faulty"
    }

    async fn run(&self, vehicle: &GuardedVehicle) -> Result<()> {
        vehicle.set_movement(3.0, 0.0, 0.0)?;
        vehicle.sleep(Duration::from_millis(20)).await?;
        Err(Error::MissionFailed("sensor out of range".into()))
    }
}

/// Polls the stop flag instead of sleeping through the guard, then tries
/// one more command and records how it was answered.
struct Stubborn {
    saw_cancellation: Arc<AtomicBool>,
}

#[async_trait]
impl Mission for Stubborn {
    fn name(&self) -> &str {
        "stubborn"
    }

    async fn run(&self, vehicle: &GuardedVehicle) -> Result<()> {
        vehicle.set_movement(4.0, 0.0, 0.0)?;
        while !vehicle.is_stop_requested() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let result = vehicle.set_movement(4.0, 0.0, 0.0);
        if matches!(result, Err(Error::MissionCancelled)) {
            self.saw_cancellation.store(true, Ordering::SeqCst);
        }
        result
    }
}

/// Waits for the stop request, then lands one more movement the way a call
/// that passed the stop check just before the request would, and finishes
/// normally.
struct LateMover {
    link: Arc<VehicleLink>,
}

#[async_trait]
impl Mission for LateMover {
    fn name(&self) -> &str {
        "late-mover"
    }

    async fn run(&self, vehicle: &GuardedVehicle) -> Result<()> {
        vehicle.set_movement(6.0, 0.0, 0.0)?;
        while !vehicle.is_stop_requested() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.link.set_movement(6.0, 0.0, 0.0)?;
        Ok(())
    }
}

#[tokio::test]
async fn test_mission_runs_to_completion() {
    let (link, _vehicle) = started_link().await;
    assert_eq!(link.mission_state(), MissionState::Idle);

    link.start_mission(quick_sweep(3)).unwrap();
    assert_eq!(link.mission_state(), MissionState::Running);

    link.wait_mission().await;
    assert_eq!(link.mission_state(), MissionState::Completed);
    assert!(link.setpoint().is_zero());

    let lines = log_lines(&link);
    assert_eq!(lines.first().map(String::as_str), Some("mission started: forward-sweep"));
    assert!(lines.contains(&"step 1: moving forward".to_string()));
    assert!(lines.contains(&"step 3: moving forward".to_string()));
    assert!(!lines.contains(&"step 4: moving forward".to_string()));
    assert!(lines.contains(&"sweep finished".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("mission completed"));

    link.close().await;
}

#[tokio::test]
async fn test_stop_puts_vehicle_at_rest_immediately() {
    let (link, vehicle) = started_link().await;
    link.set_mode(VehicleMode::Stabilize).unwrap();

    link.start_mission(long_sweep()).unwrap();
    assert!(
        eventually(Duration::from_secs(1), || {
            link.setpoint() == MovementSetpoint::new(10.0, 0.0, 0.0)
        })
        .await
    );

    // Let forward heartbeats go out, then discard everything received so far
    tokio::time::sleep(Duration::from_millis(250)).await;
    while vehicle.recv(Duration::from_millis(5)).await.is_some() {}

    let requested = Instant::now();
    link.request_stop_mission();
    // Issued before the mission observes the flag
    assert!(link.setpoint().is_zero());
    assert_eq!(link.mode(), VehicleMode::Manual);

    // The zero Move is sent right away, ahead of the queued Manual mode
    let mut manual_first = false;
    let zero_at = loop {
        let (data, at) = vehicle
            .recv(Duration::from_secs(1))
            .await
            .expect("no zero move after stop");
        match Command::decode(&data).unwrap() {
            Command::Move(setpoint) if setpoint.is_zero() => break at,
            Command::Mode(VehicleMode::Manual) => manual_first = true,
            _ => {}
        }
    };
    assert!(!manual_first, "manual mode sent before the zero move");
    assert!(
        zero_at - requested < Duration::from_millis(50),
        "zero move took {:?}",
        zero_at - requested
    );

    link.wait_mission().await;
    assert_eq!(link.mission_state(), MissionState::Stopped);
    assert!(link.setpoint().is_zero());

    let lines = log_lines(&link);
    assert!(lines.contains(&"stop requested".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("mission stopped")));

    // Manual mode follows on the next tick
    let mut saw_manual = false;
    while let Some(command) = vehicle.recv_command(Duration::from_millis(600)).await {
        if command == Command::Mode(VehicleMode::Manual) {
            saw_manual = true;
            break;
        }
    }
    assert!(saw_manual);

    // Heartbeats now carry zero movement
    let moves = vehicle.collect_moves(Duration::from_millis(500)).await;
    assert!(!moves.is_empty());
    assert!(moves
        .iter()
        .all(|(command, _)| *command == Command::Move(MovementSetpoint::ZERO)));

    link.close().await;
}

#[tokio::test]
async fn test_calls_after_stop_are_cancelled() {
    let (link, _vehicle) = started_link().await;
    let saw_cancellation = Arc::new(AtomicBool::new(false));

    link.start_mission(Stubborn {
        saw_cancellation: Arc::clone(&saw_cancellation),
    })
    .unwrap();
    assert!(
        eventually(Duration::from_secs(1), || {
            link.setpoint() == MovementSetpoint::new(4.0, 0.0, 0.0)
        })
        .await
    );

    link.request_stop_mission();
    link.wait_mission().await;

    assert!(saw_cancellation.load(Ordering::SeqCst));
    assert_eq!(link.mission_state(), MissionState::Stopped);
    assert!(link.setpoint().is_zero());
    assert!(log_lines(&link)
        .iter()
        .any(|l| l == "set_movement rejected: mission stopped or not running"));

    link.close().await;
}

#[tokio::test]
async fn test_movement_after_stop_is_zeroed_on_completion() {
    let (link, vehicle) = started_link().await;

    link.start_mission(LateMover {
        link: Arc::clone(&link),
    })
    .unwrap();
    assert!(
        eventually(Duration::from_secs(1), || {
            link.setpoint() == MovementSetpoint::new(6.0, 0.0, 0.0)
        })
        .await
    );

    link.request_stop_mission();
    link.wait_mission().await;

    assert_eq!(link.mission_state(), MissionState::Completed);
    assert!(link.setpoint().is_zero());

    link.close().await;
    let mut last_move = None;
    while let Some((data, _)) = vehicle.recv(Duration::from_millis(300)).await {
        if let Command::Move(setpoint) = Command::decode(&data).unwrap() {
            last_move = Some(setpoint);
        }
    }
    assert_eq!(last_move, Some(MovementSetpoint::ZERO));
}

#[tokio::test]
async fn test_second_mission_is_rejected() {
    let (link, _vehicle) = started_link().await;

    link.start_mission(long_sweep()).unwrap();
    assert!(matches!(
        link.start_mission(quick_sweep(1)),
        Err(Error::MissionAlreadyRunning)
    ));

    // The first mission keeps going
    assert_eq!(link.mission_state(), MissionState::Running);
    assert!(
        eventually(Duration::from_secs(1), || {
            log_lines(&link).contains(&"step 2: moving forward".to_string())
        })
        .await
    );

    link.request_stop_mission();
    link.wait_mission().await;
    assert_eq!(link.mission_state(), MissionState::Stopped);

    // A finished mission frees the slot
    link.start_mission(quick_sweep(1)).unwrap();
    link.wait_mission().await;
    assert_eq!(link.mission_state(), MissionState::Completed);

    link.close().await;
}

#[tokio::test]
async fn test_failing_mission_stops_vehicle() {
    let (link, _vehicle) = started_link().await;

    link.start_mission(Faulty).unwrap();
    link.wait_mission().await;

    assert_eq!(link.mission_state(), MissionState::Failed);
    assert!(link.setpoint().is_zero());
    assert!(log_lines(&link)
        .iter()
        .any(|l| l.starts_with("mission failed") && l.contains("sensor out of range")));

    link.close().await;
}

#[tokio::test]
async fn test_mission_on_stopped_link_fails() {
    let vehicle = MockVehicle::new().await;
    let link = Arc::new(VehicleLink::new(loopback_config(vehicle.local_addr())));

    link.start_mission(quick_sweep(2)).unwrap();
    link.wait_mission().await;

    assert_eq!(link.mission_state(), MissionState::Failed);
    assert!(log_lines(&link)
        .iter()
        .any(|l| l.starts_with("mission failed")));
}

#[tokio::test]
async fn test_log_stream_resumes_from_cursor() {
    let (link, _vehicle) = started_link().await;

    link.start_mission(quick_sweep(2)).unwrap();
    link.wait_mission().await;

    let mut stream = link.mission_log(0);
    let first: Vec<String> = stream.by_ref().take(2).collect();
    assert_eq!(first[0], "mission started: forward-sweep");
    assert_eq!(first[1], "step 1: moving forward");

    let rest: Vec<String> = link.mission_log(stream.cursor()).collect();
    assert_eq!(rest.first().map(String::as_str), Some("step 2: moving forward"));
    assert_eq!(rest.last().map(String::as_str), Some("mission completed"));

    let mut drained = link.mission_log(stream.cursor());
    drained.by_ref().for_each(drop);
    assert_eq!(link.mission_log(drained.cursor()).count(), 0);

    // A new run starts a fresh log
    link.start_mission(quick_sweep(1)).unwrap();
    link.wait_mission().await;
    let lines = log_lines(&link);
    assert_eq!(lines.first().map(String::as_str), Some("mission started: forward-sweep"));
    assert_eq!(
        lines.iter().filter(|l| l.as_str() == "mission completed").count(),
        1
    );

    link.close().await;
}

#[tokio::test]
async fn test_close_leaves_vehicle_at_rest() {
    let (link, vehicle) = started_link().await;

    link.start_mission(long_sweep()).unwrap();
    assert!(
        eventually(Duration::from_secs(1), || {
            link.setpoint() == MovementSetpoint::new(10.0, 0.0, 0.0)
        })
        .await
    );
    // At least one forward heartbeat reaches the vehicle
    tokio::time::sleep(Duration::from_millis(300)).await;

    link.close().await;
    assert_eq!(link.mission_state(), MissionState::Stopped);
    assert!(!link.is_started());

    let mut last_move = None;
    let mut saw_forward = false;
    let mut saw_manual = false;
    while let Some((data, _)) = vehicle.recv(Duration::from_millis(300)).await {
        match Command::decode(&data).unwrap() {
            Command::Move(setpoint) => {
                saw_forward |= setpoint.forward == 10.0;
                last_move = Some(setpoint);
            }
            Command::Mode(VehicleMode::Manual) => saw_manual = true,
            _ => {}
        }
    }

    assert!(saw_forward);
    assert_eq!(last_move, Some(MovementSetpoint::ZERO));
    assert!(saw_manual);
}
