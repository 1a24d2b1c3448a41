//! Shared test infrastructure: a loopback stand-in for the vehicle.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;

use boatlink::protocol::{header, Command};
use boatlink::{LinkConfig, VehicleLink};

/// Plays the vehicle: receives commands, sends telemetry.
pub struct MockVehicle {
    socket: UdpSocket,
}

impl MockVehicle {
    pub async fn new() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        Self { socket }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    /// Next datagram, or `None` after `wait`.
    pub async fn recv(&self, wait: Duration) -> Option<(Vec<u8>, Instant)> {
        let mut buf = [0u8; 1024];
        match tokio::time::timeout(wait, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, _))) => Some((buf[..len].to_vec(), Instant::now())),
            _ => None,
        }
    }

    /// Next datagram that is not a heartbeat, or `None` after `wait`.
    pub async fn recv_command(&self, wait: Duration) -> Option<Command> {
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (data, _) = self.recv(remaining).await?;
            if data[0] != header::MOVE {
                return Some(Command::decode(&data).unwrap());
            }
        }
    }

    /// Every Move packet received within `window`, with arrival times.
    pub async fn collect_moves(&self, window: Duration) -> Vec<(Command, Instant)> {
        let deadline = Instant::now() + window;
        let mut moves = Vec::new();
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            match self.recv(remaining).await {
                Some((data, at)) if data[0] == header::MOVE => {
                    moves.push((Command::decode(&data).unwrap(), at));
                }
                Some(_) => {}
                None => break,
            }
        }
        moves
    }

    pub async fn send_to(&self, data: &[u8], target: SocketAddr) {
        self.socket.send_to(data, target).await.unwrap();
    }
}

/// Link config pointing at `vehicle`, bound to loopback ephemeral ports.
pub fn loopback_config(vehicle: SocketAddr) -> LinkConfig {
    LinkConfig {
        command_bind: "127.0.0.1:0".parse().unwrap(),
        ..LinkConfig::new(vehicle, "127.0.0.1:0".parse().unwrap())
    }
}

/// Start a link against a fresh mock vehicle.
pub async fn started_link() -> (Arc<VehicleLink>, MockVehicle) {
    let vehicle = MockVehicle::new().await;
    let link = Arc::new(VehicleLink::new(loopback_config(vehicle.local_addr())));
    link.start().await.unwrap();
    (link, vehicle)
}

/// Poll `condition` until it holds or `wait` elapses.
pub async fn eventually(wait: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + wait;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
