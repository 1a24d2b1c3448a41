//! Duplex channel: command dispatch and telemetry ingestion over two sockets.
//!
//! The dispatch loop sends at most one datagram per tick. A queued one-off
//! command takes the tick if one is waiting; otherwise the current movement
//! setpoint is resent as a heartbeat. Nothing is acknowledged or retried: a
//! lost Move packet is superseded by the next heartbeat.
//!
//! Safety stops bypass the tick through [`DuplexChannel::send_now`], and
//! [`DuplexChannel::stop`] flushes the queue and the current setpoint once
//! the loops have exited.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::queue::CommandQueue;
use super::socket::{bind_udp, SocketConfig};
use super::stats::LinkStats;
use super::telemetry::TelemetryStore;
use super::LinkConfig;
use crate::error::{Error, Result, TransportError};
use crate::protocol::{decode_inbound, Command, Inbound, MAX_DATAGRAM};
use crate::types::MovementSetpoint;

/// Handles owned while the loops are running.
struct Running {
    command_socket: Arc<UdpSocket>,
    shutdown_tx: broadcast::Sender<()>,
    dispatch: JoinHandle<()>,
    ingest: JoinHandle<()>,
    telemetry_addr: SocketAddr,
}

/// Owner of both sockets, the movement setpoint and the command queue.
pub struct DuplexChannel {
    config: LinkConfig,
    setpoint: Arc<Mutex<MovementSetpoint>>,
    queue: Arc<CommandQueue>,
    telemetry: Arc<TelemetryStore>,
    stats: Arc<LinkStats>,
    running: Mutex<Option<Running>>,
}

impl DuplexChannel {
    /// Create a stopped channel.
    pub fn new(config: LinkConfig) -> Self {
        Self {
            queue: Arc::new(CommandQueue::new(config.queue_capacity)),
            config,
            setpoint: Arc::new(Mutex::new(MovementSetpoint::ZERO)),
            telemetry: Arc::new(TelemetryStore::new()),
            stats: Arc::new(LinkStats::default()),
            running: Mutex::new(None),
        }
    }

    /// Bind both sockets, spawn the loops and announce ourselves to the vehicle.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(&self) -> Result<()> {
        let socket_config = SocketConfig::from_link_config(&self.config);

        let command_socket = {
            let mut running = self.running.lock();
            if running.is_some() {
                return Err(Error::LinkAlreadyStarted);
            }

            let command_socket = Arc::new(bind_udp(self.config.command_bind, &socket_config)?);
            let telemetry_socket = Arc::new(bind_udp(self.config.telemetry_bind, &socket_config)?);
            let telemetry_addr = telemetry_socket
                .local_addr()
                .map_err(|e| TransportError::SocketError(e.to_string()))?;

            let (shutdown_tx, _) = broadcast::channel(1);

            let dispatch = tokio::spawn(dispatch_loop(
                DispatchContext {
                    socket: Arc::clone(&command_socket),
                    peer: self.config.vehicle_addr,
                    setpoint: Arc::clone(&self.setpoint),
                    queue: Arc::clone(&self.queue),
                    stats: Arc::clone(&self.stats),
                    dequeue_wait: self.config.dequeue_wait,
                    tick_interval: self.config.tick_interval,
                },
                shutdown_tx.subscribe(),
            ));

            let ingest = tokio::spawn(ingest_loop(
                IngestContext {
                    socket: telemetry_socket,
                    telemetry: Arc::clone(&self.telemetry),
                    stats: Arc::clone(&self.stats),
                    recv_timeout: self.config.recv_timeout,
                },
                shutdown_tx.subscribe(),
            ));

            *running = Some(Running {
                command_socket: Arc::clone(&command_socket),
                shutdown_tx,
                dispatch,
                ingest,
                telemetry_addr,
            });

            info!(
                vehicle = %self.config.vehicle_addr,
                telemetry = %telemetry_addr,
                "Vehicle link started"
            );

            command_socket
        };

        // Lets the vehicle learn where to send telemetry before the first tick
        let hello = Command::Move(*self.setpoint.lock()).encode();
        match command_socket.send_to(&hello, self.config.vehicle_addr).await {
            Ok(_) => self.stats.record_heartbeat(),
            Err(e) => {
                self.stats.record_send_error();
                warn!(error = %e, "Initial move packet failed");
            }
        }

        Ok(())
    }

    /// Signal both loops to exit and wait for them. No-op when stopped.
    ///
    /// Once the loops are gone, anything still queued is sent, followed by
    /// one last Move with the current setpoint.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };

        let _ = running.shutdown_tx.send(());

        for (name, handle) in [("dispatch", running.dispatch), ("ingest", running.ingest)] {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "Link task ended abnormally");
            }
        }

        let pending = self.queue.drain();
        let flushed = pending.len();
        for packet in pending {
            match running.command_socket.send_to(&packet, self.config.vehicle_addr).await {
                Ok(_) => self.stats.record_command(),
                Err(e) => {
                    self.stats.record_send_error();
                    warn!(header = packet[0], error = %e, "Flushing queued command failed");
                }
            }
        }

        let last = Command::Move(self.setpoint()).encode();
        match running.command_socket.send_to(&last, self.config.vehicle_addr).await {
            Ok(_) => self.stats.record_heartbeat(),
            Err(e) => {
                self.stats.record_send_error();
                warn!(error = %e, "Final move packet failed");
            }
        }

        info!(flushed, "Vehicle link stopped");
    }

    /// Send `packet` immediately from the caller, outside the dispatch tick.
    ///
    /// Fails with `LinkNotStarted` when stopped, or `SendFailed` if the
    /// socket cannot take the datagram right now.
    pub fn send_now(&self, packet: &[u8]) -> Result<()> {
        let socket = self
            .running
            .lock()
            .as_ref()
            .map(|r| Arc::clone(&r.command_socket))
            .ok_or(Error::LinkNotStarted)?;

        match socket.try_send_to(packet, self.config.vehicle_addr) {
            Ok(_) => {
                self.stats.record_command();
                trace!(header = packet.first().copied(), "Command sent out of band");
                Ok(())
            }
            Err(e) => {
                self.stats.record_send_error();
                Err(TransportError::SendFailed(e.to_string()).into())
            }
        }
    }

    /// Check whether the loops are running.
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Local address the telemetry socket is bound to, while running.
    pub fn telemetry_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|r| r.telemetry_addr)
    }

    /// Replace the movement setpoint; latest write wins.
    pub fn set_setpoint(&self, setpoint: MovementSetpoint) {
        *self.setpoint.lock() = setpoint;
    }

    /// Current movement setpoint.
    pub fn setpoint(&self) -> MovementSetpoint {
        *self.setpoint.lock()
    }

    /// Queue an encoded one-off packet for the next tick.
    pub fn enqueue(&self, packet: Bytes) {
        self.queue.enqueue(packet);
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn telemetry(&self) -> &TelemetryStore {
        &self.telemetry
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

impl Drop for DuplexChannel {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            let _ = running.shutdown_tx.send(());
            running.dispatch.abort();
            running.ingest.abort();
        }
    }
}

struct DispatchContext {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    setpoint: Arc<Mutex<MovementSetpoint>>,
    queue: Arc<CommandQueue>,
    stats: Arc<LinkStats>,
    dequeue_wait: Duration,
    tick_interval: Duration,
}

async fn dispatch_loop(ctx: DispatchContext, mut shutdown: broadcast::Receiver<()>) {
    loop {
        let queued = tokio::select! {
            _ = shutdown.recv() => break,
            packet = ctx.queue.try_dequeue(ctx.dequeue_wait) => packet,
        };

        let (packet, heartbeat) = match queued {
            Some(packet) => (packet, false),
            None => (Command::Move(*ctx.setpoint.lock()).encode(), true),
        };

        match ctx.socket.send_to(&packet, ctx.peer).await {
            Ok(_) if heartbeat => ctx.stats.record_heartbeat(),
            Ok(_) => {
                ctx.stats.record_command();
                trace!(header = packet[0], len = packet.len(), "Command sent");
            }
            Err(e) => {
                ctx.stats.record_send_error();
                warn!(peer = %ctx.peer, error = %e, heartbeat, "Send failed");
            }
        }

        tokio::select! {
            _ = shutdown.recv() => break,
            () = tokio::time::sleep(ctx.tick_interval) => {}
        }
    }

    debug!("Dispatch loop exited");
}

struct IngestContext {
    socket: Arc<UdpSocket>,
    telemetry: Arc<TelemetryStore>,
    stats: Arc<LinkStats>,
    recv_timeout: Duration,
}

async fn ingest_loop(ctx: IngestContext, mut shutdown: broadcast::Receiver<()>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let received = tokio::select! {
            _ = shutdown.recv() => break,
            result = tokio::time::timeout(ctx.recv_timeout, ctx.socket.recv_from(&mut buf)) => result,
        };

        let (len, from) = match received {
            Err(_) => {
                trace!(timeout = ?ctx.recv_timeout, "No telemetry received");
                continue;
            }
            Ok(Err(e)) => {
                ctx.stats.record_receive_error();
                warn!(error = %e, "Telemetry receive failed");
                continue;
            }
            Ok(Ok(received)) => received,
        };

        match decode_inbound(&buf[..len]) {
            Ok(Inbound::Telemetry(snapshot)) => {
                ctx.telemetry.write(snapshot);
                ctx.stats.record_telemetry();
                trace!(%from, "Telemetry updated");
            }
            Ok(Inbound::Ignored(header)) => {
                ctx.stats.record_ignored();
                debug!(%from, header, "Discarding non-telemetry datagram");
            }
            Err(e) => {
                ctx.stats.record_malformed();
                warn!(%from, error = %e, "Dropping malformed telemetry");
            }
        }
    }

    debug!("Ingest loop exited");
}
