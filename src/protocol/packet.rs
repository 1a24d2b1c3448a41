//! Outbound command packets.

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};

use super::{header, packet_len, FLOAT_OFFSET, FLOAT_PAD};
use crate::error::ProtocolError;
use crate::types::{LedMode, MovementSetpoint, PidGains, ProbeAction, VehicleMode};

/// A command sent from the ground station to the vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Movement setpoint (also the heartbeat).
    Move(MovementSetpoint),
    /// PID gain update.
    Pid(PidGains),
    /// LED strip control.
    Led { mode: LedMode, r: u8, g: u8, b: u8 },
    /// GPIO pin state.
    Gpio(u8),
    /// Operating mode switch.
    Mode(VehicleMode),
    /// Sampling probe control. The probe stops on its own after `timeout_secs`.
    Probe { action: ProbeAction, timeout_secs: u16 },
}

impl Command {
    /// Header byte for this command.
    pub fn header(&self) -> u8 {
        match self {
            Self::Move(_) => header::MOVE,
            Self::Pid(_) => header::PID,
            Self::Led { .. } => header::LED,
            Self::Gpio(_) => header::GPIO,
            Self::Mode(_) => header::MODE,
            Self::Probe { .. } => header::PROBE,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Move(_) => "move",
            Self::Pid(_) => "pid",
            Self::Led { .. } => "led",
            Self::Gpio(_) => "gpio",
            Self::Mode(_) => "mode",
            Self::Probe { .. } => "probe",
        }
    }

    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        packet_len(self.header()).unwrap_or_default()
    }

    /// Encode to an exact-length datagram.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u8(self.header());

        match *self {
            Self::Move(sp) => {
                buf.put_bytes(0, FLOAT_PAD);
                buf.put_f32_le(sp.forward);
                buf.put_f32_le(sp.lateral);
                buf.put_f32_le(sp.yaw);
            }
            Self::Pid(gains) => {
                buf.put_bytes(0, FLOAT_PAD);
                buf.put_f32_le(gains.p);
                buf.put_f32_le(gains.i);
                buf.put_f32_le(gains.d);
            }
            Self::Led { mode, r, g, b } => {
                buf.put_u8(mode.into());
                buf.put_u8(r);
                buf.put_u8(g);
                buf.put_u8(b);
            }
            Self::Gpio(state) => buf.put_u8(state),
            Self::Mode(mode) => buf.put_u8(mode.into()),
            Self::Probe {
                action,
                timeout_secs,
            } => {
                buf.put_u8(action.into());
                buf.put_u16_le(timeout_secs);
            }
        }

        debug_assert_eq!(buf.len(), self.encoded_len());
        buf.freeze()
    }

    /// Decode a command datagram, as the vehicle would.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let &hdr = data.first().ok_or(ProtocolError::EmptyDatagram)?;
        let expected = packet_len(hdr).ok_or(ProtocolError::InvalidHeader(hdr))?;

        if data.len() != expected {
            return Err(ProtocolError::MalformedPacket {
                header: hdr,
                expected,
                got: data.len(),
            });
        }

        let float = |index: usize| LittleEndian::read_f32(&data[FLOAT_OFFSET + index * 4..]);

        match hdr {
            header::MOVE => Ok(Self::Move(MovementSetpoint::new(
                float(0),
                float(1),
                float(2),
            ))),
            header::PID => Ok(Self::Pid(PidGains::new(float(0), float(1), float(2)))),
            header::LED => Ok(Self::Led {
                mode: LedMode::try_from(data[1])?,
                r: data[2],
                g: data[3],
                b: data[4],
            }),
            header::GPIO => Ok(Self::Gpio(data[1])),
            header::MODE => Ok(Self::Mode(VehicleMode::try_from(data[1])?)),
            header::PROBE => Ok(Self::Probe {
                action: ProbeAction::try_from(data[1])?,
                timeout_secs: LittleEndian::read_u16(&data[2..4]),
            }),
            // Telemetry is inbound only
            other => Err(ProtocolError::InvalidHeader(other)),
        }
    }
}
