//! Inbound datagram decoding and telemetry encoding.

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};

use super::{header, FLOAT_OFFSET, FLOAT_PAD, TELEMETRY_LEN};
use crate::error::ProtocolError;
use crate::types::{PidGains, TelemetrySnapshot};

/// Result of decoding a datagram received on the telemetry socket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Inbound {
    /// A well-formed telemetry packet.
    Telemetry(TelemetrySnapshot),
    /// A packet of another kind; not expected inbound and discarded.
    Ignored(u8),
}

/// Decode a datagram received on the telemetry socket.
pub fn decode_inbound(data: &[u8]) -> Result<Inbound, ProtocolError> {
    let &hdr = data.first().ok_or(ProtocolError::EmptyDatagram)?;

    if hdr != header::TELEMETRY {
        return Ok(Inbound::Ignored(hdr));
    }

    TelemetrySnapshot::decode(data).map(Inbound::Telemetry)
}

impl TelemetrySnapshot {
    /// Decode a telemetry packet, header included.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let &hdr = data.first().ok_or(ProtocolError::EmptyDatagram)?;
        if hdr != header::TELEMETRY {
            return Err(ProtocolError::InvalidHeader(hdr));
        }
        if data.len() != TELEMETRY_LEN {
            return Err(ProtocolError::MalformedPacket {
                header: hdr,
                expected: TELEMETRY_LEN,
                got: data.len(),
            });
        }

        let mut fields = [0f32; 11];
        LittleEndian::read_f32_into(&data[FLOAT_OFFSET..], &mut fields);

        Ok(Self {
            roll: fields[0],
            pitch: fields[1],
            yaw: fields[2],
            adc_value: fields[3],
            motor_pwm: [fields[4], fields[5], fields[6], fields[7]],
            pid: PidGains::new(fields[8], fields[9], fields[10]),
        })
    }

    /// Encode as the vehicle would send it.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(TELEMETRY_LEN);
        buf.put_u8(header::TELEMETRY);
        buf.put_bytes(0, FLOAT_PAD);
        for value in [self.roll, self.pitch, self.yaw, self.adc_value] {
            buf.put_f32_le(value);
        }
        for pwm in self.motor_pwm {
            buf.put_f32_le(pwm);
        }
        buf.put_f32_le(self.pid.p);
        buf.put_f32_le(self.pid.i);
        buf.put_f32_le(self.pid.d);
        buf.freeze()
    }
}
