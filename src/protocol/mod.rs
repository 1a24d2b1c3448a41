//! Wire protocol between the ground station and the vehicle.
//!
//! Every datagram carries exactly one packet: a header byte followed by a
//! fixed payload. There is no version, length prefix or checksum; the
//! datagram boundary is the packet boundary. Multi-byte fields are
//! little-endian. Packets carrying 32-bit floats are naturally aligned, so
//! three zero bytes follow the header.
//!
//! ## Packet Formats
//!
//! ```text
//! Move       │ 0x01 │ pad (3) │ forward f32 │ lateral f32 │ yaw f32 │         16 bytes
//! PID        │ 0x02 │ pad (3) │ P f32 │ I f32 │ D f32 │                       16 bytes
//! Telemetry  │ 0x03 │ pad (3) │ roll │ pitch │ yaw │ adc │ pwm x4 │ P │ I │ D │ 48 bytes
//! LED        │ 0x04 │ mode u8 │ r u8 │ g u8 │ b u8 │                          5 bytes
//! GPIO       │ 0x05 │ state u8 │                                             2 bytes
//! Mode       │ 0x06 │ mode u8 │                                              2 bytes
//! Probe      │ 0x07 │ action u8 │ timeout u16 │                              4 bytes
//! ```

mod codec;
mod packet;

pub use codec::{decode_inbound, Inbound};
pub use packet::Command;

/// Header byte of each packet kind.
pub mod header {
    pub const MOVE: u8 = 0x01;
    pub const PID: u8 = 0x02;
    pub const TELEMETRY: u8 = 0x03;
    pub const LED: u8 = 0x04;
    pub const GPIO: u8 = 0x05;
    pub const MODE: u8 = 0x06;
    pub const PROBE: u8 = 0x07;
}

/// Padding between the header and the first float field.
pub const FLOAT_PAD: usize = 3;

/// Offset of the first float field in float-bearing packets.
pub const FLOAT_OFFSET: usize = 1 + FLOAT_PAD;

pub const MOVE_LEN: usize = FLOAT_OFFSET + 3 * 4;
pub const PID_LEN: usize = FLOAT_OFFSET + 3 * 4;
pub const TELEMETRY_LEN: usize = FLOAT_OFFSET + 11 * 4;
pub const LED_LEN: usize = 5;
pub const GPIO_LEN: usize = 2;
pub const MODE_LEN: usize = 2;
pub const PROBE_LEN: usize = 4;

/// Largest datagram the receive path needs to hold.
pub const MAX_DATAGRAM: usize = 1024;

/// Expected encoded length for a header, if the header is known.
pub fn packet_len(header: u8) -> Option<usize> {
    match header {
        header::MOVE => Some(MOVE_LEN),
        header::PID => Some(PID_LEN),
        header::TELEMETRY => Some(TELEMETRY_LEN),
        header::LED => Some(LED_LEN),
        header::GPIO => Some(GPIO_LEN),
        header::MODE => Some(MODE_LEN),
        header::PROBE => Some(PROBE_LEN),
        _ => None,
    }
}
