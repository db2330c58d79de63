//! Binary codec for encoding and decoding NetTablet event frames.
//!
//! Wire format:
//! ```text
//! [opcode:1][field:N]...
//! ```
//! Fields follow the declaration order of the event struct.  All multi-byte
//! integers are big-endian, booleans are a single `0x00`/`0x01` byte, and
//! every frame of a given opcode has the same length (see
//! [`Opcode::frame_len`]).  There is no header, no length prefix and no
//! sequence number: each frame travels as one independent UDP datagram.

use thiserror::Error;

use crate::protocol::messages::{ButtonEvent, DeviceChange, Event, Opcode, PointerUpdate, ToolState};

/// Errors that can occur while decoding a frame.
///
/// Encoding cannot fail: every [`Event`] has a fixed-size representation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The buffer contained no bytes at all.
    #[error("empty frame")]
    Empty,

    /// The first byte is not a recognized opcode.
    #[error("unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// The buffer is shorter than the fixed frame size of its opcode.
    #[error("insufficient data for {opcode:?}: need {needed} bytes, got {available}")]
    InsufficientData {
        opcode: Opcode,
        needed: usize,
        available: usize,
    },

    /// A field holds a value outside its domain (unknown tool, bad bool byte).
    #[error("malformed field {field}: 0x{value:02X}")]
    MalformedField { field: &'static str, value: u8 },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an [`Event`] into a freshly allocated frame.
///
/// # Examples
///
/// ```rust
/// use tablet_core::{decode_event, encode_event, Event, PointerUpdate, ToolState};
///
/// let event = Event::PointerUpdate(PointerUpdate {
///     x: 100, y: 200, pressure: 300, orientation: 0,
///     tool: ToolState::Stylus, device_id: 1,
/// });
/// let frame = encode_event(&event);
/// assert_eq!(frame.len(), 11);
/// assert_eq!(decode_event(&frame).unwrap(), event);
/// ```
pub fn encode_event(event: &Event) -> Vec<u8> {
    let mut buf = Vec::with_capacity(event.opcode().frame_len());
    encode_event_into(event, &mut buf);
    buf
}

/// Appends the frame for `event` to `buf`.
///
/// The caller clears `buf` between frames; this lets a hot send loop reuse a
/// single allocation for every datagram.
pub fn encode_event_into(event: &Event, buf: &mut Vec<u8>) {
    buf.push(event.opcode() as u8);
    match event {
        Event::PointerUpdate(p) => encode_pointer_update(buf, p),
        Event::Button(b) => encode_button(buf, b),
        Event::DeviceChange(d) => encode_device_change(buf, d),
        Event::Disconnect => {} // opcode only
    }
}

/// Decodes one [`Event`] from the beginning of `bytes`.
///
/// Bytes beyond the fixed frame size are ignored.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the opcode is unknown, the buffer is shorter
/// than the opcode's frame size, or a field is out of range.
pub fn decode_event(bytes: &[u8]) -> Result<Event, ProtocolError> {
    let (&op_byte, payload) = bytes.split_first().ok_or(ProtocolError::Empty)?;
    let opcode = Opcode::try_from(op_byte).map_err(|_| ProtocolError::UnknownOpcode(op_byte))?;

    let needed = opcode.frame_len();
    if bytes.len() < needed {
        return Err(ProtocolError::InsufficientData {
            opcode,
            needed,
            available: bytes.len(),
        });
    }

    match opcode {
        Opcode::PointerUpdate => decode_pointer_update(payload).map(Event::PointerUpdate),
        Opcode::Button => decode_button(payload).map(Event::Button),
        Opcode::DeviceChange => decode_device_change(payload).map(Event::DeviceChange),
        Opcode::Disconnect => Ok(Event::Disconnect),
    }
}

// ── Per-variant encode helpers ────────────────────────────────────────────────

fn encode_pointer_update(buf: &mut Vec<u8>, p: &PointerUpdate) {
    buf.extend_from_slice(&p.x.to_be_bytes());
    buf.extend_from_slice(&p.y.to_be_bytes());
    buf.extend_from_slice(&p.pressure.to_be_bytes());
    buf.extend_from_slice(&p.orientation.to_be_bytes());
    buf.push(p.tool as u8);
    buf.push(p.device_id);
}

fn encode_button(buf: &mut Vec<u8>, b: &ButtonEvent) {
    buf.push(b.button_id);
    buf.push(u8::from(b.pressed));
    buf.push(b.device_id);
}

fn encode_device_change(buf: &mut Vec<u8>, d: &DeviceChange) {
    buf.push(d.device_id);
    buf.push(u8::from(d.present));
}

// ── Per-variant decode helpers ────────────────────────────────────────────────
//
// Length has already been checked against `Opcode::frame_len`, so direct
// indexing below cannot go out of bounds.

fn decode_pointer_update(p: &[u8]) -> Result<PointerUpdate, ProtocolError> {
    let tool = ToolState::try_from(p[8]).map_err(|_| ProtocolError::MalformedField {
        field: "tool",
        value: p[8],
    })?;
    Ok(PointerUpdate {
        x: u16::from_be_bytes([p[0], p[1]]),
        y: u16::from_be_bytes([p[2], p[3]]),
        pressure: u16::from_be_bytes([p[4], p[5]]),
        orientation: i16::from_be_bytes([p[6], p[7]]),
        tool,
        device_id: p[9],
    })
}

fn decode_button(p: &[u8]) -> Result<ButtonEvent, ProtocolError> {
    Ok(ButtonEvent {
        button_id: p[0],
        pressed: read_bool(p[1], "pressed")?,
        device_id: p[2],
    })
}

fn decode_device_change(p: &[u8]) -> Result<DeviceChange, ProtocolError> {
    Ok(DeviceChange {
        device_id: p[0],
        present: read_bool(p[1], "present")?,
    })
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn read_bool(value: u8, field: &'static str) -> Result<bool, ProtocolError> {
    match value {
        0x00 => Ok(false),
        0x01 => Ok(true),
        _ => Err(ProtocolError::MalformedField { field, value }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
