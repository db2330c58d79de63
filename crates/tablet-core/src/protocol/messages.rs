//! All NetTablet input event types.
//!
//! Every event is a small, immutable value.  Coordinates and pressure are
//! fixed-point values in `[0, 65535]`; the producer (the capture surface)
//! normalizes them before the event is constructed, so the same frame means
//! the same thing regardless of the device's physical resolution.

use serde::{Deserialize, Serialize};

// ── Well-known button identifiers ─────────────────────────────────────────────

/// Button id reported while the tool touches the surface.
pub const TIP_BUTTON: u8 = 0x00;

/// Button id reported while the tool is within hover range of the surface.
///
/// The host driver treats a press of this button as "pen in proximity" and
/// the matching release as "pen left proximity".
pub const PROXIMITY_BUTTON: u8 = 0xFF;

// ── Tool state ────────────────────────────────────────────────────────────────

/// Which end of the tool produced a pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ToolState {
    Touch = 0x00,
    Stylus = 0x01,
    Eraser = 0x02,
}

impl TryFrom<u8> for ToolState {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ToolState::Touch),
            0x01 => Ok(ToolState::Stylus),
            0x02 => Ok(ToolState::Eraser),
            _ => Err(()),
        }
    }
}

// ── Opcodes ───────────────────────────────────────────────────────────────────

/// First byte of every frame; identifies the event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    PointerUpdate = 0x01,
    Button = 0x02,
    DeviceChange = 0x03,
    Disconnect = 0x04,
}

impl Opcode {
    /// Total frame size in bytes (opcode included) for this opcode.
    ///
    /// | Opcode          | Layout                                   | Size |
    /// |-----------------|------------------------------------------|------|
    /// | `PointerUpdate` | op, x:2, y:2, pressure:2, orient:2, tool:1, dev:1 | 11 |
    /// | `Button`        | op, button:1, pressed:1, dev:1           | 4    |
    /// | `DeviceChange`  | op, dev:1, present:1                     | 3    |
    /// | `Disconnect`    | op                                       | 1    |
    pub const fn frame_len(self) -> usize {
        match self {
            Opcode::PointerUpdate => 11,
            Opcode::Button => 4,
            Opcode::DeviceChange => 3,
            Opcode::Disconnect => 1,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(Opcode::PointerUpdate),
            0x02 => Ok(Opcode::Button),
            0x03 => Ok(Opcode::DeviceChange),
            0x04 => Ok(Opcode::Disconnect),
            _ => Err(()),
        }
    }
}

// ── Per-variant payload structs ───────────────────────────────────────────────

/// A sampled position / pressure / orientation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointerUpdate {
    /// Horizontal position, `0` = left edge, `65535` = right edge.
    pub x: u16,
    /// Vertical position, `0` = top edge, `65535` = bottom edge.
    pub y: u16,
    /// Normalized pressure.
    pub pressure: u16,
    /// Tool orientation; `0` points straight up, the sign gives the direction.
    pub orientation: i16,
    pub tool: ToolState,
    pub device_id: u8,
}

/// A button transitioned to pressed or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub button_id: u8,
    pub pressed: bool,
    pub device_id: u8,
}

/// An input device was attached (`present = true`) or detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceChange {
    pub device_id: u8,
    pub present: bool,
}

// ── Top-level event enum ──────────────────────────────────────────────────────

/// One discrete occurrence in the input stream.
///
/// `Disconnect` is the sentinel that tells the network worker to stop; it is
/// never produced by the capture surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    PointerUpdate(PointerUpdate),
    Button(ButtonEvent),
    DeviceChange(DeviceChange),
    Disconnect,
}

impl Event {
    /// Returns the wire opcode for this event.
    pub fn opcode(&self) -> Opcode {
        match self {
            Event::PointerUpdate(_) => Opcode::PointerUpdate,
            Event::Button(_) => Opcode::Button,
            Event::DeviceChange(_) => Opcode::DeviceChange,
            Event::Disconnect => Opcode::Disconnect,
        }
    }

    /// Returns `true` for the shutdown sentinel.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Event::Disconnect)
    }

    /// Returns the device that produced the event, if any.
    pub fn device_id(&self) -> Option<u8> {
        match self {
            Event::PointerUpdate(p) => Some(p.device_id),
            Event::Button(b) => Some(b.device_id),
            Event::DeviceChange(d) => Some(d.device_id),
            Event::Disconnect => None,
        }
    }
}

impl From<PointerUpdate> for Event {
    fn from(value: PointerUpdate) -> Self {
        Event::PointerUpdate(value)
    }
}

impl From<ButtonEvent> for Event {
    fn from(value: ButtonEvent) -> Self {
        Event::Button(value)
    }
}

impl From<DeviceChange> for Event {
    fn from(value: DeviceChange) -> Self {
        Event::DeviceChange(value)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_try_from_accepts_every_defined_value() {
        for op in [
            Opcode::PointerUpdate,
            Opcode::Button,
            Opcode::DeviceChange,
            Opcode::Disconnect,
        ] {
            assert_eq!(Opcode::try_from(op as u8), Ok(op));
        }
    }

    #[test]
    fn test_opcode_try_from_rejects_zero_and_unknown() {
        assert!(Opcode::try_from(0x00).is_err());
        assert!(Opcode::try_from(0x05).is_err());
        assert!(Opcode::try_from(0xFF).is_err());
    }

    #[test]
    fn test_tool_state_discriminants_are_stable() {
        // The host driver depends on these exact values.
        assert_eq!(ToolState::Touch as u8, 0);
        assert_eq!(ToolState::Stylus as u8, 1);
        assert_eq!(ToolState::Eraser as u8, 2);
        assert!(ToolState::try_from(3).is_err());
    }

    #[test]
    fn test_event_opcode_matches_variant() {
        let pointer = Event::PointerUpdate(PointerUpdate {
            x: 0,
            y: 0,
            pressure: 0,
            orientation: 0,
            tool: ToolState::Touch,
            device_id: 0,
        });
        assert_eq!(pointer.opcode(), Opcode::PointerUpdate);
        assert_eq!(Event::Disconnect.opcode(), Opcode::Disconnect);
    }

    #[test]
    fn test_only_disconnect_is_the_sentinel() {
        let button = Event::Button(ButtonEvent {
            button_id: TIP_BUTTON,
            pressed: true,
            device_id: 2,
        });
        assert!(!button.is_disconnect());
        assert!(Event::Disconnect.is_disconnect());
        assert_eq!(button.device_id(), Some(2));
        assert_eq!(Event::Disconnect.device_id(), None);
    }

    #[test]
    fn test_from_impls_wrap_payloads() {
        let change = DeviceChange {
            device_id: 4,
            present: false,
        };
        assert_eq!(Event::from(change), Event::DeviceChange(change));
    }
}
