//! # tablet-core
//!
//! Shared library for NetTablet containing the input event model, the
//! endpoint type, and the binary wire codec.
//!
//! This crate has zero dependencies on OS APIs, UI frameworks, or network
//! sockets.  Everything that touches a socket lives in `tablet-client`.
//!
//! # Architecture overview (for beginners)
//!
//! NetTablet turns a touch or stylus device into a remote drawing tablet for
//! a host computer.  The device captures pointer samples, converts them to
//! [`Event`] values, and streams one small UDP datagram per event to the host.
//!
//! - **`protocol`** – The event types and how they travel over the network.
//!   Every event encodes to a *fixed-size* frame: a one-byte opcode followed
//!   by big-endian integers.  Because the size depends only on the opcode, a
//!   receiver never needs a length prefix.
//!
//! - **`domain`** – Plain value types with no I/O.  The [`Endpoint`] describes
//!   where the event stream is currently sent.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `tablet_core::Event` instead of `tablet_core::protocol::messages::Event`.
pub use domain::endpoint::{Endpoint, EndpointError, DEFAULT_INPUT_PORT, DEFAULT_MIRROR_PORT};
pub use protocol::codec::{decode_event, encode_event, encode_event_into, ProtocolError};
pub use protocol::messages::{
    ButtonEvent, DeviceChange, Event, Opcode, PointerUpdate, ToolState, PROXIMITY_BUTTON,
    TIP_BUTTON,
};
