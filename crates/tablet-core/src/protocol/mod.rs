//! Protocol module containing the event types and the binary codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_event, encode_event, encode_event_into, ProtocolError};
pub use messages::*;
