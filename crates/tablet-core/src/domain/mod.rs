//! Domain value types for NetTablet.
//!
//! Nothing in here performs I/O.  Name resolution and socket handling happen
//! in the client's infrastructure layer; the domain only describes *where*
//! events should go.

/// Transmission target (`host:port`) and its parser.
pub mod endpoint;
