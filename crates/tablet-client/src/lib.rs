//! tablet-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does tablet-client do? (for beginners)
//!
//! The *client* runs on the touch/stylus device.  The UI layer hands it a
//! continuous stream of input [`tablet_core::Event`]s; the client forwards
//! each one to the host computer as a single UDP datagram.
//!
//! 1. Pointer samples are normalized into events (`application::capture_input`).
//! 2. Events are pushed into an unbounded ordered channel (`NetworkClient::submit`).
//! 3. A single background worker drains the channel, encodes each event and
//!    sends it over the current UDP socket (`infrastructure::network`).
//! 4. When the configured host changes, a reconfiguration request travels the
//!    *same* channel, so events queued before the change go to the old host
//!    and events queued after go to the new one.
//!
//! Events submitted while no host is reachable are dropped, never buffered:
//! a burst of stale pen positions after a reconnect is worse than a gap.

/// Application layer: use cases (client facade, settings follower, pointer translation).
pub mod application;

/// Infrastructure layer: sockets, name resolution, and configuration storage.
pub mod infrastructure;
