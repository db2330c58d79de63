//! Infrastructure layer for the client application.
//!
//! Contains OS-facing adapters: UDP network I/O, host name resolution, and
//! configuration file persistence.
//!
//! **Dependency rule**: this layer may depend on `tablet_core`, but the
//! domain crate never imports from here.
//!
//! # Sub-modules
//!
//! - **`network`** – The network worker that owns the UDP socket, the traits
//!   it talks through (`HostResolver`, `DatagramConnector`, `DatagramLink`),
//!   their production implementations, and an in-memory recording transport
//!   for tests.
//!
//! - **`storage`** – TOML configuration file and the in-memory settings store
//!   that notifies subscribers when the target host changes.

pub mod network;
pub mod storage;
