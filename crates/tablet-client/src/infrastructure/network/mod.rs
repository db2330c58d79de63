//! Network infrastructure for the client application.
//!
//! Architecture:
//! - [`worker::NetworkWorker`] is the single consumer of the event channel.
//!   It owns the current endpoint and the live datagram link.
//! - Name resolution and socket creation go through the [`HostResolver`] and
//!   [`DatagramConnector`] traits so the worker can be driven by the
//!   in-memory [`mock::RecordingTransport`] in tests.
//! - [`udp`] holds the production implementations (`tokio::net`).
//!
//! Every failure in this layer is recovered locally: it is logged, published
//! through the worker's [`worker::LinkState`], and never propagated back
//! across the channel to producers.

use std::net::SocketAddr;

use async_trait::async_trait;
use tablet_core::{Endpoint, EndpointError};
use thiserror::Error;

pub mod mock;
pub mod udp;
pub mod worker;

pub use udp::{SystemResolver, UdpConnector};
pub use worker::{
    LinkState, LinkStatus, NetworkWorker, ReconfigureOutcome, WorkerCommand, WorkerReport,
};

/// Errors that can occur in the client network layer.
///
/// Reasons from the OS are stored as strings so the error can be cloned into
/// the published [`LinkState`] and compared in tests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    /// The configured host string could not be parsed.
    #[error("invalid host {input:?}: {source}")]
    InvalidEndpoint {
        input: String,
        #[source]
        source: EndpointError,
    },

    /// The host name could not be resolved to a socket address.
    #[error("could not resolve {endpoint}: {reason}")]
    Resolution { endpoint: Endpoint, reason: String },

    /// A datagram socket to the resolved address could not be opened.
    #[error("could not open datagram socket to {addr}: {reason}")]
    Connection { addr: SocketAddr, reason: String },

    /// A single frame could not be sent on an open link.
    #[error("failed to send frame to {addr}: {reason}")]
    Transmission { addr: SocketAddr, reason: String },

    /// The network worker has terminated (or was never started and then dropped).
    #[error("network worker is not running")]
    WorkerStopped,
}

/// Turns an [`Endpoint`] into a socket address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolves `endpoint`, returning one address to send to.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Resolution`] if the name does not resolve.
    async fn resolve(&self, endpoint: &Endpoint) -> Result<SocketAddr, NetworkError>;
}

/// Opens datagram links.
#[async_trait]
pub trait DatagramConnector: Send + Sync {
    /// Opens a link whose every send goes to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Connection`] if no socket could be created.
    async fn connect(&self, addr: SocketAddr) -> Result<Box<dyn DatagramLink>, NetworkError>;
}

/// A live, connected datagram socket.  Dropping the link closes it.
#[async_trait]
pub trait DatagramLink: Send {
    /// The address every frame is sent to.
    fn peer(&self) -> SocketAddr;

    /// Sends one frame as one datagram.
    async fn send(&mut self, frame: &[u8]) -> std::io::Result<()>;
}
