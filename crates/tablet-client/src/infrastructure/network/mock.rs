//! In-memory resolver and transport for tests.
//!
//! # Why a recording transport?
//!
//! The real [`super::UdpConnector`] sends datagrams that a test can only
//! observe by binding its own socket, and it cannot be made to fail on
//! demand.  [`RecordingTransport`] replaces the socket with a log:
//!
//! - every frame is stored together with the peer it was sent to,
//! - every `connect` is recorded, in order,
//! - the number of links currently open (and the peak) is tracked, so tests
//!   can prove that the old link is closed before a new one is opened,
//! - `set_fail_connect` / `set_fail_send` simulate an unreachable host.
//!
//! # Usage in tests
//!
//! ```ignore
//! let transport = RecordingTransport::new();
//! let client = NetworkClient::new(
//!     Arc::new(StaticResolver::new()),
//!     Arc::new(transport.clone()),
//!     ClientSettings::default(),
//! );
//! client.start()?;
//! client.reconfigure("10.0.0.5:7273").await?;
//! client.submit(event);
//! client.shutdown().await;
//!
//! assert_eq!(transport.frames().len(), 1);
//! ```

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tablet_core::Endpoint;

use super::{DatagramConnector, DatagramLink, HostResolver, NetworkError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Resolves IP literals directly and names from a fixed table.
///
/// Anything else fails with [`NetworkError::Resolution`], which makes
/// "unresolvable host" trivially reproducible.
#[derive(Debug, Default)]
pub struct StaticResolver {
    names: HashMap<String, IpAddr>,
    lookups: Mutex<Vec<Endpoint>>,
}

impl StaticResolver {
    /// Creates a resolver that only knows IP literals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a name → address mapping.
    pub fn with_host(mut self, name: &str, ip: IpAddr) -> Self {
        self.names.insert(name.to_string(), ip);
        self
    }

    /// Every endpoint passed to `resolve`, in call order.
    pub fn lookups(&self) -> Vec<Endpoint> {
        lock(&self.lookups).clone()
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn resolve(&self, endpoint: &Endpoint) -> Result<SocketAddr, NetworkError> {
        lock(&self.lookups).push(endpoint.clone());
        let ip = endpoint
            .host
            .parse::<IpAddr>()
            .ok()
            .or_else(|| self.names.get(&endpoint.host).copied())
            .ok_or_else(|| NetworkError::Resolution {
                endpoint: endpoint.clone(),
                reason: "unknown host (static resolver)".to_string(),
            })?;
        Ok(SocketAddr::new(ip, endpoint.port))
    }
}

// ── Transport ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct TransportLog {
    frames: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
    connects: Mutex<Vec<SocketAddr>>,
    open_links: AtomicUsize,
    peak_open_links: AtomicUsize,
    fail_connect: AtomicBool,
    fail_send: AtomicBool,
}

/// A connector whose links record frames instead of sending them.
///
/// Cloning is cheap and every clone shares the same log, so a test keeps one
/// clone for assertions and hands another to the client.
#[derive(Debug, Default, Clone)]
pub struct RecordingTransport {
    log: Arc<TransportLog>,
}

impl RecordingTransport {
    /// Creates a transport with an empty log that accepts every connect and send.
    pub fn new() -> Self {
        Self::default()
    }

    /// All frames sent so far, with their destination.
    pub fn frames(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        lock(&self.log.frames).clone()
    }

    /// Frames sent to `peer`, in send order.
    pub fn frames_to(&self, peer: SocketAddr) -> Vec<Vec<u8>> {
        lock(&self.log.frames)
            .iter()
            .filter(|(addr, _)| *addr == peer)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    /// Every successful `connect` target, in call order.
    pub fn connects(&self) -> Vec<SocketAddr> {
        lock(&self.log.connects).clone()
    }

    /// Number of links that are currently open (created and not yet dropped).
    pub fn open_links(&self) -> usize {
        self.log.open_links.load(Ordering::SeqCst)
    }

    /// Highest number of links that were ever open at the same time.
    pub fn peak_open_links(&self) -> usize {
        self.log.peak_open_links.load(Ordering::SeqCst)
    }

    /// When `true`, `connect` fails with [`NetworkError::Connection`].
    pub fn set_fail_connect(&self, fail: bool) {
        self.log.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// When `true`, every `send` on every link fails.
    pub fn set_fail_send(&self, fail: bool) {
        self.log.fail_send.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatagramConnector for RecordingTransport {
    async fn connect(&self, addr: SocketAddr) -> Result<Box<dyn DatagramLink>, NetworkError> {
        if self.log.fail_connect.load(Ordering::SeqCst) {
            return Err(NetworkError::Connection {
                addr,
                reason: "connection refused (recording transport)".to_string(),
            });
        }
        lock(&self.log.connects).push(addr);
        let open = self.log.open_links.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.peak_open_links.fetch_max(open, Ordering::SeqCst);
        Ok(Box::new(RecordingLink {
            peer: addr,
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordingLink {
    peer: SocketAddr,
    log: Arc<TransportLog>,
}

#[async_trait]
impl DatagramLink for RecordingLink {
    fn peer(&self) -> SocketAddr {
        self.peer
    }

    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        if self.log.fail_send.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "send refused (recording transport)",
            ));
        }
        lock(&self.log.frames).push((self.peer, frame.to_vec()));
        Ok(())
    }
}

impl Drop for RecordingLink {
    fn drop(&mut self) {
        self.log.open_links.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_resolver_resolves_literals_and_table_entries() {
        let resolver =
            StaticResolver::new().with_host("studio-pc", "192.168.1.20".parse().unwrap());

        let literal = resolver.resolve(&Endpoint::new("10.0.0.5", 7273)).await;
        let named = resolver.resolve(&Endpoint::new("studio-pc", 40118)).await;

        assert_eq!(literal, Ok("10.0.0.5:7273".parse().unwrap()));
        assert_eq!(named, Ok("192.168.1.20:40118".parse().unwrap()));
        assert_eq!(resolver.lookups().len(), 2);
    }

    #[tokio::test]
    async fn test_static_resolver_rejects_unknown_names() {
        let resolver = StaticResolver::new();
        let result = resolver.resolve(&Endpoint::new("nowhere", 1)).await;
        assert!(matches!(result, Err(NetworkError::Resolution { .. })));
    }

    #[tokio::test]
    async fn test_recording_transport_tracks_open_links() {
        // Arrange
        let transport = RecordingTransport::new();
        let addr: SocketAddr = "10.0.0.5:1".parse().unwrap();

        // Act
        let first = transport.connect(addr).await.unwrap();
        let second = transport.connect(addr).await.unwrap();
        drop(first);

        // Assert
        assert_eq!(transport.open_links(), 1);
        assert_eq!(transport.peak_open_links(), 2);
        drop(second);
        assert_eq!(transport.open_links(), 0);
    }

    #[tokio::test]
    async fn test_recording_link_records_frames_and_honours_fail_flag() {
        let transport = RecordingTransport::new();
        let addr: SocketAddr = "10.0.0.5:1".parse().unwrap();
        let mut link = transport.connect(addr).await.unwrap();

        link.send(&[1, 2, 3]).await.unwrap();
        transport.set_fail_send(true);
        assert!(link.send(&[4]).await.is_err());

        assert_eq!(transport.frames_to(addr), vec![vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_fail_connect_does_not_count_as_open() {
        let transport = RecordingTransport::new();
        transport.set_fail_connect(true);

        let result = transport.connect("10.0.0.5:1".parse().unwrap()).await;

        assert!(matches!(result, Err(NetworkError::Connection { .. })));
        assert_eq!(transport.open_links(), 0);
        assert!(transport.connects().is_empty());
    }
}
