//! Production resolver and connector backed by `tokio::net`.
//!
//! # Why a *connected* UDP socket?
//!
//! UDP has no connection, but calling `connect` on a UDP socket fixes its
//! default destination.  After that, `send` needs no address argument and
//! the kernel filters out datagrams from any other peer.  The worker opens a
//! new socket for every endpoint change, so "close the connection" is simply
//! "drop the socket".

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tablet_core::Endpoint;
use tokio::net::{lookup_host, UdpSocket};
use tracing::debug;

use super::{DatagramConnector, DatagramLink, HostResolver, NetworkError};

/// Resolves host names with the operating system's resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, endpoint: &Endpoint) -> Result<SocketAddr, NetworkError> {
        let addrs: Vec<SocketAddr> = lookup_host((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| NetworkError::Resolution {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?
            .collect();

        debug!("{endpoint} resolved to {addrs:?}");
        pick_address(&addrs).ok_or_else(|| NetworkError::Resolution {
            endpoint: endpoint.clone(),
            reason: "no addresses returned".to_string(),
        })
    }
}

/// Picks the address to send to, preferring IPv4.
///
/// Host-side receivers commonly bind `0.0.0.0` only, so an IPv4 result is
/// the safer choice when a name has both.
fn pick_address(addrs: &[SocketAddr]) -> Option<SocketAddr> {
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}

/// Opens one connected `UdpSocket` per link.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpConnector;

#[async_trait]
impl DatagramConnector for UdpConnector {
    async fn connect(&self, addr: SocketAddr) -> Result<Box<dyn DatagramLink>, NetworkError> {
        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let connection_error = |e: io::Error| NetworkError::Connection {
            addr,
            reason: e.to_string(),
        };

        let socket = UdpSocket::bind(local).await.map_err(connection_error)?;
        socket.connect(addr).await.map_err(connection_error)?;
        debug!(
            "datagram socket {} -> {addr} opened",
            socket.local_addr().map_or_else(|_| "?".to_string(), |a| a.to_string())
        );

        Ok(Box::new(UdpLink { socket, peer: addr }))
    }
}

/// A connected UDP socket.
pub struct UdpLink {
    socket: UdpSocket,
    peer: SocketAddr,
}

#[async_trait]
impl DatagramLink for UdpLink {
    fn peer(&self) -> SocketAddr {
        self.peer
    }

    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let written = self.socket.send(frame).await?;
        if written != frame.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short datagram: {written} of {} bytes", frame.len()),
            ));
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pick_address_prefers_ipv4() {
        let v6: SocketAddr = "[::1]:40118".parse().unwrap();
        let v4: SocketAddr = "127.0.0.1:40118".parse().unwrap();
        assert_eq!(pick_address(&[v6, v4]), Some(v4));
    }

    #[test]
    fn test_pick_address_falls_back_to_first_ipv6() {
        let v6: SocketAddr = "[::1]:40118".parse().unwrap();
        assert_eq!(pick_address(&[v6]), Some(v6));
        assert_eq!(pick_address(&[]), None);
    }

    #[tokio::test]
    async fn test_system_resolver_passes_ip_literals_through() {
        // Arrange
        let endpoint = Endpoint::new("127.0.0.1", 7273);

        // Act
        let addr = SystemResolver.resolve(&endpoint).await.expect("literal must resolve");

        // Assert
        assert_eq!(addr, "127.0.0.1:7273".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_system_resolver_fails_for_reserved_invalid_tld() {
        // `.invalid` is reserved by RFC 2606 and never resolves.
        let endpoint = Endpoint::new("unknown.invalid", 40118);

        let result = SystemResolver.resolve(&endpoint).await;

        assert!(matches!(result, Err(NetworkError::Resolution { .. })));
    }

    #[tokio::test]
    async fn test_udp_link_delivers_frame_as_single_datagram() {
        // Arrange: a local receiver standing in for the host driver.
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap();

        // Act
        let mut link = UdpConnector.connect(target).await.expect("connect");
        link.send(&[0x04]).await.expect("send");
        link.send(&[0x03, 0x07, 0x01]).await.expect("send");

        // Assert
        let mut buf = [0u8; 64];
        let n = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .expect("first datagram within 2s")
            .unwrap();
        assert_eq!(&buf[..n], &[0x04]);
        let n = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .expect("second datagram within 2s")
            .unwrap();
        assert_eq!(&buf[..n], &[0x03, 0x07, 0x01]);
        assert_eq!(link.peer(), target);
    }
}
