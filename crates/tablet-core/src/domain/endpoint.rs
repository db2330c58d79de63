//! The transmission target for the input event stream.
//!
//! An [`Endpoint`] is only a name and a port.  Turning it into a socket
//! address (DNS lookup) is the client's job and may fail; parsing the user's
//! host string into an `Endpoint` is purely syntactic and happens here.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// UDP port the host-side driver listens on for input frames.
pub const DEFAULT_INPUT_PORT: u16 = 40118;

/// RTSP port of the host's screen-mirroring stream.
///
/// The mirror is played by a separate video component; the constant lives
/// here so both sides agree on the default.
pub const DEFAULT_MIRROR_PORT: u16 = 8554;

/// Errors produced while parsing a host string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    /// The host part is empty (unset preference, whitespace, `":40118"`).
    #[error("host name is empty")]
    EmptyHost,

    /// The port is not a number in `1..=65535`.
    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    /// An IPv6 literal opened with `[` but never closed.
    #[error("unterminated IPv6 literal: {0:?}")]
    UnterminatedBracket(String),
}

/// A `(host, port)` pair that input events are sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Creates an endpoint from already-validated parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses a user-supplied host string.
    ///
    /// Accepted forms (surrounding whitespace is ignored):
    ///
    /// | Input               | Host          | Port           |
    /// |---------------------|---------------|----------------|
    /// | `tablet-host`       | `tablet-host` | `default_port` |
    /// | `10.0.0.5:7273`     | `10.0.0.5`    | `7273`         |
    /// | `[fe80::1]:7273`    | `fe80::1`     | `7273`         |
    /// | `[fe80::1]`         | `fe80::1`     | `default_port` |
    /// | `fe80::1`           | `fe80::1`     | `default_port` |
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] for an empty host, a bad port, or an
    /// unterminated `[`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tablet_core::Endpoint;
    ///
    /// let ep = Endpoint::parse("10.0.0.5:7273", 40118).unwrap();
    /// assert_eq!(ep, Endpoint::new("10.0.0.5", 7273));
    /// ```
    pub fn parse(input: &str, default_port: u16) -> Result<Self, EndpointError> {
        let input = input.trim();

        if let Some(rest) = input.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| EndpointError::UnterminatedBracket(input.to_string()))?;
            let port = match after {
                "" => default_port,
                _ => match after.strip_prefix(':') {
                    Some(port) => parse_port(port)?,
                    None => return Err(EndpointError::InvalidPort(after.to_string())),
                },
            };
            return Self::checked(host, port);
        }

        match input.matches(':').count() {
            0 => Self::checked(input, default_port),
            1 => {
                let (host, port) = input.split_once(':').unwrap_or((input, ""));
                Self::checked(host, parse_port(port)?)
            }
            // Several colons without brackets can only be a bare IPv6 literal.
            _ => Self::checked(input, default_port),
        }
    }

    fn checked(host: &str, port: u16) -> Result<Self, EndpointError> {
        if host.is_empty() {
            return Err(EndpointError::EmptyHost);
        }
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn parse_port(raw: &str) -> Result<u16, EndpointError> {
    match raw.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(EndpointError::InvalidPort(raw.to_string())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_host_uses_default_port() {
        let ep = Endpoint::parse("tablet-host.local", DEFAULT_INPUT_PORT).unwrap();
        assert_eq!(ep, Endpoint::new("tablet-host.local", 40118));
    }

    #[test]
    fn test_parse_host_with_port() {
        let ep = Endpoint::parse("10.0.0.5:7273", DEFAULT_INPUT_PORT).unwrap();
        assert_eq!(ep.host, "10.0.0.5");
        assert_eq!(ep.port, 7273);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let ep = Endpoint::parse("  host \n", 1).unwrap();
        assert_eq!(ep, Endpoint::new("host", 1));
    }

    #[test]
    fn test_parse_bracketed_ipv6_with_and_without_port() {
        assert_eq!(
            Endpoint::parse("[fe80::1]:9000", 1).unwrap(),
            Endpoint::new("fe80::1", 9000)
        );
        assert_eq!(
            Endpoint::parse("[::1]", 40118).unwrap(),
            Endpoint::new("::1", 40118)
        );
    }

    #[test]
    fn test_parse_bare_ipv6_uses_default_port() {
        let ep = Endpoint::parse("fe80::1", 40118).unwrap();
        assert_eq!(ep, Endpoint::new("fe80::1", 40118));
    }

    #[test]
    fn test_parse_empty_or_blank_is_empty_host() {
        assert_eq!(Endpoint::parse("", 1), Err(EndpointError::EmptyHost));
        assert_eq!(Endpoint::parse("   ", 1), Err(EndpointError::EmptyHost));
        assert_eq!(Endpoint::parse(":40118", 1), Err(EndpointError::EmptyHost));
        assert_eq!(Endpoint::parse("[]:40118", 1), Err(EndpointError::EmptyHost));
    }

    #[test]
    fn test_parse_rejects_bad_ports() {
        assert!(matches!(
            Endpoint::parse("host:abc", 1),
            Err(EndpointError::InvalidPort(_))
        ));
        assert!(matches!(
            Endpoint::parse("host:0", 1),
            Err(EndpointError::InvalidPort(_))
        ));
        assert!(matches!(
            Endpoint::parse("host:70000", 1),
            Err(EndpointError::InvalidPort(_))
        ));
        assert!(matches!(
            Endpoint::parse("[::1]x", 1),
            Err(EndpointError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_parse_unterminated_bracket() {
        assert!(matches!(
            Endpoint::parse("[::1:80", 1),
            Err(EndpointError::UnterminatedBracket(_))
        ));
    }

    #[test]
    fn test_display_brackets_ipv6_hosts() {
        assert_eq!(Endpoint::new("10.0.0.5", 7273).to_string(), "10.0.0.5:7273");
        assert_eq!(Endpoint::new("::1", 40118).to_string(), "[::1]:40118");
    }

    #[test]
    fn test_display_output_parses_back() {
        for ep in [Endpoint::new("host", 5), Endpoint::new("fe80::2", 6)] {
            assert_eq!(Endpoint::parse(&ep.to_string(), 1).unwrap(), ep);
        }
    }
}
