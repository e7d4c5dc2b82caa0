//! Core types for the snipnet protocol
//!
//! Peers are identified by their UDP endpoint, serialized as `host:port` in
//! dotted-quad form everywhere it crosses a boundary: wire payloads, audit
//! records, and the registry report.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

use crate::errors::WireError;

// ----------------------------------------------------------------------------
// Lamport Timestamp
// ----------------------------------------------------------------------------

/// Lamport logical timestamp carried on every snippet.
pub type Lamport = u64;

// ----------------------------------------------------------------------------
// Peer Address
// ----------------------------------------------------------------------------

/// Network address of a peer: IPv4 host plus UDP port.
///
/// Two addresses compare equal iff both host and port match. Ordering is
/// lexicographic over (host octets, port) so sets of peers iterate
/// deterministically in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddr(SocketAddrV4);

impl PeerAddr {
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Self(SocketAddrV4::new(host, port))
    }

    pub fn host(&self) -> Ipv4Addr {
        *self.0.ip()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }

    /// The underlying socket address, for bind/connect/send_to calls.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(self.0)
    }
}

impl PartialOrd for PeerAddr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PeerAddr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.host().octets(), self.port()).cmp(&(other.host().octets(), other.port()))
    }
}

impl From<SocketAddrV4> for PeerAddr {
    fn from(addr: SocketAddrV4) -> Self {
        Self(addr)
    }
}

impl TryFrom<SocketAddr> for PeerAddr {
    type Error = WireError;

    fn try_from(addr: SocketAddr) -> Result<Self, Self::Error> {
        match addr {
            SocketAddr::V4(v4) => Ok(Self(v4)),
            SocketAddr::V6(_) => Err(WireError::InvalidAddress {
                input: addr.to_string(),
            }),
        }
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0.ip(), self.0.port())
    }
}

impl FromStr for PeerAddr {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WireError::InvalidAddress {
            input: s.to_string(),
        };
        let (host, port) = s.split_once(':').ok_or_else(invalid)?;
        let host: Ipv4Addr = host.trim().parse().map_err(|_| invalid())?;
        let port: u16 = port.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(host, port))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trip() {
        let addr = PeerAddr::new(Ipv4Addr::new(10, 0, 0, 7), 12000);
        assert_eq!(addr.to_string(), "10.0.0.7:12000");
        assert_eq!("10.0.0.7:12000".parse::<PeerAddr>().unwrap(), addr);
    }

    #[test]
    fn equality_requires_both_fields() {
        let a = PeerAddr::new(Ipv4Addr::LOCALHOST, 12000);
        let b = PeerAddr::new(Ipv4Addr::LOCALHOST, 12001);
        let c = PeerAddr::new(Ipv4Addr::new(127, 0, 0, 2), 12000);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, PeerAddr::new(Ipv4Addr::LOCALHOST, 12000));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!("12000".parse::<PeerAddr>().is_err());
        assert!("localhost:12000".parse::<PeerAddr>().is_err());
        assert!("1.2.3.4:notaport".parse::<PeerAddr>().is_err());
        assert!("1.2.3.4:99999".parse::<PeerAddr>().is_err());
        assert!("null".parse::<PeerAddr>().is_err());
    }

    #[test]
    fn ordering_is_host_then_port() {
        let mut peers = vec![
            PeerAddr::new(Ipv4Addr::new(10, 0, 0, 2), 1),
            PeerAddr::new(Ipv4Addr::new(10, 0, 0, 1), 9),
            PeerAddr::new(Ipv4Addr::new(10, 0, 0, 1), 2),
        ];
        peers.sort();
        assert_eq!(
            peers.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["10.0.0.1:2", "10.0.0.1:9", "10.0.0.2:1"]
        );
    }

    #[test]
    fn rejects_ipv6_socket_addrs() {
        let v6: SocketAddr = "[::1]:9000".parse().unwrap();
        assert!(PeerAddr::try_from(v6).is_err());
    }
}
