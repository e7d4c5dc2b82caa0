//! UDP wire codec
//!
//! Datagrams are line-oriented ASCII with a fixed 4-byte verb prefix:
//!
//! | Verb   | Payload        | Meaning                                   |
//! |--------|----------------|-------------------------------------------|
//! | `peer` | `host:port`    | Heartbeat; sender announces its address.  |
//! | `snip` | `T SP text`    | Snippet with Lamport timestamp `T`.       |
//! | `stop` | —              | Shutdown trigger.                         |
//!
//! The payload is everything after the verb, trimmed of surrounding
//! whitespace. A `snip` payload splits at the first space; the text may
//! itself contain spaces.

use crate::errors::WireError;
use crate::types::{Lamport, PeerAddr};

/// Maximum size of a single datagram, verb included.
pub const MAX_DATAGRAM: usize = 2048;

// ----------------------------------------------------------------------------
// Request
// ----------------------------------------------------------------------------

/// A decoded UDP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Heartbeat carrying the sender's bound address.
    Peer(PeerAddr),
    /// Chat snippet with its Lamport timestamp.
    Snip { timestamp: Lamport, text: String },
    /// Shutdown trigger for the listen loop.
    Stop,
}

impl Request {
    /// Decode one datagram.
    ///
    /// The first four bytes are the verb; unknown verbs yield
    /// [`WireError::UnknownVerb`] so callers can drop them silently.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < 4 {
            return Err(WireError::Truncated);
        }
        let verb = std::str::from_utf8(&data[..4]).map_err(|_| WireError::UnknownVerb {
            verb: String::from_utf8_lossy(&data[..4]).into_owned(),
        })?;
        let payload = String::from_utf8_lossy(&data[4..]);
        let payload = payload.trim();

        match verb {
            "peer" => Ok(Self::Peer(payload.parse()?)),
            "snip" => {
                let (stamp, text) = payload.split_once(' ').unwrap_or((payload, ""));
                let timestamp = stamp.parse().map_err(|_| WireError::InvalidTimestamp {
                    input: stamp.to_string(),
                })?;
                Ok(Self::Snip {
                    timestamp,
                    text: text.to_string(),
                })
            }
            "stop" => Ok(Self::Stop),
            _ => Err(WireError::UnknownVerb {
                verb: verb.to_string(),
            }),
        }
    }

    /// Encode this request into datagram bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Peer(addr) => format!("peer{addr}"),
            Self::Snip { timestamp, text } => format!("snip{timestamp} {text}"),
            Self::Stop => "stop".to_string(),
        }
        .into_bytes()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn decodes_peer_heartbeat() {
        let request = Request::decode(b"peer192.168.0.9:12001").unwrap();
        assert_eq!(
            request,
            Request::Peer(PeerAddr::new(Ipv4Addr::new(192, 168, 0, 9), 12001))
        );
    }

    #[test]
    fn decodes_snip_with_spaces_in_text() {
        let request = Request::decode(b"snip17 hello there world").unwrap();
        assert_eq!(
            request,
            Request::Snip {
                timestamp: 17,
                text: "hello there world".to_string(),
            }
        );
    }

    #[test]
    fn snip_without_text_is_empty_snippet() {
        let request = Request::decode(b"snip3").unwrap();
        assert_eq!(
            request,
            Request::Snip {
                timestamp: 3,
                text: String::new(),
            }
        );
    }

    #[test]
    fn decodes_stop() {
        assert_eq!(Request::decode(b"stop").unwrap(), Request::Stop);
        assert_eq!(Request::decode(b"stop   \n").unwrap(), Request::Stop);
    }

    #[test]
    fn payload_is_trimmed() {
        let request = Request::decode(b"peer  10.0.0.1:9  \n").unwrap();
        assert_eq!(
            request,
            Request::Peer(PeerAddr::new(Ipv4Addr::new(10, 0, 0, 1), 9))
        );
    }

    #[test]
    fn rejects_unknown_verbs() {
        assert!(matches!(
            Request::decode(b"ping1.2.3.4:5"),
            Err(WireError::UnknownVerb { .. })
        ));
    }

    #[test]
    fn rejects_short_datagrams() {
        assert_eq!(Request::decode(b"sni"), Err(WireError::Truncated));
        assert_eq!(Request::decode(b""), Err(WireError::Truncated));
    }

    #[test]
    fn rejects_unparseable_peer_port() {
        assert!(matches!(
            Request::decode(b"peer1.2.3.4:notaport"),
            Err(WireError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_lamport_timestamp() {
        assert!(matches!(
            Request::decode(b"snipabc hello"),
            Err(WireError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn encode_decode_round_trip() {
        let requests = [
            Request::Peer(PeerAddr::new(Ipv4Addr::new(136, 159, 5, 22), 55921)),
            Request::Snip {
                timestamp: 42,
                text: "the quick brown fox".to_string(),
            },
            Request::Stop,
        ];
        for request in requests {
            assert_eq!(Request::decode(&request.encode()).unwrap(), request);
        }
    }

    #[test]
    fn encoded_snip_matches_wire_shape() {
        let encoded = Request::Snip {
            timestamp: 1,
            text: "hello".to_string(),
        }
        .encode();
        assert_eq!(encoded, b"snip1 hello");
    }
}
