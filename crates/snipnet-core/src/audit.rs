//! In-memory audit log
//!
//! Append-only records of every peer and snippet event observed during a
//! run, kept in five streams that map one-to-one onto the sections of the
//! registry report. The set and map streams use ordered collections so the
//! report serializes deterministically.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use chrono::Local;

use crate::types::{Lamport, PeerAddr};

/// Wall-clock string attached to audit records, local time.
fn now_string() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

// ----------------------------------------------------------------------------
// Record Types
// ----------------------------------------------------------------------------

/// One heartbeat exchanged with one peer (either direction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerUpdate {
    pub to: String,
    pub from: String,
    pub datetime: String,
}

/// Peer list obtained from one bootstrap source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub datetime: String,
    pub peers: Vec<String>,
}

/// One delivered snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetRecord {
    pub timestamp: Lamport,
    pub text: String,
    pub sender: String,
}

// ----------------------------------------------------------------------------
// Audit Log
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditSnapshot {
    pub peers: BTreeSet<String>,
    pub sources: BTreeMap<String, SourceRecord>,
    pub sent_updates: Vec<PeerUpdate>,
    pub recv_updates: Vec<PeerUpdate>,
    pub snippets: Vec<SnippetRecord>,
}

/// Append-only structured log of every peer/snippet event.
///
/// All mutators take the internal lock; readers obtain a snapshot and
/// iterate without holding it.
#[derive(Default)]
pub struct AuditLog {
    inner: Mutex<AuditSnapshot>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a peer address has been observed.
    pub fn record_peer(&self, peer: PeerAddr) {
        self.lock().peers.insert(peer.to_string());
    }

    /// Record the peer list handed out by a bootstrap source.
    pub fn record_source(&self, source: &str, peers: &[PeerAddr]) {
        let record = SourceRecord {
            datetime: now_string(),
            peers: peers.iter().map(ToString::to_string).collect(),
        };
        self.lock().sources.insert(source.to_string(), record);
    }

    /// Record one heartbeat sent to `to` announcing `from`.
    pub fn record_sent_update(&self, to: PeerAddr, from: PeerAddr) {
        let update = PeerUpdate {
            to: to.to_string(),
            from: from.to_string(),
            datetime: now_string(),
        };
        self.lock().sent_updates.push(update);
    }

    /// Record one accepted `peer` request: `to` is the announced peer,
    /// `from` the datagram sender.
    pub fn record_recv_update(&self, to: PeerAddr, from: PeerAddr) {
        let update = PeerUpdate {
            to: to.to_string(),
            from: from.to_string(),
            datetime: now_string(),
        };
        self.lock().recv_updates.push(update);
    }

    /// Record one delivered snippet with the post-max Lamport clock.
    pub fn record_snippet(&self, timestamp: Lamport, text: &str, sender: PeerAddr) {
        let record = SnippetRecord {
            timestamp,
            text: text.to_string(),
            sender: sender.to_string(),
        };
        self.lock().snippets.push(record);
    }

    /// Point-in-time copy of all five streams.
    pub fn snapshot(&self) -> AuditSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AuditSnapshot> {
        self.inner.lock().expect("audit log lock poisoned")
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr(port: u16) -> PeerAddr {
        PeerAddr::new(Ipv4Addr::new(10, 0, 0, 1), port)
    }

    #[test]
    fn peers_deduplicate_and_sort() {
        let log = AuditLog::new();
        log.record_peer(addr(2));
        log.record_peer(addr(1));
        log.record_peer(addr(2));

        let snapshot = log.snapshot();
        assert_eq!(
            snapshot.peers.iter().cloned().collect::<Vec<_>>(),
            ["10.0.0.1:1", "10.0.0.1:2"]
        );
    }

    #[test]
    fn updates_preserve_append_order() {
        let log = AuditLog::new();
        log.record_sent_update(addr(1), addr(9));
        log.record_sent_update(addr(2), addr(9));

        let snapshot = log.snapshot();
        assert_eq!(snapshot.sent_updates[0].to, "10.0.0.1:1");
        assert_eq!(snapshot.sent_updates[1].to, "10.0.0.1:2");
        assert_eq!(snapshot.sent_updates[0].from, "10.0.0.1:9");
    }

    #[test]
    fn source_keeps_peer_list_snapshot() {
        let log = AuditLog::new();
        log.record_source("136.159.5.22:55921", &[addr(1), addr(2)]);

        let snapshot = log.snapshot();
        let record = &snapshot.sources["136.159.5.22:55921"];
        assert_eq!(record.peers, ["10.0.0.1:1", "10.0.0.1:2"]);
        assert!(!record.datetime.is_empty());
    }

    #[test]
    fn snippets_keep_clock_text_and_sender() {
        let log = AuditLog::new();
        log.record_snippet(3, "hello world", addr(1));

        let snapshot = log.snapshot();
        assert_eq!(
            snapshot.snippets,
            [SnippetRecord {
                timestamp: 3,
                text: "hello world".to_string(),
                sender: "10.0.0.1:1".to_string(),
            }]
        );
    }

    #[test]
    fn datetime_shape_matches_report_format() {
        let log = AuditLog::new();
        log.record_sent_update(addr(1), addr(9));
        let datetime = &log.snapshot().sent_updates[0].datetime;
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(datetime.len(), 19);
        assert_eq!(&datetime[4..5], "-");
        assert_eq!(&datetime[10..11], " ");
        assert_eq!(&datetime[13..14], ":");
    }

    #[test]
    fn snapshot_is_detached_from_later_records() {
        let log = AuditLog::new();
        log.record_peer(addr(1));
        let snapshot = log.snapshot();
        log.record_peer(addr(2));
        assert_eq!(snapshot.peers.len(), 1);
        assert_eq!(log.snapshot().peers.len(), 2);
    }
}
