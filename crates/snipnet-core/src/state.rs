//! Shared membership state
//!
//! One instance is co-owned (via `Arc`) by the heartbeat, broadcast, and
//! listen tasks. The peer table is guarded by a mutex and only ever read
//! through snapshots; the Lamport clock and run flag are atomics, so
//! timestamp operations are linearizable without touching the table lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

use tracing::info;

use crate::types::{Lamport, PeerAddr};

// ----------------------------------------------------------------------------
// Shared State
// ----------------------------------------------------------------------------

/// Authoritative membership table, Lamport clock, and run flag.
pub struct SharedState {
    address: PeerAddr,
    peers: Mutex<HashMap<PeerAddr, SystemTime>>,
    timestamp: AtomicU64,
    running: AtomicBool,
}

impl SharedState {
    /// Create state for a node bound at `address`, with an empty peer
    /// table, a zeroed clock, and the run flag set.
    pub fn new(address: PeerAddr) -> Self {
        Self {
            address,
            peers: Mutex::new(HashMap::new()),
            timestamp: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }

    /// The node's own advertised address.
    pub fn address(&self) -> PeerAddr {
        self.address
    }

    /// Admit a peer, stamping it with the current wall clock.
    pub fn join(&self, peer: PeerAddr) {
        let mut peers = self.peers.lock().expect("peer table lock poisoned");
        if peers.insert(peer, SystemTime::now()).is_none() {
            info!("{peer} has joined");
        }
    }

    /// Refresh a peer's `last_seen`, admitting it if absent. Idempotent.
    pub fn update(&self, peer: PeerAddr) {
        let mut peers = self.peers.lock().expect("peer table lock poisoned");
        peers.insert(peer, SystemTime::now());
    }

    /// Remove a peer. No-op if absent.
    pub fn leave(&self, peer: PeerAddr) {
        let mut peers = self.peers.lock().expect("peer table lock poisoned");
        if peers.remove(&peer).is_some() {
            info!("{peer} has left");
        }
    }

    /// Point-in-time snapshot of the table, safe to iterate lock-free.
    pub fn peers(&self) -> HashMap<PeerAddr, SystemTime> {
        self.peers.lock().expect("peer table lock poisoned").clone()
    }

    /// Current Lamport clock value.
    pub fn timestamp(&self) -> Lamport {
        self.timestamp.load(Ordering::SeqCst)
    }

    /// Advance the clock by one and return the new value.
    pub fn increment_timestamp(&self) -> Lamport {
        self.timestamp.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply the Lamport receive rule: clock becomes `max(clock, value)`.
    pub fn update_timestamp(&self, value: Lamport) {
        self.timestamp.fetch_max(value, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clear the run flag. The three loops observe this and wind down.
    pub fn halt(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("run flag cleared, node halting");
        }
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
        PeerAddr::new(Ipv4Addr::LOCALHOST, port)
    }

    #[test]
    fn join_and_leave_are_idempotent() {
        let state = SharedState::new(addr(12000));
        state.join(addr(12001));
        state.join(addr(12001));
        assert_eq!(state.peers().len(), 1);

        state.leave(addr(12001));
        state.leave(addr(12001));
        assert!(state.peers().is_empty());
    }

    #[test]
    fn update_refreshes_last_seen() {
        let state = SharedState::new(addr(12000));
        state.join(addr(12001));
        let before = state.peers()[&addr(12001)];
        state.update(addr(12001));
        let after = state.peers()[&addr(12001)];
        assert!(after >= before);
    }

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let state = SharedState::new(addr(12000));
        state.join(addr(12001));
        let snapshot = state.peers();
        state.leave(addr(12001));
        assert!(snapshot.contains_key(&addr(12001)));
        assert!(state.peers().is_empty());
    }

    #[test]
    fn increment_returns_successive_values() {
        let state = SharedState::new(addr(12000));
        assert_eq!(state.timestamp(), 0);
        assert_eq!(state.increment_timestamp(), 1);
        assert_eq!(state.increment_timestamp(), 2);
        assert_eq!(state.timestamp(), 2);
    }

    #[test]
    fn update_timestamp_is_the_max_rule() {
        let state = SharedState::new(addr(12000));
        state.update_timestamp(7);
        assert_eq!(state.timestamp(), 7);
        // A stale timestamp never rolls the clock back.
        state.update_timestamp(3);
        assert_eq!(state.timestamp(), 7);
    }

    #[test]
    fn halt_transitions_once() {
        let state = SharedState::new(addr(12000));
        assert!(state.is_running());
        state.halt();
        assert!(!state.is_running());
        state.halt();
        assert!(!state.is_running());
    }
}
