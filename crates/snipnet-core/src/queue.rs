//! Frontend I/O queue
//!
//! A pair of FIFO queues bridging the user frontend and the peer manager:
//! outgoing lines typed by the user wait here for the broadcast loop, and
//! delivered snippets wait here for the frontend writer. Both directions
//! share one mutex; every operation is a short critical section with no
//! blocking inside.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use crate::types::{Lamport, PeerAddr};

// ----------------------------------------------------------------------------
// Incoming Message
// ----------------------------------------------------------------------------

/// A snippet delivered to the frontend.
///
/// `timestamp` is the receiver's Lamport clock after applying the max rule
/// to the value carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub sender: PeerAddr,
    pub text: String,
    pub timestamp: Lamport,
}

impl fmt::Display for IncomingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}> {}", self.timestamp, self.sender, self.text)
    }
}

// ----------------------------------------------------------------------------
// I/O Queue
// ----------------------------------------------------------------------------

#[derive(Default)]
struct Queues {
    incoming: VecDeque<IncomingMessage>,
    outgoing: VecDeque<String>,
}

/// Thread-safe bidirectional message queue between frontend and core.
#[derive(Default)]
pub struct IoQueue {
    inner: Mutex<Queues>,
}

impl IoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.lock().outgoing.is_empty()
    }

    pub fn put_outgoing(&self, text: impl Into<String>) {
        self.lock().outgoing.push_back(text.into());
    }

    pub fn pop_outgoing(&self) -> Option<String> {
        self.lock().outgoing.pop_front()
    }

    pub fn has_incoming(&self) -> bool {
        !self.lock().incoming.is_empty()
    }

    pub fn put_incoming(&self, message: IncomingMessage) {
        self.lock().incoming.push_back(message);
    }

    pub fn pop_incoming(&self) -> Option<IncomingMessage> {
        self.lock().incoming.pop_front()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queues> {
        self.inner.lock().expect("io queue lock poisoned")
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn message(text: &str, timestamp: Lamport) -> IncomingMessage {
        IncomingMessage {
            sender: PeerAddr::new(Ipv4Addr::LOCALHOST, 12001),
            text: text.to_string(),
            timestamp,
        }
    }

    #[test]
    fn outgoing_is_fifo() {
        let queue = IoQueue::new();
        assert!(!queue.has_outgoing());

        queue.put_outgoing("first");
        queue.put_outgoing("second");
        assert!(queue.has_outgoing());

        assert_eq!(queue.pop_outgoing().as_deref(), Some("first"));
        assert_eq!(queue.pop_outgoing().as_deref(), Some("second"));
        assert_eq!(queue.pop_outgoing(), None);
    }

    #[test]
    fn incoming_is_fifo_and_preserves_payload() {
        let queue = IoQueue::new();
        queue.put_incoming(message("hello", 1));
        queue.put_incoming(message("hi", 2));

        assert_eq!(queue.pop_incoming(), Some(message("hello", 1)));
        assert_eq!(queue.pop_incoming(), Some(message("hi", 2)));
        assert!(!queue.has_incoming());
    }

    #[test]
    fn directions_are_independent() {
        let queue = IoQueue::new();
        queue.put_outgoing("out");
        assert!(!queue.has_incoming());
        queue.put_incoming(message("in", 1));
        assert_eq!(queue.pop_outgoing().as_deref(), Some("out"));
        assert!(queue.has_incoming());
    }

    #[test]
    fn incoming_display_format() {
        assert_eq!(message("hello", 7).to_string(), "7 127.0.0.1:12001> hello");
    }
}
