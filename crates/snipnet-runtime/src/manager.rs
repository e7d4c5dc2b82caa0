//! Peer manager
//!
//! Owns the node's UDP socket and runs the three cooperating tasks:
//!
//! - **heartbeat**: announce liveness to every known peer and prune silent
//!   ones, once per keepalive interval;
//! - **broadcast**: drain the outgoing queue, stamping each snippet with a
//!   freshly incremented Lamport timestamp;
//! - **listen**: receive datagrams and dispatch `peer`/`snip`/`stop`.
//!
//! The manager is co-owned by its tasks through an `Arc`; the socket is one
//! OS endpoint used concurrently by all three (tokio's `UdpSocket` sends
//! and receives through `&self`). Shutdown is cooperative: `stop` ends the
//! listen task, `run()` clears the run flag, and the other two tasks exit
//! on their next loop iteration.

use std::io;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::net::UdpSocket;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use snipnet_core::{
    AuditLog, IncomingMessage, IoQueue, Lamport, NodeConfig, PeerAddr, Request, Result,
    SharedState, SnipnetError, WireError, MAX_DATAGRAM,
};

// ----------------------------------------------------------------------------
// Peer Manager
// ----------------------------------------------------------------------------

/// The concurrent agent at the heart of a snipnet node.
pub struct PeerManager {
    socket: Arc<UdpSocket>,
    state: Arc<SharedState>,
    queue: Arc<IoQueue>,
    audit: Arc<AuditLog>,
    local: PeerAddr,
    keepalive_interval: Duration,
    peer_timeout: Duration,
    poll_interval: Duration,
}

impl PeerManager {
    /// Bind the UDP socket at the state's address and seed the node's own
    /// entry into the peer table. Bind failure is fatal; the node never
    /// enters its run loop.
    pub async fn bind(
        state: Arc<SharedState>,
        queue: Arc<IoQueue>,
        audit: Arc<AuditLog>,
        config: &NodeConfig,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(state.address().socket_addr()).await?;
        let local = PeerAddr::try_from(socket.local_addr()?)?;
        state.join(local);
        info!("udp socket bound at {local}");

        Ok(Self {
            socket: Arc::new(socket),
            state,
            queue,
            audit,
            local,
            keepalive_interval: config.keepalive_interval(),
            peer_timeout: config.peer_timeout(),
            poll_interval: config.poll_interval(),
        })
    }

    /// The socket's actual bound address.
    pub fn local_addr(&self) -> PeerAddr {
        self.local
    }

    /// Seed bootstrap peers obtained from `source` into the peer table and
    /// the audit log.
    pub fn bootstrap(&self, source: &str, peers: &[PeerAddr]) {
        for &peer in peers {
            self.state.join(peer);
            self.audit.record_peer(peer);
        }
        self.audit.record_source(source, peers);
    }

    /// Run the node until a `stop` datagram arrives.
    ///
    /// Spawns the heartbeat and broadcast tasks, awaits the listen task,
    /// then clears the run flag and waits for the other two to observe it
    /// (bounded by their sleep intervals).
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let heartbeat = tokio::spawn({
            let manager = Arc::clone(&self);
            async move { manager.heartbeat_loop().await }
        });
        let broadcast = tokio::spawn({
            let manager = Arc::clone(&self);
            async move { manager.broadcast_loop().await }
        });
        let listen = tokio::spawn({
            let manager = Arc::clone(&self);
            async move { manager.listen_loop().await }
        });

        let result = listen.await;
        self.state.halt();
        let _ = heartbeat.await;
        let _ = broadcast.await;

        match result {
            Ok(outcome) => outcome,
            Err(join_error) => Err(SnipnetError::Io(io::Error::other(join_error))),
        }
    }

    // ------------------------------------------------------------------------
    // Heartbeat Task
    // ------------------------------------------------------------------------

    async fn heartbeat_loop(&self) {
        debug!("scheduling keepalive updates");
        while self.state.is_running() {
            // The node is trivially alive; keep its own entry fresh so
            // pruning never evicts it.
            self.state.update(self.local);
            self.multicast_heartbeat().await;
            self.prune_stale_peers();
            sleep(self.keepalive_interval).await;
        }
        info!("heartbeat task stopped");
    }

    async fn multicast_heartbeat(&self) {
        let targets = self.send_targets();
        debug!("sending keepalive to {} peers", targets.len());
        let datagram = Request::Peer(self.local).encode();
        for peer in targets {
            self.send_datagram(&datagram, peer).await;
            self.audit.record_sent_update(peer, self.local);
        }
    }

    fn prune_stale_peers(&self) {
        let now = SystemTime::now();
        for (peer, last_seen) in self.state.peers() {
            let elapsed = now.duration_since(last_seen).unwrap_or(Duration::ZERO);
            if elapsed > self.peer_timeout {
                debug!("evicting {peer}, silent for {elapsed:?}");
                self.state.leave(peer);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Broadcast Task
    // ------------------------------------------------------------------------

    async fn broadcast_loop(&self) {
        while self.state.is_running() {
            if self.queue.has_outgoing() {
                if let Some(text) = self.queue.pop_outgoing() {
                    self.multicast_snippet(&text).await;
                }
            }
            sleep(self.poll_interval).await;
        }
        info!("broadcast task stopped");
    }

    async fn multicast_snippet(&self, text: &str) {
        // Increment, then stamp: consecutive emissions carry strictly
        // increasing timestamps starting at 1.
        let timestamp = self.state.increment_timestamp();
        let datagram = Request::Snip {
            timestamp,
            text: text.to_string(),
        }
        .encode();
        let targets = self.send_targets();
        debug!("broadcasting snippet {timestamp} to {} peers", targets.len());
        for peer in targets {
            self.send_datagram(&datagram, peer).await;
        }
    }

    // ------------------------------------------------------------------------
    // Listen Task
    // ------------------------------------------------------------------------

    async fn listen_loop(&self) -> Result<()> {
        debug!("listening for messages");
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) if is_transient(&e) => {
                    warn!("transient receive error: {e}");
                    continue;
                }
                Err(e) => {
                    error!("listen socket failed: {e}");
                    return Err(e.into());
                }
            };
            let sender = match PeerAddr::try_from(from) {
                Ok(sender) => sender,
                Err(_) => {
                    debug!("dropping datagram from non-IPv4 sender {from}");
                    continue;
                }
            };

            match Request::decode(&buf[..len]) {
                Ok(Request::Peer(new_peer)) => self.on_peer(sender, new_peer),
                Ok(Request::Snip { timestamp, text }) => self.on_snip(sender, timestamp, &text),
                Ok(Request::Stop) => {
                    info!("stop request received");
                    break;
                }
                Err(WireError::InvalidAddress { input }) => {
                    // The payload is garbage, but the sender still proved
                    // it is alive by contacting us.
                    self.state.update(sender);
                    warn!("unresolvable peer payload {input:?} from {sender}");
                }
                Err(e) => debug!("dropping malformed datagram from {sender}: {e}"),
            }
        }
        info!("listen task stopped");
        Ok(())
    }

    /// Handle a `peer` heartbeat: both the sender and the announced peer
    /// are (re-)admitted.
    fn on_peer(&self, sender: PeerAddr, new_peer: PeerAddr) {
        self.state.update(sender);
        self.state.update(new_peer);
        self.audit.record_peer(sender);
        self.audit.record_peer(new_peer);
        self.audit.record_recv_update(new_peer, sender);
        debug!("handled peer request from {sender} announcing {new_peer}");
    }

    /// Handle a `snip`: apply the Lamport receive rule and deliver the
    /// snippet to the frontend. The recorded clock is the post-max value.
    fn on_snip(&self, sender: PeerAddr, timestamp: Lamport, text: &str) {
        self.state.update(sender);
        self.state.update_timestamp(timestamp);
        let clock = self.state.timestamp();
        self.queue.put_incoming(IncomingMessage {
            sender,
            text: text.to_string(),
            timestamp: clock,
        });
        self.audit.record_snippet(clock, text, sender);
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Current peers minus this node; the snapshot also backs the per-pass
    /// audit records, so the set sent to and the set logged always agree.
    fn send_targets(&self) -> Vec<PeerAddr> {
        let mut targets: Vec<PeerAddr> = self
            .state
            .peers()
            .into_keys()
            .filter(|peer| *peer != self.local)
            .collect();
        targets.sort();
        targets
    }

    async fn send_datagram(&self, datagram: &[u8], peer: PeerAddr) {
        if let Err(e) = self.socket.send_to(datagram, peer.socket_addr()).await {
            warn!("failed to send to {peer}: {e}");
        }
    }
}

/// Receive errors that do not indicate a broken socket. Everything else is
/// fatal to the listen task.
fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
    )
}
