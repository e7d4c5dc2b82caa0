//! Snippet frontend
//!
//! Bridges the user's terminal and the peer manager through the I/O queue:
//! a reader task turns input lines into outgoing snippets, a writer task
//! prints delivered snippets. The literal line `close` does not become a
//! snippet; it sends a `stop` datagram to the node's own UDP address, the
//! out-of-band shutdown path for the listen task.
//!
//! Both loops are generic over their streams so tests can substitute
//! in-memory buffers for stdin/stdout.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

use snipnet_core::{IoQueue, PeerAddr, Request, Result};

// ----------------------------------------------------------------------------
// Snippet Frontend
// ----------------------------------------------------------------------------

/// User I/O endpoint of a node.
pub struct SnippetFrontend {
    queue: Arc<IoQueue>,
    node_addr: PeerAddr,
    poll_interval: Duration,
    running: AtomicBool,
}

impl SnippetFrontend {
    pub fn new(queue: Arc<IoQueue>, node_addr: PeerAddr, poll_interval: Duration) -> Self {
        Self {
            queue,
            node_addr,
            poll_interval,
            running: AtomicBool::new(true),
        }
    }

    /// Spawn the reader and writer tasks over stdin/stdout.
    ///
    /// The reader may stay blocked on stdin after the node halts; callers
    /// abort its handle once the run is over. The writer exits via
    /// [`close`](Self::close).
    pub fn spawn(self: &Arc<Self>) -> (JoinHandle<()>, JoinHandle<()>) {
        let reader = tokio::spawn({
            let frontend = Arc::clone(self);
            async move {
                let stdin = BufReader::new(tokio::io::stdin());
                if let Err(e) = frontend.read_loop(stdin).await {
                    warn!("frontend reader failed: {e}");
                }
            }
        });
        let writer = tokio::spawn({
            let frontend = Arc::clone(self);
            async move {
                if let Err(e) = frontend.write_loop(tokio::io::stdout()).await {
                    warn!("frontend writer failed: {e}");
                }
            }
        });
        (reader, writer)
    }

    /// Forward input lines to the outgoing queue until end of input, the
    /// `close` line, or [`close`](Self::close).
    pub async fn read_loop<R>(&self, mut input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = String::new();
        while self.is_running() {
            line.clear();
            if input.read_line(&mut line).await? == 0 {
                break;
            }
            let text = line.trim_end_matches(['\r', '\n']);
            if text == "close" {
                self.send_stop().await?;
                break;
            }
            self.queue.put_outgoing(text);
        }
        Ok(())
    }

    /// Print delivered snippets, one per line, until [`close`](Self::close).
    pub async fn write_loop<W>(&self, mut output: W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.is_running() {
            while let Some(message) = self.queue.pop_incoming() {
                output.write_all(format!("{message}\n").as_bytes()).await?;
            }
            output.flush().await?;
            sleep(self.poll_interval).await;
        }
        Ok(())
    }

    /// Stop both loops. The reader also stops on its own after `close` or
    /// end of input.
    pub fn close(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Deliver the out-of-band `stop` to our own listen task.
    async fn send_stop(&self) -> Result<()> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket
            .send_to(&Request::Stop.encode(), self.node_addr.socket_addr())
            .await?;
        info!("close requested, stop sent to {}", self.node_addr);
        Ok(())
    }
}
