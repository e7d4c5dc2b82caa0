//! Bootstrap registry client
//!
//! The node talks to the registry twice per run over TCP: once before the
//! peer manager starts (to learn its own address and the initial peer
//! list) and once after it returns (to upload the report). The registry
//! drives the exchange by sending line-terminated ASCII commands; the
//! client replies and keeps going until `close` or end of stream.
//!
//! The client socket is bound to the node's port so the registry observes
//! the same port for TCP and UDP.

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpSocket;
use tracing::{debug, info, warn};

use snipnet_core::{PeerAddr, Result, SnipnetError};

// ----------------------------------------------------------------------------
// Registry Context
// ----------------------------------------------------------------------------

/// Everything the registry exchange reads from or writes into the node.
#[derive(Debug, Clone)]
pub struct RegistryContext {
    /// Opaque team name announced on `get team name`.
    pub team_name: String,
    /// Directory walked for `.rs` sources on `get code`.
    pub source_root: PathBuf,
    /// This node's address, learned from the first exchange's TCP socket.
    pub location: Option<PeerAddr>,
    /// Bootstrap peers handed out by `receive peers`.
    pub peers: BTreeSet<PeerAddr>,
    /// End-of-run report served on `get report`.
    pub report: Option<String>,
}

impl RegistryContext {
    pub fn new(team_name: impl Into<String>, source_root: impl Into<PathBuf>) -> Self {
        Self {
            team_name: team_name.into(),
            source_root: source_root.into(),
            location: None,
            peers: BTreeSet::new(),
            report: None,
        }
    }

    /// Bootstrap peers in deterministic order.
    pub fn peer_list(&self) -> Vec<PeerAddr> {
        self.peers.iter().copied().collect()
    }
}

// ----------------------------------------------------------------------------
// Exchange
// ----------------------------------------------------------------------------

/// Connect to the registry from `local_port` and serve its commands until
/// it closes the exchange.
pub async fn exchange(
    local_port: u16,
    registry_addr: &str,
    ctx: &mut RegistryContext,
) -> Result<()> {
    let remote = resolve(registry_addr).await?;
    let socket = TcpSocket::new_v4()?;
    // The report upload reuses the same local port moments after the
    // bootstrap connection closed.
    socket.set_reuseaddr(true)?;
    socket.bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, local_port)))?;
    let stream = socket.connect(remote).await?;

    let local = PeerAddr::try_from(stream.local_addr()?)?;
    if ctx.location.is_none() {
        ctx.location = Some(local);
    }
    info!("connected to registry {remote} as {local}");
    drive(stream, local, ctx).await
}

async fn resolve(registry_addr: &str) -> Result<SocketAddr> {
    tokio::net::lookup_host(registry_addr)
        .await?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| SnipnetError::Registry {
            reason: format!("registry address {registry_addr:?} did not resolve"),
        })
}

/// Serve registry commands over an established stream. Commands are
/// line-terminated and matched by substring; unrecognized ones are ignored.
pub async fn drive<S>(stream: S, local: PeerAddr, ctx: &mut RegistryContext) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        debug!("registry command {command:?}");

        if command.contains("get team name") {
            send_line(&mut writer, &ctx.team_name).await?;
        } else if command.contains("get location") {
            send_line(&mut writer, &local.to_string()).await?;
        } else if command.contains("get code") {
            send_code(&mut writer, &ctx.source_root).await?;
        } else if command.contains("get report") {
            send_line(&mut writer, ctx.report.as_deref().unwrap_or_default()).await?;
        } else if command.contains("receive peers") {
            receive_peers(&mut reader, ctx).await?;
        } else if command.contains("close") {
            break;
        } else {
            warn!("unrecognized registry command {command:?}");
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Command Handlers
// ----------------------------------------------------------------------------

async fn receive_peers<R>(reader: &mut R, ctx: &mut RegistryContext) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let count: usize = line
        .trim()
        .parse()
        .map_err(|_| SnipnetError::Registry {
            reason: format!("invalid peer count {:?}", line.trim()),
        })?;

    for _ in 0..count {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(SnipnetError::Registry {
                reason: format!("peer list ended early, expected {count} entries"),
            });
        }
        let entry = line.trim();
        // The registry pads short lists with null entries.
        if entry.starts_with("null") {
            continue;
        }
        match entry.parse::<PeerAddr>() {
            Ok(peer) => {
                ctx.peers.insert(peer);
            }
            Err(e) => warn!("skipping bootstrap peer {entry:?}: {e}"),
        }
    }
    info!("registry handed out {} bootstrap peers", ctx.peers.len());
    Ok(())
}

async fn send_code<W>(writer: &mut W, root: &Path) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    send_line(writer, "rust").await?;
    for path in source_files(root) {
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => send_line(writer, &contents).await?,
            Err(e) => warn!("skipping unreadable source file {}: {e}", path.display()),
        }
    }
    send_line(writer, "...").await
}

/// All `.rs` files under `root`, sorted for a stable listing.
fn source_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

async fn send_line<W>(writer: &mut W, payload: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
