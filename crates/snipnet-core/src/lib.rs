//! Snipnet core protocol implementation
//!
//! This crate provides the foundational pieces of the snipnet gossip chat
//! protocol: peer addressing, the UDP wire codec, the shared membership
//! state with its Lamport clock, the frontend I/O queue, the audit log, and
//! the end-of-run report assembler.
//!
//! ## Architecture Overview
//!
//! Snipnet separates concerns across three crates:
//!
//! - **snipnet-core** (this crate): protocol types and passive state. No
//!   sockets, no tasks — everything here is driven by the runtime crate and
//!   is directly testable without I/O.
//! - **snipnet-runtime**: the peer manager (heartbeat, broadcast, and listen
//!   tasks around one UDP socket), the bootstrap registry client, and the
//!   stdin/stdout snippet frontend.
//! - **snipnet-cli**: the binary wiring it all together.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod audit;
pub mod config;
pub mod errors;
pub mod queue;
pub mod report;
pub mod state;
pub mod types;
pub mod wire;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use audit::{AuditLog, AuditSnapshot, PeerUpdate, SnippetRecord, SourceRecord};
pub use config::NodeConfig;
pub use errors::{Result, SnipnetError, WireError};
pub use queue::{IncomingMessage, IoQueue};
pub use report::assemble_report;
pub use state::SharedState;
pub use types::{Lamport, PeerAddr};
pub use wire::{Request, MAX_DATAGRAM};
