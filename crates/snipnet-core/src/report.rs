//! Registry report assembler
//!
//! Serializes an audit-log snapshot into the newline-separated text document
//! the registry expects after a run:
//!
//! ```text
//! <N_peers>
//! <peer_addr>            × N_peers
//! <N_sources>
//! <src_addr> \n <datetime> \n <N> \n <peer_addr>…   × N_sources
//! <N_recv>
//! <to> <from> <datetime>  × N_recv
//! <N_sent>
//! <to> <from> <datetime>  × N_sent
//! <N_snippets>
//! <lamport_ts> <text> <sender>  × N_snippets
//! ```

use std::fmt::Write;

use crate::audit::AuditSnapshot;

/// Assemble the end-of-run report. Call only after the peer manager has
/// returned; the snapshot is then quiescent.
pub fn assemble_report(snapshot: &AuditSnapshot) -> String {
    let mut report = String::new();
    // Infallible: writing to a String cannot fail.
    let out = &mut report;

    let _ = writeln!(out, "{}", snapshot.peers.len());
    for peer in &snapshot.peers {
        let _ = writeln!(out, "{peer}");
    }

    let _ = writeln!(out, "{}", snapshot.sources.len());
    for (source, record) in &snapshot.sources {
        let _ = writeln!(out, "{source}");
        let _ = writeln!(out, "{}", record.datetime);
        let _ = writeln!(out, "{}", record.peers.len());
        for peer in &record.peers {
            let _ = writeln!(out, "{peer}");
        }
    }

    let _ = writeln!(out, "{}", snapshot.recv_updates.len());
    for update in &snapshot.recv_updates {
        let _ = writeln!(out, "{} {} {}", update.to, update.from, update.datetime);
    }

    let _ = writeln!(out, "{}", snapshot.sent_updates.len());
    for update in &snapshot.sent_updates {
        let _ = writeln!(out, "{} {} {}", update.to, update.from, update.datetime);
    }

    let _ = writeln!(out, "{}", snapshot.snippets.len());
    for snippet in &snapshot.snippets {
        let _ = writeln!(
            out,
            "{} {} {}",
            snippet.timestamp, snippet.text, snippet.sender
        );
    }

    report
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
