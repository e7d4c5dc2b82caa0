//! Snipnet CLI
//!
//! Binary crate for the snipnet gossip chat node: argument parsing, logging
//! setup, and the bootstrap → run → report lifecycle live in `main.rs`; the
//! clap definitions are exposed here for testing.

pub mod cli;
