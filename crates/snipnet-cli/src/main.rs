//! Snipnet node entry point
//!
//! Lifecycle: bootstrap against the registry (learn our address and the
//! initial peer list), run the peer manager until a `stop` datagram
//! arrives, then assemble the audit report and upload it.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use snipnet_cli::cli::Cli;
use snipnet_core::{assemble_report, AuditLog, IoQueue, NodeConfig, SharedState, SnipnetError};
use snipnet_runtime::{registry, PeerManager, RegistryContext, SnippetFrontend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The CLI contract is exit 1 on bad arguments; clap defaults to 2.
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        let _ = e.print();
        std::process::exit(1);
    });

    setup_logging(cli.verbose);
    let config = load_configuration(&cli)?;

    info!("getting initial peers...");
    let mut ctx = RegistryContext::new(&cli.team_name, &config.source_root);
    registry::exchange(cli.port, &config.registry_addr, &mut ctx)
        .await
        .context("bootstrap exchange failed")?;
    let own_addr = ctx
        .location
        .context("registry exchange yielded no local address")?;

    let state = Arc::new(SharedState::new(own_addr));
    let queue = Arc::new(IoQueue::new());
    let audit = Arc::new(AuditLog::new());

    let manager = Arc::new(
        PeerManager::bind(
            Arc::clone(&state),
            Arc::clone(&queue),
            Arc::clone(&audit),
            &config,
        )
        .await
        .context("failed to bind the local UDP socket")?,
    );
    manager.bootstrap(&config.registry_addr, &ctx.peer_list());

    let frontend = Arc::new(SnippetFrontend::new(
        Arc::clone(&queue),
        manager.local_addr(),
        config.poll_interval(),
    ));
    let (reader, writer) = frontend.spawn();

    // Blocks until the peer manager receives a stop request.
    Arc::clone(&manager).run().await?;

    frontend.close();
    reader.abort();
    let _ = writer.await;

    info!("sending report...");
    ctx.report = Some(assemble_report(&audit.snapshot()));
    registry::exchange(cli.port, &config.registry_addr, &mut ctx)
        .await
        .context("report upload failed")?;

    Ok(())
}

/// Route diagnostics to stderr; stdout belongs to the snippet frontend.
fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_configuration(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("loading configuration from {path}");
            NodeConfig::load_from_file(path)?
        }
        None => NodeConfig::default(),
    };
    if let Some(registry_addr) = &cli.registry {
        config.registry_addr = registry_addr.clone();
    }
    config
        .validate()
        .map_err(|reason| SnipnetError::Configuration { reason })?;
    Ok(config)
}
