//! # Stack Node
//!
//! Runs a node container with the offline networking layer.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (optional TOML path as first argument, then env)
//! 2. Build the node from the networking configuration
//! 3. Start the node
//! 4. Wait for Ctrl+C, then stop

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_stack::{Node, NodeConfig, NodeError, OfflineNetwork};

/// Load configuration from file and environment.
fn load_config() -> Result<NodeConfig> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            NodeConfig::load(&path).with_context(|| format!("Failed to load config {path}"))?
        }
        None => NodeConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config()?;
    let network = config
        .network_config()
        .context("Invalid networking configuration")?;

    let node = Node::new(network, OfflineNetwork::constructor());
    info!("Node identity: {}", node.node_id());

    node.start().context("Failed to start node")?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    match node.stop() {
        Ok(()) => info!("Shutdown complete"),
        Err(NodeError::Stop(failure)) => {
            for (id, err) in &failure.services {
                error!("Service {} failed to stop: {:#}", id, err);
            }
            if let Some(err) = &failure.network {
                error!("Networking layer failed to stop: {:#}", err);
            }
            return Err(NodeError::Stop(failure).into());
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
