//! # Networking Layer
//!
//! The node treats the peer-to-peer transport as one extra service that comes
//! up before every registered service and goes down after all of them. The
//! transport itself (discovery, dialing, handshakes) lives outside this crate;
//! the node only needs:
//!
//! - a [`NetworkConfig`] template with value semantics, snapshotted on every
//!   start so a run never mutates the template,
//! - a constructor turning that snapshot into a [`Network`] handle,
//! - `start`/`stop` on the handle.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use tracing::info;

/// Default P2P listening port.
pub const DEFAULT_P2P_PORT: u16 = 30303;

/// Default maximum number of connected peers.
pub const DEFAULT_MAX_PEERS: usize = 25;

/// Configuration of the networking layer.
///
/// Cloning produces an independent value; the node clones its template into a
/// fresh config on every start.
#[derive(Clone)]
pub struct NetworkConfig {
    /// Node identity key (secp256k1).
    pub private_key: SigningKey,
    /// Human readable node name announced to peers.
    pub name: String,
    /// Address the transport listens on.
    pub listen_addr: SocketAddr,
    /// Maximum peers to keep connected.
    pub max_peers: usize,
    /// Peers to contact when joining the network.
    pub bootstrap_nodes: Vec<String>,
    /// Never dial out; only accept inbound connections.
    pub no_dial: bool,
    /// Disable peer discovery.
    pub no_discovery: bool,
}

impl NetworkConfig {
    /// Create a configuration for the given identity and name with default
    /// transport parameters.
    pub fn new(private_key: SigningKey, name: impl Into<String>) -> Self {
        Self {
            private_key,
            name: name.into(),
            listen_addr: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::UNSPECIFIED,
                DEFAULT_P2P_PORT,
            )),
            max_peers: DEFAULT_MAX_PEERS,
            bootstrap_nodes: Vec::new(),
            no_dial: false,
            no_discovery: false,
        }
    }

    /// Create a configuration with a freshly generated identity key.
    pub fn random(name: impl Into<String>) -> Self {
        Self::new(SigningKey::random(&mut OsRng), name)
    }

    /// Hex encoded compressed public key identifying this node.
    #[must_use]
    pub fn node_id(&self) -> String {
        hex::encode(
            self.private_key
                .verifying_key()
                .to_encoded_point(true)
                .as_bytes(),
        )
    }
}

impl fmt::Debug for NetworkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkConfig")
            .field("node_id", &self.node_id())
            .field("name", &self.name)
            .field("listen_addr", &self.listen_addr)
            .field("max_peers", &self.max_peers)
            .field("bootstrap_nodes", &self.bootstrap_nodes)
            .field("no_dial", &self.no_dial)
            .field("no_discovery", &self.no_discovery)
            .finish_non_exhaustive()
    }
}

/// A live networking layer instance.
pub trait Network: Send + Sync {
    /// Bring the transport up.
    fn start(&mut self) -> anyhow::Result<()>;

    /// Tear the transport down.
    fn stop(&mut self) -> anyhow::Result<()>;
}

/// Builds a networking layer from a configuration snapshot.
///
/// Called once per start attempt.
pub type NetworkConstructor = Arc<dyn Fn(NetworkConfig) -> Box<dyn Network> + Send + Sync>;

// ============================================================================
// OfflineNetwork - transport that never touches the wire
// ============================================================================

/// Networking layer that neither listens nor dials.
///
/// Lets a node run its services without any peer connectivity, e.g. for
/// development setups or single-process tooling.
#[derive(Debug)]
pub struct OfflineNetwork {
    config: NetworkConfig,
    running: bool,
}

impl OfflineNetwork {
    /// Create an offline network for the given configuration.
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            running: false,
        }
    }

    /// Constructor suitable for [`crate::Node::new`].
    #[must_use]
    pub fn constructor() -> NetworkConstructor {
        Arc::new(|config: NetworkConfig| Box::new(Self::new(config)) as Box<dyn Network>)
    }

    /// Whether `start` has been called without a matching `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Network for OfflineNetwork {
    fn start(&mut self) -> anyhow::Result<()> {
        if self.running {
            anyhow::bail!("offline network already started");
        }
        self.running = true;
        info!(
            "[network] Offline mode, not listening on {} (node {})",
            self.config.listen_addr,
            self.config.node_id()
        );
        Ok(())
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.running = false;
        info!("[network] Offline network stopped");
        Ok(())
    }
}
