//! # Node Stack
//!
//! Lifecycle container for a peer-to-peer protocol stack. A [`Node`] owns one
//! shared networking layer and any number of pluggable [`Service`]s riding on
//! top of it.
//!
//! ## Lifecycle
//!
//! 1. Register service factories while the node is stopped
//! 2. `start`: construct every service, bring up the networking layer, start
//!    the services in registration order; any failure rolls everything back
//! 3. `stop`: stop every service (never short-circuiting), then the
//!    networking layer; failures come back as one [`StopError`]
//!
//! The registry is frozen while the node runs.
//!
//! ## Example
//!
//! ```rust
//! use node_stack::{NetworkConfig, Node, OfflineNetwork, Service};
//!
//! struct Ping;
//!
//! impl Service for Ping {
//!     fn start(&mut self) -> anyhow::Result<()> { Ok(()) }
//!     fn stop(&mut self) -> anyhow::Result<()> { Ok(()) }
//! }
//!
//! let node = Node::new(NetworkConfig::random("demo"), OfflineNetwork::constructor());
//! node.register("ping", || Ok(Ping)).unwrap();
//!
//! node.start().unwrap();
//! assert!(node.is_running());
//! node.stop().unwrap();
//! ```

pub mod config;
pub mod errors;
pub mod network;
pub mod node;
pub mod service;

/// Mock services and networks for tests.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{ConfigError, NodeConfig};
pub use errors::{NodeError, StopError};
pub use network::{Network, NetworkConfig, NetworkConstructor, OfflineNetwork};
pub use node::Node;
pub use service::{DynService, Service, ServiceFactory, ServiceId};
