//! # Node Configuration
//!
//! Settings for the networking layer, loaded from a TOML file and then
//! overridden from the environment.
//!
//! ## Config File Format
//!
//! ```toml
//! [node]
//! name = "stack-node"
//! private_key = "<64 hex chars>"   # omitted: fresh random identity
//!
//! [network]
//! listen_addr = "0.0.0.0:30303"
//! max_peers = 25
//! bootstrap_nodes = ["10.0.0.1:30303"]
//! no_dial = false
//! no_discovery = false
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable                | Field                     |
//! |-------------------------|---------------------------|
//! | `STACK_NODE_NAME`       | `node.name`               |
//! | `STACK_PRIVATE_KEY`     | `node.private_key`        |
//! | `STACK_P2P_PORT`        | port of `listen_addr`     |
//! | `STACK_MAX_PEERS`       | `network.max_peers`       |
//! | `STACK_BOOTSTRAP_NODES` | comma separated list      |

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use k256::ecdsa::SigningKey;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::network::{NetworkConfig, DEFAULT_MAX_PEERS, DEFAULT_P2P_PORT};

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid listen address: {0}")]
    InvalidAddress(String),
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Identity settings.
    pub node: IdentityConfig,
    /// Transport settings.
    pub network: TransportConfig,
}

/// Identity settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Name announced to peers.
    pub name: String,
    /// Hex encoded secp256k1 secret key.
    pub private_key: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: "stack-node".to_string(),
            private_key: None,
        }
    }
}

/// Transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Listening address, `ip:port`.
    pub listen_addr: String,
    /// Maximum peers in the peer set.
    pub max_peers: usize,
    /// Bootstrap node addresses.
    pub bootstrap_nodes: Vec<String>,
    /// Only accept inbound connections.
    pub no_dial: bool,
    /// Disable discovery.
    pub no_discovery: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{DEFAULT_P2P_PORT}"),
            max_peers: DEFAULT_MAX_PEERS,
            bootstrap_nodes: Vec::new(),
            no_dial: false,
            no_discovery: false,
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("STACK_NODE_NAME") {
            self.node.name = name;
        }
        if let Some(key) = lookup("STACK_PRIVATE_KEY") {
            info!("Loaded node key from environment");
            self.node.private_key = Some(key);
        }
        if let Some(port) = lookup("STACK_P2P_PORT") {
            match (port.parse::<u16>(), self.network.listen_addr.parse::<SocketAddr>()) {
                (Ok(port), Ok(mut addr)) => {
                    addr.set_port(port);
                    self.network.listen_addr = addr.to_string();
                }
                _ => warn!("Ignoring STACK_P2P_PORT={}", port),
            }
        }
        if let Some(max) = lookup("STACK_MAX_PEERS") {
            match max.parse() {
                Ok(max) => self.network.max_peers = max,
                Err(_) => warn!("Ignoring STACK_MAX_PEERS={}", max),
            }
        }
        if let Some(nodes) = lookup("STACK_BOOTSTRAP_NODES") {
            self.network.bootstrap_nodes = nodes
                .split(',')
                .map(str::trim)
                .filter(|node| !node.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Build the networking layer configuration.
    ///
    /// Generates a fresh identity when no key is configured.
    ///
    /// # Errors
    ///
    /// Returns error if the key or listen address is malformed.
    pub fn network_config(&self) -> Result<NetworkConfig, ConfigError> {
        let private_key = match &self.node.private_key {
            Some(key) => parse_private_key(key)?,
            None => {
                warn!("No node key configured, generating an ephemeral identity");
                return self.with_key(NetworkConfig::random(self.node.name.clone()));
            }
        };
        self.with_key(NetworkConfig::new(private_key, self.node.name.clone()))
    }

    fn with_key(&self, mut config: NetworkConfig) -> Result<NetworkConfig, ConfigError> {
        config.listen_addr = self
            .network
            .listen_addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.network.listen_addr.clone()))?;
        config.max_peers = self.network.max_peers;
        config.bootstrap_nodes = self.network.bootstrap_nodes.clone();
        config.no_dial = self.network.no_dial;
        config.no_discovery = self.network.no_discovery;
        Ok(config)
    }
}

fn parse_private_key(key: &str) -> Result<SigningKey, ConfigError> {
    let bytes = hex::decode(key.trim_start_matches("0x"))
        .map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(ConfigError::InvalidKey(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    SigningKey::from_slice(&bytes).map_err(|e| ConfigError::InvalidKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const KEY: &str = "0707070707070707070707070707070707070707070707070707070707070707";

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.node.name, "stack-node");
        assert_eq!(config.network.listen_addr, "0.0.0.0:30303");
        assert_eq!(config.network.max_peers, DEFAULT_MAX_PEERS);
        assert!(config.node.private_key.is_none());
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let toml = r#"
            [network]
            max_peers = 50
            bootstrap_nodes = ["10.0.0.1:30303", "10.0.0.2:30303"]
        "#;

        let config = NodeConfig::parse(toml).unwrap();
        assert_eq!(config.network.max_peers, 50);
        assert_eq!(config.network.bootstrap_nodes.len(), 2);
        assert_eq!(config.node.name, "stack-node"); // default
        assert!(!config.network.no_dial); // default
    }

    #[test]
    fn test_parse_rejects_malformed_toml() {
        assert!(matches!(
            NodeConfig::parse("[network\nmax_peers = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[node]\nname = \"archive\"\nprivate_key = \"{KEY}\"").unwrap();

        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.node.name, "archive");

        let network = config.network_config().unwrap();
        assert_eq!(network.name, "archive");
        assert_eq!(
            network.node_id(),
            NetworkConfig::new(parse_private_key(KEY).unwrap(), "x").node_id()
        );
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            NodeConfig::load("/definitely/not/here.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("STACK_NODE_NAME", "light"),
            ("STACK_P2P_PORT", "40404"),
            ("STACK_MAX_PEERS", "7"),
            ("STACK_BOOTSTRAP_NODES", "1.1.1.1:30303, ,2.2.2.2:30303"),
        ]
        .into_iter()
        .collect();

        let mut config = NodeConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.node.name, "light");
        assert_eq!(config.network.listen_addr, "0.0.0.0:40404");
        assert_eq!(config.network.max_peers, 7);
        assert_eq!(
            config.network.bootstrap_nodes,
            vec!["1.1.1.1:30303".to_string(), "2.2.2.2:30303".to_string()]
        );
    }

    #[test]
    fn test_env_ignores_bad_values() {
        let mut config = NodeConfig::default();
        config.apply_overrides(|key| match key {
            "STACK_P2P_PORT" => Some("not-a-port".to_string()),
            "STACK_MAX_PEERS" => Some("-1".to_string()),
            _ => None,
        });
        assert_eq!(config.network.listen_addr, "0.0.0.0:30303");
        assert_eq!(config.network.max_peers, DEFAULT_MAX_PEERS);
    }

    #[test]
    fn test_network_config_random_key_when_unset() {
        let config = NodeConfig::default();
        let a = config.network_config().unwrap();
        let b = config.network_config().unwrap();
        assert_ne!(a.node_id(), b.node_id());
    }

    #[test]
    fn test_network_config_rejects_bad_key() {
        let mut config = NodeConfig::default();
        config.node.private_key = Some("abcd".to_string());
        assert!(matches!(
            config.network_config(),
            Err(ConfigError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_network_config_rejects_bad_address() {
        let mut config = NodeConfig::default();
        config.node.private_key = Some(format!("0x{KEY}"));
        config.network.listen_addr = "nowhere".to_string();
        assert!(matches!(
            config.network_config(),
            Err(ConfigError::InvalidAddress(_))
        ));
    }
}
