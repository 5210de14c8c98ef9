//! # Node Container
//!
//! The node owns the networking layer and the services registered into it.
//!
//! ## Lifecycle
//!
//! ```text
//!              register / unregister
//!                    ┌────┐
//!                    ▼    │
//!               ┌───────────┐   start (ok)    ┌───────────┐
//!    new() ───→ │  Stopped  │ ──────────────→ │  Running  │
//!               └───────────┘ ←────────────── └───────────┘
//!                 ▲       │   stop (always)
//!                 └───────┘
//!             start (failed)
//! ```
//!
//! Start is all-or-nothing: every factory runs first, then the networking
//! layer comes up, then each service in registration order. A failing
//! service rolls back the ones started before it (in reverse) and the
//! networking layer. Stop tears down every service even when some fail,
//! then the networking layer, and always leaves the node stopped.
//!
//! A single `RwLock` guards the registry and the live state. State changing
//! operations hold the write lock for their whole duration, so no two of them
//! ever interleave; queries take the read lock.

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::errors::{NodeError, StopError};
use crate::network::{Network, NetworkConfig, NetworkConstructor};
use crate::service::{boxed_factory, DynService, Service, ServiceFactory, ServiceId};

/// Live resources of a running node.
///
/// The network handle and the services exist together or not at all.
struct Running {
    network: Box<dyn Network>,
    /// Started services, in start order.
    services: IndexMap<ServiceId, DynService>,
}

#[derive(Default)]
struct NodeState {
    /// Registered constructors, in registration order.
    stack: IndexMap<ServiceId, ServiceFactory>,
    running: Option<Running>,
}

/// A peer-to-peer node into which services are registered.
pub struct Node {
    /// Networking configuration template, snapshotted on every start.
    config: NetworkConfig,
    network: NetworkConstructor,
    state: RwLock<NodeState>,
}

impl Node {
    /// Create a stopped node with an empty service stack.
    ///
    /// `network` builds the networking layer from a snapshot of `config` each
    /// time the node starts.
    pub fn new(config: NetworkConfig, network: NetworkConstructor) -> Self {
        Self {
            config,
            network,
            state: RwLock::new(NodeState::default()),
        }
    }

    /// The networking configuration template.
    #[must_use]
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Identity of this node, derived from the configured key.
    #[must_use]
    pub fn node_id(&self) -> String {
        self.config.node_id()
    }

    /// Register a service constructor under `id`.
    ///
    /// # Errors
    ///
    /// - [`NodeError::AlreadyRunning`] if the node is running
    /// - [`NodeError::DuplicateService`] if `id` is taken
    pub fn register<F, S>(&self, id: impl Into<ServiceId>, factory: F) -> Result<(), NodeError>
    where
        F: Fn() -> anyhow::Result<S> + Send + Sync + 'static,
        S: Service + 'static,
    {
        let id = id.into();
        let mut state = self.state.write();

        if state.running.is_some() {
            return Err(NodeError::AlreadyRunning);
        }
        if state.stack.contains_key(&id) {
            return Err(NodeError::DuplicateService(id));
        }
        debug!("[node] Registering service {}", id);
        state.stack.insert(id, boxed_factory(factory));
        Ok(())
    }

    /// Remove a service from the stack.
    ///
    /// # Errors
    ///
    /// - [`NodeError::AlreadyRunning`] if the node is running
    /// - [`NodeError::UnknownService`] if `id` is not registered
    pub fn unregister(&self, id: &str) -> Result<(), NodeError> {
        let mut state = self.state.write();

        if state.running.is_some() {
            return Err(NodeError::AlreadyRunning);
        }
        if state.stack.shift_remove(id).is_none() {
            return Err(NodeError::UnknownService(ServiceId::from(id)));
        }
        debug!("[node] Unregistered service {}", id);
        Ok(())
    }

    /// Bring up the networking layer and every registered service.
    ///
    /// On failure nothing is left running and the node stays stopped.
    ///
    /// # Errors
    ///
    /// - [`NodeError::AlreadyRunning`] if the node is running
    /// - [`NodeError::FactoryFailed`] if a constructor fails
    /// - [`NodeError::NetworkStartFailed`] if the networking layer fails
    /// - [`NodeError::ServiceStartFailed`] if a service fails to start
    pub fn start(&self) -> Result<(), NodeError> {
        let mut state = self.state.write();
        self.start_locked(&mut state)
    }

    /// Tear down every service and then the networking layer.
    ///
    /// The node is stopped afterwards even if some component failed.
    ///
    /// # Errors
    ///
    /// - [`NodeError::NotRunning`] if the node is stopped
    /// - [`NodeError::Stop`] listing every component that failed to stop
    pub fn stop(&self) -> Result<(), NodeError> {
        let mut state = self.state.write();
        Self::stop_locked(&mut state)
    }

    /// Stop the node and start it again with fresh service instances.
    ///
    /// No other state changing operation can run between the two halves.
    /// If stopping fails the node is left stopped and no start is attempted.
    ///
    /// # Errors
    ///
    /// Whatever [`Node::stop`] or [`Node::start`] returns.
    pub fn restart(&self) -> Result<(), NodeError> {
        let mut state = self.state.write();
        Self::stop_locked(&mut state)?;
        self.start_locked(&mut state)
    }

    /// Whether the node is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.read().running.is_some()
    }

    /// Registered service IDs, in registration order.
    #[must_use]
    pub fn registered(&self) -> Vec<ServiceId> {
        self.state.read().stack.keys().cloned().collect()
    }

    /// IDs of the live services, in start order. Empty while stopped.
    #[must_use]
    pub fn running_services(&self) -> Vec<ServiceId> {
        self.state
            .read()
            .running
            .as_ref()
            .map(|running| running.services.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn start_locked(&self, state: &mut NodeState) -> Result<(), NodeError> {
        if state.running.is_some() {
            return Err(NodeError::AlreadyRunning);
        }
        info!("[node] Starting node {} ({} services)", self.config.name, state.stack.len());

        let config = self.config.clone();

        let mut services = IndexMap::with_capacity(state.stack.len());
        for (id, factory) in &state.stack {
            let service = factory().map_err(|source| NodeError::FactoryFailed {
                id: id.clone(),
                source,
            })?;
            services.insert(id.clone(), service);
        }

        let mut network = (self.network)(config);
        network.start().map_err(NodeError::NetworkStartFailed)?;

        for index in 0..services.len() {
            let Some((id, service)) = services.get_index_mut(index) else {
                break;
            };
            debug!("[node] Starting service {}", id);
            if let Err(source) = service.start() {
                let id = id.clone();
                warn!("[node] Service {} failed to start, rolling back: {}", id, source);
                Self::rollback(&mut services, index, network.as_mut());
                return Err(NodeError::ServiceStartFailed { id, source });
            }
        }

        state.running = Some(Running { network, services });
        info!("[node] Node started");
        Ok(())
    }

    /// Stop the first `started` services in reverse order, then the network.
    fn rollback(
        services: &mut IndexMap<ServiceId, DynService>,
        started: usize,
        network: &mut dyn Network,
    ) {
        for index in (0..started).rev() {
            let Some((id, service)) = services.get_index_mut(index) else {
                continue;
            };
            if let Err(err) = service.stop() {
                warn!("[node] Rollback: service {} failed to stop: {}", id, err);
            }
        }
        if let Err(err) = network.stop() {
            warn!("[node] Rollback: networking layer failed to stop: {}", err);
        }
    }

    fn stop_locked(state: &mut NodeState) -> Result<(), NodeError> {
        let Some(Running {
            mut network,
            mut services,
        }) = state.running.take()
        else {
            return Err(NodeError::NotRunning);
        };
        info!("[node] Stopping node ({} services)", services.len());

        let mut failure = StopError::default();
        for (id, service) in services.iter_mut().rev() {
            debug!("[node] Stopping service {}", id);
            if let Err(err) = service.stop() {
                warn!("[node] Service {} failed to stop: {}", id, err);
                failure.services.insert(id.clone(), err);
            }
        }
        if let Err(err) = network.stop() {
            warn!("[node] Networking layer failed to stop: {}", err);
            failure.network = Some(err);
        }

        if failure.is_empty() {
            info!("[node] Node stopped");
        } else {
            warn!("[node] Node stopped with {} failure(s)", failure.len());
        }
        failure.into_result().map_err(NodeError::from)
    }
}
