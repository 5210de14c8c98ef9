//! Test utilities for the node container.
//!
//! Mock services and networking layers that record every lifecycle call into
//! a shared [`CallLog`], so tests can assert on ordering across components.
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust,ignore
//! use node_stack::testing::{Call, CallLog, MockNetwork, MockService};
//! use node_stack::{NetworkConfig, Node};
//!
//! let log = CallLog::new();
//! let node = Node::new(NetworkConfig::random("demo"), MockNetwork::constructor(&log));
//!
//! let service_log = log.clone();
//! node.register("eth", move || Ok(MockService::new("eth", &service_log)))
//!     .unwrap();
//! node.start().unwrap();
//!
//! assert_eq!(log.count(&Call::ServiceStart("eth")), 1);
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::network::{Network, NetworkConfig, NetworkConstructor};
use crate::service::Service;

/// A recorded lifecycle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    /// A service factory produced an instance.
    Construct(&'static str),
    /// `Service::start` was called.
    ServiceStart(&'static str),
    /// `Service::stop` was called.
    ServiceStop(&'static str),
    /// `Network::start` was called.
    NetworkStart,
    /// `Network::stop` was called.
    NetworkStop,
}

/// Shared, ordered record of lifecycle calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call.
    pub fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    /// Snapshot of all calls so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// How many times `call` was recorded.
    #[must_use]
    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Service that records its lifecycle and can be told to fail.
#[derive(Debug)]
pub struct MockService {
    id: &'static str,
    log: Option<CallLog>,
    start_error: Option<&'static str>,
    stop_error: Option<&'static str>,
}

impl MockService {
    /// Create a service and record its construction.
    #[must_use]
    pub fn new(id: &'static str, log: &CallLog) -> Self {
        log.record(Call::Construct(id));
        Self {
            id,
            log: Some(log.clone()),
            start_error: None,
            stop_error: None,
        }
    }

    /// A service that records nothing and never fails.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            id: "silent",
            log: None,
            start_error: None,
            stop_error: None,
        }
    }

    /// Make `start` fail with `message`.
    #[must_use]
    pub fn failing_start(mut self, message: &'static str) -> Self {
        self.start_error = Some(message);
        self
    }

    /// Make `stop` fail with `message`.
    #[must_use]
    pub fn failing_stop(mut self, message: &'static str) -> Self {
        self.stop_error = Some(message);
        self
    }

    fn record(&self, call: Call) {
        if let Some(log) = &self.log {
            log.record(call);
        }
    }
}

impl Service for MockService {
    fn start(&mut self) -> anyhow::Result<()> {
        self.record(Call::ServiceStart(self.id));
        match self.start_error {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        }
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.record(Call::ServiceStop(self.id));
        match self.stop_error {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        }
    }
}

/// Networking layer that records its lifecycle and can be told to fail.
#[derive(Debug, Clone)]
pub struct MockNetwork {
    log: CallLog,
    start_error: Option<&'static str>,
    stop_error: Option<&'static str>,
}

impl MockNetwork {
    /// Create a network recording into `log`.
    #[must_use]
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            start_error: None,
            stop_error: None,
        }
    }

    /// Constructor producing a well-behaved mock on every start.
    #[must_use]
    pub fn constructor(log: &CallLog) -> NetworkConstructor {
        let log = log.clone();
        Arc::new(move |_config: NetworkConfig| Box::new(Self::new(&log)) as Box<dyn Network>)
    }

    /// Make `start` fail with `message`.
    #[must_use]
    pub fn failing_start(mut self, message: &'static str) -> Self {
        self.start_error = Some(message);
        self
    }

    /// Make `stop` fail with `message`.
    #[must_use]
    pub fn failing_stop(mut self, message: &'static str) -> Self {
        self.stop_error = Some(message);
        self
    }
}

impl Network for MockNetwork {
    fn start(&mut self) -> anyhow::Result<()> {
        self.log.record(Call::NetworkStart);
        match self.start_error {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        }
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.log.record(Call::NetworkStop);
        match self.stop_error {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        }
    }
}
