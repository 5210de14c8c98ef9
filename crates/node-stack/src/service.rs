//! # Service Contract
//!
//! Every pluggable protocol component implements [`Service`]. The node never
//! looks inside a service: it constructs it through a registered factory,
//! calls `start` once when the stack comes up and `stop` once when it goes
//! down. All resource acquisition belongs in `start`, all release in `stop`.

use std::borrow::Borrow;
use std::fmt;

/// Identifier a service is registered under.
///
/// Opaque to the node; only uniqueness within a registry matters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceId(String);

impl ServiceId {
    /// Create a new identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// View the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ServiceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for ServiceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle contract of a pluggable service.
///
/// `start` and `stop` are invoked sequentially by the node, exactly once per
/// start/stop cycle, and never concurrently for the same instance.
pub trait Service: Send + Sync {
    /// Acquire resources and begin serving.
    fn start(&mut self) -> anyhow::Result<()>;

    /// Release everything acquired in `start`.
    fn stop(&mut self) -> anyhow::Result<()>;
}

impl<S: Service + ?Sized> Service for Box<S> {
    fn start(&mut self) -> anyhow::Result<()> {
        (**self).start()
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        (**self).stop()
    }
}

/// Boxed service instance owned by a running node.
pub type DynService = Box<dyn Service>;

/// Type-erased zero-argument service constructor.
pub type ServiceFactory = Box<dyn Fn() -> anyhow::Result<DynService> + Send + Sync>;

/// Erase the concrete service type produced by `factory`.
pub(crate) fn boxed_factory<F, S>(factory: F) -> ServiceFactory
where
    F: Fn() -> anyhow::Result<S> + Send + Sync + 'static,
    S: Service + 'static,
{
    Box::new(move || factory().map(|service| Box::new(service) as DynService))
}
