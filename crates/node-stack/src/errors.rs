//! Error types for the node container.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::service::ServiceId;

/// Errors returned by node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node already running")]
    AlreadyRunning,

    #[error("node not started")]
    NotRunning,

    #[error("service not registered: {0}")]
    UnknownService(ServiceId),

    #[error("service already registered: {0}")]
    DuplicateService(ServiceId),

    #[error("failed to construct service {id}: {source}")]
    FactoryFailed {
        id: ServiceId,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to start networking layer: {0}")]
    NetworkStartFailed(#[source] anyhow::Error),

    #[error("failed to start service {id}: {source}")]
    ServiceStartFailed {
        id: ServiceId,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Stop(#[from] StopError),
}

impl NodeError {
    /// The aggregate stop failure, if this error came from `stop`.
    #[must_use]
    pub fn as_stop_error(&self) -> Option<&StopError> {
        match self {
            Self::Stop(err) => Some(err),
            _ => None,
        }
    }
}

/// Failures collected while tearing a node down.
///
/// Per-service failures are keyed by service ID. A failure of the networking
/// layer itself is kept apart in `network`, so `services` can be empty when
/// only the transport failed to shut down.
#[derive(Debug, Default)]
pub struct StopError {
    /// Services that failed to stop.
    pub services: BTreeMap<ServiceId, anyhow::Error>,
    /// Failure stopping the networking layer.
    pub network: Option<anyhow::Error>,
}

impl StopError {
    /// True when nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.network.is_none()
    }

    /// Number of recorded failures, the networking layer included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len() + usize::from(self.network.is_some())
    }

    /// `Ok` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for StopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to stop {} component(s)", self.len())?;
        let mut sep = ": ";
        for (id, err) in &self.services {
            write!(f, "{sep}{id}: {err}")?;
            sep = ", ";
        }
        if let Some(err) = &self.network {
            write!(f, "{sep}networking layer: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for StopError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stop_error_is_success() {
        let failure = StopError::default();
        assert!(failure.is_empty());
        assert_eq!(failure.len(), 0);
        assert!(failure.into_result().is_ok());
    }

    #[test]
    fn test_stop_error_display_lists_every_failure() {
        let mut failure = StopError::default();
        failure
            .services
            .insert(ServiceId::from("les"), anyhow::anyhow!("peer set busy"));
        failure
            .services
            .insert(ServiceId::from("eth"), anyhow::anyhow!("db locked"));
        failure.network = Some(anyhow::anyhow!("listener stuck"));

        assert_eq!(failure.len(), 3);
        assert_eq!(
            failure.to_string(),
            "failed to stop 3 component(s): eth: db locked, les: peer set busy, \
             networking layer: listener stuck"
        );
    }

    #[test]
    fn test_network_only_failure_is_not_empty() {
        let failure = StopError {
            services: BTreeMap::new(),
            network: Some(anyhow::anyhow!("boom")),
        };
        assert!(!failure.is_empty());
        assert!(failure.into_result().is_err());
    }

    #[test]
    fn test_node_error_wraps_stop_error() {
        let err = NodeError::from(StopError {
            services: BTreeMap::new(),
            network: Some(anyhow::anyhow!("boom")),
        });
        assert!(err.as_stop_error().is_some());
        assert!(NodeError::NotRunning.as_stop_error().is_none());
        assert_eq!(
            err.to_string(),
            "failed to stop 1 component(s): networking layer: boom"
        );
    }

    #[test]
    fn test_service_start_failure_keeps_source() {
        let err = NodeError::ServiceStartFailed {
            id: ServiceId::from("eth"),
            source: anyhow::anyhow!("port taken"),
        };
        assert_eq!(err.to_string(), "failed to start service eth: port taken");
        assert!(std::error::Error::source(&err).is_some());
    }
}
