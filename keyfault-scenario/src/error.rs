//! Scenario driver errors.

use keyfault_conductor_admin::AdminError;
use keyfault_core::error::KeyfaultError;
use keyfault_signing_proxy::ProxyError;
use keyfault_supervisor::SupervisorError;

/// Fatal failures of a scenario run.
///
/// Failures of the expected-to-fail probes are not represented here; they are
/// recorded as step outcomes in the report.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] KeyfaultError),

    /// Scratch or log directories could not be prepared.
    #[error("failed to prepare {path}: {reason}")]
    Setup { path: String, reason: String },

    /// A managed process could not be started.
    #[error("failed to start process: {0}")]
    Spawn(SupervisorError),

    /// A readiness probe did not succeed before its deadline.
    #[error("readiness check failed: {0}")]
    NotReady(SupervisorError),

    /// The signing proxy could not be started.
    #[error("signing proxy error: {0}")]
    Proxy(#[from] ProxyError),

    /// The run was stopped by a shutdown signal.
    #[error("interrupted by {signal}")]
    Interrupted { signal: &'static str },

    /// A required admin call failed.
    #[error("admin call '{step}' failed: {source}")]
    Rpc {
        step: String,
        #[source]
        source: AdminError,
    },
}

impl From<SupervisorError> for ScenarioError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::NotReady { .. } => Self::NotReady(err),
            other => Self::Spawn(other),
        }
    }
}

impl ScenarioError {
    pub(crate) fn setup(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Setup {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn rpc(step: impl Into<String>, source: AdminError) -> Self {
        Self::Rpc {
            step: step.into(),
            source,
        }
    }
}
