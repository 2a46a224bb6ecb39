//! Error types for the migration orchestrator.
//!
//! Every fatal error aborts the whole run; re-invoking the tool is safe
//! because each step detects already-applied state and skips it.

use thiserror::Error;

/// Error type for orchestration operations
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error (failed reads and failed writes alike)
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// A mandatory field is missing from the configuration being mirrored.
    /// Proceeding would desynchronize the declared state from the running
    /// cluster, so this is always fatal.
    #[error("incomplete source configuration: {0}")]
    ConfigIncomplete(String),

    /// A polled condition did not reach its target value within the timeout
    #[error("deadline exceeded waiting for {awaited} (last observed: {last_observed})")]
    DeadlineExceeded {
        awaited: String,
        last_observed: String,
    },

    /// The pool scheduled for evacuation has no assigned node ids
    #[error("node pool {pool} has no assigned node ids")]
    MissingNodeIds { pool: String },

    /// Invalid combination of options or inconsistent cluster state
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 404)
    }

    /// Check if this error is a polling deadline, the only kind some
    /// call sites downgrade to a warning
    pub fn is_deadline(&self) -> bool {
        matches!(self, Error::DeadlineExceeded { .. })
    }
}

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, Error>;
