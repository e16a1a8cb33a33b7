use thiserror::Error;

/// Store-contract failures.
///
/// `Connection` marks transient store-layer trouble worth retrying; the
/// lookup and conflict variants are definite logical outcomes and are
/// never retryable.
#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("workflow already exists: {0}")]
    WorkflowAlreadyExists(String),

    #[error("workflow missing name")]
    MissingWorkflowName,

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
