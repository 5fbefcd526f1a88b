use modsync_core::{DescriptorError, VersionParseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Parse(#[from] VersionParseError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error("failed to install {filename}: {cause:#}")]
    Install {
        filename: String,
        cause: anyhow::Error,
    },
    #[error("component '{id}' failed to start: {cause}")]
    StartFailure { id: String, cause: String },
    #[error(
        "no pending start can proceed (missing or circular dependency); blocked components: {}",
        blocked.join(", ")
    )]
    Deadlock { blocked: Vec<String> },
    #[error("component registry failure: {0:#}")]
    Registry(anyhow::Error),
}

impl PlanError {
    /// Errors confined to one candidate; the run continues with it skipped.
    pub fn is_candidate_scoped(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Descriptor(_))
    }
}

/// A fatal error together with the activity lines produced before it.
#[derive(Debug, Error)]
#[error("run aborted after {} completed operation(s)", log.len())]
pub struct ExecutionFailure {
    pub log: Vec<String>,
    #[source]
    pub error: PlanError,
}
