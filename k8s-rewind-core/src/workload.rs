use std::fmt::Display;

use serde::Serialize;
use thiserror::Error;

use crate::policy::RollbackPolicy;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WorkloadRef {
    pub name: String,
    pub namespace: String,
}

impl WorkloadRef {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl Display for WorkloadRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// What the controller did in response to a rollback request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum RollbackApplied {
    RolledBack { revision: u64 },
    AlreadyAtRevision { revision: u64 },
}

impl Display for RollbackApplied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackApplied::RolledBack { revision } => write!(f, "rolled back to revision {revision}"),
            RollbackApplied::AlreadyAtRevision { revision } => write!(
                f,
                "skipped rollback (current template already matches revision {revision})"
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Namespace '{}' doesn't exist!", .0)]
    NamespaceNotFound(String),
    #[error("Couldn't list workloads in '{namespace}' namespace! Reason: {reason}")]
    ListFailed { namespace: String, reason: BoxError },
    #[error("Cluster returned a nameless workload in '{}' namespace!", .0)]
    NamelessWorkload(String),
}

/// Enumerates rollback targets.
#[allow(async_fn_in_trait)]
pub trait WorkloadRegistry {
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadRef>, DiscoveryError>;
}

/// Performs rollout operations on a single workload.
///
/// Every method is expected to block until the underlying operation finishes;
/// `rollout_status` in particular returns only once the rollout either
/// completed (`Ok`) or definitively failed (`Err`).
#[allow(async_fn_in_trait)]
pub trait WorkloadController {
    type Error: Display;

    async fn rollback_to(
        &self,
        workload: &WorkloadRef,
        policy: &RollbackPolicy,
    ) -> Result<RollbackApplied, Self::Error>;

    async fn rollout_status(&self, workload: &WorkloadRef) -> Result<(), Self::Error>;

    /// Upserts `key` with `value`, overwriting whatever was there.
    async fn annotate(&self, workload: &WorkloadRef, key: &str, value: &str)
        -> Result<(), Self::Error>;

    async fn history(&self, workload: &WorkloadRef) -> Result<String, Self::Error>;
}
