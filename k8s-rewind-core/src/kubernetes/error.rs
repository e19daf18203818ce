use std::borrow::Cow;

use thiserror::Error;

use crate::policy::RollbackPolicy;

#[derive(Debug, Error)]
pub enum KubeControllerError {
    #[error("Kubernetes API request failed! Reason: {}", .0)]
    KubeApiError(kube::Error),
    #[error("Deployment '{}' wasn't found!", .0)]
    NotFound(String),
    #[error("'{}' resource is missing required data ({})!", .0, .1)]
    MissingData(String, Cow<'static, str>),
    #[error("Rollback policy '{}' is not supported!", .0)]
    UnsupportedPolicy(RollbackPolicy),
    #[error("You cannot rollback a paused deployment; resume '{}' first!", .0)]
    Paused(String),
    #[error("No rollout history found for '{}'!", .0)]
    NoHistory(String),
    #[error("Unable to find revision {revision} in '{name}' history!")]
    RevisionNotFound { name: String, revision: u64 },
    #[error("Deployment '{}' exceeded its progress deadline!", .0)]
    ProgressDeadlineExceeded(String),
    #[error("Deployment '{}' was deleted while waiting for its rollout!", .0)]
    Deleted(String),
    #[error("Couldn't wait for '{}' rollout! Reason: {}", .0, .1)]
    WatchError(String, kube::runtime::wait::Error),
    #[error("Timed out waiting for '{}' rollout to finish!", .0)]
    Timeout(String),
}

impl From<kube::Error> for KubeControllerError {
    fn from(value: kube::Error) -> Self {
        KubeControllerError::KubeApiError(value)
    }
}
