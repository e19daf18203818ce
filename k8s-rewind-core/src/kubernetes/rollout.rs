use k8s_openapi::api::apps::v1::Deployment;

const PROGRESS_DEADLINE_EXCEEDED: &str = "ProgressDeadlineExceeded";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloutState {
    Complete,
    Progressing(String),
    DeadlineExceeded,
}

impl RolloutState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, RolloutState::Progressing(_))
    }
}

/// Reads the rollout state off a deployment the same way `kubectl rollout
/// status` does.
pub fn evaluate_rollout(deployment: &Deployment) -> RolloutState {
    let generation = deployment.metadata.generation.unwrap_or(0);
    let Some(status) = deployment.status.as_ref() else {
        return RolloutState::Progressing(
            "Waiting for deployment spec update to be observed...".to_owned(),
        );
    };

    if generation > status.observed_generation.unwrap_or(0) {
        return RolloutState::Progressing(
            "Waiting for deployment spec update to be observed...".to_owned(),
        );
    }

    let deadline_exceeded = status
        .conditions
        .as_ref()
        .and_then(|c| c.iter().find(|c| c.type_ == "Progressing"))
        .and_then(|c| c.reason.as_deref())
        == Some(PROGRESS_DEADLINE_EXCEEDED);

    if deadline_exceeded {
        return RolloutState::DeadlineExceeded;
    }

    let updated = status.updated_replicas.unwrap_or(0);
    let total = status.replicas.unwrap_or(0);
    let available = status.available_replicas.unwrap_or(0);

    if let Some(desired) = deployment.spec.as_ref().and_then(|s| s.replicas) {
        if updated < desired {
            return RolloutState::Progressing(format!(
                "{updated} out of {desired} new replicas have been updated..."
            ));
        }
    }

    if total > updated {
        return RolloutState::Progressing(format!(
            "{} old replicas are pending termination...",
            total - updated
        ));
    }

    if available < updated {
        return RolloutState::Progressing(format!(
            "{available} of {updated} updated replicas are available..."
        ));
    }

    RolloutState::Complete
}
