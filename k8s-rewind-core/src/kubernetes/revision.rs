use std::collections::BTreeMap;

use itertools::Itertools;
use k8s_openapi::api::{
    apps::v1::{Deployment, ReplicaSet},
    core::v1::PodTemplateSpec,
};
use serde::Serialize;

use crate::{
    kubernetes::error::KubeControllerError, policy::RollbackPolicy, CHANGE_CAUSE_ANNOTATION,
    POD_TEMPLATE_HASH_LABEL, REVISION_ANNOTATION,
};

/// Deployment annotations that are bookkeeping of the deployment controller
/// itself and never copied over from a ReplicaSet during a rollback.
pub const BOOKKEEPING_ANNOTATIONS: [&str; 6] = [
    "kubectl.kubernetes.io/last-applied-configuration",
    REVISION_ANNOTATION,
    "deployment.kubernetes.io/revision-history",
    "deployment.kubernetes.io/desired-replicas",
    "deployment.kubernetes.io/max-replicas",
    "deprecated.deployment.rollback.to",
];

/// A single entry of a deployment's rollout history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision: u64,
    pub replica_set: String,
    pub change_cause: Option<String>,
    pub current: bool,
}

pub fn get_revision(replica_set: &ReplicaSet) -> Option<u64> {
    replica_set
        .metadata
        .annotations
        .as_ref()?
        .get(REVISION_ANNOTATION)?
        .trim()
        .parse()
        .ok()
}

/// Keeps the ReplicaSets that are controlled by the deployment with `owner_uid`
/// and carry a parsable revision, ordered by ascending revision.
pub fn owned_revisions<'a>(
    replica_sets: &'a [ReplicaSet],
    owner_uid: &str,
) -> Vec<(u64, &'a ReplicaSet)> {
    replica_sets
        .iter()
        .filter(|rs| is_controlled_by(rs, owner_uid))
        .filter_map(|rs| get_revision(rs).map(|revision| (revision, rs)))
        .sorted_by_key(|(revision, _)| *revision)
        .collect()
}

fn is_controlled_by(replica_set: &ReplicaSet, owner_uid: &str) -> bool {
    replica_set
        .metadata
        .owner_references
        .as_ref()
        .map(|refs| {
            refs.iter()
                .any(|r| r.controller.unwrap_or(false) && r.uid == owner_uid)
        })
        .unwrap_or(false)
}

/// Picks the ReplicaSet a rollback should restore. `revisions` must come from
/// [`owned_revisions`].
pub fn select_target<'a>(
    name: &str,
    revisions: &[(u64, &'a ReplicaSet)],
    policy: &RollbackPolicy,
) -> Result<(u64, &'a ReplicaSet), KubeControllerError> {
    match policy {
        RollbackPolicy::PreviousRevision => {
            let mut descending = revisions.iter().rev();
            let _current = descending
                .next()
                .ok_or_else(|| KubeControllerError::NoHistory(name.to_owned()))?;

            descending
                .next()
                .copied()
                .ok_or_else(|| KubeControllerError::NoHistory(name.to_owned()))
        }
        RollbackPolicy::SpecificRevision(revision) => revisions
            .iter()
            .find(|(r, _)| *r == revision.get())
            .copied()
            .ok_or_else(|| KubeControllerError::RevisionNotFound {
                name: name.to_owned(),
                revision: revision.get(),
            }),
        RollbackPolicy::Relative(_) => Err(KubeControllerError::UnsupportedPolicy(*policy)),
    }
}

/// Strips the label the deployment controller adds to every ReplicaSet it owns.
pub fn without_template_hash(template: &PodTemplateSpec) -> PodTemplateSpec {
    let mut template = template.clone();

    if let Some(labels) = template
        .metadata
        .as_mut()
        .and_then(|m| m.labels.as_mut())
    {
        labels.remove(POD_TEMPLATE_HASH_LABEL);
    }

    template
}

pub fn templates_equal(left: &PodTemplateSpec, right: &PodTemplateSpec) -> bool {
    without_template_hash(left) == without_template_hash(right)
}

/// Annotations the deployment should carry after rolling back to `replica_set`:
/// its own bookkeeping annotations, plus everything else from the ReplicaSet.
pub fn rollback_annotations(
    deployment: &Deployment,
    replica_set: &ReplicaSet,
) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();

    if let Some(current) = &deployment.metadata.annotations {
        annotations.extend(
            current
                .iter()
                .filter(|(k, _)| BOOKKEEPING_ANNOTATIONS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone())),
        );
    }

    if let Some(replica_set_annotations) = &replica_set.metadata.annotations {
        annotations.extend(
            replica_set_annotations
                .iter()
                .filter(|(k, _)| !BOOKKEEPING_ANNOTATIONS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone())),
        );
    }

    annotations
}

pub fn describe_revisions(revisions: &[(u64, &ReplicaSet)]) -> Vec<RevisionInfo> {
    let latest = revisions.last().map(|(revision, _)| *revision);

    revisions
        .iter()
        .map(|(revision, rs)| RevisionInfo {
            revision: *revision,
            replica_set: rs.metadata.name.clone().unwrap_or_default(),
            change_cause: rs
                .metadata
                .annotations
                .as_ref()
                .and_then(|a| a.get(CHANGE_CAUSE_ANNOTATION))
                .cloned(),
            current: Some(*revision) == latest,
        })
        .collect()
}

/// Renders a history in the same shape `kubectl rollout history` prints it.
pub fn render_history(name: &str, revisions: &[RevisionInfo]) -> String {
    let mut output = format!("deployment.apps/{name}\nREVISION  CHANGE-CAUSE\n");

    for info in revisions {
        output.push_str(&format!(
            "{:<10}{}\n",
            info.revision,
            info.change_cause.as_deref().unwrap_or("<none>")
        ));
    }

    output
}
