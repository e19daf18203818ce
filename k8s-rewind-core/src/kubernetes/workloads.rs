use std::{collections::BTreeMap, time::Duration};

use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use kube::{
    api::{ListParams, PatchParams, PostParams},
    runtime::wait::await_condition,
    Api, Client,
};
use log::{debug, info};

use crate::{
    helpers::{AndIfSome, RequireMetadata},
    kubernetes::{
        error::KubeControllerError,
        operations::{
            list_resource_names, list_resources, namespace_exists, try_get_resource,
            upsert_annotation,
        },
        revision::{
            describe_revisions, owned_revisions, render_history, rollback_annotations,
            select_target, templates_equal, without_template_hash, RevisionInfo,
        },
        rollout::{evaluate_rollout, RolloutState},
    },
    policy::RollbackPolicy,
    workload::{
        DiscoveryError, RollbackApplied, WorkloadController, WorkloadRef, WorkloadRegistry,
    },
};

pub const FIELD_MANAGER: &str = "k8s-rewind";

/// Deployment registry and controller backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeWorkloads {
    client: Client,
    selector: Option<String>,
    rollout_timeout: Option<Duration>,
}

impl KubeWorkloads {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            selector: None,
            rollout_timeout: None,
        }
    }

    /// Only deployments matching the label `selector` will be listed.
    pub fn with_selector(mut self, selector: Option<String>) -> Self {
        self.selector = selector.filter(|s| !s.trim().is_empty());
        self
    }

    /// Bounds how long a single rollout status check may wait.
    pub fn with_rollout_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.rollout_timeout = timeout;
        self
    }

    fn list_params(&self) -> ListParams {
        ListParams::default().and_if_some(|| self.selector.as_deref(), |lp, s| lp.labels(s))
    }

    async fn get_deployment(&self, workload: &WorkloadRef) -> Result<Deployment, KubeControllerError> {
        try_get_resource::<Deployment>(&self.client, &workload.name, &workload.namespace)
            .await?
            .ok_or_else(|| KubeControllerError::NotFound(workload.name.clone()))
    }

    async fn get_replica_sets(&self, deployment: &Deployment) -> Result<Vec<ReplicaSet>, KubeControllerError> {
        let namespace = deployment
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| missing_data(deployment, "metadata.namespace"))?;
        let match_labels = deployment
            .spec
            .as_ref()
            .and_then(|s| s.selector.match_labels.as_ref());
        let list_params = ListParams::default().and_if_some(
            || match_labels.map(join_labels),
            |lp, labels| lp.labels(&labels),
        );

        Ok(list_resources::<ReplicaSet>(&self.client, namespace, &list_params).await?)
    }

    /// Rollout history of a single deployment, ordered by ascending revision.
    pub async fn revisions(&self, workload: &WorkloadRef) -> Result<Vec<RevisionInfo>, KubeControllerError> {
        let deployment = self.get_deployment(workload).await?;
        let uid = deployment.require_uid_or_else(|| missing_data(&deployment, "metadata.uid"))?;
        let replica_sets = self.get_replica_sets(&deployment).await?;

        Ok(describe_revisions(&owned_revisions(&replica_sets, uid)))
    }

    async fn wait_for_rollout(&self, workload: &WorkloadRef) -> Result<Option<Deployment>, KubeControllerError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &workload.namespace);
        let condition = |deployment: Option<&Deployment>| {
            deployment.map_or(true, |d| evaluate_rollout(d).is_finished())
        };
        let wait = await_condition(api, &workload.name, condition);

        let result = match self.rollout_timeout {
            Some(timeout) => tokio::time::timeout(timeout, wait)
                .await
                .map_err(|_| KubeControllerError::Timeout(workload.name.clone()))?,
            None => wait.await,
        };

        result.map_err(|e| KubeControllerError::WatchError(workload.name.clone(), e))
    }
}

impl WorkloadRegistry for KubeWorkloads {
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadRef>, DiscoveryError> {
        let list_failed = |e: kube::Error| DiscoveryError::ListFailed {
            namespace: namespace.to_owned(),
            reason: Box::new(e),
        };

        if !namespace_exists(&self.client, namespace)
            .await
            .map_err(list_failed)?
        {
            return Err(DiscoveryError::NamespaceNotFound(namespace.to_owned()));
        }

        let names = list_resource_names::<Deployment>(&self.client, namespace, &self.list_params())
            .await
            .map_err(list_failed)?;

        names
            .into_iter()
            .map(|name| {
                name.map(|name| WorkloadRef::new(name, namespace))
                    .ok_or_else(|| DiscoveryError::NamelessWorkload(namespace.to_owned()))
            })
            .collect()
    }
}

impl WorkloadController for KubeWorkloads {
    type Error = KubeControllerError;

    async fn rollback_to(
        &self,
        workload: &WorkloadRef,
        policy: &RollbackPolicy,
    ) -> Result<RollbackApplied, KubeControllerError> {
        if !policy.is_supported() {
            return Err(KubeControllerError::UnsupportedPolicy(*policy));
        }

        let mut deployment = self.get_deployment(workload).await?;
        let uid = deployment
            .require_uid_or_else(|| missing_data(&deployment, "metadata.uid"))?
            .to_owned();
        let spec = deployment
            .spec
            .as_ref()
            .ok_or_else(|| missing_data(&deployment, "spec"))?;

        if spec.paused.unwrap_or(false) {
            return Err(KubeControllerError::Paused(workload.name.clone()));
        }

        let replica_sets = self.get_replica_sets(&deployment).await?;
        let revisions = owned_revisions(&replica_sets, &uid);
        let (revision, target) = select_target(&workload.name, &revisions, policy)?;
        let target_template = target
            .spec
            .as_ref()
            .and_then(|s| s.template.as_ref())
            .ok_or_else(|| {
                KubeControllerError::MissingData(
                    target.metadata.name.clone().unwrap_or_default(),
                    "spec.template".into(),
                )
            })?;

        if templates_equal(&spec.template, target_template) {
            info!(
                "'{}' already runs the template of revision {revision}, nothing to roll back",
                workload.name
            );

            return Ok(RollbackApplied::AlreadyAtRevision { revision });
        }

        debug!(
            "Restoring '{}' template from {:?} (revision {revision})",
            workload.name, target.metadata.name
        );

        let annotations = rollback_annotations(&deployment, target);
        let template = without_template_hash(target_template);

        deployment.metadata.annotations = Some(annotations);
        if let Some(spec) = deployment.spec.as_mut() {
            spec.template = template;
        }

        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &workload.namespace);
        let post_params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_owned()),
            ..Default::default()
        };

        api.replace(&workload.name, &post_params, &deployment).await?;

        Ok(RollbackApplied::RolledBack { revision })
    }

    async fn rollout_status(&self, workload: &WorkloadRef) -> Result<(), KubeControllerError> {
        let deployment = self
            .wait_for_rollout(workload)
            .await?
            .ok_or_else(|| KubeControllerError::Deleted(workload.name.clone()))?;

        match evaluate_rollout(&deployment) {
            RolloutState::Complete => Ok(()),
            RolloutState::DeadlineExceeded => Err(KubeControllerError::ProgressDeadlineExceeded(
                workload.name.clone(),
            )),
            RolloutState::Progressing(message) => {
                debug!("'{}' is still progressing: {message}", workload.name);
                Err(KubeControllerError::Timeout(workload.name.clone()))
            }
        }
    }

    async fn annotate(
        &self,
        workload: &WorkloadRef,
        key: &str,
        value: &str,
    ) -> Result<(), KubeControllerError> {
        let patch_params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_owned()),
            ..Default::default()
        };

        upsert_annotation::<Deployment>(
            &self.client,
            &workload.name,
            &workload.namespace,
            key,
            value,
            &patch_params,
        )
        .await?;

        Ok(())
    }

    async fn history(&self, workload: &WorkloadRef) -> Result<String, KubeControllerError> {
        let revisions = self.revisions(workload).await?;

        Ok(render_history(&workload.name, &revisions))
    }
}

fn missing_data(deployment: &Deployment, field: &'static str) -> KubeControllerError {
    KubeControllerError::MissingData(
        deployment.metadata.name.clone().unwrap_or_default(),
        field.into(),
    )
}

fn join_labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}
