use log::{debug, info, warn};

use crate::{
    plan::RollbackPlan,
    report::{IssueStage, ReportDraft, RollbackOutcome, RollbackReport, WorkloadEntry},
    workload::{DiscoveryError, WorkloadController, WorkloadRef, WorkloadRegistry},
};

/// Rolls back every workload of a namespace, one at a time, and reports the
/// outcome of each of them.
///
/// Per-workload errors never stop the batch, only a failed discovery does.
pub struct RolloutOrchestrator<R, C> {
    registry: R,
    controller: C,
}

impl<R: WorkloadRegistry, C: WorkloadController> RolloutOrchestrator<R, C> {
    pub fn new(registry: R, controller: C) -> Self {
        Self {
            registry,
            controller,
        }
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub async fn run(&self, plan: &RollbackPlan) -> Result<RollbackReport, DiscoveryError> {
        info!(
            "Rolling back deployments in '{}' namespace to {}...",
            plan.namespace,
            plan.policy.describe()
        );

        let workloads = self.registry.list_workloads(&plan.namespace).await?;

        if workloads.is_empty() {
            warn!("No deployments found in '{}' namespace!", plan.namespace);
        } else {
            debug!("Found {} deployment(s): {workloads:?}", workloads.len());
        }

        let mut draft = ReportDraft::new(plan);

        for workload in workloads {
            let entry = self.process(workload, plan).await;

            draft.record(entry);
        }

        let report = draft.finalize();
        let summary = report.summary();

        info!(
            "Processed {} deployment(s): {} succeeded, {} failed, {} skipped",
            summary.total, summary.succeeded, summary.failed, summary.skipped
        );

        Ok(report)
    }

    async fn process(&self, workload: WorkloadRef, plan: &RollbackPlan) -> WorkloadEntry {
        if !plan.policy.is_supported() {
            warn!(
                "Skipping '{}': rollback policy '{}' is not supported, only '-1' and explicit revisions are!",
                workload.name, plan.policy
            );

            let reason = format!("policy '{}' is not supported", plan.policy);

            return WorkloadEntry::skipped(workload, reason);
        }

        let mut entry = WorkloadEntry::pending(workload);
        let workload = &entry.workload.clone();

        info!("Rolling back '{}' ({})...", workload.name, plan.policy);
        match self.controller.rollback_to(workload, &plan.policy).await {
            Ok(applied) => {
                info!("'{}': {applied}", workload.name);
                entry.rollback = Some(applied);
            }
            Err(error) => {
                warn!("Rollback request for '{}' failed! {error}", workload.name);
                entry.push_issue(IssueStage::RollbackRequest, error);
            }
        }

        debug!("Waiting for '{}' rollout to finish...", workload.name);
        entry.outcome = match self.controller.rollout_status(workload).await {
            Ok(()) => {
                info!("'{}' successfully rolled out", workload.name);
                RollbackOutcome::Succeeded
            }
            Err(error) => {
                warn!("Rollout of '{}' failed! {error}", workload.name);
                entry.push_issue(IssueStage::StatusCheck, error);
                RollbackOutcome::Failed
            }
        };

        match self
            .controller
            .annotate(workload, &plan.annotation_key, &plan.change_cause)
            .await
        {
            Ok(()) => {
                debug!("Annotated '{}' with {}", workload.name, plan.annotation_key);
                entry.annotated = true;
            }
            Err(error) => {
                warn!("Couldn't annotate '{}'! {error}", workload.name);
                entry.push_issue(IssueStage::Annotation, error);
            }
        }

        match self.controller.history(workload).await {
            Ok(history) => entry.history = Some(history),
            Err(error) => {
                warn!("Couldn't fetch '{}' rollout history! {error}", workload.name);
                entry.push_issue(IssueStage::History, error);
            }
        }

        entry
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        collections::{BTreeMap, HashSet},
        num::NonZeroU64,
    };

    use crate::{
        plan::{RollbackPlan, RollbackPlanBuilder},
        policy::RollbackPolicy,
        report::{IssueStage, RollbackOutcome},
        workload::{
            DiscoveryError, RollbackApplied, WorkloadController, WorkloadRef, WorkloadRegistry,
        },
        CHANGE_CAUSE_ANNOTATION,
    };

    use super::RolloutOrchestrator;

    struct FakeRegistry(Result<Vec<&'static str>, ()>);

    impl WorkloadRegistry for FakeRegistry {
        async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadRef>, DiscoveryError> {
            match &self.0 {
                Ok(names) => Ok(names
                    .iter()
                    .map(|name| WorkloadRef::new(*name, namespace))
                    .collect()),
                Err(()) => Err(DiscoveryError::NamespaceNotFound(namespace.to_owned())),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Rollback(String, RollbackPolicy),
        Status(String),
        Annotate(String, String, String),
        History(String),
    }

    #[derive(Default)]
    struct FakeController {
        calls: RefCell<Vec<Call>>,
        annotations: RefCell<BTreeMap<(String, String), String>>,
        failing_rollbacks: HashSet<&'static str>,
        failing_statuses: HashSet<&'static str>,
        failing_annotations: HashSet<&'static str>,
        failing_histories: HashSet<&'static str>,
    }

    impl FakeController {
        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        fn annotation(&self, name: &str) -> Option<String> {
            self.annotations
                .borrow()
                .get(&(name.to_owned(), CHANGE_CAUSE_ANNOTATION.to_owned()))
                .cloned()
        }
    }

    impl WorkloadController for FakeController {
        type Error = String;

        async fn rollback_to(
            &self,
            workload: &WorkloadRef,
            policy: &RollbackPolicy,
        ) -> Result<RollbackApplied, String> {
            self.calls
                .borrow_mut()
                .push(Call::Rollback(workload.name.clone(), *policy));

            if self.failing_rollbacks.contains(workload.name.as_str()) {
                return Err("no rollout history found".to_owned());
            }

            Ok(RollbackApplied::RolledBack {
                revision: match policy {
                    RollbackPolicy::SpecificRevision(revision) => revision.get(),
                    _ => 1,
                },
            })
        }

        async fn rollout_status(&self, workload: &WorkloadRef) -> Result<(), String> {
            self.calls
                .borrow_mut()
                .push(Call::Status(workload.name.clone()));

            if self.failing_statuses.contains(workload.name.as_str()) {
                return Err("exceeded its progress deadline".to_owned());
            }

            Ok(())
        }

        async fn annotate(&self, workload: &WorkloadRef, key: &str, value: &str) -> Result<(), String> {
            self.calls.borrow_mut().push(Call::Annotate(
                workload.name.clone(),
                key.to_owned(),
                value.to_owned(),
            ));

            if self.failing_annotations.contains(workload.name.as_str()) {
                return Err("forbidden".to_owned());
            }

            self.annotations
                .borrow_mut()
                .insert((workload.name.clone(), key.to_owned()), value.to_owned());

            Ok(())
        }

        async fn history(&self, workload: &WorkloadRef) -> Result<String, String> {
            self.calls
                .borrow_mut()
                .push(Call::History(workload.name.clone()));

            if self.failing_histories.contains(workload.name.as_str()) {
                return Err("connection reset".to_owned());
            }

            Ok(format!("deployment.apps/{}\nREVISION  CHANGE-CAUSE\n", workload.name))
        }
    }

    fn plan(policy: RollbackPolicy) -> RollbackPlan {
        RollbackPlanBuilder::default()
            .namespace("giccdevbot")
            .policy(policy)
            .change_cause("fix-1")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn rolls_back_namespace_with_partial_failures() {
        let controller = FakeController {
            failing_statuses: HashSet::from(["b"]),
            ..Default::default()
        };
        let orchestrator = RolloutOrchestrator::new(FakeRegistry(Ok(vec!["a", "b"])), controller);

        let report = orchestrator
            .run(&plan(RollbackPolicy::PreviousRevision))
            .await
            .unwrap();
        let summary = report.summary();

        assert_eq!(report.entries().len(), 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed_workloads, vec!["b"]);

        for name in ["a", "b"] {
            let entry = report.entry(name).unwrap();

            assert!(entry.annotated);
            assert!(entry.history.is_some());
            assert_eq!(
                orchestrator.controller().annotation(name).as_deref(),
                Some("fix-1")
            );
        }

        assert_eq!(report.entry("a").unwrap().outcome, RollbackOutcome::Succeeded);
        assert_eq!(report.entry("b").unwrap().outcome, RollbackOutcome::Failed);
    }

    #[tokio::test]
    async fn processes_workloads_in_enumeration_order() {
        let orchestrator = RolloutOrchestrator::new(
            FakeRegistry(Ok(vec!["zeta", "alpha"])),
            FakeController::default(),
        );

        let report = orchestrator
            .run(&plan(RollbackPolicy::PreviousRevision))
            .await
            .unwrap();
        let names = report
            .entries()
            .iter()
            .map(|e| e.workload.name.as_str())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(
            orchestrator.controller().calls(),
            vec![
                Call::Rollback("zeta".to_owned(), RollbackPolicy::PreviousRevision),
                Call::Status("zeta".to_owned()),
                Call::Annotate(
                    "zeta".to_owned(),
                    CHANGE_CAUSE_ANNOTATION.to_owned(),
                    "fix-1".to_owned()
                ),
                Call::History("zeta".to_owned()),
                Call::Rollback("alpha".to_owned(), RollbackPolicy::PreviousRevision),
                Call::Status("alpha".to_owned()),
                Call::Annotate(
                    "alpha".to_owned(),
                    CHANGE_CAUSE_ANNOTATION.to_owned(),
                    "fix-1".to_owned()
                ),
                Call::History("alpha".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn specific_revision_is_requested_once_per_workload() {
        let revision = RollbackPolicy::SpecificRevision(NonZeroU64::new(3).unwrap());
        let orchestrator = RolloutOrchestrator::new(
            FakeRegistry(Ok(vec!["a", "b", "c"])),
            FakeController::default(),
        );

        orchestrator.run(&plan(revision)).await.unwrap();

        let rollbacks = orchestrator
            .controller()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Rollback(..)))
            .collect::<Vec<_>>();

        assert_eq!(
            rollbacks,
            vec![
                Call::Rollback("a".to_owned(), revision),
                Call::Rollback("b".to_owned(), revision),
                Call::Rollback("c".to_owned(), revision),
            ]
        );
    }

    #[tokio::test]
    async fn unsupported_policy_skips_every_workload_without_controller_calls() {
        let orchestrator = RolloutOrchestrator::new(
            FakeRegistry(Ok(vec!["a", "b"])),
            FakeController::default(),
        );

        let report = orchestrator
            .run(&plan(RollbackPolicy::Relative(1)))
            .await
            .unwrap();
        let summary = report.summary();

        assert!(orchestrator.controller().calls().is_empty());
        assert_eq!(summary.total, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 0);
        assert!(summary.failed_workloads.is_empty());
        assert!(report.entries().iter().all(|e| e.outcome == RollbackOutcome::Skipped
            && e.issues[0].stage == IssueStage::PolicyUnsupported));
    }

    #[tokio::test]
    async fn controller_errors_never_abort_the_batch() {
        let controller = FakeController {
            failing_rollbacks: HashSet::from(["a"]),
            failing_statuses: HashSet::from(["a"]),
            failing_annotations: HashSet::from(["b"]),
            failing_histories: HashSet::from(["c"]),
            ..Default::default()
        };
        let orchestrator =
            RolloutOrchestrator::new(FakeRegistry(Ok(vec!["a", "b", "c", "d"])), controller);

        let report = orchestrator
            .run(&plan(RollbackPolicy::PreviousRevision))
            .await
            .unwrap();
        let summary = report.summary();

        assert_eq!(report.entries().len(), 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded + summary.failed + summary.skipped, 4);

        let a = report.entry("a").unwrap();
        assert_eq!(a.outcome, RollbackOutcome::Failed);
        assert!(a.rollback.is_none());
        assert!(a.annotated);
        assert!(a.history.is_some());
        assert_eq!(
            a.issues.iter().map(|i| i.stage).collect::<Vec<_>>(),
            vec![IssueStage::RollbackRequest, IssueStage::StatusCheck]
        );

        let b = report.entry("b").unwrap();
        assert_eq!(b.outcome, RollbackOutcome::Succeeded);
        assert!(!b.annotated);

        let c = report.entry("c").unwrap();
        assert_eq!(c.outcome, RollbackOutcome::Succeeded);
        assert!(c.history.is_none());
        assert_eq!(c.issues[0].stage, IssueStage::History);

        assert_eq!(report.entry("d").unwrap().outcome, RollbackOutcome::Succeeded);
    }

    #[tokio::test]
    async fn failed_rollback_request_still_checks_status() {
        let controller = FakeController {
            failing_rollbacks: HashSet::from(["a"]),
            ..Default::default()
        };
        let orchestrator = RolloutOrchestrator::new(FakeRegistry(Ok(vec!["a"])), controller);

        let report = orchestrator
            .run(&plan(RollbackPolicy::PreviousRevision))
            .await
            .unwrap();

        assert_eq!(report.entry("a").unwrap().outcome, RollbackOutcome::Succeeded);
        assert!(orchestrator
            .controller()
            .calls()
            .contains(&Call::Status("a".to_owned())));
    }

    #[tokio::test]
    async fn repeated_runs_leave_the_same_annotation() {
        let orchestrator =
            RolloutOrchestrator::new(FakeRegistry(Ok(vec!["a"])), FakeController::default());
        let plan = plan(RollbackPolicy::PreviousRevision);

        orchestrator.run(&plan).await.unwrap();
        let first = orchestrator.controller().annotation("a");
        orchestrator.run(&plan).await.unwrap();
        let second = orchestrator.controller().annotation("a");

        assert_eq!(first.as_deref(), Some("fix-1"));
        assert_eq!(first, second);
        assert_eq!(orchestrator.controller().annotations.borrow().len(), 1);
    }

    #[tokio::test]
    async fn empty_namespace_produces_empty_report() {
        let orchestrator =
            RolloutOrchestrator::new(FakeRegistry(Ok(vec![])), FakeController::default());

        let report = orchestrator
            .run(&plan(RollbackPolicy::PreviousRevision))
            .await
            .unwrap();

        assert!(report.entries().is_empty());
        assert_eq!(report.summary().total, 0);
        assert!(orchestrator.controller().calls().is_empty());
    }

    #[tokio::test]
    async fn discovery_error_aborts_before_any_workload() {
        let orchestrator = RolloutOrchestrator::new(FakeRegistry(Err(())), FakeController::default());

        let result = orchestrator.run(&plan(RollbackPolicy::PreviousRevision)).await;

        assert!(matches!(result, Err(DiscoveryError::NamespaceNotFound(ns)) if ns == "giccdevbot"));
        assert!(orchestrator.controller().calls().is_empty());
    }
}
