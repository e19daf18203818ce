use std::{fmt::Display, fs, io, path::Path};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::{
    plan::RollbackPlan,
    policy::RollbackPolicy,
    workload::{RollbackApplied, WorkloadRef},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RollbackOutcome {
    Succeeded,
    Failed,
    Skipped,
}

impl Display for RollbackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RollbackOutcome::Succeeded => "succeeded",
            RollbackOutcome::Failed => "failed",
            RollbackOutcome::Skipped => "skipped",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueStage {
    PolicyUnsupported,
    RollbackRequest,
    StatusCheck,
    Annotation,
    History,
}

impl Display for IssueStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IssueStage::PolicyUnsupported => "policy",
            IssueStage::RollbackRequest => "rollback",
            IssueStage::StatusCheck => "status",
            IssueStage::Annotation => "annotation",
            IssueStage::History => "history",
        })
    }
}

/// An error that was absorbed while processing a single workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadIssue {
    pub stage: IssueStage,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadEntry {
    pub workload: WorkloadRef,
    pub outcome: RollbackOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackApplied>,
    pub annotated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<WorkloadIssue>,
}

impl WorkloadEntry {
    /// Starts an entry for a workload the controller is about to act on. The
    /// outcome stays `Failed` until a successful status check says otherwise.
    pub fn pending(workload: WorkloadRef) -> Self {
        Self {
            workload,
            outcome: RollbackOutcome::Failed,
            rollback: None,
            annotated: false,
            history: None,
            issues: Vec::new(),
        }
    }

    pub fn skipped(workload: WorkloadRef, reason: impl Into<String>) -> Self {
        Self {
            outcome: RollbackOutcome::Skipped,
            issues: vec![WorkloadIssue {
                stage: IssueStage::PolicyUnsupported,
                message: reason.into(),
            }],
            ..Self::pending(workload)
        }
    }

    pub fn push_issue(&mut self, stage: IssueStage, message: impl Display) {
        self.issues.push(WorkloadIssue {
            stage,
            message: message.to_string(),
        });
    }
}

/// A report that is still being filled in by the orchestrator.
#[derive(Debug)]
pub struct ReportDraft {
    namespace: String,
    policy: RollbackPolicy,
    change_cause: String,
    entries: Vec<WorkloadEntry>,
}

impl ReportDraft {
    pub fn new(plan: &RollbackPlan) -> Self {
        Self {
            namespace: plan.namespace.clone(),
            policy: plan.policy,
            change_cause: plan.change_cause.clone(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: WorkloadEntry) {
        self.entries.push(entry);
    }

    pub fn finalize(self) -> RollbackReport {
        let count = |outcome| self.entries.iter().filter(|e| e.outcome == outcome).count();
        let summary = ReportSummary {
            total: self.entries.len(),
            succeeded: count(RollbackOutcome::Succeeded),
            failed: count(RollbackOutcome::Failed),
            skipped: count(RollbackOutcome::Skipped),
            failed_workloads: self
                .entries
                .iter()
                .filter(|e| e.outcome == RollbackOutcome::Failed)
                .map(|e| e.workload.name.clone())
                .collect(),
        };

        RollbackReport {
            namespace: self.namespace,
            policy: self.policy,
            change_cause: self.change_cause,
            generated_at: Utc::now(),
            entries: self.entries,
            summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failed_workloads: Vec<String>,
}

/// Finalized, immutable result of a rollback run.
#[serde_as]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    namespace: String,
    #[serde_as(as = "DisplayFromStr")]
    policy: RollbackPolicy,
    change_cause: String,
    generated_at: DateTime<Utc>,
    entries: Vec<WorkloadEntry>,
    summary: ReportSummary,
}

impl RollbackReport {
    pub fn entries(&self) -> &[WorkloadEntry] {
        &self.entries
    }

    pub fn summary(&self) -> &ReportSummary {
        &self.summary
    }

    pub fn entry(&self, name: &str) -> Option<&WorkloadEntry> {
        self.entries.iter().find(|e| e.workload.name == name)
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_string())
    }
}

impl Display for RollbackReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Rollback report for namespace '{}'", self.namespace)?;
        writeln!(f, "Policy: {}", self.policy.describe())?;
        writeln!(f, "Change cause: {}", self.change_cause)?;
        writeln!(f, "Generated at: {}", self.generated_at.to_rfc3339())?;

        for entry in &self.entries {
            writeln!(f)?;
            writeln!(f, "==> {} [{}]", entry.workload.name, entry.outcome)?;

            if let Some(rollback) = &entry.rollback {
                writeln!(f, "{rollback}")?;
            }

            for issue in &entry.issues {
                writeln!(f, "{}: {}", issue.stage, issue.message)?;
            }

            if let Some(history) = &entry.history {
                writeln!(f, "{}", history.trim_end())?;
            }
        }

        let summary = &self.summary;

        writeln!(f)?;
        writeln!(f, "Summary")?;
        writeln!(f, "  Total: {}", summary.total)?;
        writeln!(f, "  Succeeded: {}", summary.succeeded)?;
        writeln!(f, "  Failed: {}", summary.failed)?;
        writeln!(f, "  Skipped: {}", summary.skipped)?;

        if summary.failed > 0 {
            writeln!(
                f,
                "  Failed deployments: {}",
                summary.failed_workloads.join(", ")
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        plan::{RollbackPlan, RollbackPlanBuilder},
        policy::RollbackPolicy,
        workload::{RollbackApplied, WorkloadRef},
    };

    use super::{IssueStage, ReportDraft, RollbackOutcome, WorkloadEntry};

    fn plan() -> RollbackPlan {
        RollbackPlanBuilder::default()
            .namespace("giccdevbot")
            .policy(RollbackPolicy::PreviousRevision)
            .change_cause("fix-1")
            .build()
            .unwrap()
    }

    fn entry(name: &str, outcome: RollbackOutcome) -> WorkloadEntry {
        WorkloadEntry {
            outcome,
            ..WorkloadEntry::pending(WorkloadRef::new(name, "giccdevbot"))
        }
    }

    #[test]
    fn finalize_counts_every_outcome() {
        let mut draft = ReportDraft::new(&plan());

        draft.record(entry("a", RollbackOutcome::Succeeded));
        draft.record(entry("b", RollbackOutcome::Failed));
        draft.record(WorkloadEntry::skipped(
            WorkloadRef::new("c", "giccdevbot"),
            "unsupported",
        ));
        draft.record(entry("d", RollbackOutcome::Failed));

        let report = draft.finalize();
        let summary = report.summary();

        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed_workloads, vec!["b", "d"]);
        assert_eq!(
            summary.succeeded + summary.failed + summary.skipped,
            summary.total
        );
    }

    #[test]
    fn empty_report_renders_summary_without_failures() {
        let report = ReportDraft::new(&plan()).finalize();
        let rendered = report.to_string();

        assert!(rendered.contains("Rollback report for namespace 'giccdevbot'"));
        assert!(rendered.contains("Total: 0"));
        assert!(!rendered.contains("Failed deployments"));
    }

    #[test]
    fn rendered_report_lists_sections_and_failures() {
        let mut draft = ReportDraft::new(&plan());
        let mut a = entry("a", RollbackOutcome::Succeeded);
        let mut b = entry("b", RollbackOutcome::Failed);

        a.rollback = Some(RollbackApplied::RolledBack { revision: 2 });
        a.history = Some("deployment.apps/a\nREVISION  CHANGE-CAUSE\n2         fix-1\n".to_owned());
        b.push_issue(IssueStage::StatusCheck, "exceeded its progress deadline");

        draft.record(a);
        draft.record(b);

        let rendered = draft.finalize().to_string();

        assert!(rendered.contains("Policy: previous revision (-1)"));
        assert!(rendered.contains("==> a [succeeded]"));
        assert!(rendered.contains("rolled back to revision 2"));
        assert!(rendered.contains("deployment.apps/a"));
        assert!(rendered.contains("==> b [failed]"));
        assert!(rendered.contains("status: exceeded its progress deadline"));
        assert!(rendered.contains("Failed deployments: b"));
    }

    #[test]
    fn serializes_policy_as_display_string() {
        let report = ReportDraft::new(&plan()).finalize();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["policy"], "-1");
        assert_eq!(json["summary"]["total"], 0);
        assert_eq!(json["changeCause"], "fix-1");
    }

    #[test]
    fn writes_rendered_report_to_disk() {
        let dir = std::env::temp_dir().join(format!("k8s-rewind-report-{}", std::process::id()));
        let path = dir.join("nested").join("report.txt");
        let report = ReportDraft::new(&plan()).finalize();

        report.write_to(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), report.to_string());

        std::fs::remove_dir_all(dir).unwrap();
    }
}
