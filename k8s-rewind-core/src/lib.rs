pub mod helpers;
pub mod kubernetes;
pub mod orchestrator;
pub mod plan;
pub mod policy;
pub mod report;
pub mod workload;

pub const CHANGE_CAUSE_ANNOTATION: &str = "kubernetes.io/change-cause";
pub const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";
pub const POD_TEMPLATE_HASH_LABEL: &str = "pod-template-hash";
