use derive_builder::Builder;

use crate::{policy::RollbackPolicy, CHANGE_CAUSE_ANNOTATION};

/// Everything a single orchestrator run needs to know.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct RollbackPlan {
    #[builder(setter(into))]
    pub namespace: String,
    pub policy: RollbackPolicy,
    #[builder(setter(into))]
    pub change_cause: String,
    #[builder(setter(into), default = "CHANGE_CAUSE_ANNOTATION.to_owned()")]
    pub annotation_key: String,
}

impl RollbackPlanBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(namespace) = &self.namespace {
            if namespace.trim().is_empty() {
                return Err("namespace can't be empty".to_owned());
            }
        }

        if let Some(change_cause) = &self.change_cause {
            if change_cause.trim().is_empty() {
                return Err("change cause can't be empty".to_owned());
            }
        }

        if let Some(annotation_key) = &self.annotation_key {
            if annotation_key.trim().is_empty() {
                return Err("annotation key can't be empty".to_owned());
            }
        }

        Ok(())
    }
}
