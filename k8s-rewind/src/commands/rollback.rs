use std::time::Duration;

use anyhow::Context;
use k8s_rewind_core::{
    kubernetes::workloads::KubeWorkloads, orchestrator::RolloutOrchestrator,
    plan::RollbackPlanBuilder,
};
use log::{info, warn};

use super::create_client;
use crate::{
    cli::{GlobalArgs, RollbackArgs},
    config::RewindConfig,
    output::render_report,
    prompt::{is_interactive, resolve_change_cause, resolve_policy},
};

pub async fn rollback(
    global_args: &GlobalArgs,
    args: RollbackArgs,
    config: &RewindConfig,
) -> anyhow::Result<()> {
    let interactive = is_interactive();
    let policy = resolve_policy(args.revision, interactive)?;
    let change_cause = resolve_change_cause(args.change_cause, interactive)?;
    let plan = RollbackPlanBuilder::default()
        .namespace(global_args.namespace.as_str())
        .policy(policy)
        .change_cause(change_cause)
        .annotation_key(config.annotation_key.as_str())
        .build()
        .context("Invalid rollback parameters!")?;

    let client = create_client(global_args).await?;
    let workloads = KubeWorkloads::new(client)
        .with_selector(args.selector.or_else(|| config.selector.clone()))
        .with_rollout_timeout(
            args.timeout
                .map(Duration::from_secs)
                .or_else(|| config.rollout_timeout()),
        );
    let orchestrator = RolloutOrchestrator::new(workloads.clone(), workloads);

    let report = orchestrator
        .run(&plan)
        .await
        .context("Couldn't discover deployments to roll back!")?;

    let report_file = args.report_file.unwrap_or_else(|| config.report_file.clone());

    match report.write_to(&report_file) {
        Ok(()) => info!("Report written to {}", report_file.display()),
        Err(error) => warn!(
            "Couldn't write the report to {}! {error}",
            report_file.display()
        ),
    }

    print!("{}", render_report(&report, args.output)?);

    if report.summary().failed > 0 {
        warn!(
            "{} deployment(s) failed to roll back: {}",
            report.summary().failed,
            report.summary().failed_workloads.join(", ")
        );
    }

    Ok(())
}
