use anyhow::Context;
use k8s_rewind_core::{
    kubernetes::{revision::RevisionInfo, workloads::KubeWorkloads},
    workload::{WorkloadRef, WorkloadRegistry},
};
use k8s_rewind_macros::TableOutputRow;
use log::warn;
use serde::Serialize;

use super::create_client;
use crate::{
    cli::{GlobalArgs, HistoryArgs},
    output::{CliPrint, TableCellOption},
};

pub async fn history(
    global_args: &GlobalArgs,
    args: HistoryArgs,
) -> anyhow::Result<()> {
    let client = create_client(global_args).await?;
    let workloads = KubeWorkloads::new(client).with_selector(args.selector);
    let targets = match args.name {
        Some(name) => vec![WorkloadRef::new(name, global_args.namespace.as_str())],
        None => workloads
            .list_workloads(&global_args.namespace)
            .await
            .context("Couldn't list deployments!")?,
    };

    let mut histories = Vec::with_capacity(targets.len());
    for target in targets {
        match workloads.revisions(&target).await {
            Ok(revisions) => histories.push((target, revisions)),
            Err(error) => warn!("Couldn't fetch '{}' history! {error}", target.name),
        }
    }

    let views = histories
        .iter()
        .flat_map(|(target, revisions)| {
            revisions
                .iter()
                .map(move |revision| RevisionView::new(&target.name, revision))
        })
        .collect::<Vec<_>>();

    views.print(args.output)?;

    Ok(())
}

#[derive(Serialize, TableOutputRow)]
struct RevisionView<'a> {
    #[name_column]
    pub deployment: &'a str,
    pub revision: u64,
    pub replica_set: &'a str,
    #[column(header = "CHANGE-CAUSE")]
    pub change_cause: TableCellOption<&'a str>,
    pub current: &'static str,
}

impl<'a> RevisionView<'a> {
    fn new(deployment: &'a str, info: &'a RevisionInfo) -> Self {
        Self {
            deployment,
            revision: info.revision,
            replica_set: &info.replica_set,
            change_cause: info.change_cause.as_deref().into(),
            current: if info.current { "*" } else { "" },
        }
    }
}
