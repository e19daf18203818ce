use anyhow::Context;
use k8s_rewind_core::kubernetes::operations::create_local_client;
use kube::Client;

use crate::cli::GlobalArgs;

pub mod history;
pub mod rollback;

async fn create_client(global_args: &GlobalArgs) -> anyhow::Result<Client> {
    create_local_client(&global_args.kube_config, &global_args.kube_context)
        .await
        .context("Couldn't initialize k8s API client!")
}
