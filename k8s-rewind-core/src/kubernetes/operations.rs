use std::fmt::Debug;

use k8s_openapi::{
    api::core::v1::Namespace,
    serde::{de::DeserializeOwned, Serialize},
    NamespaceResourceScope,
};
use kube::{
    api::{ListParams, Patch, PatchParams},
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client, Config, Resource,
};
use log::debug;
use serde_json::json;

use crate::helpers::pretty_type_name;

pub async fn create_local_client(
    config_path: &Option<String>,
    context_name: &Option<String>,
) -> anyhow::Result<Client> {
    let config_options = KubeConfigOptions {
        context: context_name.to_owned(),
        ..Default::default()
    };

    let config = match config_path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &config_options).await?
        }
        None => Config::from_kubeconfig(&config_options).await?,
    };

    let client = Client::try_from(config)?;

    Ok(client)
}

pub async fn namespace_exists(client: &Client, name: &str) -> Result<bool, kube::Error> {
    let namespace_api: Api<Namespace> = Api::all(client.clone());

    Ok(namespace_api.get_opt(name).await?.is_some())
}

pub async fn list_resource_names<T>(
    client: &Client,
    namespace: &str,
    list_params: &ListParams,
) -> Result<Vec<Option<String>>, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    debug!(
        "Listing {} resources in '{namespace}' namespace...",
        pretty_type_name::<T>()
    );

    let resource_api: Api<T> = Api::namespaced(client.clone(), namespace);
    let resources = resource_api.list_metadata(list_params).await?;

    Ok(resources
        .items
        .into_iter()
        .map(|r| r.metadata.name)
        .collect())
}

pub async fn list_resources<T>(
    client: &Client,
    namespace: &str,
    list_params: &ListParams,
) -> Result<Vec<T>, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    let resource_api: Api<T> = Api::namespaced(client.clone(), namespace);

    Ok(resource_api.list(list_params).await?.items)
}

pub async fn try_get_resource<T>(
    client: &Client,
    name: &str,
    namespace: &str,
) -> Result<Option<T>, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    let resource_api: Api<T> = Api::namespaced(client.clone(), namespace);

    resource_api.get_opt(name).await
}

pub async fn upsert_annotation<T>(
    client: &Client,
    name: &str,
    namespace: &str,
    key: &str,
    value: &str,
    patch_params: &PatchParams,
) -> Result<T, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Serialize
        + Debug,
{
    debug!(
        "Setting '{key}' annotation on '{name}' {}...",
        pretty_type_name::<T>()
    );

    let resource_api: Api<T> = Api::namespaced(client.clone(), namespace);
    let patch = json!({
        "metadata": {
            "annotations": {
                key: value
            }
        }
    });

    resource_api
        .patch(name, patch_params, &Patch::Merge(&patch))
        .await
}
