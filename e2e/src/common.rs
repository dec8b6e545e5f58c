use kube::{
    api::{Api, DynamicObject, Patch, PatchParams, ResourceExt},
    core::GroupVersionKind,
    discovery::{ApiCapabilities, ApiResource, Discovery, Scope},
    Client,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to get kube client: {0}")]
    ClientGetFailed(#[from] kube::Error),

    #[error("Failed to apply yaml file!")]
    ApplyFailed,

    #[error("Failed to parse the yaml file!")]
    ParseYamlFailed(#[from] serde_yaml::Error),

    #[error("Failed to parse the json format!")]
    ParseJsonFailed(#[from] serde_json::Error),

    #[error("Failed to get CRD: {0}")]
    CRDGetFailed(#[source] kube::Error),

    #[error("Timeout, e2e test failed!")]
    Timeout,

    #[error("Pod is not consistent with SimplePod: {0}")]
    SimplePodFailed(String),
}

// apply server-side applies one yaml document and returns the object's name.
pub async fn apply(yaml: String, client: Client, discovery: &Discovery) -> Result<String, Error> {
    let ssapply = PatchParams::apply("kubectl-light").force();
    let obj: DynamicObject = serde_yaml::from_str(&yaml)?;
    let namespace = obj.metadata.namespace.as_deref();
    let gvk = match &obj.types {
        Some(tm) => GroupVersionKind::try_from(tm).map_err(|_| Error::ApplyFailed)?,
        None => {
            info!("cannot apply object without valid TypeMeta {:?}", obj);
            return Err(Error::ApplyFailed);
        }
    };
    let name = obj.name_any();
    match discovery.resolve_gvk(&gvk) {
        Some((ar, caps)) => {
            let api = dynamic_api(ar, caps, client, namespace);
            info!("Applying {}: \n{}", gvk.kind, serde_yaml::to_string(&obj)?);
            let data: serde_json::Value = serde_json::to_value(&obj)?;
            api.patch(&name, &ssapply, &Patch::Apply(data)).await?;
            info!("applied {} {}", gvk.kind, name);
        }
        None => {
            info!("Cannot apply document for unknown {:?}", gvk);
            return Err(Error::ApplyFailed);
        }
    }
    Ok(name)
}

fn dynamic_api(
    ar: ApiResource,
    caps: ApiCapabilities,
    client: Client,
    ns: Option<&str>,
) -> Api<DynamicObject> {
    if caps.scope == Scope::Cluster {
        Api::all_with(client, &ar)
    } else if let Some(namespace) = ns {
        Api::namespaced_with(client, namespace, &ar)
    } else {
        Api::default_namespaced_with(client, &ar)
    }
}
