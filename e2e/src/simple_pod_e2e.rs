use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    api::{Api, DeleteParams, ListParams},
    discovery::Discovery,
    Client,
};
use simple_pod_operator::controllers::simple_pod_controller::crd::SimplePod;
use simple_pod_operator::controllers::simple_pod_controller::exec::resource::RESOURCE_OWNER_LABEL;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::*;

use crate::common::*;

pub fn simple_pod() -> String {
    "
    apiVersion: pod.routine.kat/v1
    kind: SimplePod
    metadata:
      name: web
      namespace: default
      labels:
        tier: fe
    spec:
      containers:
      - name: nginx
        image: nginx:1.25
    "
    .to_string()
}

fn owned_pods(pods: Vec<Pod>, sp_name: &str) -> Vec<Pod> {
    pods.into_iter()
        .filter(|pod| {
            pod.metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(RESOURCE_OWNER_LABEL))
                .map(|owner| owner == sp_name)
                .unwrap_or(false)
        })
        .collect()
}

pub async fn desired_state_test(client: Client, sp_name: String) -> Result<(), Error> {
    let timeout = Duration::from_secs(120);
    let start = Instant::now();
    let pod_api: Api<Pod> = Api::namespaced(client.clone(), "default");
    loop {
        sleep(Duration::from_secs(5)).await;
        if start.elapsed() > timeout {
            error!("Time out on desired state test");
            return Err(Error::Timeout);
        }
        let pods = match pod_api.list(&ListParams::default()).await {
            Err(e) => {
                info!("List pods failed with error {}.", e);
                continue;
            }
            Ok(pods) => owned_pods(pods.items, &sp_name),
        };
        match pods.as_slice() {
            [] => {
                info!("No owned pod yet; still creating.");
                continue;
            }
            [pod] => {
                if pod.metadata.name.as_deref() != Some(sp_name.as_str()) {
                    return Err(Error::SimplePodFailed(format!(
                        "pod is named {:?}, expected {}",
                        pod.metadata.name, sp_name
                    )));
                }
                let tier = pod
                    .metadata
                    .labels
                    .as_ref()
                    .and_then(|labels| labels.get("tier"));
                if tier.map(String::as_str) != Some("fe") {
                    return Err(Error::SimplePodFailed("label tier:fe is not copied".to_string()));
                }
                let images: Vec<Option<String>> = pod
                    .spec
                    .as_ref()
                    .map(|spec| spec.containers.iter().map(|c| c.image.clone()).collect())
                    .unwrap_or_default();
                if images != vec![Some("nginx:1.25".to_string())] {
                    return Err(Error::SimplePodFailed(format!(
                        "containers are {:?}",
                        images
                    )));
                }
                info!("Owned pod {} is created.", sp_name);
                break;
            }
            _ => {
                return Err(Error::SimplePodFailed(format!(
                    "{} pods are owned by {}",
                    pods.len(),
                    sp_name
                )));
            }
        }
    }
    info!("Desired state test passed.");
    Ok(())
}

pub async fn status_test(client: Client, sp_name: String) -> Result<(), Error> {
    let timeout = Duration::from_secs(180);
    let start = Instant::now();
    let pod_api: Api<Pod> = Api::namespaced(client.clone(), "default");
    let sp_api: Api<SimplePod> = Api::namespaced(client.clone(), "default");
    loop {
        sleep(Duration::from_secs(5)).await;
        if start.elapsed() > timeout {
            error!("Time out on status test");
            return Err(Error::Timeout);
        }
        let pod_ip = match pod_api.get(&sp_name).await {
            Err(e) => {
                info!("Get pod failed with error {}.", e);
                continue;
            }
            Ok(pod) => pod.status.and_then(|status| status.pod_ip),
        };
        let Some(pod_ip) = pod_ip else {
            info!("Pod has no IP yet.");
            continue;
        };
        let sp_pod_ip = match sp_api.get(&sp_name).await {
            Err(e) => {
                info!("Get simple pod failed with error {}.", e);
                continue;
            }
            Ok(sp) => sp.status.map(|status| status.pod_ip),
        };
        if sp_pod_ip.as_deref() == Some(pod_ip.as_str()) {
            info!("SimplePod status shows pod IP {}.", pod_ip);
            break;
        }
        info!("SimplePod status is {:?}, pod IP is {}.", sp_pod_ip, pod_ip);
    }
    info!("Status test passed.");
    Ok(())
}

pub async fn recreation_test(client: Client, sp_name: String) -> Result<(), Error> {
    let timeout = Duration::from_secs(120);
    let pod_api: Api<Pod> = Api::namespaced(client.clone(), "default");
    let old_uid = pod_api.get(&sp_name).await?.metadata.uid;
    pod_api.delete(&sp_name, &DeleteParams::default()).await?;
    info!("Deleted pod {}.", sp_name);

    let start = Instant::now();
    loop {
        sleep(Duration::from_secs(5)).await;
        if start.elapsed() > timeout {
            error!("Time out on recreation test");
            return Err(Error::Timeout);
        }
        match pod_api.get(&sp_name).await {
            Err(e) => {
                info!("Get pod failed with error {}.", e);
                continue;
            }
            Ok(pod) => {
                if pod.metadata.uid == old_uid {
                    info!("Old pod is still terminating.");
                    continue;
                }
                info!("Pod {} is recreated.", sp_name);
                break;
            }
        }
    }
    info!("Recreation test passed.");
    Ok(())
}

pub async fn simple_pod_e2e_test() -> Result<(), Error> {
    // check if the CRD is already registered
    let client = Client::try_default().await?;
    let crd_api: Api<CustomResourceDefinition> = Api::all(client.clone());
    match crd_api.get("simplepods.pod.routine.kat").await {
        Err(e) => {
            error!("No CRD found, create one before run the e2e test.");
            return Err(Error::CRDGetFailed(e));
        }
        Ok(_) => {
            info!("CRD found, continue to run the e2e test.");
        }
    }

    let discovery = Discovery::new(client.clone()).run().await?;
    let sp_name = apply(simple_pod(), client.clone(), &discovery).await?;

    desired_state_test(client.clone(), sp_name.clone()).await?;
    status_test(client.clone(), sp_name.clone()).await?;
    recreation_test(client.clone(), sp_name.clone()).await?;

    info!("E2e test passed.");
    Ok(())
}
