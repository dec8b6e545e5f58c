pub mod reconciler;
pub mod resource;

use crate::controllers::simple_pod_controller::crd::{SimplePod, SimplePodSpec};
use crate::controllers::simple_pod_controller::exec::resource::RESOURCE_OWNER_LABEL;
use crate::kubernetes_api_objects::error::APIError;
use crate::reconciler::error::ReconcileCoreError;
use k8s_openapi::api::core::v1::{Container, Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

pub fn container(name: &str, image: &str) -> Container {
    Container {
        name: name.to_string(),
        image: Some(image.to_string()),
        ..Container::default()
    }
}

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn simple_pod(name: &str, namespace: &str) -> SimplePod {
    let mut simple_pod = SimplePod::new(
        name,
        SimplePodSpec {
            containers: vec![container("nginx", "nginx")],
        },
    );
    simple_pod.metadata.namespace = Some(namespace.to_string());
    simple_pod
}

// A Pod as the runtime would report it, labeled as owned by owner.
pub fn owned_pod(name: &str, namespace: &str, owner: &str, ip: Option<&str>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels(&[(RESOURCE_OWNER_LABEL, owner)])),
            ..ObjectMeta::default()
        },
        spec: None,
        status: Some(PodStatus {
            pod_ip: ip.map(str::to_string),
            ..PodStatus::default()
        }),
    }
}

// The API error behind a core failure, if the failure came from a request.
pub fn api_error_of(err: &ReconcileCoreError) -> Option<&APIError> {
    match err {
        ReconcileCoreError::RequestFailed { error, .. } => Some(error),
        _ => None,
    }
}
