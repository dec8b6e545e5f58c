// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::controllers::simple_pod_controller::crd::SimplePod;
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::runtime::reflector::ObjectRef;
use kube::{Resource, ResourceExt};

/// Label on a Pod naming the SimplePod (in the same namespace) that owns it.
pub const RESOURCE_OWNER_LABEL: &str = "resourceOwner";

/// make_pod builds the Pod a SimplePod asks for.
///
/// The Pod shares the SimplePod's name and namespace, so at most one Pod can
/// ever be created per SimplePod name. Labels are copied from the SimplePod
/// with the ownership label set on top, and containers are copied in order.
/// When the SimplePod has a UID the Pod also gets a controller owner reference,
/// which lets the garbage collector remove the Pod together with its owner.
pub fn make_pod(simple_pod: &SimplePod) -> Pod {
    let name = simple_pod.name_any();
    let mut labels = simple_pod.labels().clone();
    labels.insert(RESOURCE_OWNER_LABEL.to_string(), name.clone());
    Pod {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: simple_pod.namespace(),
            labels: Some(labels),
            owner_references: simple_pod.controller_owner_ref(&()).map(|oref| vec![oref]),
            ..ObjectMeta::default()
        },
        spec: Some(PodSpec {
            containers: simple_pod.spec.containers.clone(),
            ..PodSpec::default()
        }),
        status: None,
    }
}

/// is_owned_by holds when the Pod carries the ownership label for this SimplePod
/// and lives in the same namespace.
pub fn is_owned_by(pod: &Pod, simple_pod: &SimplePod) -> bool {
    match &simple_pod.meta().name {
        Some(name) => {
            pod.namespace() == simple_pod.namespace()
                && pod.labels().get(RESOURCE_OWNER_LABEL) == Some(name)
        }
        None => false,
    }
}

/// find_owned_pod returns the first owned Pod in list order.
/// Later owners, if any, are ignored.
pub fn find_owned_pod<'a>(pods: &'a [Pod], simple_pod: &SimplePod) -> Option<&'a Pod> {
    pods.iter().find(|pod| is_owned_by(pod, simple_pod))
}

/// The Pod IP as reported by the runtime, empty when not assigned yet.
pub fn pod_ip(pod: &Pod) -> String {
    pod.status
        .as_ref()
        .and_then(|status| status.pod_ip.clone())
        .unwrap_or_default()
}

/// owner_of maps a Pod event to the SimplePod that should be reconciled for it.
pub fn owner_of(pod: &Pod) -> Option<ObjectRef<SimplePod>> {
    let owner = pod.labels().get(RESOURCE_OWNER_LABEL)?;
    let namespace = pod.namespace()?;
    Some(ObjectRef::new(owner).within(&namespace))
}
