// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use k8s_openapi::api::core::v1::Container;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// SimplePod asks for exactly one Pod running the given containers.
#[derive(CustomResource, Default, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(group = "pod.routine.kat", version = "v1", kind = "SimplePod")]
#[kube(shortname = "sp", namespaced)]
#[kube(status = "SimplePodStatus")]
#[kube(printcolumn = r#"{"name":"PodIP", "type":"string", "jsonPath":".status.podIp"}"#)]
pub struct SimplePodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Default, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct SimplePodStatus {
    /// IP of the owned Pod as last observed, empty until the runtime assigns one
    #[serde(rename = "podIp", default)]
    pub pod_ip: String,
}
