// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use kube::api::{ApiResource, DynamicObject};
use kube::core::TypeMeta;
use serde::{de::DeserializeOwned, Serialize};

/// Marshal a typed Kubernetes object into a DynamicObject.
///
/// Typed objects (k8s-openapi types and types derived with kube::CustomResource)
/// always serialize their apiVersion and kind, so the result carries a TypeMeta.
pub fn marshal<K: Serialize>(obj: &K) -> Result<DynamicObject, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(obj)?)
}

/// Unmarshal a DynamicObject back to a typed Kubernetes object.
pub fn unmarshal<K: DeserializeOwned>(obj: DynamicObject) -> Result<K, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(obj)?)
}

/// Items of a list response come back without apiVersion and kind;
/// fill them in from the resource the request was issued for.
pub fn with_type_meta(mut obj: DynamicObject, api_resource: &ApiResource) -> DynamicObject {
    if obj.types.is_none() {
        obj.types = Some(TypeMeta {
            api_version: api_resource.api_version.clone(),
            kind: api_resource.kind.clone(),
        });
    }
    obj
}
