// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::error::APIError;
use kube::api::{ApiResource, DynamicObject};
use std::fmt;

// KubeAPIRequest represents the API requests a reconcile core can issue.
//
// kube-rs uses a generic type kube::api::Api as an api handle to send
// requests to the Kubernetes API.
// So KubeAPIRequest wraps around the variables used to instantiate a
// kube::api::Api<DynamicObject> and to call its methods.
// The ApiResource plays the role of the type registry: it is derived from the
// Rust type once (ApiResource::erase) and carried with the request.

#[derive(Debug, Clone)]
pub enum KubeAPIRequest {
    ListRequest(KubeListRequest),
    CreateRequest(KubeCreateRequest),
    UpdateStatusRequest(KubeUpdateStatusRequest),
}

impl KubeAPIRequest {
    pub fn key(&self) -> String {
        match self {
            KubeAPIRequest::ListRequest(req) => req.key(),
            KubeAPIRequest::CreateRequest(req) => req.key(),
            KubeAPIRequest::UpdateStatusRequest(req) => req.key(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVerb {
    Get,
    List,
    Create,
    UpdateStatus,
}

impl fmt::Display for ApiVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            ApiVerb::Get => "Get",
            ApiVerb::List => "List",
            ApiVerb::Create => "Create",
            ApiVerb::UpdateStatus => "UpdateStatus",
        };
        f.write_str(verb)
    }
}

// KubeGetRequest has the name as the parameter of Api.get(), and namespace to instantiate an Api.

#[derive(Debug, Clone)]
pub struct KubeGetRequest {
    pub api_resource: ApiResource,
    pub name: String,
    pub namespace: String,
}

impl KubeGetRequest {
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.api_resource.kind, self.namespace, self.name)
    }
}

// KubeListRequest has the namespace to instantiate an Api.

#[derive(Debug, Clone)]
pub struct KubeListRequest {
    pub api_resource: ApiResource,
    pub namespace: String,
}

impl KubeListRequest {
    pub fn key(&self) -> String {
        format!("{}/{}", self.api_resource.kind, self.namespace)
    }
}

// KubeCreateRequest has the obj as the parameter of Api.create().

#[derive(Debug, Clone)]
pub struct KubeCreateRequest {
    pub api_resource: ApiResource,
    pub namespace: String,
    pub obj: DynamicObject,
}

impl KubeCreateRequest {
    pub fn key(&self) -> String {
        format!(
            "{}/{}/{}",
            self.api_resource.kind,
            self.namespace,
            self.obj.metadata.name.as_deref().unwrap_or_default()
        )
    }
}

// KubeUpdateStatusRequest writes the status of obj.
// The resource version carried in obj.metadata guards against stale writes.

#[derive(Debug, Clone)]
pub struct KubeUpdateStatusRequest {
    pub api_resource: ApiResource,
    pub name: String,
    pub namespace: String,
    pub obj: DynamicObject,
}

impl KubeUpdateStatusRequest {
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.api_resource.kind, self.namespace, self.name)
    }
}

// KubeAPIResponse represents API results used in executable.
// Each response carries either the object(s) returned by the API server or the APIError.

#[derive(Debug, Clone)]
pub enum KubeAPIResponse {
    ListResponse(KubeListResponse),
    CreateResponse(KubeCreateResponse),
    UpdateStatusResponse(KubeUpdateStatusResponse),
}

impl KubeAPIResponse {
    pub fn verb(&self) -> ApiVerb {
        match self {
            KubeAPIResponse::ListResponse(_) => ApiVerb::List,
            KubeAPIResponse::CreateResponse(_) => ApiVerb::Create,
            KubeAPIResponse::UpdateStatusResponse(_) => ApiVerb::UpdateStatus,
        }
    }

    pub fn error(&self) -> Option<&APIError> {
        match self {
            KubeAPIResponse::ListResponse(resp) => resp.res.as_ref().err(),
            KubeAPIResponse::CreateResponse(resp) => resp.res.as_ref().err(),
            KubeAPIResponse::UpdateStatusResponse(resp) => resp.res.as_ref().err(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KubeGetResponse {
    pub res: Result<DynamicObject, APIError>,
}

#[derive(Debug, Clone)]
pub struct KubeListResponse {
    pub res: Result<Vec<DynamicObject>, APIError>,
}

#[derive(Debug, Clone)]
pub struct KubeCreateResponse {
    pub res: Result<DynamicObject, APIError>,
}

#[derive(Debug, Clone)]
pub struct KubeUpdateStatusResponse {
    pub res: Result<DynamicObject, APIError>,
}
