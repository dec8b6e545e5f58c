// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::error::{kube_error_to_api_error, APIError};
use crate::kubernetes_api_objects::marshal::with_type_meta;
use crate::reconciler::exec::io::*;
use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::json;
use tracing::debug;

/// ApiServerClient is the object store the shim layer sends reconcile requests to.
///
/// Every call is a fallible remote call; failures come back as APIError inside the
/// response so that reconcile_core can decide what to do with them.
#[async_trait]
pub trait ApiServerClient: Send + Sync {
    async fn get(&self, req: &KubeGetRequest) -> KubeGetResponse;

    async fn list(&self, req: &KubeListRequest) -> KubeListResponse;

    async fn create(&self, req: &KubeCreateRequest) -> KubeCreateResponse;

    async fn update_status(&self, req: &KubeUpdateStatusRequest) -> KubeUpdateStatusResponse;
}

/// Sends the request to the matching ApiServerClient method.
pub async fn send_request<A: ApiServerClient + ?Sized>(
    api: &A,
    req: &KubeAPIRequest,
) -> KubeAPIResponse {
    match req {
        KubeAPIRequest::ListRequest(list_req) => {
            KubeAPIResponse::ListResponse(api.list(list_req).await)
        }
        KubeAPIRequest::CreateRequest(create_req) => {
            KubeAPIResponse::CreateResponse(api.create(create_req).await)
        }
        KubeAPIRequest::UpdateStatusRequest(update_status_req) => {
            KubeAPIResponse::UpdateStatusResponse(api.update_status(update_status_req).await)
        }
    }
}

/// KubeClientShim talks to a real API server through kube-rs.
/// Requests are served by Api<DynamicObject> handles built from the request's ApiResource.
#[derive(Clone)]
pub struct KubeClientShim {
    client: Client,
}

impl KubeClientShim {
    pub fn new(client: Client) -> Self {
        KubeClientShim { client }
    }

    fn api(&self, req_namespace: &str, api_resource: &kube::api::ApiResource) -> Api<DynamicObject> {
        Api::<DynamicObject>::namespaced_with(self.client.clone(), req_namespace, api_resource)
    }
}

fn to_api_error(verb: ApiVerb, key: &str, err: kube::Error) -> APIError {
    debug!(%verb, %key, error = %err, "kube api call failed");
    kube_error_to_api_error(&err)
}

#[async_trait]
impl ApiServerClient for KubeClientShim {
    async fn get(&self, req: &KubeGetRequest) -> KubeGetResponse {
        let api = self.api(&req.namespace, &req.api_resource);
        KubeGetResponse {
            res: api
                .get(&req.name)
                .await
                .map(|obj| with_type_meta(obj, &req.api_resource))
                .map_err(|err| to_api_error(ApiVerb::Get, &req.key(), err)),
        }
    }

    async fn list(&self, req: &KubeListRequest) -> KubeListResponse {
        let api = self.api(&req.namespace, &req.api_resource);
        KubeListResponse {
            res: api
                .list(&ListParams::default())
                .await
                .map(|obj_list| {
                    obj_list
                        .items
                        .into_iter()
                        .map(|obj| with_type_meta(obj, &req.api_resource))
                        .collect()
                })
                .map_err(|err| to_api_error(ApiVerb::List, &req.key(), err)),
        }
    }

    async fn create(&self, req: &KubeCreateRequest) -> KubeCreateResponse {
        let api = self.api(&req.namespace, &req.api_resource);
        KubeCreateResponse {
            res: api
                .create(&PostParams::default(), &req.obj)
                .await
                .map(|obj| with_type_meta(obj, &req.api_resource))
                .map_err(|err| to_api_error(ApiVerb::Create, &req.key(), err)),
        }
    }

    // The status is written with a merge patch on the status subresource.
    // Carrying the resource version we read makes the API server reject the
    // write with Conflict if the object changed in between.
    async fn update_status(&self, req: &KubeUpdateStatusRequest) -> KubeUpdateStatusResponse {
        let api = self.api(&req.namespace, &req.api_resource);
        let mut patch = json!({
            "status": req.obj.data.get("status").cloned().unwrap_or_default(),
        });
        if let Some(resource_version) = &req.obj.metadata.resource_version {
            patch["metadata"] = json!({ "resourceVersion": resource_version });
        }
        KubeUpdateStatusResponse {
            res: api
                .patch_status(&req.name, &PatchParams::default(), &Patch::Merge(&patch))
                .await
                .map(|obj| with_type_meta(obj, &req.api_resource))
                .map_err(|err| to_api_error(ApiVerb::UpdateStatus, &req.key(), err)),
        }
    }
}
