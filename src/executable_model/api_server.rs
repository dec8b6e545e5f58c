// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::error::APIError;
use crate::kubernetes_api_objects::marshal::{marshal, unmarshal, with_type_meta};
use crate::reconciler::exec::io::*;
use crate::shim_layer::api_client::ApiServerClient;
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject};
use kube::Resource;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

// The ExecutableApiServer is an in-memory version of the Kubernetes API server.
// It implements the subset of the API server behavior the controllers rely on:
// objects are keyed by (kind, namespace, name), every write gets a fresh resource
// version, and a status write carrying a stale resource version is rejected.
// It lets the shim layer and the reconcile core run end to end without a cluster.
//
// Lists are returned in key order, which makes "first listed" deterministic.

// KubeObjectRef is the key of an object in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KubeObjectRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl KubeObjectRef {
    pub fn new(kind: &str, namespace: &str, name: &str) -> Self {
        KubeObjectRef {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Default)]
pub struct ApiServerState {
    pub resources: BTreeMap<KubeObjectRef, DynamicObject>,
    pub resource_version_counter: u64,
    pub uid_counter: u64,
    injected_errors: HashMap<ApiVerb, VecDeque<APIError>>,
    history: Vec<(ApiVerb, String)>,
}

impl ApiServerState {
    fn next_resource_version(&mut self) -> String {
        self.resource_version_counter += 1;
        self.resource_version_counter.to_string()
    }

    fn next_uid(&mut self) -> String {
        self.uid_counter += 1;
        format!("uid-{}", self.uid_counter)
    }

    // Records the request and returns the injected error for its verb, if any.
    fn admit(&mut self, verb: ApiVerb, key: String) -> Option<APIError> {
        self.history.push((verb, key));
        self.injected_errors
            .get_mut(&verb)
            .and_then(|errors| errors.pop_front())
    }
}

#[derive(Default)]
pub struct ExecutableApiServer {
    state: Mutex<ApiServerState>,
}

impl ExecutableApiServer {
    pub fn new() -> Self {
        ExecutableApiServer::default()
    }

    fn lock(&self) -> MutexGuard<'_, ApiServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn handle_get_request(req: &KubeGetRequest, s: &ApiServerState) -> KubeGetResponse {
        let req_key = KubeObjectRef::new(&req.api_resource.kind, &req.namespace, &req.name);
        match s.resources.get(&req_key) {
            Some(obj) => KubeGetResponse { res: Ok(obj.clone()) },
            None => KubeGetResponse {
                res: Err(APIError::ObjectNotFound),
            },
        }
    }

    pub fn handle_list_request(req: &KubeListRequest, s: &ApiServerState) -> KubeListResponse {
        let objs = s
            .resources
            .iter()
            .filter(|(key, _)| key.kind == req.api_resource.kind && key.namespace == req.namespace)
            .map(|(_, obj)| obj.clone())
            .collect();
        KubeListResponse { res: Ok(objs) }
    }

    fn create_request_admission_check(
        req: &KubeCreateRequest,
        s: &ApiServerState,
    ) -> Result<KubeObjectRef, APIError> {
        let name = req.obj.metadata.name.as_ref().ok_or(APIError::Invalid)?;
        if let Some(namespace) = &req.obj.metadata.namespace {
            if namespace != &req.namespace {
                return Err(APIError::BadRequest);
            }
        }
        let key = KubeObjectRef::new(&req.api_resource.kind, &req.namespace, name);
        if s.resources.contains_key(&key) {
            return Err(APIError::ObjectAlreadyExists);
        }
        Ok(key)
    }

    pub fn handle_create_request(req: &KubeCreateRequest, s: &mut ApiServerState) -> KubeCreateResponse {
        let key = match Self::create_request_admission_check(req, s) {
            Ok(key) => key,
            Err(err) => return KubeCreateResponse { res: Err(err) },
        };
        let mut created_obj = with_type_meta(req.obj.clone(), &req.api_resource);
        created_obj.metadata.namespace = Some(req.namespace.clone());
        created_obj.metadata.resource_version = Some(s.next_resource_version());
        created_obj.metadata.uid = Some(s.next_uid());
        created_obj.metadata.deletion_timestamp = None;
        s.resources.insert(key, created_obj.clone());
        KubeCreateResponse { res: Ok(created_obj) }
    }

    // Only the status of the stored object changes; metadata and spec in the
    // request are ignored. A write that leaves the status as it is does not
    // produce a new resource version.
    pub fn handle_update_status_request(
        req: &KubeUpdateStatusRequest,
        s: &mut ApiServerState,
    ) -> KubeUpdateStatusResponse {
        let req_key = KubeObjectRef::new(&req.api_resource.kind, &req.namespace, &req.name);
        let old_obj = match s.resources.get(&req_key) {
            Some(obj) => obj.clone(),
            None => {
                return KubeUpdateStatusResponse {
                    res: Err(APIError::ObjectNotFound),
                }
            }
        };
        if let Some(resource_version) = &req.obj.metadata.resource_version {
            if old_obj.metadata.resource_version.as_ref() != Some(resource_version) {
                return KubeUpdateStatusResponse {
                    res: Err(APIError::Conflict),
                };
            }
        }
        let new_status = req.obj.data.get("status").cloned();
        if old_obj.data.get("status").cloned() == new_status {
            return KubeUpdateStatusResponse { res: Ok(old_obj) };
        }
        let mut status_updated_obj = old_obj;
        match status_updated_obj.data.as_object_mut() {
            Some(fields) => {
                match new_status {
                    Some(status) => fields.insert("status".to_string(), status),
                    None => fields.remove("status"),
                };
            }
            None => return KubeUpdateStatusResponse {
                res: Err(APIError::BadRequest),
            },
        }
        status_updated_obj.metadata.resource_version = Some(s.next_resource_version());
        s.resources.insert(req_key, status_updated_obj.clone());
        KubeUpdateStatusResponse {
            res: Ok(status_updated_obj),
        }
    }

    // The helpers below drive the store from outside the controller,
    // the way a user or another component would.

    // seed stores obj as is, replacing any object with the same key.
    // A replaced object keeps its uid; the resource version always moves forward.
    pub fn seed<K>(&self, obj: &K) -> Result<DynamicObject, APIError>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let api_resource = ApiResource::erase::<K>(&());
        let mut dyn_obj = marshal(obj).map_err(|err| APIError::Other(err.to_string()))?;
        dyn_obj = with_type_meta(dyn_obj, &api_resource);
        let name = dyn_obj.metadata.name.clone().ok_or(APIError::Invalid)?;
        let namespace = dyn_obj.metadata.namespace.clone().ok_or(APIError::BadRequest)?;
        let key = KubeObjectRef::new(&api_resource.kind, &namespace, &name);

        let mut s = self.lock();
        let uid = match s.resources.get(&key).and_then(|old| old.metadata.uid.clone()) {
            Some(uid) => uid,
            None => s.next_uid(),
        };
        dyn_obj.metadata.uid = Some(uid);
        dyn_obj.metadata.resource_version = Some(s.next_resource_version());
        s.resources.insert(key, dyn_obj.clone());
        Ok(dyn_obj)
    }

    pub fn get_as<K>(&self, namespace: &str, name: &str) -> Option<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let key = KubeObjectRef::new(&K::kind(&()), namespace, name);
        let obj = self.lock().resources.get(&key).cloned()?;
        unmarshal(obj).ok()
    }

    pub fn list_as<K>(&self, namespace: &str) -> Vec<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let kind = K::kind(&());
        let objs: Vec<DynamicObject> = self
            .lock()
            .resources
            .iter()
            .filter(|(key, _)| key.kind == kind && key.namespace == namespace)
            .map(|(_, obj)| obj.clone())
            .collect();
        objs.into_iter().filter_map(|obj| unmarshal(obj).ok()).collect()
    }

    pub fn delete<K>(&self, namespace: &str, name: &str) -> bool
    where
        K: Resource<DynamicType = ()>,
    {
        let key = KubeObjectRef::new(&K::kind(&()), namespace, name);
        let mut s = self.lock();
        let removed = s.resources.remove(&key).is_some();
        if removed {
            s.resource_version_counter += 1;
        }
        removed
    }

    pub fn resource_version<K>(&self, namespace: &str, name: &str) -> Option<String>
    where
        K: Resource<DynamicType = ()>,
    {
        let key = KubeObjectRef::new(&K::kind(&()), namespace, name);
        self.lock()
            .resources
            .get(&key)
            .and_then(|obj| obj.metadata.resource_version.clone())
    }

    // The next request with this verb fails with err and leaves the store untouched.
    pub fn inject_error(&self, verb: ApiVerb, err: APIError) {
        self.lock()
            .injected_errors
            .entry(verb)
            .or_default()
            .push_back(err);
    }

    // Every request served so far, in arrival order, as (verb, key).
    pub fn history(&self) -> Vec<(ApiVerb, String)> {
        self.lock().history.clone()
    }

    pub fn clear_history(&self) {
        self.lock().history.clear();
    }
}

#[async_trait]
impl ApiServerClient for ExecutableApiServer {
    async fn get(&self, req: &KubeGetRequest) -> KubeGetResponse {
        let mut s = self.lock();
        match s.admit(ApiVerb::Get, req.key()) {
            Some(err) => KubeGetResponse { res: Err(err) },
            None => Self::handle_get_request(req, &s),
        }
    }

    async fn list(&self, req: &KubeListRequest) -> KubeListResponse {
        let mut s = self.lock();
        match s.admit(ApiVerb::List, req.key()) {
            Some(err) => KubeListResponse { res: Err(err) },
            None => Self::handle_list_request(req, &s),
        }
    }

    async fn create(&self, req: &KubeCreateRequest) -> KubeCreateResponse {
        let mut s = self.lock();
        match s.admit(ApiVerb::Create, req.key()) {
            Some(err) => KubeCreateResponse { res: Err(err) },
            None => Self::handle_create_request(req, &mut s),
        }
    }

    async fn update_status(&self, req: &KubeUpdateStatusRequest) -> KubeUpdateStatusResponse {
        let mut s = self.lock();
        match s.admit(ApiVerb::UpdateStatus, req.key()) {
            Some(err) => KubeUpdateStatusResponse { res: Err(err) },
            None => Self::handle_update_status_request(req, &mut s),
        }
    }
}
