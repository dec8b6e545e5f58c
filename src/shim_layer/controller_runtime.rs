// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::config::ControllerConfig;
use crate::kubernetes_api_objects::marshal::unmarshal;
use crate::reconciler::exec::io::*;
use crate::reconciler::exec::reconciler::Reconciler;
use crate::shim_layer::api_client::{send_request, ApiServerClient, KubeClientShim};
use crate::Error;
use anyhow::Result;
use core::fmt::Debug;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{Api, ApiResource},
    runtime::{
        controller::{Action, Controller},
        watcher,
    },
    Client, Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

// The shim layer connects the reconcile core to the kube-rs APIs.
// The key is to implement the reconcile function (impl FnMut(Arc<K>, Arc<Ctx>) -> ReconcilerFut),
// which is required by the kube-rs framework to build a controller,
// on top of reconcile_core, which is provided by the developer.

// Data is passed to reconcile_with and error_policy.
// It carries the client that communicates with the Kubernetes API, the controller settings,
// and the number of failed passes in a row per custom resource, which drives the backoff.
pub struct Data<A> {
    pub api: A,
    pub config: ControllerConfig,
    failures: Mutex<HashMap<String, u32>>,
}

impl<A> Data<A> {
    pub fn new(api: A, config: ControllerConfig) -> Self {
        Data {
            api,
            config,
            failures: Mutex::new(HashMap::new()),
        }
    }

    // Returns the number of failures in a row before this one.
    fn record_failure(&self, key: &str) -> u32 {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let count = failures.entry(key.to_string()).or_insert(0);
        let before = *count;
        *count = count.saturating_add(1);
        before
    }

    fn clear_failures(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

// object_key names a custom resource the same way request keys do: Kind/namespace/name.
fn object_key<K: Resource<DynamicType = ()>>(obj: &K) -> String {
    format!(
        "{}/{}/{}",
        K::kind(&()),
        obj.meta().namespace.as_deref().unwrap_or_default(),
        obj.meta().name.as_deref().unwrap_or_default()
    )
}

// run_controller prepares and runs the controller. It requires:
// K: the custom resource type
// R: the reconciler type
//
// The controller is triggered when a custom resource changes, when a Pod that
// R::owner_of maps to a custom resource changes, and when a requeue elapses.
// On SIGINT/SIGTERM the controller stops and drops in-flight reconciles.
pub async fn run_controller<K, R>(config: ControllerConfig) -> Result<()>
where
    K: Clone
        + Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + DeserializeOwned
        + Serialize
        + Debug
        + Send
        + Sync
        + 'static,
    R: Reconciler<K = K> + 'static,
    R::S: Send,
{
    let client = Client::try_default().await?;
    let (crs, pods) = match &config.namespace {
        Some(namespace) => (
            Api::<K>::namespaced(client.clone(), namespace),
            Api::<Pod>::namespaced(client.clone(), namespace),
        ),
        None => (Api::<K>::all(client.clone()), Api::<Pod>::all(client.clone())),
    };
    let data = Arc::new(Data::new(KubeClientShim::new(client), config));

    info!(kind = %K::kind(&()), "starting controller");
    Controller::new(crs, watcher::Config::default())
        .watches(pods, watcher::Config::default(), |pod| R::owner_of(&pod))
        .shutdown_on_signal()
        .run(
            reconcile_with::<K, R, KubeClientShim>,
            error_policy::<K, KubeClientShim>,
            data,
        )
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => info!(object = %obj, "reconciled"),
                Err(err) => warn!(error = %err, "reconcile failed"),
            }
        })
        .await;
    info!("controller terminated");
    Ok(())
}

// reconcile_with implements the reconcile function by repeatedly invoking R::reconcile_core.
// reconcile_with will be invoked by kube-rs whenever kube-rs's watcher receives any relevant event to the controller,
// or when a requeue requested by a previous invocation elapses.
// In each invocation, reconcile_with first reads the custom resource from the API server,
// then invokes R::reconcile_core in a loop:
// it starts with R::reconcile_init_state, and in each iteration it invokes R::reconcile_core
// with the new state returned by the previous invocation.
// For each request from R::reconcile_core, it sends the request to the API server and
// feeds the response to the next iteration.
// It ends the loop when R reports the reconcile is done (R::reconcile_done)
// or encounters error (R::reconcile_error).
pub async fn reconcile_with<K, R, A>(cr: Arc<K>, ctx: Arc<Data<A>>) -> Result<Action, Error>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
    R: Reconciler<K = K>,
    A: ApiServerClient,
{
    let cr_name = cr
        .meta()
        .name
        .clone()
        .ok_or(Error::MissingObjectKey(".metadata.name"))?;
    let cr_namespace = cr
        .meta()
        .namespace
        .clone()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;

    // Get the custom resource from the API server since the copy handed over by
    // the watcher cache can be stale
    let get_cr_req = KubeGetRequest {
        api_resource: ApiResource::erase::<K>(&()),
        name: cr_name,
        namespace: cr_namespace,
    };
    let cr_key = get_cr_req.key();
    let cr = match ctx.api.get(&get_cr_req).await.res {
        Err(err) if err.is_object_not_found() => {
            info!(object = %cr_key, "custom resource not found, end reconcile");
            ctx.clear_failures(&cr_key);
            return Ok(Action::await_change());
        }
        Err(err) => {
            error!(object = %cr_key, error = %err, "get custom resource failed");
            return Err(Error::GetCustomResourceFailed { key: cr_key, error: err });
        }
        Ok(obj) => unmarshal::<K>(obj).map_err(|source| Error::UnmarshalFailed {
            key: cr_key.clone(),
            source,
        })?,
    };
    info!(object = %cr_key, "reconciling");

    let mut state = R::reconcile_init_state();
    let mut resp_option: Option<KubeAPIResponse> = None;
    loop {
        if R::reconcile_done(&state) {
            info!(object = %cr_key, "reconcile done");
            break;
        }
        if let Some(err) = R::reconcile_error(&state) {
            error!(object = %cr_key, error = %err, "reconcile core failed");
            return Err(Error::ReconcileCoreError(err.clone()));
        }
        let (state_prime, request_option) = R::reconcile_core(&cr, resp_option, state);
        resp_option = match request_option {
            Some(req) => {
                let resp = send_request(&ctx.api, &req).await;
                match resp.error() {
                    None => info!(object = %cr_key, verb = %resp.verb(), key = %req.key(), "request done"),
                    Some(err) => warn!(
                        object = %cr_key,
                        verb = %resp.verb(),
                        key = %req.key(),
                        error = %err,
                        "request failed"
                    ),
                }
                Some(resp)
            }
            None => None,
        };
        state = state_prime;
    }

    ctx.clear_failures(&cr_key);
    Ok(Action::requeue(ctx.config.requeue_after()))
}

// error_policy defines the controller's behavior when the reconcile ends with an error.
// The error has already been logged with its context by reconcile_with.
// The retry delay doubles with every failure in a row of the same custom resource,
// up to the configured maximum, and starts over after a successful pass.
pub fn error_policy<K, A>(object: Arc<K>, err: &Error, ctx: Arc<Data<A>>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let key = object_key(object.as_ref());
    let failures = ctx.record_failure(&key);
    let delay = ctx.config.error_requeue_after(failures);
    warn!(
        object = %key,
        error = %err,
        failures = failures + 1,
        delay_secs = delay.as_secs(),
        "reconcile failed, will retry"
    );
    Action::requeue(delay)
}
