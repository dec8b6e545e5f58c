// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::reconciler::error::ReconcileCoreError;
use crate::reconciler::exec::io::{KubeAPIRequest, KubeAPIResponse};
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::reflector::ObjectRef;
use kube::Resource;

// Reconciler is the interface a controller implements to be run by the shim layer.
//
// The reconcile logic is a state machine: reconcile_core takes (1) the custom resource,
// (2) the response of the previous request, and (3) the current local state,
// and returns (1) the new local state and (2) at most one request to send to the Kubernetes API.
// reconcile_core itself never talks to the API server, which keeps it deterministic
// and lets the same logic run against a real cluster or the executable model.
pub trait Reconciler {
    // K: the custom resource type
    type K: Resource;
    // S: the local state of one reconcile invocation
    type S;

    fn reconcile_init_state() -> Self::S;

    fn reconcile_core(
        cr: &Self::K,
        resp_o: Option<KubeAPIResponse>,
        state: Self::S,
    ) -> (Self::S, Option<KubeAPIRequest>);

    fn reconcile_done(state: &Self::S) -> bool;

    fn reconcile_error(state: &Self::S) -> Option<&ReconcileCoreError>;

    /// Maps a changed Pod to the custom resource that should be reconciled for it.
    fn owner_of(_pod: &Pod) -> Option<ObjectRef<Self::K>> {
        None
    }
}
