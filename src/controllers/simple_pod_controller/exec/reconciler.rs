// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::controllers::simple_pod_controller::crd::{SimplePod, SimplePodStatus};
use crate::controllers::simple_pod_controller::exec::resource::{
    find_owned_pod, make_pod, owner_of, pod_ip,
};
use crate::controllers::simple_pod_controller::step::SimplePodReconcileStep;
use crate::kubernetes_api_objects::marshal::{marshal, unmarshal};
use crate::reconciler::error::ReconcileCoreError;
use crate::reconciler::exec::io::*;
use crate::reconciler::exec::reconciler::Reconciler;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ApiResource, DynamicObject};
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;

// Known limitations:
// + Container changes in the SimplePod spec are not pushed to an existing Pod.
// + When several Pods carry the ownership label, only the first one listed is looked at.

// SimplePodReconcileState describes the local state with which the reconcile functions makes decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimplePodReconcileState {
    pub reconcile_step: SimplePodReconcileStep,
}

pub struct SimplePodReconciler {}

impl Reconciler for SimplePodReconciler {
    type K = SimplePod;
    type S = SimplePodReconcileState;

    fn reconcile_init_state() -> Self::S {
        reconcile_init_state()
    }

    fn reconcile_core(
        simple_pod: &Self::K,
        resp_o: Option<KubeAPIResponse>,
        state: Self::S,
    ) -> (Self::S, Option<KubeAPIRequest>) {
        reconcile_core(simple_pod, resp_o, state)
    }

    fn reconcile_done(state: &Self::S) -> bool {
        reconcile_done(state)
    }

    fn reconcile_error(state: &Self::S) -> Option<&ReconcileCoreError> {
        reconcile_error(state)
    }

    fn owner_of(pod: &Pod) -> Option<ObjectRef<Self::K>> {
        owner_of(pod)
    }
}

pub fn reconcile_init_state() -> SimplePodReconcileState {
    SimplePodReconcileState {
        reconcile_step: SimplePodReconcileStep::Init,
    }
}

pub fn reconcile_done(state: &SimplePodReconcileState) -> bool {
    matches!(state.reconcile_step, SimplePodReconcileStep::Done)
}

pub fn reconcile_error(state: &SimplePodReconcileState) -> Option<&ReconcileCoreError> {
    match &state.reconcile_step {
        SimplePodReconcileStep::Error(err) => Some(err),
        _ => None,
    }
}

pub fn reconcile_core(
    simple_pod: &SimplePod,
    resp_o: Option<KubeAPIResponse>,
    state: SimplePodReconcileState,
) -> (SimplePodReconcileState, Option<KubeAPIRequest>) {
    let namespace = simple_pod.namespace().unwrap_or_default();
    match state.reconcile_step {
        SimplePodReconcileStep::Init => {
            let req = KubeAPIRequest::ListRequest(KubeListRequest {
                api_resource: ApiResource::erase::<Pod>(&()),
                namespace,
            });
            (step_to(SimplePodReconcileStep::AfterListPods), Some(req))
        }
        SimplePodReconcileStep::AfterListPods => {
            let objs = match resp_o {
                Some(KubeAPIResponse::ListResponse(KubeListResponse { res: Ok(objs) })) => objs,
                Some(KubeAPIResponse::ListResponse(KubeListResponse { res: Err(error) })) => {
                    return error_state(ReconcileCoreError::RequestFailed {
                        verb: ApiVerb::List,
                        key: format!("Pod/{}", namespace),
                        error,
                    });
                }
                _ => return unexpected_response(&state),
            };
            let pods = match objects_to_pods(objs) {
                Ok(pods) => pods,
                Err(err) => return error_state(err),
            };
            match find_owned_pod(&pods, simple_pod) {
                Some(pod) => {
                    // Always refresh the status so it follows the latest owned Pod
                    let mut updated = simple_pod.clone();
                    updated.status = Some(SimplePodStatus {
                        pod_ip: pod_ip(pod),
                    });
                    let obj = match marshal_or_error::<SimplePod>(&updated) {
                        Ok(obj) => obj,
                        Err(err) => return error_state(err),
                    };
                    let req = KubeAPIRequest::UpdateStatusRequest(KubeUpdateStatusRequest {
                        api_resource: ApiResource::erase::<SimplePod>(&()),
                        name: simple_pod.name_any(),
                        namespace,
                        obj,
                    });
                    (step_to(SimplePodReconcileStep::AfterUpdateStatus), Some(req))
                }
                None => {
                    let obj = match marshal_or_error::<Pod>(&make_pod(simple_pod)) {
                        Ok(obj) => obj,
                        Err(err) => return error_state(err),
                    };
                    let req = KubeAPIRequest::CreateRequest(KubeCreateRequest {
                        api_resource: ApiResource::erase::<Pod>(&()),
                        namespace,
                        obj,
                    });
                    (step_to(SimplePodReconcileStep::AfterCreatePod), Some(req))
                }
            }
        }
        SimplePodReconcileStep::AfterCreatePod => match resp_o {
            Some(KubeAPIResponse::CreateResponse(KubeCreateResponse { res: Ok(_) })) => {
                (step_to(SimplePodReconcileStep::Done), None)
            }
            Some(KubeAPIResponse::CreateResponse(KubeCreateResponse { res: Err(error) })) => {
                // AlreadyExists lands here as well: a Pod with this name exists
                // but does not carry the ownership label.
                error_state(ReconcileCoreError::RequestFailed {
                    verb: ApiVerb::Create,
                    key: format!("Pod/{}/{}", namespace, simple_pod.name_any()),
                    error,
                })
            }
            _ => unexpected_response(&state),
        },
        SimplePodReconcileStep::AfterUpdateStatus => match resp_o {
            Some(KubeAPIResponse::UpdateStatusResponse(KubeUpdateStatusResponse {
                res: Ok(_),
            })) => (step_to(SimplePodReconcileStep::Done), None),
            Some(KubeAPIResponse::UpdateStatusResponse(KubeUpdateStatusResponse {
                res: Err(error),
            })) => error_state(ReconcileCoreError::RequestFailed {
                verb: ApiVerb::UpdateStatus,
                key: format!("SimplePod/{}/{}", namespace, simple_pod.name_any()),
                error,
            }),
            _ => unexpected_response(&state),
        },
        SimplePodReconcileStep::Done | SimplePodReconcileStep::Error(_) => (state, None),
    }
}

fn step_to(reconcile_step: SimplePodReconcileStep) -> SimplePodReconcileState {
    SimplePodReconcileState { reconcile_step }
}

fn error_state(err: ReconcileCoreError) -> (SimplePodReconcileState, Option<KubeAPIRequest>) {
    (step_to(SimplePodReconcileStep::Error(err)), None)
}

fn unexpected_response(
    state: &SimplePodReconcileState,
) -> (SimplePodReconcileState, Option<KubeAPIRequest>) {
    error_state(ReconcileCoreError::UnexpectedResponse(
        state.reconcile_step.to_string(),
    ))
}

fn objects_to_pods(objs: Vec<DynamicObject>) -> Result<Vec<Pod>, ReconcileCoreError> {
    objs.into_iter()
        .map(|obj| {
            unmarshal::<Pod>(obj).map_err(|err| ReconcileCoreError::UnmarshalFailed {
                kind: "Pod".to_string(),
                reason: err.to_string(),
            })
        })
        .collect()
}

fn marshal_or_error<K: kube::Resource<DynamicType = ()> + serde::Serialize>(
    obj: &K,
) -> Result<DynamicObject, ReconcileCoreError> {
    marshal(obj).map_err(|err| ReconcileCoreError::UnmarshalFailed {
        kind: K::kind(&()).to_string(),
        reason: err.to_string(),
    })
}
