// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::controllers::simple_pod_controller::crd::SimplePod;
use crate::controllers::simple_pod_controller::exec::reconciler::*;
use crate::controllers::simple_pod_controller::step::SimplePodReconcileStep;
use crate::kubernetes_api_objects::error::APIError;
use crate::kubernetes_api_objects::marshal::{marshal, unmarshal};
use crate::reconciler::error::ReconcileCoreError;
use crate::reconciler::exec::io::*;
use crate::unit_tests::{api_error_of, labels, owned_pod, simple_pod};
use k8s_openapi::api::core::v1::Pod;

fn at(reconcile_step: SimplePodReconcileStep) -> SimplePodReconcileState {
    SimplePodReconcileState { reconcile_step }
}

fn list_response(pods: &[Pod]) -> Option<KubeAPIResponse> {
    let objs = pods.iter().map(|pod| marshal(pod).unwrap()).collect();
    Some(KubeAPIResponse::ListResponse(KubeListResponse { res: Ok(objs) }))
}

#[test]
pub fn test_init_lists_pods_in_namespace() {
    let sp = simple_pod("foo", "default");
    let (state, req) = reconcile_core(&sp, None, reconcile_init_state());

    assert_eq!(state, at(SimplePodReconcileStep::AfterListPods));
    match req {
        Some(KubeAPIRequest::ListRequest(list_req)) => {
            assert_eq!(list_req.api_resource.kind, "Pod");
            assert_eq!(list_req.namespace, "default");
        }
        _ => panic!("expected a list request"),
    }
}

#[test]
pub fn test_no_owned_pod_creates_pod() {
    let mut sp = simple_pod("foo", "default");
    sp.metadata.labels = Some(labels(&[("a", "1")]));
    let others = vec![owned_pod("bar", "default", "bar", Some("10.0.0.1"))];

    let (state, req) = reconcile_core(
        &sp,
        list_response(&others),
        at(SimplePodReconcileStep::AfterListPods),
    );

    assert_eq!(state, at(SimplePodReconcileStep::AfterCreatePod));
    match req {
        Some(KubeAPIRequest::CreateRequest(create_req)) => {
            assert_eq!(create_req.namespace, "default");
            assert_eq!(create_req.key(), "Pod/default/foo");
            let pod: Pod = unmarshal(create_req.obj).unwrap();
            assert_eq!(
                pod.metadata.labels,
                Some(labels(&[("a", "1"), ("resourceOwner", "foo")]))
            );
            assert_eq!(pod.spec.unwrap().containers, sp.spec.containers);
        }
        _ => panic!("expected a create request"),
    }
}

#[test]
pub fn test_owned_pod_updates_status() {
    let mut sp = simple_pod("foo", "default");
    sp.metadata.resource_version = Some("7".to_string());
    let pods = vec![owned_pod("foo", "default", "foo", Some("10.0.0.9"))];

    let (state, req) = reconcile_core(
        &sp,
        list_response(&pods),
        at(SimplePodReconcileStep::AfterListPods),
    );

    assert_eq!(state, at(SimplePodReconcileStep::AfterUpdateStatus));
    match req {
        Some(KubeAPIRequest::UpdateStatusRequest(update_req)) => {
            assert_eq!(update_req.key(), "SimplePod/default/foo");
            assert_eq!(update_req.obj.metadata.resource_version, Some("7".to_string()));
            let updated: SimplePod = unmarshal(update_req.obj).unwrap();
            assert_eq!(updated.status.unwrap().pod_ip, "10.0.0.9");
            assert_eq!(updated.spec, sp.spec);
        }
        _ => panic!("expected an update status request"),
    }
}

#[test]
pub fn test_owned_pod_without_ip_updates_status_to_empty() {
    let sp = simple_pod("foo", "default");
    let pods = vec![owned_pod("foo", "default", "foo", None)];

    let (_, req) = reconcile_core(
        &sp,
        list_response(&pods),
        at(SimplePodReconcileStep::AfterListPods),
    );

    match req {
        Some(KubeAPIRequest::UpdateStatusRequest(update_req)) => {
            let updated: SimplePod = unmarshal(update_req.obj).unwrap();
            assert_eq!(updated.status.unwrap().pod_ip, "");
        }
        _ => panic!("expected an update status request"),
    }
}

#[test]
pub fn test_first_owned_pod_wins() {
    let sp = simple_pod("foo", "default");
    let pods = vec![
        owned_pod("a", "default", "foo", Some("10.0.0.1")),
        owned_pod("b", "default", "foo", Some("10.0.0.2")),
    ];

    let (_, req) = reconcile_core(
        &sp,
        list_response(&pods),
        at(SimplePodReconcileStep::AfterListPods),
    );

    match req {
        Some(KubeAPIRequest::UpdateStatusRequest(update_req)) => {
            let updated: SimplePod = unmarshal(update_req.obj).unwrap();
            assert_eq!(updated.status.unwrap().pod_ip, "10.0.0.1");
        }
        _ => panic!("expected an update status request"),
    }
}

#[test]
pub fn test_list_failure() {
    let sp = simple_pod("foo", "default");
    let resp = Some(KubeAPIResponse::ListResponse(KubeListResponse {
        res: Err(APIError::InternalError),
    }));

    let (state, req) = reconcile_core(&sp, resp, at(SimplePodReconcileStep::AfterListPods));

    assert!(req.is_none());
    assert_eq!(
        reconcile_error(&state),
        Some(&ReconcileCoreError::RequestFailed {
            verb: ApiVerb::List,
            key: "Pod/default".to_string(),
            error: APIError::InternalError,
        })
    );
}

#[test]
pub fn test_missing_response() {
    let sp = simple_pod("foo", "default");

    let (state, req) = reconcile_core(&sp, None, at(SimplePodReconcileStep::AfterListPods));

    assert!(req.is_none());
    assert_eq!(
        reconcile_error(&state),
        Some(&ReconcileCoreError::UnexpectedResponse("AfterListPods".to_string()))
    );
}

#[test]
pub fn test_mismatched_response() {
    let sp = simple_pod("foo", "default");
    let resp = list_response(&[]);

    let (state, _) = reconcile_core(&sp, resp, at(SimplePodReconcileStep::AfterCreatePod));

    assert_eq!(
        reconcile_error(&state),
        Some(&ReconcileCoreError::UnexpectedResponse("AfterCreatePod".to_string()))
    );
}

#[test]
pub fn test_create_done() {
    let sp = simple_pod("foo", "default");
    let created = marshal(&owned_pod("foo", "default", "foo", None)).unwrap();
    let resp = Some(KubeAPIResponse::CreateResponse(KubeCreateResponse { res: Ok(created) }));

    let (state, req) = reconcile_core(&sp, resp, at(SimplePodReconcileStep::AfterCreatePod));

    assert!(req.is_none());
    assert!(reconcile_done(&state));
}

#[test]
pub fn test_create_already_exists() {
    let sp = simple_pod("foo", "default");
    let resp = Some(KubeAPIResponse::CreateResponse(KubeCreateResponse {
        res: Err(APIError::ObjectAlreadyExists),
    }));

    let (state, _) = reconcile_core(&sp, resp, at(SimplePodReconcileStep::AfterCreatePod));

    let err = reconcile_error(&state).unwrap();
    assert_eq!(api_error_of(err), Some(&APIError::ObjectAlreadyExists));
    assert_eq!(
        err,
        &ReconcileCoreError::RequestFailed {
            verb: ApiVerb::Create,
            key: "Pod/default/foo".to_string(),
            error: APIError::ObjectAlreadyExists,
        }
    );
}

#[test]
pub fn test_update_status_done() {
    let sp = simple_pod("foo", "default");
    let resp = Some(KubeAPIResponse::UpdateStatusResponse(KubeUpdateStatusResponse {
        res: Ok(marshal(&sp).unwrap()),
    }));

    let (state, req) = reconcile_core(&sp, resp, at(SimplePodReconcileStep::AfterUpdateStatus));

    assert!(req.is_none());
    assert!(reconcile_done(&state));
}

#[test]
pub fn test_update_status_conflict() {
    let sp = simple_pod("foo", "default");
    let resp = Some(KubeAPIResponse::UpdateStatusResponse(KubeUpdateStatusResponse {
        res: Err(APIError::Conflict),
    }));

    let (state, _) = reconcile_core(&sp, resp, at(SimplePodReconcileStep::AfterUpdateStatus));

    assert_eq!(
        reconcile_error(&state).and_then(api_error_of),
        Some(&APIError::Conflict)
    );
}

#[test]
pub fn test_terminal_steps_stay() {
    let sp = simple_pod("foo", "default");

    let (state, req) = reconcile_core(&sp, None, at(SimplePodReconcileStep::Done));
    assert_eq!(state, at(SimplePodReconcileStep::Done));
    assert!(req.is_none());

    let failed = at(SimplePodReconcileStep::Error(ReconcileCoreError::UnexpectedResponse(
        "Init".to_string(),
    )));
    let (state, req) = reconcile_core(&sp, None, failed.clone());
    assert_eq!(state, failed);
    assert!(req.is_none());
}

#[test]
pub fn test_done_and_error_predicates() {
    assert!(!reconcile_done(&reconcile_init_state()));
    assert!(reconcile_error(&reconcile_init_state()).is_none());
    assert!(reconcile_done(&at(SimplePodReconcileStep::Done)));
    assert!(reconcile_error(&at(SimplePodReconcileStep::Done)).is_none());
}
