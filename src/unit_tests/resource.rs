// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::controllers::simple_pod_controller::exec::resource::*;
use crate::unit_tests::{container, labels, owned_pod, simple_pod};
use k8s_openapi::api::core::v1::Pod;
use proptest::prelude::*;

#[test]
pub fn test_make_pod_name_namespace_and_labels() {
    let mut sp = simple_pod("foo", "default");
    sp.metadata.labels = Some(labels(&[("a", "1")]));

    let pod = make_pod(&sp);
    assert_eq!(pod.metadata.name, Some("foo".to_string()));
    assert_eq!(pod.metadata.namespace, Some("default".to_string()));
    assert_eq!(
        pod.metadata.labels,
        Some(labels(&[("a", "1"), ("resourceOwner", "foo")]))
    );
    assert!(pod.status.is_none());
}

#[test]
pub fn test_make_pod_without_labels() {
    let pod = make_pod(&simple_pod("foo", "default"));
    assert_eq!(pod.metadata.labels, Some(labels(&[("resourceOwner", "foo")])));
}

#[test]
pub fn test_make_pod_overwrites_owner_label() {
    let mut sp = simple_pod("foo", "default");
    sp.metadata.labels = Some(labels(&[("resourceOwner", "bar"), ("tier", "fe")]));

    let pod = make_pod(&sp);
    assert_eq!(
        pod.metadata.labels,
        Some(labels(&[("resourceOwner", "foo"), ("tier", "fe")]))
    );
}

#[test]
pub fn test_make_pod_keeps_container_order() {
    let mut sp = simple_pod("foo", "default");
    sp.spec.containers = vec![
        container("web", "nginx"),
        container("sidecar", "envoy"),
        container("log", "fluentd"),
    ];

    let pod = make_pod(&sp);
    let spec = pod.spec.unwrap();
    assert_eq!(spec.containers, sp.spec.containers);
}

#[test]
pub fn test_make_pod_with_no_containers() {
    let mut sp = simple_pod("foo", "default");
    sp.spec.containers = vec![];

    let pod = make_pod(&sp);
    assert!(pod.spec.unwrap().containers.is_empty());
}

#[test]
pub fn test_make_pod_owner_reference() {
    let mut sp = simple_pod("foo", "default");
    sp.metadata.uid = Some("uid-1".to_string());

    let owner_refs = make_pod(&sp).metadata.owner_references.unwrap();
    assert_eq!(owner_refs.len(), 1);
    assert_eq!(owner_refs[0].name, "foo");
    assert_eq!(owner_refs[0].uid, "uid-1");
    assert_eq!(owner_refs[0].kind, "SimplePod");
    assert_eq!(owner_refs[0].api_version, "pod.routine.kat/v1");
    assert_eq!(owner_refs[0].controller, Some(true));
}

#[test]
pub fn test_make_pod_no_owner_reference_without_uid() {
    let pod = make_pod(&simple_pod("foo", "default"));
    assert!(pod.metadata.owner_references.is_none());
}

#[test]
pub fn test_find_owned_pod_first_match() {
    let sp = simple_pod("foo", "default");
    let pods = vec![
        owned_pod("a", "default", "bar", Some("10.0.0.1")),
        owned_pod("b", "default", "foo", Some("10.0.0.2")),
        owned_pod("c", "default", "foo", Some("10.0.0.3")),
    ];

    let found = find_owned_pod(&pods, &sp).unwrap();
    assert_eq!(found.metadata.name, Some("b".to_string()));
}

#[test]
pub fn test_find_owned_pod_ignores_other_namespaces() {
    let sp = simple_pod("foo", "default");
    let pods = vec![owned_pod("foo", "other", "foo", Some("10.0.0.1"))];

    assert!(find_owned_pod(&pods, &sp).is_none());
}

#[test]
pub fn test_find_owned_pod_ignores_unlabeled_pods() {
    let sp = simple_pod("foo", "default");
    let mut pod = owned_pod("foo", "default", "foo", None);
    pod.metadata.labels = None;

    assert!(find_owned_pod(&[pod], &sp).is_none());
    assert!(find_owned_pod(&[], &sp).is_none());
}

#[test]
pub fn test_is_owned_by_requires_name() {
    let mut sp = simple_pod("foo", "default");
    sp.metadata.name = None;
    let pod = owned_pod("foo", "default", "foo", None);

    assert!(!is_owned_by(&pod, &sp));
}

#[test]
pub fn test_pod_ip() {
    assert_eq!(pod_ip(&owned_pod("foo", "default", "foo", Some("10.0.0.7"))), "10.0.0.7");
    assert_eq!(pod_ip(&owned_pod("foo", "default", "foo", None)), "");
    assert_eq!(pod_ip(&Pod::default()), "");
}

#[test]
pub fn test_owner_of() {
    let pod = owned_pod("whatever", "default", "foo", None);
    let owner = owner_of(&pod).unwrap();
    assert_eq!(owner.name, "foo");
    assert_eq!(owner.namespace, Some("default".to_string()));

    let mut unlabeled = pod.clone();
    unlabeled.metadata.labels = None;
    assert!(owner_of(&unlabeled).is_none());

    let mut no_namespace = pod;
    no_namespace.metadata.namespace = None;
    assert!(owner_of(&no_namespace).is_none());
}

#[test]
pub fn test_made_pod_is_found_and_maps_back() {
    let sp = simple_pod("foo", "default");
    let pod = make_pod(&sp);

    assert!(is_owned_by(&pod, &sp));
    assert_eq!(owner_of(&pod).unwrap().name, "foo");
}

proptest! {
    #[test]
    fn test_make_pod_labels_are_copied_with_owner(
        user_labels in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..8),
        name in "[a-z][a-z0-9-]{0,15}",
    ) {
        let mut sp = simple_pod(&name, "default");
        sp.metadata.labels = Some(user_labels.clone());

        let pod_labels = make_pod(&sp).metadata.labels.unwrap();
        prop_assert_eq!(pod_labels.get(RESOURCE_OWNER_LABEL), Some(&name));
        for (key, value) in user_labels.iter().filter(|(key, _)| key.as_str() != RESOURCE_OWNER_LABEL) {
            prop_assert_eq!(pod_labels.get(key), Some(value));
        }
        let expected_len = user_labels.len() + usize::from(!user_labels.contains_key(RESOURCE_OWNER_LABEL));
        prop_assert_eq!(pod_labels.len(), expected_len);
    }

    #[test]
    fn test_make_pod_containers_are_copied_in_order(
        names in prop::collection::vec("[a-z]{1,10}", 0..6),
    ) {
        let mut sp = simple_pod("foo", "default");
        sp.spec.containers = names.iter().map(|name| container(name, "busybox")).collect();

        let containers = make_pod(&sp).spec.unwrap().containers;
        let copied: Vec<String> = containers.into_iter().map(|c| c.name).collect();
        prop_assert_eq!(copied, names);
    }
}
