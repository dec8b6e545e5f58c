// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::reconciler::error::ReconcileCoreError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimplePodReconcileStep {
    Init,
    AfterListPods,
    AfterCreatePod,
    AfterUpdateStatus,
    Done,
    Error(ReconcileCoreError),
}

impl fmt::Display for SimplePodReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimplePodReconcileStep::Init => f.write_str("Init"),
            SimplePodReconcileStep::AfterListPods => f.write_str("AfterListPods"),
            SimplePodReconcileStep::AfterCreatePod => f.write_str("AfterCreatePod"),
            SimplePodReconcileStep::AfterUpdateStatus => f.write_str("AfterUpdateStatus"),
            SimplePodReconcileStep::Done => f.write_str("Done"),
            SimplePodReconcileStep::Error(_) => f.write_str("Error"),
        }
    }
}
