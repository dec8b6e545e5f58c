// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::error::APIError;
use crate::reconciler::exec::io::ApiVerb;

/// ReconcileCoreError is the reason a reconcile core moved into its error step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileCoreError {
    #[error("{verb} {key} failed: {error}")]
    RequestFailed {
        verb: ApiVerb,
        key: String,
        error: APIError,
    },
    #[error("unexpected response at step {0}")]
    UnexpectedResponse(String),
    #[error("cannot marshal or unmarshal {kind}: {reason}")]
    UnmarshalFailed { kind: String, reason: String },
}
