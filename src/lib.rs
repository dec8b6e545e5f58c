// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT

pub mod config;
pub mod controllers;
pub mod executable_model;
pub mod kubernetes_api_objects;
pub mod reconciler;
pub mod shim_layer;

#[cfg(test)]
mod unit_tests;

use crate::kubernetes_api_objects::error::APIError;
use crate::reconciler::error::ReconcileCoreError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MissingObjectKey: {0}")]
    MissingObjectKey(&'static str),
    #[error("Failed to get custom resource {key}: {error}")]
    GetCustomResourceFailed { key: String, error: APIError },
    #[error("Failed to unmarshal custom resource {key}: {source}")]
    UnmarshalFailed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("ReconcileCoreError: {0}")]
    ReconcileCoreError(#[from] ReconcileCoreError),
}
