// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT

/// APIError is the kind of failure reported by the Kubernetes API for one request.
/// The reconcile core only ever branches on the kind; the raw kube-rs error is
/// logged by the shim layer where it happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum APIError {
    #[error("ObjectNotFound")]
    ObjectNotFound,
    #[error("ObjectAlreadyExists")]
    ObjectAlreadyExists,
    #[error("BadRequest")]
    BadRequest,
    #[error("Conflict")]
    Conflict,
    #[error("Invalid")]
    Invalid,
    #[error("InternalError")]
    InternalError,
    #[error("Timeout")]
    Timeout,
    #[error("ServerTimeout")]
    ServerTimeout,
    #[error("Other: {0}")]
    Other(String),
}

impl APIError {
    pub fn is_object_not_found(&self) -> bool {
        matches!(self, APIError::ObjectNotFound)
    }
}

// kube_error_to_api_error translates the error returned by kube-rs APIs
// to the form that can be processed by reconcile_core.
// The reason string is authoritative; the HTTP code is only consulted when
// the API server leaves the reason empty.
pub fn kube_error_to_api_error(error: &kube::Error) -> APIError {
    match error {
        kube::Error::Api(error_resp) => match error_resp.reason.as_str() {
            "NotFound" => APIError::ObjectNotFound,
            "AlreadyExists" => APIError::ObjectAlreadyExists,
            "BadRequest" => APIError::BadRequest,
            "Conflict" => APIError::Conflict,
            "Invalid" => APIError::Invalid,
            "InternalError" => APIError::InternalError,
            "Timeout" => APIError::Timeout,
            "ServerTimeout" => APIError::ServerTimeout,
            _ => match error_resp.code {
                400 => APIError::BadRequest,
                404 => APIError::ObjectNotFound,
                422 => APIError::Invalid,
                500 => APIError::InternalError,
                504 => APIError::Timeout,
                _ => APIError::Other(error_resp.message.clone()),
            },
        },
        _ => APIError::Other(error.to_string()),
    }
}
