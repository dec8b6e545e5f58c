// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use clap::Args;
use std::time::Duration;

pub const DEFAULT_REQUEUE_AFTER_SECS: u64 = 10;
pub const DEFAULT_ERROR_REQUEUE_AFTER_SECS: u64 = 10;
pub const DEFAULT_ERROR_REQUEUE_MAX_SECS: u64 = 300;

/// Knobs of a running controller. Every flag can also be set through the
/// environment so the same image works under a plain Deployment.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Seconds before a custom resource is reconciled again after a successful pass
    #[arg(
        long,
        env = "SIMPLE_POD_REQUEUE_AFTER_SECS",
        default_value_t = DEFAULT_REQUEUE_AFTER_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub requeue_after_secs: u64,

    /// Seconds before a custom resource is reconciled again after its first failed pass;
    /// the delay doubles with every further failure in a row
    #[arg(
        long,
        env = "SIMPLE_POD_ERROR_REQUEUE_AFTER_SECS",
        default_value_t = DEFAULT_ERROR_REQUEUE_AFTER_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub error_requeue_after_secs: u64,

    /// Upper bound in seconds of the delay after failed passes
    #[arg(
        long,
        env = "SIMPLE_POD_ERROR_REQUEUE_MAX_SECS",
        default_value_t = DEFAULT_ERROR_REQUEUE_MAX_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub error_requeue_max_secs: u64,

    /// Only watch objects in this namespace (all namespaces when unset)
    #[arg(long, env = "SIMPLE_POD_NAMESPACE")]
    pub namespace: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            requeue_after_secs: DEFAULT_REQUEUE_AFTER_SECS,
            error_requeue_after_secs: DEFAULT_ERROR_REQUEUE_AFTER_SECS,
            error_requeue_max_secs: DEFAULT_ERROR_REQUEUE_MAX_SECS,
            namespace: None,
        }
    }
}

impl ControllerConfig {
    pub fn requeue_after(&self) -> Duration {
        Duration::from_secs(self.requeue_after_secs)
    }

    /// Delay after the given number of earlier failures in a row (0 for the first failure).
    /// The cap never goes below the base delay.
    pub fn error_requeue_after(&self, failures: u32) -> Duration {
        calculate_backoff(
            failures,
            self.error_requeue_after_secs,
            self.error_requeue_max_secs.max(self.error_requeue_after_secs),
        )
    }
}

/// Calculate exponential backoff duration.
pub fn calculate_backoff(attempt: u32, base_secs: u64, max_secs: u64) -> Duration {
    let backoff = base_secs.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_secs(backoff.min(max_secs))
}
