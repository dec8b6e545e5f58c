// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod simple_pod_controller;
