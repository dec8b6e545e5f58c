// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod crd;
pub mod exec;
pub mod step;
