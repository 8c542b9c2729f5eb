// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Resource accounting for fault injection: how much CPU and memory a target
//! process is entitled to, and how much it is using, under an unconstrained
//! host, a cgroup v1 hierarchy, or the unified cgroup v2 hierarchy. Stress
//! actions size their workloads from these answers, so every resolver
//! degrades through a fallback chain (v2, v1, whole-host counters) rather
//! than failing an experiment on an unreadable tier.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

mod cpu;
mod errors;
mod fs;
mod host;
mod memory;
mod mounts;
mod paths;
mod platform;
mod procfs;
mod sampler;
mod version;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export the public API
pub use cpu::{CpuQuota, RoundFn, default_round, entitled_cores, resolve_cpu_quota};
pub use errors::Error;
pub use memory::{MemoryFigures, resolve_memory};
pub use paths::{DEFAULT_CGROUP_ROOT, DEFAULT_PROC_ROOT, Roots};
pub use platform::{Accounting, KernelAccounting, UnsupportedAccounting, native};
pub use sampler::{CpuScope, DEFAULT_SAMPLE_WINDOW, sample_cpu};
pub use version::{CgroupVersion, detect_version};
