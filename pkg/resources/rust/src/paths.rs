// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use std::path::{Path, PathBuf};

pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// The pair of kernel interface roots every resolver reads from. Threaded
/// explicitly through all calls so resolvers stay pure functions of their
/// inputs; tests point both roots at a synthetic tree.
#[derive(Debug, Clone)]
pub struct Roots {
    pub proc: PathBuf,
    pub cgroup: PathBuf,
}

impl Default for Roots {
    fn default() -> Self {
        Self {
            proc: PathBuf::from(DEFAULT_PROC_ROOT),
            cgroup: PathBuf::from(DEFAULT_CGROUP_ROOT),
        }
    }
}

impl Roots {
    pub fn new<P: AsRef<Path>, C: AsRef<Path>>(proc: P, cgroup: C) -> Self {
        Self {
            proc: proc.as_ref().to_path_buf(),
            cgroup: cgroup.as_ref().to_path_buf(),
        }
    }

    /// Path of `<proc>/<pid>/cgroup`, relative to the proc root.
    pub(crate) fn pid_cgroup_rel(pid: u32) -> PathBuf {
        PathBuf::from(pid.to_string()).join("cgroup")
    }
}
