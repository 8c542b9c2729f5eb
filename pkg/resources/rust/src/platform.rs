// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Capability interface over the kernel's resource-control filesystem. One
//! real implementation is selected at process startup based on the target
//! OS; everything above this trait stays platform-agnostic instead of
//! branching on the build target throughout.

use std::time::Duration;

use log::info;

use crate::cpu::{self, CpuQuota};
use crate::errors::Error;
use crate::host;
use crate::memory::{self, MemoryFigures};
use crate::paths::Roots;
use crate::sampler::{self, CpuScope};
use crate::version::{CgroupVersion, detect_version};

pub trait Accounting: Send + Sync {
    /// Classifies the resource-control regime, fresh on every call.
    fn detect_version(&self) -> CgroupVersion;

    /// CPU entitlement of `pid` from its control group.
    fn cpu_quota(&self, pid: u32, min_cores: u32) -> Result<CpuQuota, Error>;

    /// Entitlement a stress action should size against, with the host core
    /// count standing in wherever the quota is undefined or unresolvable.
    fn entitled_cores(&self, pid: Option<u32>, min_cores: u32) -> u32;

    /// Total and available memory for `pid`, host-wide when `pid` is absent.
    fn memory_figures(
        &self,
        pid: Option<u32>,
        include_reclaimable_cache: bool,
    ) -> Result<MemoryFigures, Error>;

    /// CPU utilization percentage over `window`. Blocks for the window.
    fn sample_cpu(&self, scope: &CpuScope, window: Duration) -> Result<f64, Error>;
}

/// The real implementation: pure file reads against explicit roots.
pub struct KernelAccounting {
    roots: Roots,
}

impl KernelAccounting {
    pub fn new(roots: Roots) -> Self {
        Self { roots }
    }
}

impl Accounting for KernelAccounting {
    fn detect_version(&self) -> CgroupVersion {
        detect_version(&self.roots)
    }

    fn cpu_quota(&self, pid: u32, min_cores: u32) -> Result<CpuQuota, Error> {
        cpu::resolve_cpu_quota(pid, &self.roots, min_cores, None)
    }

    fn entitled_cores(&self, pid: Option<u32>, min_cores: u32) -> u32 {
        cpu::entitled_cores(pid, &self.roots, min_cores)
    }

    fn memory_figures(
        &self,
        pid: Option<u32>,
        include_reclaimable_cache: bool,
    ) -> Result<MemoryFigures, Error> {
        memory::resolve_memory(pid, &self.roots, include_reclaimable_cache)
    }

    fn sample_cpu(&self, scope: &CpuScope, window: Duration) -> Result<f64, Error> {
        sampler::sample_cpu(scope, &self.roots, window)
    }
}

/// No-op implementation for hosts without a cgroup filesystem: reports
/// Unknown/undefined for everything cgroup-shaped and host figures for the
/// rest.
pub struct UnsupportedAccounting;

impl Accounting for UnsupportedAccounting {
    fn detect_version(&self) -> CgroupVersion {
        CgroupVersion::Unknown
    }

    fn cpu_quota(&self, _pid: u32, _min_cores: u32) -> Result<CpuQuota, Error> {
        Ok(CpuQuota::Undefined)
    }

    fn entitled_cores(&self, _pid: Option<u32>, _min_cores: u32) -> u32 {
        host::logical_core_count() as u32
    }

    fn memory_figures(
        &self,
        _pid: Option<u32>,
        include_reclaimable_cache: bool,
    ) -> Result<MemoryFigures, Error> {
        host::memory_figures(include_reclaimable_cache)
    }

    fn sample_cpu(&self, scope: &CpuScope, window: Duration) -> Result<f64, Error> {
        match *scope {
            CpuScope::HostCore(index) => host::cpu_percent(window, Some(index)),
            CpuScope::Cgroup { .. } | CpuScope::Host => host::cpu_percent(window, None),
        }
    }
}

/// Selects the implementation for this process.
pub fn native(roots: Roots) -> Box<dyn Accounting> {
    if cfg!(target_os = "linux") {
        Box::new(KernelAccounting::new(roots))
    } else {
        info!("no cgroup support on this platform, using host-only accounting");
        Box::new(UnsupportedAccounting)
    }
}
