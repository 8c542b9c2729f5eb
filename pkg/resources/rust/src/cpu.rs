// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! CPU entitlement resolution: how many cores a target process is actually
//! allowed to use. The answer sizes the workload a CPU stress action drives,
//! so an over- or under-read here makes the injected fault itself wrong.

use log::{debug, error, warn};
use serde::Serialize;

use crate::errors::Error;
use crate::fs::{self, RootedFs};
use crate::host;
use crate::paths::Roots;
use crate::procfs::{self, V2_UNLIMITED};
use crate::version::{CgroupVersion, detect_version};

const CPU_CONTROLLER: &str = "cpu";
const CPU_MAX_FILE: &str = "cpu.max";
const CFS_QUOTA_FILE: &str = "cpu.cfs_quota_us";
const CFS_PERIOD_FILE: &str = "cpu.cfs_period_us";

/// Outcome of a CPU quota resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "cores", rename_all = "snake_case")]
pub enum CpuQuota {
    /// No ceiling is configured for the target's control group. The caller
    /// should size against the host-wide entitlement instead.
    Undefined,
    /// The computed entitlement fell below the caller's floor and was raised
    /// to it.
    MinUsed(u32),
    /// The computed entitlement, accepted as-is.
    Used(u32),
}

impl CpuQuota {
    pub fn cores(&self) -> Option<u32> {
        match self {
            CpuQuota::Undefined => None,
            CpuQuota::MinUsed(cores) | CpuQuota::Used(cores) => Some(*cores),
        }
    }
}

pub type RoundFn = fn(f64) -> u32;

/// Default conversion of a fractional quota ratio to whole cores: nearest
/// integer, floored at zero.
pub fn default_round(ratio: f64) -> u32 {
    if ratio <= 0.0 {
        return 0;
    }
    ratio.round() as u32
}

/// Resolves the CPU core entitlement of `pid` from its control group.
///
/// The detected regime picks the branch: v2 reads `cpu.max` in the unified
/// hierarchy, with a v1 attempt if the v2 branch hits an IO or parse error;
/// v1 reads the cfs quota/period pair. An unknown regime means no cgroup
/// data and resolves to [`CpuQuota::Undefined`] without touching any files.
/// An `Err` means every tier failed; whether that is fatal, and whether to
/// fall back to the host core count, is the caller's decision.
pub fn resolve_cpu_quota(
    pid: u32,
    roots: &Roots,
    min_cores: u32,
    round: Option<RoundFn>,
) -> Result<CpuQuota, Error> {
    let round = round.unwrap_or(default_round);

    let ratio = match detect_version(roots) {
        CgroupVersion::V2 => match v2_cpu_ratio(roots, pid) {
            Ok(ratio) => ratio,
            Err(e) => {
                warn!("cgroup v2 cpu quota lookup failed for pid {pid}: {e}, trying v1");
                v1_cpu_ratio(roots, pid)?
            }
        },
        CgroupVersion::V1 => v1_cpu_ratio(roots, pid)?,
        CgroupVersion::Unknown => {
            debug!("no cgroup data available for pid {pid}, cpu quota undefined");
            return Ok(CpuQuota::Undefined);
        }
    };

    let Some(ratio) = ratio else {
        return Ok(CpuQuota::Undefined);
    };

    let cores = round(ratio);
    debug!("cpu quota for pid {pid}: ratio {ratio}, rounded {cores}");
    if min_cores > 0 && cores < min_cores {
        Ok(CpuQuota::MinUsed(min_cores))
    } else {
        Ok(CpuQuota::Used(cores))
    }
}

/// The entitlement a stress action should size its workload against: the
/// resolved core count, or the host's logical core count when no ceiling is
/// configured, no pid was given, or every resolution tier failed.
pub fn entitled_cores(pid: Option<u32>, roots: &Roots, min_cores: u32) -> u32 {
    let host_cores = host::logical_core_count() as u32;
    let Some(pid) = pid else {
        return host_cores;
    };

    match resolve_cpu_quota(pid, roots, min_cores, None) {
        Ok(CpuQuota::Undefined) => {
            warn!("cpu quota undefined for pid {pid}, using host core count {host_cores}");
            host_cores
        }
        Ok(CpuQuota::MinUsed(cores)) => {
            warn!("cpu quota for pid {pid} below minimum, using {cores}");
            cores
        }
        Ok(CpuQuota::Used(cores)) => cores,
        Err(e) => {
            error!("cpu quota resolution failed for pid {pid}: {e}, using host core count {host_cores}");
            host_cores
        }
    }
}

/// Quota ratio from the unified hierarchy. `Ok(None)` means the quota is the
/// literal unlimited marker.
fn v2_cpu_ratio(roots: &Roots, pid: u32) -> Result<Option<f64>, Error> {
    let dir = procfs::v2_cgroup_dir(roots, pid)?;
    let fs = RootedFs::new(&dir).map_err(|e| Error::io(&dir, e))?;
    let path = dir.join(CPU_MAX_FILE);
    let content = fs
        .read_to_string(CPU_MAX_FILE)
        .map_err(|e| Error::io(&path, e))?;
    parse_cpu_max(&content).map_err(|context| Error::parse(&path, context))
}

/// Parses `cpu.max`: exactly two whitespace-separated fields, `<quota>
/// <period>`, where the quota may be the unlimited marker.
fn parse_cpu_max(content: &str) -> Result<Option<f64>, String> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    let (quota, period) = match fields.as_slice() {
        [quota, period] => (*quota, *period),
        _ => return Err(format!("expected two fields, got {}", fields.len())),
    };

    if quota == V2_UNLIMITED {
        return Ok(None);
    }

    let quota: i64 = quota
        .parse()
        .map_err(|_| format!("bad quota {quota:?}"))?;
    let period: i64 = period
        .parse()
        .map_err(|_| format!("bad period {period:?}"))?;
    if period <= 0 {
        return Err(format!("non-positive period {period}"));
    }

    Ok(Some(quota as f64 / period as f64))
}

/// Quota ratio from the v1 cpu controller. A quota of `-1` means no ceiling.
fn v1_cpu_ratio(roots: &Roots, pid: u32) -> Result<Option<f64>, Error> {
    let dir = procfs::v1_controller_dir(roots, pid, CPU_CONTROLLER)?;
    let fs = RootedFs::new(&dir).map_err(|e| Error::io(&dir, e))?;

    let quota = fs::read_i64(&fs, CFS_QUOTA_FILE)?;
    if quota < 0 {
        return Ok(None);
    }

    let period = fs::read_i64(&fs, CFS_PERIOD_FILE)?;
    if period <= 0 {
        return Err(Error::parse(
            dir.join(CFS_PERIOD_FILE),
            format!("non-positive period {period}"),
        ));
    }

    Ok(Some(quota as f64 / period as f64))
}
