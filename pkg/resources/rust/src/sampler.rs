// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Windowed CPU utilization sampling. Utilization is a rate, not an
//! instantaneous value: two time-separated cumulative readings are combined
//! over the window, so the one operation here blocks for at least the
//! requested window by design.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::errors::Error;
use crate::fs::{self, RootedFs};
use crate::host;
use crate::paths::Roots;
use crate::procfs;
use crate::version::{CgroupVersion, detect_version};

const CPU_STAT_FILE: &str = "cpu.stat";
const CPUACCT_CONTROLLER: &str = "cpuacct";
const CPUACCT_USAGE_FILE: &str = "cpuacct.usage";

pub const DEFAULT_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// What to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuScope {
    /// A process's control group, expressed against its entitlement: the
    /// CPU quota resolver's answer for that process, not the raw host core
    /// count. Values above 100 are valid during bursts that momentarily
    /// exceed the group's average quota.
    Cgroup { pid: u32, entitled_cores: u32 },
    /// Whole-host aggregate.
    Host,
    /// One logical core, by index.
    HostCore(usize),
}

/// Measures CPU utilization over `window` (at least; plus file-IO overhead).
/// Blocks the calling thread for the whole window and performs no internal
/// parallel work; a caller that needs to abort early must run the sample on
/// its own cancellable unit of work and discard the result.
pub fn sample_cpu(scope: &CpuScope, roots: &Roots, window: Duration) -> Result<f64, Error> {
    match *scope {
        CpuScope::Host => host::cpu_percent(window, None),
        CpuScope::HostCore(index) => host::cpu_percent(window, Some(index)),
        CpuScope::Cgroup {
            pid,
            entitled_cores,
        } => sample_cgroup(pid, entitled_cores, roots, window),
    }
}

fn sample_cgroup(
    pid: u32,
    entitled_cores: u32,
    roots: &Roots,
    window: Duration,
) -> Result<f64, Error> {
    match detect_version(roots) {
        CgroupVersion::V2 => match CpuTimeSource::v2(roots, pid) {
            Ok(source) => measure(&source, window, entitled_cores),
            Err(e) => {
                warn!("cgroup v2 cpu accounting unavailable for pid {pid}: {e}, trying v1");
                let source = CpuTimeSource::v1(roots, pid)?;
                measure(&source, window, entitled_cores)
            }
        },
        CgroupVersion::V1 => {
            let source = CpuTimeSource::v1(roots, pid)?;
            measure(&source, window, entitled_cores)
        }
        CgroupVersion::Unknown => {
            debug!("no cgroup data available for pid {pid}, sampling whole host");
            host::cpu_percent(window, None)
        }
    }
}

fn measure(source: &CpuTimeSource, window: Duration, entitled_cores: u32) -> Result<f64, Error> {
    let first = source.cumulative()?;
    let started = Instant::now();
    std::thread::sleep(window);
    let second = source.cumulative()?;

    Ok(utilization_percent(
        second.saturating_sub(first),
        started.elapsed(),
        entitled_cores,
    ))
}

/// `(delta cpu time / elapsed wall time) * 100`, divided by the entitlement
/// so the figure reads as a share of what the target is allowed to use.
fn utilization_percent(delta: Duration, elapsed: Duration, entitled_cores: u32) -> f64 {
    if elapsed.is_zero() {
        return 0.0;
    }
    (delta.as_secs_f64() / elapsed.as_secs_f64()) * 100.0 / f64::from(entitled_cores.max(1))
}

/// A cumulative CPU-time reading for one control group, located once per
/// sample and read twice.
enum CpuTimeSource {
    /// `cpu.stat` in the unified hierarchy (microsecond fields).
    V2 { fs: RootedFs, path: PathBuf },
    /// The v1 cpuacct controller's total-consumed statistic (nanoseconds).
    V1 { fs: RootedFs },
}

impl CpuTimeSource {
    fn v2(roots: &Roots, pid: u32) -> Result<Self, Error> {
        let dir = procfs::v2_cgroup_dir(roots, pid)?;
        let fs = RootedFs::new(&dir).map_err(|e| Error::io(&dir, e))?;
        if !fs.exists(CPU_STAT_FILE) {
            return Err(Error::io(
                dir.join(CPU_STAT_FILE),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }
        let path = dir.join(CPU_STAT_FILE);
        Ok(CpuTimeSource::V2 { fs, path })
    }

    fn v1(roots: &Roots, pid: u32) -> Result<Self, Error> {
        let dir = procfs::v1_controller_dir(roots, pid, CPUACCT_CONTROLLER)?;
        let fs = RootedFs::new(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(CpuTimeSource::V1 { fs })
    }

    fn cumulative(&self) -> Result<Duration, Error> {
        match self {
            CpuTimeSource::V2 { fs, path } => {
                let content = fs
                    .read_to_string(CPU_STAT_FILE)
                    .map_err(|e| Error::io(path, e))?;
                Ok(Duration::from_micros(v2_cpu_time_usec(&content)))
            }
            CpuTimeSource::V1 { fs } => {
                let nanos = fs::read_u64(fs, CPUACCT_USAGE_FILE)?;
                Ok(Duration::from_nanos(nanos))
            }
        }
    }
}

/// Total CPU time in microseconds from `cpu.stat` content: `usage_usec`, or
/// `user_usec + system_usec` when the total field is absent. Fields missing
/// entirely read as zero; these are a late kernel addition, and a reported
/// 0% beats an error on older kernels.
fn v2_cpu_time_usec(content: &str) -> u64 {
    let mut usage: u64 = 0;
    let mut user: u64 = 0;
    let mut system: u64 = 0;

    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Ok(value) = value.parse::<u64>() else {
            continue;
        };
        match key {
            "usage_usec" => usage = value,
            "user_usec" => user = value,
            "system_usec" => system = value,
            _ => {}
        }
    }

    if usage > 0 {
        usage
    } else {
        user.saturating_add(system)
    }
}
