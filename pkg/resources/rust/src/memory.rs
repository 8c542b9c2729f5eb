// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Memory entitlement resolution: total capacity and currently-available
//! bytes for a target process, from its control group when one bounds it and
//! from whole-machine counters otherwise.

use log::{debug, warn};
use serde::Serialize;

use crate::errors::Error;
use crate::fs::{self, RootedFs};
use crate::host;
use crate::paths::Roots;
use crate::procfs::{self, V2_UNLIMITED};
use crate::version::{CgroupVersion, detect_version};

const MEMORY_CONTROLLER: &str = "memory";
const MEMORY_MAX_FILE: &str = "memory.max";
const MEMORY_CURRENT_FILE: &str = "memory.current";
const MEMORY_STAT_FILE: &str = "memory.stat";
const V1_LIMIT_FILE: &str = "memory.limit_in_bytes";
const V1_USAGE_FILE: &str = "memory.usage_in_bytes";

/// cgroup v1 has no unlimited marker; an unbounded group reports a limit of
/// the page-counter maximum. Anything at or above this is "no limit".
const V1_UNLIMITED_SENTINEL: u64 = 0x7FFF_FFFF_FFFF_F000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryFigures {
    /// Capacity in bytes: the cgroup limit, or the host total.
    pub total: u64,
    /// Bytes still available to the target, never above `total`.
    pub available: u64,
}

/// Resolves the memory entitlement of `pid`.
///
/// `include_reclaimable_cache` selects whether page cache counts as
/// available, mirroring whether the experiment's burn mode targets raw
/// physical pages or includes cache. No pid, an unknown regime, an unlimited
/// group, or an exhausted cgroup chain all land on the host fallback, which
/// is the terminal tier; only a genuine OS-query failure surfaces as an
/// error.
pub fn resolve_memory(
    pid: Option<u32>,
    roots: &Roots,
    include_reclaimable_cache: bool,
) -> Result<MemoryFigures, Error> {
    let Some(pid) = pid else {
        return host::memory_figures(include_reclaimable_cache);
    };

    match detect_version(roots) {
        CgroupVersion::V2 => match v2_memory(roots, pid, include_reclaimable_cache) {
            Ok(Some(figures)) => Ok(figures),
            Ok(None) => {
                debug!("no memory ceiling for pid {pid} in cgroup v2, using host figures");
                host::memory_figures(include_reclaimable_cache)
            }
            Err(e) => {
                warn!("cgroup v2 memory lookup failed for pid {pid}: {e}, trying v1");
                v1_or_host(roots, pid, include_reclaimable_cache)
            }
        },
        CgroupVersion::V1 => v1_or_host(roots, pid, include_reclaimable_cache),
        CgroupVersion::Unknown => {
            debug!("no cgroup data available for pid {pid}, using host figures");
            host::memory_figures(include_reclaimable_cache)
        }
    }
}

fn v1_or_host(
    roots: &Roots,
    pid: u32,
    include_reclaimable_cache: bool,
) -> Result<MemoryFigures, Error> {
    match v1_memory(roots, pid, include_reclaimable_cache) {
        Ok(Some(figures)) => Ok(figures),
        Ok(None) => {
            debug!("no memory ceiling for pid {pid} in cgroup v1, using host figures");
            host::memory_figures(include_reclaimable_cache)
        }
        Err(e) => {
            warn!("cgroup v1 memory lookup failed for pid {pid}: {e}, using host figures");
            host::memory_figures(include_reclaimable_cache)
        }
    }
}

/// Figures from the unified hierarchy. `Ok(None)` means the group has no
/// ceiling configured.
fn v2_memory(
    roots: &Roots,
    pid: u32,
    include_reclaimable_cache: bool,
) -> Result<Option<MemoryFigures>, Error> {
    let dir = procfs::v2_cgroup_dir(roots, pid)?;
    let fs = RootedFs::new(&dir).map_err(|e| Error::io(&dir, e))?;

    let raw = fs
        .read_to_string(MEMORY_MAX_FILE)
        .map_err(|e| Error::io(dir.join(MEMORY_MAX_FILE), e))?;
    let raw = raw.trim();
    if raw == V2_UNLIMITED {
        return Ok(None);
    }
    let total: u64 = raw.parse().map_err(|_| {
        Error::parse(
            dir.join(MEMORY_MAX_FILE),
            format!("expected an unsigned integer or {V2_UNLIMITED:?}, got {raw:?}"),
        )
    })?;
    if total == 0 {
        return Ok(None);
    }

    let used = fs::read_u64(&fs, MEMORY_CURRENT_FILE)?;

    let mut available = total.saturating_sub(used);
    if include_reclaimable_cache {
        // memory.stat is a later kernel addition; absence just means there is
        // no reclaimable figure to add.
        match fs.read_to_string(MEMORY_STAT_FILE) {
            Ok(stat) => available = available.saturating_add(stat_field_sum(&stat, "file")),
            Err(e) => debug!("no reclaimable cache figure for pid {pid}: {e}"),
        }
    }

    Ok(Some(MemoryFigures {
        total,
        available: available.min(total),
    }))
}

/// Figures from the v1 memory controller. `Ok(None)` means the reported
/// limit is at or above the practically-unlimited sentinel.
fn v1_memory(
    roots: &Roots,
    pid: u32,
    include_reclaimable_cache: bool,
) -> Result<Option<MemoryFigures>, Error> {
    let dir = procfs::v1_controller_dir(roots, pid, MEMORY_CONTROLLER)?;
    let fs = RootedFs::new(&dir).map_err(|e| Error::io(&dir, e))?;

    let total = fs::read_u64(&fs, V1_LIMIT_FILE)?;
    if total >= V1_UNLIMITED_SENTINEL {
        return Ok(None);
    }

    let used = fs::read_u64(&fs, V1_USAGE_FILE)?;

    let mut available = total.saturating_sub(used);
    if include_reclaimable_cache {
        match fs.read_to_string(MEMORY_STAT_FILE) {
            Ok(stat) => available = available.saturating_add(stat_field_sum(&stat, "cache")),
            Err(e) => debug!("no reclaimable cache figure for pid {pid}: {e}"),
        }
    }

    Ok(Some(MemoryFigures {
        total,
        available: available.min(total),
    }))
}

/// Sums the values of every `memory.stat` line whose key is exactly `key`.
fn stat_field_sum(content: &str, key: &str) -> u64 {
    let mut sum: u64 = 0;
    for line in content.lines() {
        let mut fields = line.split_whitespace();
        if fields.next() == Some(key)
            && let Some(value) = fields.next()
            && let Ok(value) = value.parse::<u64>()
        {
            sum = sum.saturating_add(value);
        }
    }
    sum
}
