// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Whole-machine counters, the terminal tier of every fallback chain. These
//! report host totals no matter why they were invoked; a genuine OS-query
//! failure here is fatal to the caller since nothing further exists to fall
//! back to.

use std::time::Duration;

use sysinfo::System;

use crate::errors::Error;
use crate::memory::MemoryFigures;

pub(crate) fn logical_core_count() -> usize {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    sys.cpus().len().max(1)
}

pub(crate) fn memory_figures(include_reclaimable_cache: bool) -> Result<MemoryFigures, Error> {
    let mut sys = System::new();
    sys.refresh_memory();

    let total = sys.total_memory();
    if total == 0 {
        return Err(Error::HostQuery);
    }

    let free = sys.free_memory();
    let mut available = free;
    if include_reclaimable_cache {
        // Buffers and page cache: what the kernel reports as reclaimable
        // beyond outright free pages.
        available = available.saturating_add(sys.available_memory().saturating_sub(free));
    }

    Ok(MemoryFigures {
        total,
        available: available.min(total),
    })
}

/// Aggregate or per-core CPU percentage over `window`, measured the same
/// refresh-sleep-refresh way the cgroup sampler works.
pub(crate) fn cpu_percent(window: Duration, core: Option<usize>) -> Result<f64, Error> {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    std::thread::sleep(window);
    sys.refresh_cpu_usage();

    match core {
        None => Ok(f64::from(sys.global_cpu_usage())),
        Some(index) => {
            let cpus = sys.cpus();
            let cpu = cpus.get(index).ok_or(Error::CpuIndexOutOfRange {
                index,
                count: cpus.len(),
            })?;
            Ok(f64::from(cpu.cpu_usage()))
        }
    }
}
