// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Operator-facing probe for debugging miscalibrated experiments: resolves
//! the entitlement and takes one utilization sample, printed as JSON.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chaos_resources::{
    CgroupVersion, CpuQuota, CpuScope, DEFAULT_CGROUP_ROOT, DEFAULT_PROC_ROOT, MemoryFigures,
    Roots,
};
use clap::Parser;
use log::warn;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "resprobe")]
#[command(about = "Resource accounting probe - resolves CPU/memory entitlement and usage for a process", long_about = None)]
struct Args {
    /// Target process ID; omit for whole-host figures
    #[arg(short, long)]
    pid: Option<u32>,

    /// cgroup filesystem root
    #[arg(long, default_value = DEFAULT_CGROUP_ROOT)]
    cgroup_root: PathBuf,

    /// proc filesystem root
    #[arg(long, default_value = DEFAULT_PROC_ROOT)]
    proc_root: PathBuf,

    /// Floor for the resolved core count
    #[arg(long, default_value_t = 1)]
    min_cores: u32,

    /// Count reclaimable page cache as available memory
    #[arg(long)]
    include_cache: bool,

    /// Sampling window in seconds
    #[arg(long, default_value_t = 1.0)]
    sample_window: f64,

    /// Sample one logical core instead of the aggregate (whole-host mode)
    #[arg(long)]
    core: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report {
    cgroup_version: CgroupVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpu_quota: Option<CpuQuota>,
    entitled_cores: u32,
    memory: MemoryFigures,
    cpu_usage_percent: f64,
}

#[allow(clippy::print_stdout)]
fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    simple_logger::init_with_level(level)?;

    if !(args.sample_window > 0.0 && args.sample_window.is_finite()) {
        bail!("sample window must be a positive number of seconds");
    }
    let window = Duration::from_secs_f64(args.sample_window);

    let roots = Roots::new(&args.proc_root, &args.cgroup_root);
    let accounting = chaos_resources::native(roots);

    let cpu_quota = args.pid.and_then(|pid| {
        match accounting.cpu_quota(pid, args.min_cores) {
            Ok(quota) => Some(quota),
            Err(e) => {
                warn!("cpu quota resolution failed for pid {pid}: {e}");
                None
            }
        }
    });

    let entitled_cores = accounting.entitled_cores(args.pid, args.min_cores);

    let memory = accounting
        .memory_figures(args.pid, args.include_cache)
        .context("memory resolution failed")?;

    let scope = match (args.pid, args.core) {
        (Some(pid), _) => CpuScope::Cgroup {
            pid,
            entitled_cores,
        },
        (None, Some(index)) => CpuScope::HostCore(index),
        (None, None) => CpuScope::Host,
    };
    let cpu_usage_percent = accounting
        .sample_cpu(&scope, window)
        .context("usage sampling failed")?;

    let report = Report {
        cgroup_version: accounting.detect_version(),
        cpu_quota,
        entitled_cores,
        memory,
        cpu_usage_percent,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
