// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Parsing of `/proc/<pid>/cgroup` and resolution of the directory a target
//! process's control group lives in. The resolved directory is a per-call
//! value owned by the resolving operation; it is never stored, since the
//! process may be migrated between cgroups at any time.

use std::io;
use std::path::PathBuf;

use crate::errors::Error;
use crate::fs::RootedFs;
use crate::mounts;
use crate::paths::Roots;
use crate::version::CGROUP_V1_FSTYPE;

/// Literal marker cgroup v2 uses for "no ceiling configured".
pub(crate) const V2_UNLIMITED: &str = "max";

pub(crate) fn read_pid_cgroup(roots: &Roots, pid: u32) -> Result<String, Error> {
    let rel = Roots::pid_cgroup_rel(pid);
    let full = roots.proc.join(&rel);
    let fs = RootedFs::new(&roots.proc).map_err(|e| Error::io(&roots.proc, e))?;
    fs.read_to_string(&rel).map_err(|e| Error::io(&full, e))
}

/// Returns the unified-hierarchy path from `/proc/<pid>/cgroup` content: the
/// line whose hierarchy id is `0` and whose controller-list field is empty.
pub(crate) fn unified_cgroup_path(content: &str) -> Option<&str> {
    for line in content.lines() {
        let mut fields = line.splitn(3, ':');
        let (Some(hierarchy), Some(controllers), Some(path)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if hierarchy == "0" && controllers.is_empty() {
            return Some(path);
        }
    }
    None
}

/// Returns the v1 entry whose controller list contains `controller`, as the
/// pair (controller list as mounted, relative path).
pub(crate) fn v1_controller_entry<'a>(
    content: &'a str,
    controller: &str,
) -> Option<(&'a str, &'a str)> {
    for line in content.lines() {
        let mut fields = line.splitn(3, ':');
        let (Some(hierarchy), Some(controllers), Some(path)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if hierarchy != "0" && controllers.split(',').any(|c| c == controller) {
            return Some((controllers, path));
        }
    }
    None
}

/// Resolves the unified-hierarchy directory of `pid` under the cgroup root.
pub(crate) fn v2_cgroup_dir(roots: &Roots, pid: u32) -> Result<PathBuf, Error> {
    let content = read_pid_cgroup(roots, pid)?;
    let rel = unified_cgroup_path(&content).ok_or_else(|| {
        Error::parse(
            roots.proc.join(Roots::pid_cgroup_rel(pid)),
            "no unified hierarchy entry",
        )
    })?;
    Ok(roots.cgroup.join(rel.trim_start_matches('/')))
}

/// Resolves the directory of `pid`'s `controller` hierarchy under cgroup v1:
/// the controller's hierarchy mount joined with the process's relative path.
pub(crate) fn v1_controller_dir(
    roots: &Roots,
    pid: u32,
    controller: &str,
) -> Result<PathBuf, Error> {
    let content = read_pid_cgroup(roots, pid)?;
    let (list, rel) = v1_controller_entry(&content, controller).ok_or_else(|| {
        Error::parse(
            roots.proc.join(Roots::pid_cgroup_rel(pid)),
            format!("no {controller} controller entry"),
        )
    })?;

    let hierarchy = v1_hierarchy_mount(roots, controller, list)?;
    Ok(hierarchy.join(rel.trim_start_matches('/')))
}

/// Locates the hierarchy mount of a v1 controller: first from the mount
/// table, then from the conventional per-controller directories under the
/// cgroup root (`<root>/cpu`, or the combined form such as
/// `<root>/cpu,cpuacct` when controllers are co-mounted).
fn v1_hierarchy_mount(roots: &Roots, controller: &str, list: &str) -> Result<PathBuf, Error> {
    if let Ok(mounts) = mounts::read_mounts(roots) {
        for entry in mounts {
            if entry.fstype == CGROUP_V1_FSTYPE
                && entry.mount_point.starts_with(&roots.cgroup)
                && entry.super_options.split(',').any(|o| o == controller)
            {
                return Ok(entry.mount_point);
            }
        }
    }

    for name in [controller, list] {
        let dir = roots.cgroup.join(name);
        if dir.is_dir() {
            return Ok(dir);
        }
    }

    Err(Error::io(
        roots.cgroup.join(controller),
        io::Error::from(io::ErrorKind::NotFound),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::FakeHost;

    const MIXED: &str = "0::/user.slice/session-3.scope\n\
                         4:memory:/kubepods/pod1\n\
                         3:cpu,cpuacct:/kubepods/pod1\n";

    #[test]
    fn test_unified_cgroup_path() {
        assert_eq!(
            unified_cgroup_path(MIXED),
            Some("/user.slice/session-3.scope")
        );
        assert_eq!(unified_cgroup_path("3:cpu:/a\n"), None);
        assert_eq!(unified_cgroup_path(""), None);
        // A path containing colons stays intact.
        assert_eq!(unified_cgroup_path("0::/odd:name\n"), Some("/odd:name"));
    }

    #[test]
    fn test_v1_controller_entry() {
        assert_eq!(
            v1_controller_entry(MIXED, "cpu"),
            Some(("cpu,cpuacct", "/kubepods/pod1"))
        );
        assert_eq!(
            v1_controller_entry(MIXED, "memory"),
            Some(("memory", "/kubepods/pod1"))
        );
        // "cpu" must not match the "cpuset" or "cpuacct" controllers.
        assert_eq!(v1_controller_entry("5:cpuset:/a\n", "cpu"), None);
        assert_eq!(v1_controller_entry(MIXED, "blkio"), None);
    }

    #[test]
    fn test_v2_cgroup_dir() {
        let host = FakeHost::new();
        host.write_proc("1234/cgroup", "0::/workload\n");

        let dir = v2_cgroup_dir(&host.roots(), 1234).unwrap();
        assert_eq!(dir, host.roots().cgroup.join("workload"));
    }

    #[test]
    fn test_v2_cgroup_dir_missing_pid() {
        let host = FakeHost::new();

        assert!(matches!(
            v2_cgroup_dir(&host.roots(), 9999),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_v2_cgroup_dir_no_unified_entry() {
        let host = FakeHost::new();
        host.write_proc("1234/cgroup", "3:cpu:/kubepods\n");

        assert!(matches!(
            v2_cgroup_dir(&host.roots(), 1234),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_v1_controller_dir_from_mounts() {
        let host = FakeHost::new();
        host.write_proc("42/cgroup", "3:cpu,cpuacct:/kubepods/pod1\n");
        host.write_mountinfo(&[&host.v1_mountinfo_line("cpu,cpuacct")]);

        let dir = v1_controller_dir(&host.roots(), 42, "cpu").unwrap();
        assert_eq!(
            dir,
            host.roots().cgroup.join("cpu,cpuacct").join("kubepods/pod1")
        );
    }

    #[test]
    fn test_v1_controller_dir_from_root_convention() {
        let host = FakeHost::new();
        host.write_proc("42/cgroup", "4:memory:/kubepods/pod1\n");
        host.write_cgroup("memory/kubepods/pod1/memory.limit_in_bytes", "1048576\n");

        let dir = v1_controller_dir(&host.roots(), 42, "memory").unwrap();
        assert_eq!(dir, host.roots().cgroup.join("memory/kubepods/pod1"));
    }

    #[test]
    fn test_v1_controller_dir_unlocatable() {
        let host = FakeHost::new();
        host.write_proc("42/cgroup", "3:cpu:/kubepods\n");

        assert!(v1_controller_dir(&host.roots(), 42, "cpu").is_err());
    }
}
