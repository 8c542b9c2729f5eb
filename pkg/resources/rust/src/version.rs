// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use log::{debug, warn};
use serde::Serialize;

use crate::fs::RootedFs;
use crate::mounts;
use crate::paths::Roots;

/// cgroup v1 filesystem type in the mount table.
pub(crate) const CGROUP_V1_FSTYPE: &str = "cgroup";
/// cgroup v2 (unified hierarchy) filesystem type in the mount table.
pub(crate) const CGROUP_V2_FSTYPE: &str = "cgroup2";

/// The resource-control regime the target host runs under. Derived fresh on
/// every detection call; a process may be migrated between cgroups during the
/// agent's lifetime, so the result is never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CgroupVersion {
    V1,
    V2,
    /// No cgroup data available; resolvers fall through to host accounting.
    Unknown,
}

impl std::fmt::Display for CgroupVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CgroupVersion::V1 => write!(f, "v1"),
            CgroupVersion::V2 => write!(f, "v2"),
            CgroupVersion::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classifies the host's cgroup regime. Never fails: inconclusive input
/// degrades to an assumed v1 with a warning, since refusing to calibrate a
/// fault experiment on an unrecognized kernel setup is worse than a
/// best-effort guess.
pub fn detect_version(roots: &Roots) -> CgroupVersion {
    // The presence of cgroup.controllers at the root marks the unified
    // hierarchy.
    if let Ok(fs) = RootedFs::new(&roots.cgroup)
        && fs.exists("cgroup.controllers")
    {
        debug!(
            "detected cgroup v2 unified hierarchy at {}",
            roots.cgroup.display()
        );
        return CgroupVersion::V2;
    }

    match mounts::read_mounts(roots) {
        Ok(mounts) => {
            if let Some(entry) = mounts
                .iter()
                .find(|m| m.fstype == CGROUP_V2_FSTYPE && m.mount_point.starts_with(&roots.cgroup))
            {
                debug!(
                    "detected cgroup v2 mount at {}",
                    entry.mount_point.display()
                );
                return CgroupVersion::V2;
            }
            if mounts.iter().any(|m| m.fstype == CGROUP_V1_FSTYPE) {
                debug!("detected cgroup v1 mount");
                return CgroupVersion::V1;
            }
        }
        Err(e) => debug!("could not read mount table: {e}"),
    }

    warn!("unable to detect cgroup version, assuming v1");
    CgroupVersion::V1
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::FakeHost;

    #[test]
    fn test_controllers_file_wins() {
        let host = FakeHost::new();
        host.write_cgroup("cgroup.controllers", "cpuset cpu io memory\n");
        // A v1 mount table entry must not override the unified marker.
        host.write_mountinfo(&[&host.v1_mountinfo_line("cpu,cpuacct")]);

        assert_eq!(detect_version(&host.roots()), CgroupVersion::V2);
    }

    #[test]
    fn test_v2_mount_under_root() {
        let host = FakeHost::new();
        host.write_mountinfo(&[&host.v2_mountinfo_line()]);

        assert_eq!(detect_version(&host.roots()), CgroupVersion::V2);
    }

    #[test]
    fn test_v2_mount_outside_root_ignored() {
        let host = FakeHost::new();
        let v1_line = host.v1_mountinfo_line("memory");
        host.write_mountinfo(&[
            "30 23 0:26 / /elsewhere rw - cgroup2 cgroup2 rw",
            v1_line.as_str(),
        ]);

        assert_eq!(detect_version(&host.roots()), CgroupVersion::V1);
    }

    #[test]
    fn test_v1_mount() {
        let host = FakeHost::new();
        host.write_mountinfo(&[&host.v1_mountinfo_line("cpu,cpuacct")]);

        assert_eq!(detect_version(&host.roots()), CgroupVersion::V1);
    }

    #[test]
    fn test_nothing_matches_assumes_v1() {
        let host = FakeHost::new();
        host.write_mountinfo(&["30 23 0:26 / / rw - ext4 /dev/sda1 rw"]);

        assert_eq!(detect_version(&host.roots()), CgroupVersion::V1);
    }

    #[test]
    fn test_missing_everything_assumes_v1() {
        let host = FakeHost::new();

        assert_eq!(detect_version(&host.roots()), CgroupVersion::V1);
    }
}
