// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use std::io;
use std::path::PathBuf;

use crate::fs::RootedFs;
use crate::paths::Roots;

/// One line of `/proc/self/mountinfo`, reduced to the fields the cgroup
/// detection and v1 hierarchy lookup need.
#[derive(Debug)]
pub(crate) struct MountEntry {
    pub mount_point: PathBuf,
    pub fstype: String,
    pub super_options: String,
}

/// Parses a mountinfo line. The filesystem type is the first field after the
/// `-` separator; the mount fields before it contain a variable number of
/// optional fields, so fixed column indexes past the mount point are wrong.
pub(crate) fn parse_line(line: &str) -> Option<MountEntry> {
    let (mount_fields, fs_fields) = line.split_once(" - ")?;
    let mount_point = mount_fields.split_whitespace().nth(4)?;

    let mut fs_fields = fs_fields.split_whitespace();
    let fstype = fs_fields.next()?;
    let _source = fs_fields.next();
    let super_options = fs_fields.next().unwrap_or("");

    Some(MountEntry {
        mount_point: PathBuf::from(mount_point),
        fstype: fstype.to_string(),
        super_options: super_options.to_string(),
    })
}

/// Reads the calling process's mount table fresh from the proc root.
pub(crate) fn read_mounts(roots: &Roots) -> io::Result<Vec<MountEntry>> {
    let fs = RootedFs::new(&roots.proc)?;
    let content = fs.read_to_string("self/mountinfo")?;
    Ok(content.lines().filter_map(parse_line).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_parse_line_plain() {
        let entry =
            parse_line("30 23 0:26 / /sys/fs/cgroup rw,nosuid - cgroup2 cgroup2 rw,nsdelegate")
                .unwrap();
        assert_eq!(entry.mount_point, Path::new("/sys/fs/cgroup"));
        assert_eq!(entry.fstype, "cgroup2");
        assert_eq!(entry.super_options, "rw,nsdelegate");
    }

    #[test]
    fn test_parse_line_optional_fields() {
        // One optional field ("shared:9") before the separator; fstype must
        // still resolve to the field after "-", not a fixed column.
        let entry = parse_line(
            "36 30 0:31 / /sys/fs/cgroup/cpu,cpuacct rw shared:9 - cgroup cgroup rw,cpu,cpuacct",
        )
        .unwrap();
        assert_eq!(entry.mount_point, Path::new("/sys/fs/cgroup/cpu,cpuacct"));
        assert_eq!(entry.fstype, "cgroup");
        assert!(entry.super_options.split(',').any(|o| o == "cpu"));
    }

    #[test]
    fn test_parse_line_malformed() {
        assert!(parse_line("").is_none());
        assert!(parse_line("36 30 0:31 / /mnt rw").is_none());
        assert!(parse_line("36 30 - cgroup cgroup rw").is_none());
    }
}
