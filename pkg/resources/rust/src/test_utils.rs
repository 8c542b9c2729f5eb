// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

//! Test fixture: a synthetic host with fake `/proc` and cgroup trees on a
//! temporary directory, so resolvers run against controlled kernel files.
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::paths::Roots;

pub(crate) struct FakeHost {
    temp_dir: TempDir,
}

impl FakeHost {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("proc")).unwrap();
        std::fs::create_dir(temp_dir.path().join("cgroup")).unwrap();
        Self { temp_dir }
    }

    pub fn roots(&self) -> Roots {
        Roots::new(
            self.temp_dir.path().join("proc"),
            self.temp_dir.path().join("cgroup"),
        )
    }

    pub fn write_proc(&self, rel: &str, content: &str) {
        write(&self.temp_dir.path().join("proc").join(rel), content);
    }

    pub fn write_cgroup(&self, rel: &str, content: &str) {
        write(&self.temp_dir.path().join("cgroup").join(rel), content);
    }

    pub fn write_mountinfo<S: AsRef<str>>(&self, lines: &[S]) {
        let mut content = lines
            .iter()
            .map(|line| line.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        content.push('\n');
        self.write_proc("self/mountinfo", &content);
    }

    /// A mount table line for a v1 hierarchy mounted at
    /// `<cgroup root>/<controllers>`.
    pub fn v1_mountinfo_line(&self, controllers: &str) -> String {
        format!(
            "36 30 0:31 / {} rw,nosuid shared:9 - cgroup cgroup rw,{}",
            self.cgroup_root().join(controllers).display(),
            controllers
        )
    }

    /// A mount table line for the unified hierarchy mounted at the cgroup
    /// root itself.
    pub fn v2_mountinfo_line(&self) -> String {
        format!(
            "30 23 0:26 / {} rw,nosuid shared:4 - cgroup2 cgroup2 rw,nsdelegate",
            self.cgroup_root().display()
        )
    }

    /// Lays out a v2 control group for `pid`: the unified-hierarchy marker,
    /// the pid's `cgroup` file, and the group directory itself.
    pub fn v2_group(&self, pid: u32, rel: &str) -> PathBuf {
        self.write_cgroup("cgroup.controllers", "cpuset cpu io memory\n");
        self.write_proc(&format!("{pid}/cgroup"), &format!("0::/{rel}\n"));
        let dir = self.cgroup_root().join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Lays out a v1 control group for `pid` under the conventional
    /// per-controller directory, with a matching mount table.
    pub fn v1_group(&self, pid: u32, controllers: &str, rel: &str) -> PathBuf {
        self.write_mountinfo(&[self.v1_mountinfo_line(controllers)]);
        self.write_proc(
            &format!("{pid}/cgroup"),
            &format!("3:{controllers}:/{rel}\n"),
        );
        let dir = self.cgroup_root().join(controllers).join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cgroup_root(&self) -> PathBuf {
        self.temp_dir.path().join("cgroup")
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
