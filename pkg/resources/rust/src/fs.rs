// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use cap_std::fs::Dir;

use crate::errors::Error;

/// RootedFs reads kernel accounting files below a fixed root directory. It
/// accepts absolute paths and strips them to be relative to the root, and it
/// prevents escaping the root, including via symbolic links, by going through
/// cap_std::fs::Dir.
///
/// Every resolver opens a fresh RootedFs per call; nothing is cached between
/// calls, so a target process migrating to another cgroup is picked up on the
/// next resolution.
pub(crate) struct RootedFs {
    dir: Dir,
    root_path: PathBuf,
}

/// Kernel accounting files are a handful of bytes; anything near this limit
/// is not the file we think it is.
const MAX_ACCOUNTING_FILE_SIZE: u64 = 1024 * 1024; // 1 MiB

/// Strips the leading slash (if any) so the path can be passed to cap_std
/// functions, which in turn ensure it does not escape the root directory.
fn fix_path<P: AsRef<Path>>(path: &P) -> &Path {
    let path = path.as_ref();
    path.strip_prefix("/").unwrap_or(path)
}

impl RootedFs {
    pub(crate) fn new<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let root_path = root.as_ref().to_path_buf();
        let dir = Dir::open_ambient_dir(root.as_ref(), cap_std::ambient_authority())?;
        Ok(Self { dir, root_path })
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root_path
    }

    /// Returns `true` if the path points at an existing entity.
    pub(crate) fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.dir.exists(fix_path(&path))
    }

    /// Reads a whole file into a string after verifying that it is a regular
    /// file and small enough to be a kernel accounting file. The reader is
    /// additionally `take()`-limited so a file growing between the metadata
    /// check and the read cannot blow past the cap.
    pub(crate) fn read_to_string<P: AsRef<Path>>(&self, path: P) -> io::Result<String> {
        let file = self.dir.open(fix_path(&path))?;
        let metadata = file.metadata()?;

        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            ));
        }

        // Files under /proc and the cgroup filesystems report a zero size;
        // the cap alone bounds how much we read from those.
        let size = metadata.len();
        if size > MAX_ACCOUNTING_FILE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("file too large ({} bytes)", size),
            ));
        }

        let mut contents = String::new();
        (&file)
            .take(MAX_ACCOUNTING_FILE_SIZE)
            .read_to_string(&mut contents)?;
        Ok(contents)
    }
}

/// Reads a single-integer accounting file, as v1 quota/period/limit files
/// and `cpuacct.usage` are laid out.
pub(crate) fn read_i64(fs: &RootedFs, name: &str) -> Result<i64, Error> {
    let content = fs
        .read_to_string(name)
        .map_err(|e| Error::io(fs.root().join(name), e))?;
    content.trim().parse().map_err(|_| {
        Error::parse(
            fs.root().join(name),
            format!("expected an integer, got {:?}", content.trim()),
        )
    })
}

pub(crate) fn read_u64(fs: &RootedFs, name: &str) -> Result<u64, Error> {
    let content = fs
        .read_to_string(name)
        .map_err(|e| Error::io(fs.root().join(name), e))?;
    content.trim().parse().map_err(|_| {
        Error::parse(
            fs.root().join(name),
            format!("expected an unsigned integer, got {:?}", content.trim()),
        )
    })
}
