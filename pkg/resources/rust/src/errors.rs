// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures surfaced by the accounting resolvers. An error from a single
/// cgroup tier is absorbed by the fallback chain; callers only see one of
/// these once every tier has been exhausted.
#[derive(Error, Debug)]
pub enum Error {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path}: {context}")]
    Parse { path: PathBuf, context: String },

    #[error("cpu index {index} out of range, host has {count} cpus")]
    CpuIndexOutOfRange { index: usize, count: usize },

    #[error("host resource query returned no data")]
    HostQuery,
}

impl Error {
    pub(crate) fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse<P: AsRef<Path>, C: Into<String>>(path: P, context: C) -> Self {
        Error::Parse {
            path: path.as_ref().to_path_buf(),
            context: context.into(),
        }
    }
}
