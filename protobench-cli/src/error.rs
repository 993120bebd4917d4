// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI error type.

use std::path::PathBuf;

use protobench_core::BenchError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Bench(#[from] BenchError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dashboard server failed: {0}")]
    Server(#[source] std::io::Error),

    #[error("All {0} benchmark run(s) failed")]
    BatchFailed(usize),
}

pub type CliResult<T> = Result<T, CliError>;
