// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `protobench export` / `export-all` commands - Write runs to a file.

use std::path::PathBuf;

use protobench_core::export::{export_all, export_run};
use protobench_core::ExportFormat;

use super::{write_output, Context};
use crate::error::CliResult;

const EXPORT_DIR: &str = "exports";

pub fn execute(
    ctx: &Context,
    run_id: &str,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let store = ctx.open_store()?;
    let run = store.get(run_id)?;
    let bytes = export_run(&run, format)?;

    let path = output.unwrap_or_else(|| {
        PathBuf::from(EXPORT_DIR).join(format!("{}.{}", run.run_id(), format.extension()))
    });
    write_output(&path, &bytes)?;

    tracing::info!(run_id = %run_id, format = %format, bytes = bytes.len(), "Run exported");
    println!("✓ Exported {} to {}", run_id, path.display());
    Ok(())
}

/// Export the latest run of every protocol into one file.
pub fn execute_all(ctx: &Context, format: ExportFormat, output: Option<PathBuf>) -> CliResult<()> {
    let store = ctx.open_store()?;
    let runs: Vec<_> = store.latest_per_protocol()?.into_values().collect();
    let bytes = export_all(&runs, format)?;

    let path = output.unwrap_or_else(|| {
        PathBuf::from(EXPORT_DIR).join(format!("all_benchmarks.{}", format.extension()))
    });
    write_output(&path, &bytes)?;

    println!(
        "✓ Exported {} run(s) to {}",
        runs.len(),
        path.display()
    );
    Ok(())
}
