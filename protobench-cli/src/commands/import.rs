// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `protobench import` command - Load artifacts or exported runs into the store.

use std::path::Path;

use protobench_core::export::json_export;
use protobench_core::legacy::import_into_store;

use super::Context;
use crate::error::{CliError, CliResult};

pub fn execute(ctx: &Context, dir: &Path, run_file: Option<&Path>) -> CliResult<()> {
    let store = ctx.open_store()?;

    if let Some(file) = run_file {
        let bytes = std::fs::read(file).map_err(|source| CliError::Read {
            path: file.to_path_buf(),
            source,
        })?;
        let runs = json_export::read_runs(&bytes)?;

        for run in &runs {
            let outcome = store.save(run)?;
            let label = if outcome.is_inserted() { "imported" } else { "already stored" };
            println!(
                "✓ {} {} ({} samples, {})",
                run.protocol(),
                run.run_id(),
                run.samples().len(),
                label
            );
        }
        return Ok(());
    }

    tracing::info!(dir = %dir.display(), "Importing legacy artifacts");
    let summary = import_into_store(dir, &ctx.registry()?, &store)?;

    for stored in &summary.stored {
        let label = if stored.outcome.is_inserted() { "imported" } else { "already stored" };
        println!(
            "✓ {} {} ({} samples, {})",
            stored.protocol, stored.run_id, stored.samples, label
        );
    }
    for failure in &summary.failures {
        println!("✗ {} {}: {}", failure.protocol, failure.file.display(), failure.error);
    }
    if !summary.skipped.is_empty() {
        let names: Vec<_> = summary.skipped.iter().map(|p| p.as_str()).collect();
        println!("- no artifact for: {}", names.join(", "));
    }

    println!();
    println!(
        "{} new, {} unchanged, {} failed",
        summary.inserted(),
        summary.stored.len() - summary.inserted(),
        summary.failures.len()
    );
    Ok(())
}
