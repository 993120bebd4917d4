// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `protobench delete` command - Remove a run and its samples.

use super::Context;
use crate::error::CliResult;

pub fn execute(ctx: &Context, run_id: &str) -> CliResult<()> {
    let store = ctx.open_store()?;
    let samples = store.delete(run_id)?;

    tracing::info!(run_id = %run_id, samples = samples, "Run deleted");
    println!("✓ Deleted run {} ({} samples)", run_id, samples);
    Ok(())
}
