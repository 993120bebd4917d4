// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `protobench stats` command - Show store totals.

use super::Context;
use crate::error::CliResult;

pub fn execute(ctx: &Context) -> CliResult<()> {
    let store = ctx.open_store()?;
    let stats = store.stats()?;

    println!("Database:      {}", ctx.db_path.display());
    println!("Total runs:    {}", stats.total_runs);
    println!("Total samples: {}", stats.total_samples);

    if !stats.protocols.is_empty() {
        println!();
        println!("Runs per protocol:");
        for (protocol, runs) in &stats.protocols {
            println!("  {:<12} {}", protocol, runs);
        }
    }

    Ok(())
}
