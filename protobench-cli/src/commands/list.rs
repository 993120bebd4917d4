// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `protobench list` command - List stored runs.

use protobench_core::{BenchmarkStats, RunFilter};

use super::{truncate, Context};
use crate::error::CliResult;

pub fn execute(
    ctx: &Context,
    protocol: Option<String>,
    limit: usize,
    offset: usize,
) -> CliResult<()> {
    let store = ctx.open_store()?;

    let mut filter = RunFilter::default().limit(limit).offset(offset);
    if let Some(protocol) = protocol {
        filter = filter.protocol(protocol);
    }
    let runs = store.list(&filter)?;

    if runs.is_empty() {
        println!("No benchmark runs stored.");
        return Ok(());
    }

    println!("╔═══════════════════════════════════╦══════════════╦═════════════════════╦═════════╦════════════╦════════════╗");
    println!("║ Run ID                            ║ Protocol     ║ Created (UTC)       ║ Samples ║ Mean       ║ P95        ║");
    println!("╠═══════════════════════════════════╬══════════════╬═════════════════════╬═════════╬════════════╬════════════╣");

    for run in &runs {
        println!(
            "║ {:<33} ║ {:<12} ║ {:<19} ║ {:>7} ║ {:<10} ║ {:<10} ║",
            truncate(run.run_id.as_str(), 33),
            truncate(run.protocol.as_str(), 12),
            run.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            run.stats.count,
            BenchmarkStats::format_latency(run.stats.mean),
            BenchmarkStats::format_latency(run.stats.p95),
        );
    }

    println!("╚═══════════════════════════════════╩══════════════╩═════════════════════╩═════════╩════════════╩════════════╝");
    println!();
    println!("Showing {} run(s) from offset {}", runs.len(), offset);

    Ok(())
}
