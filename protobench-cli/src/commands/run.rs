// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `protobench run` command - Orchestrate benchmarks and store the results.
//!
//! Runs every selected adapter in turn, parses each artifact that was
//! produced, and saves the resulting run. A protocol that fails to launch is
//! reported in the summary and does not stop the others.

use std::path::PathBuf;

use protobench_core::legacy::ingest_artifact;
use protobench_core::{BenchmarkStats, Orchestrator, SaveOutcome};

use super::{truncate, Context};
use crate::error::{CliError, CliResult};
use crate::metrics;

/// What happened to one protocol.
enum Status {
    Stored { run_id: String, p50: f64, p99: f64, outcome: SaveOutcome },
    Failed(String),
}

pub async fn execute(
    ctx: &Context,
    protocols: &[String],
    output_dir: Option<PathBuf>,
) -> CliResult<()> {
    let registry = ctx.registry()?;
    let adapters = registry.select(protocols)?;
    let store = ctx.open_store()?;

    let mut config = ctx.config.orchestrator.clone();
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    tracing::info!(
        protocols = adapters.len(),
        output_dir = %config.output_dir.display(),
        "Starting benchmark batch"
    );

    let orchestrator = Orchestrator::new(config);
    let batch = orchestrator.run_batch(&adapters).await;

    let mut rows = Vec::with_capacity(batch.outcomes.len());
    for (adapter, outcome) in adapters.iter().zip(&batch.outcomes) {
        metrics::record_benchmark(adapter.protocol.as_str(), outcome.elapsed, outcome.is_success());

        let status = match &outcome.result {
            Ok(path) => match ingest_artifact(adapter, path)
                .map(|run| run.with_metadata("source", "orchestrator"))
                .and_then(|run| store.save(&run).map(|saved| (run, saved)))
            {
                Ok((run, saved)) => Status::Stored {
                    run_id: run.run_id().to_string(),
                    p50: run.stats().p50,
                    p99: run.stats().p99,
                    outcome: saved,
                },
                Err(e) => {
                    tracing::error!(protocol = %adapter.protocol, error = %e, "Failed to store benchmark");
                    Status::Failed(e.to_string())
                }
            },
            Err(e) => Status::Failed(e.to_string()),
        };
        rows.push((adapter.protocol.as_str(), outcome.elapsed, status));
    }

    println!("╔══════════════╦══════════╦═══════════════════════════════════╦════════════╦════════════╗");
    println!("║ Protocol     ║ Time     ║ Run                               ║ P50        ║ P99        ║");
    println!("╠══════════════╬══════════╬═══════════════════════════════════╬════════════╬════════════╣");

    let mut failed = 0;
    for (protocol, elapsed, status) in &rows {
        let time = format!("{:.1}s", elapsed.as_secs_f64());
        match status {
            Status::Stored {
                run_id,
                p50,
                p99,
                outcome,
            } => {
                let marker = if outcome.is_inserted() { "" } else { " (dup)" };
                println!(
                    "║ {:<12} ║ {:<8} ║ {:<33} ║ {:<10} ║ {:<10} ║",
                    truncate(protocol, 12),
                    time,
                    truncate(&format!("{}{}", run_id, marker), 33),
                    BenchmarkStats::format_latency(*p50),
                    BenchmarkStats::format_latency(*p99),
                );
            }
            Status::Failed(reason) => {
                failed += 1;
                println!(
                    "║ {:<12} ║ {:<8} ║ {:<59} ║",
                    truncate(protocol, 12),
                    time,
                    truncate(&format!("✗ {}", reason), 59),
                );
            }
        }
    }

    println!("╚══════════════╩══════════╩═══════════════════════════════════╩════════════╩════════════╝");
    println!();
    println!("{} succeeded, {} failed", rows.len() - failed, failed);

    for (protocol, _, status) in &rows {
        if let Status::Failed(reason) = status {
            eprintln!("  {}: {}", protocol, reason);
        }
    }

    if !rows.is_empty() && failed == rows.len() {
        return Err(CliError::BatchFailed(failed));
    }
    Ok(())
}
