// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `protobench validate` command - Validate configuration file.

use std::path::Path;

use protobench_core::ConfigLoader;

use crate::error::CliResult;

pub fn execute(file: Option<&Path>) -> CliResult<()> {
    match file {
        Some(path) => tracing::info!(file = %path.display(), "Validating configuration"),
        None => tracing::info!("Validating discovered configuration"),
    }

    let config = ConfigLoader::discover(file)?;

    println!("✓ Configuration is valid");
    println!();
    println!("Orchestrator Settings:");
    println!(
        "  Readiness Timeout:  {}ms",
        config.orchestrator.readiness_timeout_ms
    );
    println!("  Poll Interval:      {}ms", config.orchestrator.poll_interval_ms);
    println!(
        "  Trigger Timeout:    {}ms",
        config.orchestrator.trigger_timeout_ms
    );
    println!(
        "  Shutdown Grace:     {}ms",
        config.orchestrator.shutdown_grace_ms
    );
    println!(
        "  Output Directory:   {}",
        config.orchestrator.output_dir.display()
    );
    println!("  Database:           {}", config.storage.database.display());
    println!();
    println!("Adapters ({}):", config.adapters.len());
    for adapter in &config.adapters {
        println!(
            "  - {} (responder: {}, requester: {}, trigger: {}, artifact: {})",
            adapter.protocol,
            adapter.responder.port,
            adapter.requester.port,
            adapter.trigger_path,
            adapter.output_file
        );
    }
    Ok(())
}
