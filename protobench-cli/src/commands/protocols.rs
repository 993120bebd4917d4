// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `protobench protocols` command - List configured adapters.

use super::{truncate, Context};
use crate::error::CliResult;

pub fn execute(ctx: &Context) -> CliResult<()> {
    let adapters = ctx.registry()?.adapters();

    if adapters.is_empty() {
        println!("No protocol adapters configured.");
        return Ok(());
    }

    println!("╔══════════════╦═══════════╦═══════════╦══════════════════════════╦═══════════════════╦═══════════╗");
    println!("║ Protocol     ║ Responder ║ Requester ║ Trigger                  ║ Artifact          ║ Pairing   ║");
    println!("╠══════════════╬═══════════╬═══════════╬══════════════════════════╬═══════════════════╬═══════════╣");

    for adapter in &adapters {
        let pairing = if adapter.multi_response { "multi" } else { "single" };
        println!(
            "║ {:<12} ║ {:<9} ║ {:<9} ║ {:<24} ║ {:<17} ║ {:<9} ║",
            truncate(adapter.protocol.as_str(), 12),
            adapter.responder.port.value(),
            adapter.requester.port.value(),
            truncate(&adapter.trigger_path, 24),
            truncate(&adapter.output_file, 17),
            pairing,
        );
    }

    println!("╚══════════════╩═══════════╩═══════════╩══════════════════════════╩═══════════════════╩═══════════╝");
    println!();
    println!("Total: {} protocol(s)", adapters.len());

    Ok(())
}
