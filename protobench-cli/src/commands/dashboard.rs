// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `protobench dashboard` command - Serve the read API.

use std::net::SocketAddr;
use std::sync::Arc;

use super::Context;
use crate::dashboard::{self, DashboardState};
use crate::error::{CliError, CliResult};

pub async fn execute(ctx: &Context, host: &str, port: u16) -> CliResult<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse().map_err(|e| {
        CliError::Server(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid listen address {}:{}: {}", host, port, e),
        ))
    })?;

    let state = DashboardState {
        store: Arc::new(ctx.open_store()?),
        registry: Arc::new(ctx.registry()?),
        import_dir: ctx.config.orchestrator.output_dir.clone(),
    };

    dashboard::serve(addr, state).await
}
