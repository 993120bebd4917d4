// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Protobench Core Library
//!
//! Benchmark pipeline for protocol service pairs: launches responder and
//! requester processes, turns their timestamp artifacts into latency runs,
//! stores runs durably in SQLite, and exports them as CSV, JSON, Excel or
//! HTML.

pub mod config;
pub mod error;
pub mod export;
pub mod legacy;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod stats;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::{AdapterConfig, Config, ConfigLoader, OrchestratorConfig, ServiceConfig};
pub use error::{BenchError, BenchResult, ExportError, HardValidationError, OrchestratorError, StorageError};
pub use export::ExportFormat;
pub use legacy::{ImportReport, ImportSummary};
pub use model::{BenchmarkRun, MetricSample, RunSummary, StoreStats};
pub use orchestrator::{BatchSummary, Orchestrator};
pub use registry::AdapterRegistry;
pub use stats::BenchmarkStats;
pub use storage::{MetricsStore, RunFilter, SaveOutcome};
pub use types::{Port, ProtocolName, RunId, TimestampPair};
