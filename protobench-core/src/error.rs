// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for protobench.
//!
//! Explicit enum error types only. No `Box<dyn Error>`, no `anyhow::Result`
//! anywhere in the library; every failure the pipeline can produce has a
//! named variant so callers can decide whether to skip, report or abort.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Port, ProtocolName, RunId};

/// Top-level error type for the benchmark pipeline.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    #[error("No adapter registered for protocol: {0}")]
    AdapterNotFound(String),

    // =========================================================================
    // Orchestration Errors - Recovered per protocol by the batch runner
    // =========================================================================
    #[error("Benchmark launch failed: {0}")]
    Launch(#[from] OrchestratorError),

    // =========================================================================
    // Ingestion Errors
    // =========================================================================
    #[error("Empty dataset: no samples to compute statistics for {protocol}")]
    EmptyDataset { protocol: String },

    #[error("Malformed artifact {path}: {reason}")]
    MalformedArtifact { path: PathBuf, reason: String },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    #[error("Run {0} already exists with different content")]
    DuplicateRunId(RunId),

    #[error("No such run: {0}")]
    RunNotFound(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    // =========================================================================
    // Export Errors
    // =========================================================================
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl BenchError {
    /// Stable machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HardValidation(_) => "validation",
            Self::ConfigNotFound { .. } => "config_not_found",
            Self::ConfigParse { .. } => "config_parse",
            Self::AdapterNotFound(_) => "adapter_not_found",
            Self::Launch(e) if e.is_launch_failure() => "launch_failure",
            Self::Launch(_) => "benchmark_failure",
            Self::EmptyDataset { .. } => "empty_dataset",
            Self::MalformedArtifact { .. } => "malformed_artifact",
            Self::DuplicateRunId(_) => "duplicate_run_id",
            Self::RunNotFound(_) => "not_found",
            Self::Storage(_) => "storage_failure",
            Self::Export(_) => "export_failure",
            Self::Io { .. } => "io",
        }
    }

    /// Whether the error means the addressed entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RunNotFound(_) | Self::AdapterNotFound(_))
    }
}

/// Hard validation errors reject a configuration before anything is started.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid port: {port} - {reason}")]
    InvalidPort { port: u16, reason: String },

    #[error("Duplicate protocol: {name}")]
    DuplicateProtocol { name: String },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },
}

/// Failures while bringing up, triggering or tearing down one protocol's services.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Failed to spawn {service} for {protocol}: {reason}")]
    SpawnFailed {
        protocol: ProtocolName,
        service: &'static str,
        reason: String,
    },

    #[error("{service} for {protocol} not reachable on port {port} within {timeout_ms}ms")]
    ReadyTimeout {
        protocol: ProtocolName,
        service: &'static str,
        port: Port,
        timeout_ms: u64,
    },

    #[error("{service} for {protocol} exited before becoming ready: {status}")]
    ExitedEarly {
        protocol: ProtocolName,
        service: &'static str,
        status: String,
    },

    #[error("Benchmark trigger for {protocol} timed out after {timeout_ms}ms")]
    TriggerTimeout {
        protocol: ProtocolName,
        timeout_ms: u64,
    },

    #[error("Benchmark trigger for {protocol} failed: {reason}")]
    TriggerFailed {
        protocol: ProtocolName,
        reason: String,
    },

    #[error("Expected artifact not found: {path}")]
    ArtifactMissing { path: PathBuf },

    #[error("Failed to write artifact {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OrchestratorError {
    /// A service could not be started or never became reachable.
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            Self::SpawnFailed { .. } | Self::ReadyTimeout { .. } | Self::ExitedEarly { .. }
        )
    }
}

/// Durable store failures. No partial rows survive any of these.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to (de)serialize stored column {column}: {source}")]
    Serialization {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Stored row is corrupt: {reason}")]
    CorruptRow { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Failures while projecting runs into an output format.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workbook encoding failed: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid structured document: {reason}")]
    InvalidDocument { reason: String },

    #[error("Nothing to export")]
    NoRuns,
}

impl From<rusqlite::Error> for BenchError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Sqlite(err))
    }
}

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_validation_error_display() {
        let err = HardValidationError::MissingRequiredField {
            field: "trigger_path",
            context: "adapter 'gRPC'".to_string(),
        };
        assert!(err.to_string().contains("trigger_path"));
        assert!(err.to_string().contains("gRPC"));
    }

    #[test]
    fn test_error_chain() {
        let validation_err = HardValidationError::InvalidPort {
            port: 0,
            reason: "Port must be non-zero".to_string(),
        };
        let bench_err: BenchError = validation_err.into();
        assert!(matches!(bench_err, BenchError::HardValidation(_)));
        assert_eq!(bench_err.kind(), "validation");
    }

    #[test]
    fn test_launch_failure_classification() {
        let protocol = ProtocolName::new("gRPC").unwrap();
        let timeout = OrchestratorError::ReadyTimeout {
            protocol: protocol.clone(),
            service: "responder",
            port: Port::new(50051).unwrap(),
            timeout_ms: 100,
        };
        assert!(timeout.is_launch_failure());
        assert_eq!(BenchError::from(timeout).kind(), "launch_failure");

        let trigger = OrchestratorError::TriggerTimeout {
            protocol,
            timeout_ms: 100,
        };
        assert!(!trigger.is_launch_failure());
        assert_eq!(BenchError::from(trigger).kind(), "benchmark_failure");
    }

    #[test]
    fn test_not_found_kind() {
        let err = BenchError::RunNotFound("grpc_20250105_120000_000000".to_string());
        assert!(err.is_not_found());
        assert_eq!(err.kind(), "not_found");
        assert!(err.to_string().contains("No such run"));
    }
}
