// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Export engine.
//!
//! Every format is a pure projection of one or more runs into bytes; nothing
//! here touches the store. The cross-run comparison is built from each run's
//! stored stats, never recomputed from samples.

pub mod csv_export;
pub mod json_export;
pub mod report;
pub mod workbook;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{BenchResult, ExportError};
use crate::model::BenchmarkRun;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Tabular rows, one per sample.
    Csv,
    /// Structured document mirroring the data model.
    Json,
    /// Multi-sheet workbook with a comparison sheet.
    Excel,
    /// Self-contained styled report.
    Html,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [Self::Csv, Self::Json, Self::Excel, Self::Html];

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Excel => "xlsx",
            Self::Html => "html",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Html => "text/html; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Excel => "excel",
            Self::Html => "html",
        };
        f.write_str(name)
    }
}

/// Unrecognized format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown export format '{0}' (expected csv, json, excel or html)")]
pub struct UnknownFormat(pub String);

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "excel" | "xlsx" => Ok(Self::Excel),
            "html" => Ok(Self::Html),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// One row of the cross-run comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub protocol: String,
    pub run_id: String,
    #[serde(with = "crate::model::micros_rfc3339")]
    pub created_at: DateTime<Utc>,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Compare runs side by side, in the order given.
pub fn comparison(runs: &[BenchmarkRun]) -> Vec<ComparisonRow> {
    runs.iter()
        .map(|run| {
            let stats = run.stats();
            ComparisonRow {
                protocol: run.protocol().to_string(),
                run_id: run.run_id().to_string(),
                created_at: run.created_at(),
                count: stats.count,
                mean: stats.mean,
                median: stats.median,
                std_dev: stats.std_dev,
                min: stats.min,
                max: stats.max,
                p50: stats.p50,
                p95: stats.p95,
                p99: stats.p99,
            }
        })
        .collect()
}

/// Project one run into `format`.
pub fn export_run(run: &BenchmarkRun, format: ExportFormat) -> BenchResult<Vec<u8>> {
    let bytes = match format {
        ExportFormat::Csv => csv_export::single(run)?,
        ExportFormat::Json => json_export::single(run)?,
        ExportFormat::Excel => workbook::build(std::slice::from_ref(run))?,
        ExportFormat::Html => report::render(std::slice::from_ref(run)).into_bytes(),
    };
    tracing::debug!(run_id = %run.run_id(), format = %format, bytes = bytes.len(), "Exported run");
    Ok(bytes)
}

/// Project several runs into one `format` document.
pub fn export_all(runs: &[BenchmarkRun], format: ExportFormat) -> BenchResult<Vec<u8>> {
    if runs.is_empty() {
        return Err(ExportError::NoRuns.into());
    }
    let bytes = match format {
        ExportFormat::Csv => csv_export::multiple(runs)?,
        ExportFormat::Json => json_export::multiple(runs)?,
        ExportFormat::Excel => workbook::build(runs)?,
        ExportFormat::Html => report::render(runs).into_bytes(),
    };
    tracing::debug!(runs = runs.len(), format = %format, bytes = bytes.len(), "Exported runs");
    Ok(bytes)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::model::BenchmarkRun;
    use crate::stats::ingest;
    use crate::types::{ProtocolName, TimestampPair};

    /// A run whose latencies are `latencies_ms`, starting at `second`.
    pub fn run(protocol: &str, second: u32, latencies_ms: &[u32]) -> BenchmarkRun {
        let pairs = latencies_ms
            .iter()
            .enumerate()
            .map(|(i, ms)| {
                let req = format!("2025-01-05T12:{:02}:{:02}.000Z", i, second);
                let resp = format!("2025-01-05T12:{:02}:{:02}.{:03}Z", i, second, ms);
                TimestampPair::parse(&req, &resp).unwrap()
            })
            .collect();
        ingest(pairs, &ProtocolName::new(protocol).unwrap(), None).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;

    #[test]
    fn test_format_parsing() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert_eq!("html".parse::<ExportFormat>().unwrap(), ExportFormat::Html);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_format_round_trips_through_display() {
        for format in ExportFormat::ALL {
            assert_eq!(format.to_string().parse::<ExportFormat>().unwrap(), format);
        }
        assert_eq!(ExportFormat::Excel.extension(), "xlsx");
    }

    #[test]
    fn test_comparison_uses_stored_stats() {
        let runs = vec![fixtures::run("gRPC", 1, &[2, 4]), fixtures::run("REST", 2, &[10])];
        let rows = comparison(&runs);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].protocol, "gRPC");
        assert_eq!(rows[0].mean, runs[0].stats().mean);
        assert_eq!(rows[1].p99, runs[1].stats().p99);
        assert_eq!(rows[1].count, 1);
    }

    #[test]
    fn test_export_all_requires_runs() {
        let err = export_all(&[], ExportFormat::Csv).unwrap_err();
        assert!(matches!(err, BenchError::Export(ExportError::NoRuns)));
    }

    #[test]
    fn test_export_does_not_alter_run() {
        let run = fixtures::run("CBOR", 3, &[1, 2, 3]);
        let before = run.clone();
        for format in ExportFormat::ALL {
            let bytes = export_run(&run, format).unwrap();
            assert!(!bytes.is_empty());
        }
        assert_eq!(run, before);
    }
}
