// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Legacy artifact ingestion.
//!
//! A legacy artifact is a JSON file written by a requester outside the
//! store. Field names come from the adapter, never from the document shape.
//!
//! Single-response adapters expect an array of objects, each holding both
//! timestamp fields as strings. Multi-response adapters expect one object
//! whose response field is an array of strings and whose request field is
//! either one string shared by every response or an array of the same
//! length, paired by position.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::config::AdapterConfig;
use crate::error::{BenchError, BenchResult};
use crate::model::BenchmarkRun;
use crate::registry::AdapterRegistry;
use crate::stats::ingest;
use crate::storage::{MetricsStore, SaveOutcome};
use crate::types::{ProtocolName, RunId, TimestampPair};

/// Metadata value recorded under `source` for imported runs.
pub const LEGACY_SOURCE: &str = "legacy_import";

/// How request timestamps were attributed to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pairing {
    /// One entry per round trip.
    PerEntry,
    /// One request timestamp shared by every response.
    Broadcast,
    /// Request and response arrays paired by position.
    Zip,
}

impl fmt::Display for Pairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PerEntry => "per_entry",
            Self::Broadcast => "broadcast",
            Self::Zip => "zip",
        };
        f.write_str(name)
    }
}

/// Timestamp pairs extracted from one artifact.
#[derive(Debug, Clone)]
pub struct ParsedArtifact {
    pub pairs: Vec<TimestampPair>,
    pub pairing: Pairing,
}

fn string_at<'a>(entry: &'a Value, field: &str) -> Result<&'a str, String> {
    match entry.get(field) {
        Some(Value::String(text)) => Ok(text.as_str()),
        Some(other) => Err(format!("field '{}' is not a string: {}", field, other)),
        None => Err(format!("missing field '{}'", field)),
    }
}

fn strings_in<'a>(values: &'a [Value], field: &str) -> Result<Vec<&'a str>, String> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .ok_or_else(|| format!("'{}'[{}] is not a string: {}", field, i, v))
        })
        .collect()
}

/// Extract timestamp pairs from an artifact's bytes, in document order.
pub fn parse_artifact(adapter: &AdapterConfig, bytes: &[u8]) -> Result<ParsedArtifact, String> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| format!("invalid JSON: {}", e))?;

    if adapter.multi_response {
        parse_multi(adapter, &document)
    } else {
        parse_single(adapter, &document)
    }
}

fn parse_single(adapter: &AdapterConfig, document: &Value) -> Result<ParsedArtifact, String> {
    let entries = document
        .as_array()
        .ok_or_else(|| "expected a JSON array of entries".to_string())?;

    let pairs = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let request = string_at(entry, &adapter.request_field)
                .map_err(|e| format!("entry {}: {}", i, e))?;
            let response = string_at(entry, &adapter.response_field)
                .map_err(|e| format!("entry {}: {}", i, e))?;
            TimestampPair::parse(request, response).map_err(|e| format!("entry {}: {}", i, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedArtifact {
        pairs,
        pairing: Pairing::PerEntry,
    })
}

fn parse_multi(adapter: &AdapterConfig, document: &Value) -> Result<ParsedArtifact, String> {
    if !document.is_object() {
        return Err("expected a JSON object for a multi-response artifact".to_string());
    }

    let responses = match document.get(&adapter.response_field) {
        Some(Value::Array(values)) => strings_in(values, &adapter.response_field)?,
        Some(other) => {
            return Err(format!(
                "field '{}' must be an array of timestamps, got {}",
                adapter.response_field, other
            ))
        }
        None => return Err(format!("missing field '{}'", adapter.response_field)),
    };

    let (requests, pairing) = match document.get(&adapter.request_field) {
        Some(Value::String(shared)) => (vec![shared.as_str(); responses.len()], Pairing::Broadcast),
        Some(Value::Array(values)) => {
            let requests = strings_in(values, &adapter.request_field)?;
            if requests.len() != responses.len() {
                return Err(format!(
                    "'{}' has {} entries but '{}' has {}",
                    adapter.request_field,
                    requests.len(),
                    adapter.response_field,
                    responses.len()
                ));
            }
            (requests, Pairing::Zip)
        }
        Some(other) => {
            return Err(format!(
                "field '{}' must be a timestamp or an array of timestamps, got {}",
                adapter.request_field, other
            ))
        }
        None => return Err(format!("missing field '{}'", adapter.request_field)),
    };

    let pairs = requests
        .into_iter()
        .zip(responses)
        .enumerate()
        .map(|(i, (request, response))| {
            TimestampPair::parse(request, response).map_err(|e| format!("response {}: {}", i, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedArtifact { pairs, pairing })
}

/// Read one artifact and turn it into a run annotated with its origin.
pub fn ingest_artifact(adapter: &AdapterConfig, path: &Path) -> BenchResult<BenchmarkRun> {
    let bytes = std::fs::read(path).map_err(|e| BenchError::MalformedArtifact {
        path: path.to_path_buf(),
        reason: format!("unreadable: {}", e),
    })?;

    let parsed = parse_artifact(adapter, &bytes).map_err(|reason| BenchError::MalformedArtifact {
        path: path.to_path_buf(),
        reason,
    })?;

    let artifact = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| adapter.output_file.clone());

    let run = ingest(parsed.pairs, &adapter.protocol, None)?
        .with_metadata("source", LEGACY_SOURCE)
        .with_metadata("artifact", artifact)
        .with_metadata("pairing", parsed.pairing.to_string());

    Ok(run)
}

/// A run read from an artifact file.
#[derive(Debug, Clone)]
pub struct ImportedArtifact {
    pub file: PathBuf,
    pub run: BenchmarkRun,
}

/// An artifact that exists but could not be imported.
#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    pub file: PathBuf,
    pub protocol: ProtocolName,
    pub kind: &'static str,
    pub error: String,
}

impl ImportFailure {
    fn new(file: PathBuf, protocol: ProtocolName, err: &BenchError) -> Self {
        Self {
            file,
            protocol,
            kind: err.kind(),
            error: err.to_string(),
        }
    }
}

/// Outcome of scanning a directory for artifacts.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub runs: Vec<ImportedArtifact>,
    pub failures: Vec<ImportFailure>,
    /// Adapters whose artifact file was absent.
    pub skipped: Vec<ProtocolName>,
}

/// Parse every configured adapter's artifact found in `dir`.
///
/// Missing files are skipped. Malformed files are reported and do not stop
/// the rest of the scan.
pub fn import_dir(dir: &Path, registry: &AdapterRegistry) -> ImportReport {
    let mut report = ImportReport::default();

    for adapter in registry.adapters() {
        let path = dir.join(&adapter.output_file);
        if !path.is_file() {
            tracing::debug!(protocol = %adapter.protocol, path = %path.display(), "No artifact, skipping");
            report.skipped.push(adapter.protocol.clone());
            continue;
        }

        match ingest_artifact(&adapter, &path) {
            Ok(run) => {
                tracing::info!(
                    protocol = %adapter.protocol,
                    run_id = %run.run_id(),
                    samples = run.samples().len(),
                    "Parsed legacy artifact"
                );
                report.runs.push(ImportedArtifact { file: path, run });
            }
            Err(e) => {
                tracing::warn!(protocol = %adapter.protocol, path = %path.display(), error = %e, "Skipping artifact");
                report
                    .failures
                    .push(ImportFailure::new(path, adapter.protocol.clone(), &e));
            }
        }
    }

    report
}

/// One imported run as it landed in the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredImport {
    pub run_id: RunId,
    pub protocol: ProtocolName,
    pub samples: usize,
    pub outcome: SaveOutcome,
}

/// Result of importing a directory into the store.
#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub stored: Vec<StoredImport>,
    pub failures: Vec<ImportFailure>,
    pub skipped: Vec<ProtocolName>,
}

impl ImportSummary {
    /// Runs that produced new rows.
    pub fn inserted(&self) -> usize {
        self.stored.iter().filter(|s| s.outcome.is_inserted()).count()
    }
}

/// Scan `dir` and save every parsed run.
///
/// A run id already holding different content is reported per file. Any
/// other storage failure aborts the import.
pub fn import_into_store(
    dir: &Path,
    registry: &AdapterRegistry,
    store: &MetricsStore,
) -> BenchResult<ImportSummary> {
    let report = import_dir(dir, registry);
    let mut summary = ImportSummary {
        failures: report.failures,
        skipped: report.skipped,
        ..Default::default()
    };

    for ImportedArtifact { file, run } in report.runs {
        match store.save(&run) {
            Ok(outcome) => summary.stored.push(StoredImport {
                run_id: run.run_id().clone(),
                protocol: run.protocol().clone(),
                samples: run.samples().len(),
                outcome,
            }),
            Err(e @ BenchError::DuplicateRunId(_)) => {
                summary
                    .failures
                    .push(ImportFailure::new(file, run.protocol().clone(), &e));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(summary)
}
