// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! JSON export and re-import.
//!
//! The document is the serialized [`BenchmarkRun`], so reading it back gives
//! the same run id, protocol, samples and stats.

use serde_json::Value;

use crate::error::{BenchResult, ExportError};
use crate::model::BenchmarkRun;
use crate::types::TimestampPair;

/// Tolerance when checking a stored latency against its timestamps.
const LATENCY_TOLERANCE: f64 = 1e-9;

pub fn single(run: &BenchmarkRun) -> Result<Vec<u8>, ExportError> {
    Ok(serde_json::to_vec_pretty(run)?)
}

pub fn multiple(runs: &[BenchmarkRun]) -> Result<Vec<u8>, ExportError> {
    Ok(serde_json::to_vec_pretty(runs)?)
}

fn invalid(reason: impl Into<String>) -> ExportError {
    ExportError::InvalidDocument {
        reason: reason.into(),
    }
}

/// Check that a decoded run is internally consistent and normalize it.
fn verify(run: BenchmarkRun) -> Result<BenchmarkRun, ExportError> {
    if run.samples().is_empty() {
        return Err(invalid(format!("run {} has no samples", run.run_id())));
    }

    if run.stats().count != run.samples().len() {
        return Err(invalid(format!(
            "run {} declares {} samples but contains {}",
            run.run_id(),
            run.stats().count,
            run.samples().len()
        )));
    }

    for (index, sample) in run.samples().iter().enumerate() {
        if sample.request_id as usize != index {
            return Err(invalid(format!(
                "sample at position {} has request_id {}",
                index, sample.request_id
            )));
        }

        let expected = TimestampPair::parse(&sample.request_timestamp, &sample.response_timestamp)
            .and_then(|pair| pair.latency_seconds())
            .map_err(|e| invalid(format!("sample {}: {}", index, e)))?;
        if (expected - sample.latency_seconds).abs() > LATENCY_TOLERANCE {
            return Err(invalid(format!(
                "sample {} latency {} does not match its timestamps ({})",
                index, sample.latency_seconds, expected
            )));
        }
    }

    Ok(BenchmarkRun::from_parts(
        run.run_id().clone(),
        run.protocol().clone(),
        run.created_at(),
        run.stats().clone(),
        run.metadata().clone(),
        run.samples().to_vec(),
    ))
}

/// Read a single-run document.
pub fn read_run(bytes: &[u8]) -> BenchResult<BenchmarkRun> {
    let run: BenchmarkRun =
        serde_json::from_slice(bytes).map_err(|e| invalid(format!("not a run document: {}", e)))?;
    Ok(verify(run)?)
}

/// Read either a single-run or a multi-run document.
pub fn read_runs(bytes: &[u8]) -> BenchResult<Vec<BenchmarkRun>> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| invalid(format!("invalid JSON: {}", e)))?;

    let runs: Vec<BenchmarkRun> = if document.is_array() {
        serde_json::from_value::<Vec<BenchmarkRun>>(document)
    } else {
        serde_json::from_value::<BenchmarkRun>(document).map(|run| vec![run])
    }
    .map_err(|e| invalid(format!("not a run document: {}", e)))?;

    Ok(runs
        .into_iter()
        .map(verify)
        .collect::<Result<Vec<_>, _>>()?)
}
