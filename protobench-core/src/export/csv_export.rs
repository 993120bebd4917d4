// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CSV export: one row per sample.

use csv::Writer;

use crate::error::ExportError;
use crate::model::{BenchmarkRun, MetricSample};

const SAMPLE_HEADERS: [&str; 4] = [
    "request_id",
    "request_timestamp",
    "response_timestamp",
    "latency_seconds",
];

fn sample_fields(sample: &MetricSample) -> [String; 4] {
    [
        sample.request_id.to_string(),
        sample.request_timestamp.clone(),
        sample.response_timestamp.clone(),
        sample.latency_seconds.to_string(),
    ]
}

fn finish(wtr: Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    wtr.into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))
}

/// Samples of a single run.
pub fn single(run: &BenchmarkRun) -> Result<Vec<u8>, ExportError> {
    let mut wtr = Writer::from_writer(Vec::new());
    wtr.write_record(SAMPLE_HEADERS)?;

    for sample in run.samples() {
        wtr.write_record(sample_fields(sample))?;
    }

    finish(wtr)
}

/// Samples of several runs, each row prefixed with its protocol and run id.
pub fn multiple(runs: &[BenchmarkRun]) -> Result<Vec<u8>, ExportError> {
    let mut wtr = Writer::from_writer(Vec::new());

    let mut headers = vec!["protocol", "run_id"];
    headers.extend(SAMPLE_HEADERS);
    wtr.write_record(&headers)?;

    for run in runs {
        for sample in run.samples() {
            let [id, req, resp, latency] = sample_fields(sample);
            wtr.write_record([
                run.protocol().as_str(),
                run.run_id().as_str(),
                id.as_str(),
                req.as_str(),
                resp.as_str(),
                latency.as_str(),
            ])?;
        }
    }

    finish(wtr)
}
