// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Excel workbook export.
//!
//! One `Summary` sheet comparing every included run, then one sheet of raw
//! samples per run.

use std::collections::HashSet;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use super::comparison;
use crate::error::ExportError;
use crate::model::{format_timestamp, BenchmarkRun};

const SUMMARY_SHEET: &str = "Summary";
const MAX_SHEET_NAME: usize = 31;
const FORBIDDEN: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// A valid, unique worksheet name for `base`.
///
/// Excel compares names case-insensitively, so `taken` holds lowercase names.
fn sheet_name(base: &str, taken: &mut HashSet<String>) -> String {
    let cleaned: String = base
        .chars()
        .filter(|c| !FORBIDDEN.contains(c))
        .collect::<String>()
        .trim_matches('\'')
        .to_string();
    let cleaned = if cleaned.is_empty() {
        "run".to_string()
    } else {
        cleaned
    };

    let mut suffix = 1;
    loop {
        let tail = if suffix == 1 {
            String::new()
        } else {
            format!("_{}", suffix)
        };
        let keep = MAX_SHEET_NAME - tail.chars().count();
        let candidate: String = cleaned.chars().take(keep).chain(tail.chars()).collect();
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
        suffix += 1;
    }
}

fn write_summary(sheet: &mut Worksheet, runs: &[BenchmarkRun]) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    let ms = Format::new().set_num_format("0.000");

    let headers = [
        "Protocol",
        "Run ID",
        "Created At",
        "Samples",
        "Mean (ms)",
        "Median (ms)",
        "Std Dev (ms)",
        "Min (ms)",
        "Max (ms)",
        "P50 (ms)",
        "P95 (ms)",
        "P99 (ms)",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_with_format(0, col as u16, *header, &bold)?;
    }

    for (idx, row) in comparison(runs).iter().enumerate() {
        let r = (idx + 1) as u32;
        sheet.write(r, 0, row.protocol.as_str())?;
        sheet.write(r, 1, row.run_id.as_str())?;
        sheet.write(r, 2, format_timestamp(row.created_at).as_str())?;
        sheet.write(r, 3, row.count as f64)?;
        for (offset, value) in [
            row.mean, row.median, row.std_dev, row.min, row.max, row.p50, row.p95, row.p99,
        ]
        .into_iter()
        .enumerate()
        {
            sheet.write_with_format(r, 4 + offset as u16, value * 1000.0, &ms)?;
        }
    }

    sheet.set_column_width(0, 14)?;
    sheet.set_column_width(1, 32)?;
    sheet.set_column_width(2, 30)?;
    for col in 3..headers.len() as u16 {
        sheet.set_column_width(col, 13)?;
    }
    Ok(())
}

fn write_samples(sheet: &mut Worksheet, run: &BenchmarkRun) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    let seconds = Format::new().set_num_format("0.000000");
    let ms = Format::new().set_num_format("0.000");

    let headers = [
        "Request ID",
        "Request Timestamp",
        "Response Timestamp",
        "Latency (s)",
        "Latency (ms)",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_with_format(0, col as u16, *header, &bold)?;
    }

    for (idx, sample) in run.samples().iter().enumerate() {
        let r = (idx + 1) as u32;
        sheet.write(r, 0, sample.request_id as f64)?;
        sheet.write(r, 1, sample.request_timestamp.as_str())?;
        sheet.write(r, 2, sample.response_timestamp.as_str())?;
        sheet.write_with_format(r, 3, sample.latency_seconds, &seconds)?;
        sheet.write_with_format(r, 4, sample.latency_seconds * 1000.0, &ms)?;
    }

    sheet.set_column_width(0, 12)?;
    sheet.set_column_width(1, 30)?;
    sheet.set_column_width(2, 30)?;
    sheet.set_column_width(3, 14)?;
    sheet.set_column_width(4, 14)?;
    Ok(())
}

/// Build the workbook in memory.
pub fn build(runs: &[BenchmarkRun]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let mut taken = HashSet::from([SUMMARY_SHEET.to_lowercase()]);

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    write_summary(summary, runs)?;

    for run in runs {
        let name = sheet_name(&format!("{}_metrics", run.protocol()), &mut taken);
        let sheet = workbook.add_worksheet();
        sheet.set_name(&name)?;
        write_samples(sheet, run)?;
    }

    Ok(workbook.save_to_buffer()?)
}
