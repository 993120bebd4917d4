// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Statistics engine.
//!
//! Turns an ordered sequence of request/response timestamp pairs into a
//! [`BenchmarkRun`] with a latency distribution summary. Percentiles use the
//! nearest-rank method on the sorted latencies; there is no interpolation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};
use crate::model::{BenchmarkRun, MetricSample, ANOMALIES_KEY};
use crate::types::{ProtocolName, RunId, TimestampPair};

/// Latency distribution summary, all values in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl BenchmarkStats {
    /// Calculate the summary from latencies in arrival order.
    ///
    /// Fails with `EmptyDataset` rather than returning zero-valued stats.
    pub fn from_latencies(protocol: &str, latencies: &[f64]) -> BenchResult<Self> {
        if latencies.is_empty() {
            return Err(BenchError::EmptyDataset {
                protocol: protocol.to_string(),
            });
        }

        let mut sorted = latencies.to_vec();
        sorted.sort_by(f64::total_cmp);
        let len = sorted.len();

        let mean = sorted.iter().sum::<f64>() / len as f64;
        let median = if len % 2 == 1 {
            sorted[len / 2]
        } else {
            (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
        };

        let variance = sorted
            .iter()
            .map(|&x| {
                let diff = x - mean;
                diff * diff
            })
            .sum::<f64>()
            / len as f64;

        Ok(Self {
            count: len,
            mean,
            median,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[len - 1],
            p50: nearest_rank(&sorted, 50),
            p95: nearest_rank(&sorted, 95),
            p99: nearest_rank(&sorted, 99),
        })
    }

    /// Format a latency in seconds in human-readable form.
    pub fn format_latency(seconds: f64) -> String {
        let abs = seconds.abs();
        if abs < 1e-3 {
            format!("{:.2}μs", seconds * 1e6)
        } else if abs < 1.0 {
            format!("{:.3}ms", seconds * 1e3)
        } else {
            format!("{:.3}s", seconds)
        }
    }
}

/// Element at rank `ceil(percent/100 × N)`, 1-indexed and clamped to `[1, N]`.
///
/// `sorted` must be non-empty and ascending.
fn nearest_rank(sorted: &[f64], percent: usize) -> f64 {
    let n = sorted.len();
    let rank = (percent * n).div_ceil(100).clamp(1, n);
    sorted[rank - 1]
}

/// Build a run from timestamp pairs in arrival order.
///
/// Sequence indices follow input order, never timestamp order. Negative
/// latencies are kept and counted in the `anomalies` annotation. When no
/// `run_id` is supplied it is derived from the protocol and the first
/// request timestamp, so identical input always yields the same identifier.
pub fn ingest(
    pairs: Vec<TimestampPair>,
    protocol: &ProtocolName,
    run_id: Option<RunId>,
) -> BenchResult<BenchmarkRun> {
    let created_at = match pairs.first() {
        Some(first) => first.request(),
        None => {
            return Err(BenchError::EmptyDataset {
                protocol: protocol.to_string(),
            })
        }
    };

    let mut samples = Vec::with_capacity(pairs.len());
    for (index, pair) in pairs.iter().enumerate() {
        let latency_seconds = pair
            .latency_seconds()
            .map_err(|reason| BenchError::MalformedArtifact {
                path: format!("<{} sample {}>", protocol, index).into(),
                reason,
            })?;
        samples.push(MetricSample {
            request_id: index as u32,
            request_timestamp: pair.request_text().to_string(),
            response_timestamp: pair.response_text().to_string(),
            latency_seconds,
        });
    }

    let latencies: Vec<f64> = samples.iter().map(|s| s.latency_seconds).collect();
    let stats = BenchmarkStats::from_latencies(protocol.as_str(), &latencies)?;

    let mut metadata = BTreeMap::new();
    let anomalies = samples.iter().filter(|s| s.is_anomalous()).count();
    if anomalies > 0 {
        tracing::warn!(
            protocol = %protocol,
            anomalies = anomalies,
            "Negative latencies recorded; check clock sync or timestamp parsing"
        );
        metadata.insert(ANOMALIES_KEY.to_string(), anomalies.to_string());
    }

    let run_id = run_id.unwrap_or_else(|| RunId::derive(protocol, created_at));

    tracing::debug!(
        protocol = %protocol,
        run_id = %run_id,
        samples = samples.len(),
        mean_s = stats.mean,
        "Ingested benchmark run"
    );

    Ok(BenchmarkRun::from_parts(
        run_id,
        protocol.clone(),
        created_at,
        stats,
        metadata,
        samples,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| v / 1000.0).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_percentiles_nearest_rank() {
        let latencies = ms(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let stats = BenchmarkStats::from_latencies("X", &latencies).unwrap();

        assert_eq!(stats.count, 10);
        assert!(close(stats.p50, 0.005));
        assert!(close(stats.p95, 0.010));
        assert!(close(stats.p99, 0.010));
        assert!(close(stats.mean, 0.0055));
        assert!(close(stats.median, 0.0055));
        assert!(close(stats.min, 0.001));
        assert!(close(stats.max, 0.010));
    }

    #[test]
    fn test_rank_uses_integer_arithmetic() {
        // 0.95 * 20 is 19.000000000000004 in floating point; the rank must be 19.
        let latencies: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        let stats = BenchmarkStats::from_latencies("X", &latencies).unwrap();
        assert_eq!(stats.p95, 19.0);
        assert_eq!(stats.p99, 20.0);
        assert_eq!(stats.p50, 10.0);
    }

    #[test]
    fn test_single_sample() {
        let stats = BenchmarkStats::from_latencies("X", &[0.25]).unwrap();
        assert_eq!(stats.p50, 0.25);
        assert_eq!(stats.p99, 0.25);
        assert_eq!(stats.median, 0.25);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_population_std_dev() {
        let stats = BenchmarkStats::from_latencies("X", &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])
            .unwrap();
        assert!(close(stats.std_dev, 2.0));
        assert!(close(stats.median, 4.5));
    }

    #[test]
    fn test_empty_dataset() {
        let err = BenchmarkStats::from_latencies("X", &[]).unwrap_err();
        assert!(matches!(err, BenchError::EmptyDataset { .. }));

        let err = ingest(Vec::new(), &ProtocolName::new("X").unwrap(), None).unwrap_err();
        assert!(matches!(err, BenchError::EmptyDataset { .. }));
    }

    #[test]
    fn test_end_to_end_ingest() {
        let pairs = vec![
            TimestampPair::parse("2025-01-05T12:00:00.000Z", "2025-01-05T12:00:00.003Z").unwrap(),
            TimestampPair::parse("2025-01-05T12:00:01.000Z", "2025-01-05T12:00:01.005Z").unwrap(),
        ];
        let run = ingest(pairs, &ProtocolName::new("X").unwrap(), None).unwrap();

        let latencies: Vec<f64> = run.samples().iter().map(|s| s.latency_seconds).collect();
        assert_eq!(latencies, vec![0.003, 0.005]);
        assert_eq!(run.stats().count, 2);
        assert!(close(run.stats().mean, 0.004));
        assert!(close(run.stats().min, 0.003));
        assert!(close(run.stats().max, 0.005));
        assert_eq!(run.run_id().as_str(), "x_20250105_120000_000000");
        assert!(run.metadata().is_empty());
    }

    #[test]
    fn test_input_order_preserved() {
        let pairs = vec![
            TimestampPair::parse("2025-01-05T12:00:02.000Z", "2025-01-05T12:00:02.001Z").unwrap(),
            TimestampPair::parse("2025-01-05T12:00:00.000Z", "2025-01-05T12:00:00.009Z").unwrap(),
        ];
        let run = ingest(pairs, &ProtocolName::new("X").unwrap(), None).unwrap();
        assert_eq!(run.samples()[0].request_id, 0);
        assert_eq!(run.samples()[0].request_timestamp, "2025-01-05T12:00:02.000Z");
        assert_eq!(run.samples()[1].request_id, 1);
    }

    #[test]
    fn test_negative_latency_flagged() {
        let pairs = vec![
            TimestampPair::parse("2025-01-05T12:00:00.000Z", "2025-01-05T12:00:00.002Z").unwrap(),
            TimestampPair::parse("2025-01-05T12:00:01.005Z", "2025-01-05T12:00:01.000Z").unwrap(),
        ];
        let run = ingest(pairs, &ProtocolName::new("X").unwrap(), None).unwrap();

        assert_eq!(run.stats().count, 2);
        assert_eq!(run.anomaly_count(), 1);
        assert_eq!(run.metadata().get(ANOMALIES_KEY).map(String::as_str), Some("1"));
        assert!(run.samples()[1].latency_seconds < 0.0);
        assert!(close(run.stats().min, -0.005));
    }

    #[test]
    fn test_explicit_run_id() {
        let pairs = vec![
            TimestampPair::parse("2025-01-05T12:00:00.000Z", "2025-01-05T12:00:00.002Z").unwrap(),
        ];
        let id = RunId::new("custom-run").unwrap();
        let run = ingest(pairs, &ProtocolName::new("X").unwrap(), Some(id.clone())).unwrap();
        assert_eq!(run.run_id(), &id);
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(BenchmarkStats::format_latency(0.0000015), "1.50μs");
        assert_eq!(BenchmarkStats::format_latency(0.0015), "1.500ms");
        assert_eq!(BenchmarkStats::format_latency(1.5), "1.500s");
    }
}
