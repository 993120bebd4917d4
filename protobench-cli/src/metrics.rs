// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
};
use protobench_core::StoreStats;

lazy_static! {
    pub static ref BENCHMARK_RUNS: IntCounterVec = register_int_counter_vec!(
        "protobench_benchmark_runs_total",
        "Orchestrated benchmark runs by outcome",
        &["protocol", "outcome"]
    )
    .unwrap();
    pub static ref BENCHMARK_DURATION: HistogramVec = register_histogram_vec!(
        "protobench_benchmark_duration_seconds",
        "Wall time of one orchestrated benchmark, launch to teardown",
        &["protocol"],
        vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]
    )
    .unwrap();
    pub static ref LEGACY_IMPORTS: IntCounterVec = register_int_counter_vec!(
        "protobench_legacy_imports_total",
        "Artifacts processed by dashboard imports",
        &["outcome"]
    )
    .unwrap();
    pub static ref RUN_DELETIONS: IntCounter = register_int_counter!(
        "protobench_run_deletions_total",
        "Runs deleted through the dashboard"
    )
    .unwrap();
    pub static ref EXPORTS: IntCounterVec = register_int_counter_vec!(
        "protobench_exports_total",
        "Runs exported through the dashboard",
        &["format"]
    )
    .unwrap();
    pub static ref STORED_RUNS: IntGaugeVec = register_int_gauge_vec!(
        "protobench_stored_runs",
        "Runs currently stored",
        &["protocol"]
    )
    .unwrap();
}

pub fn record_benchmark(protocol: &str, elapsed: Duration, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    BENCHMARK_RUNS.with_label_values(&[protocol, outcome]).inc();
    BENCHMARK_DURATION
        .with_label_values(&[protocol])
        .observe(elapsed.as_secs_f64());
}

pub fn record_import(inserted: usize, unchanged: usize, failed: usize) {
    LEGACY_IMPORTS
        .with_label_values(&["inserted"])
        .inc_by(inserted as u64);
    LEGACY_IMPORTS
        .with_label_values(&["unchanged"])
        .inc_by(unchanged as u64);
    LEGACY_IMPORTS
        .with_label_values(&["failed"])
        .inc_by(failed as u64);
}

/// Replace the per-protocol gauge with the store's current counts.
pub fn record_store(stats: &StoreStats) {
    STORED_RUNS.reset();
    for (protocol, runs) in &stats.protocols {
        STORED_RUNS
            .with_label_values(&[protocol.as_str()])
            .set(*runs as i64);
    }
}

/// Prometheus text exposition of every registered metric.
pub fn render() -> String {
    use prometheus::Encoder;

    // Force registration so an idle process still reports every family.
    lazy_static::initialize(&BENCHMARK_RUNS);
    lazy_static::initialize(&BENCHMARK_DURATION);
    lazy_static::initialize(&LEGACY_IMPORTS);
    lazy_static::initialize(&RUN_DELETIONS);
    lazy_static::initialize(&EXPORTS);
    lazy_static::initialize(&STORED_RUNS);

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }

    String::from_utf8(buffer).unwrap_or_else(|_| String::from("Encoding error"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_series() {
        record_benchmark("REST", Duration::from_secs(3), true);
        RUN_DELETIONS.inc();

        let text = render();
        assert!(text.contains("protobench_benchmark_runs_total"));
        assert!(text.contains("protobench_run_deletions_total"));
    }
}
