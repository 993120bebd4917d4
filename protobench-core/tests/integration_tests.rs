// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end integration tests for protobench.
//!
//! These tests cover the path from artifact files on disk through the store
//! and back out through the exporters.

use std::path::Path;

use protobench_core::export::{self, json_export};
use protobench_core::legacy::{import_dir, import_into_store};
use protobench_core::{
    AdapterRegistry, BenchError, ConfigLoader, ExportFormat, MetricsStore, RunFilter, SaveOutcome,
};
use tempfile::TempDir;

const REST_ARTIFACT: &str = r#"[
  {"request_timestamp": "2025-01-05T12:00:00.000Z", "response_timestamp": "2025-01-05T12:00:00.010Z"},
  {"request_timestamp": "2025-01-05T12:00:00.000Z", "response_timestamp": "2025-01-05T12:00:00.020Z"},
  {"request_timestamp": "2025-01-05T12:00:00.000Z", "response_timestamp": "2025-01-05T12:00:00.030Z"}
]"#;

const SIO_ARTIFACT: &str = r#"{
  "request_ts": "2025-01-05T13:00:00.000Z",
  "respond_ts": ["2025-01-05T13:00:00.001Z", "2025-01-05T13:00:00.002Z"]
}"#;

fn builtin_registry() -> AdapterRegistry {
    let config = ConfigLoader::builtin().expect("built-in config is valid");
    AdapterRegistry::from_config(&config).expect("built-in adapters register")
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).expect("Failed to write artifact");
}

#[test]
fn test_import_store_and_query() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "rest_out.txt", REST_ARTIFACT);
    write(dir.path(), "sio_out.txt", SIO_ARTIFACT);

    let registry = builtin_registry();
    let store = MetricsStore::open(dir.path().join("db/metrics.db")).unwrap();

    let summary = import_into_store(dir.path(), &registry, &store).unwrap();
    assert_eq!(summary.inserted(), 2);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.skipped.len(), registry.len() - 2);

    let rest = store
        .list(&RunFilter::default().protocol("rest"))
        .unwrap();
    assert_eq!(rest.len(), 1);
    let run = store.get(rest[0].run_id.as_str()).unwrap();
    assert_eq!(run.samples().len(), 3);
    assert!((run.stats().mean - 0.020).abs() < 1e-9);
    assert!((run.stats().p95 - 0.030).abs() < 1e-9);
    assert_eq!(run.metadata().get("source").map(String::as_str), Some("legacy_import"));

    let sio = store
        .list(&RunFilter::default().protocol("Socket.IO"))
        .unwrap();
    assert_eq!(sio[0].stats.count, 2);

    let stats = store.stats().unwrap();
    assert_eq!(stats.total_runs, 2);
    assert_eq!(stats.total_samples, 5);
}

#[test]
fn test_reimport_is_idempotent() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "rest_out.txt", REST_ARTIFACT);

    let registry = builtin_registry();
    let store = MetricsStore::in_memory().unwrap();

    let first = import_into_store(dir.path(), &registry, &store).unwrap();
    let second = import_into_store(dir.path(), &registry, &store).unwrap();

    assert_eq!(first.inserted(), 1);
    assert_eq!(second.inserted(), 0);
    assert_eq!(second.stored[0].outcome, SaveOutcome::Unchanged);
    assert_eq!(first.stored[0].run_id, second.stored[0].run_id);
    assert_eq!(store.stats().unwrap().total_samples, 3);
}

#[test]
fn test_malformed_artifact_does_not_stop_scan() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "rest_out.txt", REST_ARTIFACT);
    write(dir.path(), "grpc_out.txt", "this is not json");
    write(dir.path(), "cbor_out.txt", "[]");

    let report = import_dir(dir.path(), &builtin_registry());

    assert_eq!(report.runs.len(), 1);
    assert_eq!(report.failures.len(), 2);
    let kinds: Vec<_> = report.failures.iter().map(|f| f.kind).collect();
    assert!(kinds.contains(&"malformed_artifact"));
    assert!(kinds.contains(&"empty_dataset"));
}

#[test]
fn test_json_export_round_trip_through_store() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "rest_out.txt", REST_ARTIFACT);

    let registry = builtin_registry();
    let source = MetricsStore::in_memory().unwrap();
    let summary = import_into_store(dir.path(), &registry, &source).unwrap();
    let run_id = summary.stored[0].run_id.clone();

    let original = source.get(run_id.as_str()).unwrap();
    let bytes = export::export_run(&original, ExportFormat::Json).unwrap();
    let restored = json_export::read_run(&bytes).unwrap();

    let target = MetricsStore::in_memory().unwrap();
    assert_eq!(target.save(&restored).unwrap(), SaveOutcome::Inserted);
    let reloaded = target.get(run_id.as_str()).unwrap();

    assert_eq!(reloaded.stats(), original.stats());
    assert_eq!(reloaded.samples(), original.samples());
    assert_eq!(reloaded.content_digest(), original.content_digest());
}

#[test]
fn test_delete_is_atomic_and_reported() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "rest_out.txt", REST_ARTIFACT);
    write(dir.path(), "sio_out.txt", SIO_ARTIFACT);

    let registry = builtin_registry();
    let store = MetricsStore::in_memory().unwrap();
    let summary = import_into_store(dir.path(), &registry, &store).unwrap();
    let rest_id = summary
        .stored
        .iter()
        .find(|s| s.protocol.as_str() == "REST")
        .map(|s| s.run_id.clone())
        .unwrap();

    assert_eq!(store.delete(rest_id.as_str()).unwrap(), 3);
    assert!(matches!(
        store.get(rest_id.as_str()),
        Err(BenchError::RunNotFound(_))
    ));
    assert!(store.delete(rest_id.as_str()).unwrap_err().is_not_found());

    let stats = store.stats().unwrap();
    assert_eq!(stats.total_runs, 1);
    assert_eq!(stats.total_samples, 2);
}

#[test]
fn test_export_all_formats() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "rest_out.txt", REST_ARTIFACT);
    write(dir.path(), "sio_out.txt", SIO_ARTIFACT);

    let registry = builtin_registry();
    let store = MetricsStore::in_memory().unwrap();
    import_into_store(dir.path(), &registry, &store).unwrap();

    let runs: Vec<_> = store
        .latest_per_protocol()
        .unwrap()
        .into_values()
        .collect();
    assert_eq!(runs.len(), 2);

    for format in ExportFormat::ALL {
        let bytes = export::export_all(&runs, format).unwrap();
        assert!(!bytes.is_empty(), "{} export is empty", format);
    }

    let csv = String::from_utf8(export::export_all(&runs, ExportFormat::Csv).unwrap()).unwrap();
    // header plus five samples
    assert_eq!(csv.lines().count(), 6);

    assert!(matches!(
        export::export_all(&[], ExportFormat::Json),
        Err(BenchError::Export(_))
    ));
}
