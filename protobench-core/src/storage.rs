// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Durable run store backed by SQLite.
//!
//! One row per run in `benchmark_runs`, one row per sample in
//! `metric_samples`. Every mutation runs in a single IMMEDIATE transaction,
//! so a run header and its samples are always committed or removed together
//! and two writers targeting the same run id serialize.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;

use crate::error::{BenchError, BenchResult, StorageError};
use crate::model::{format_timestamp, BenchmarkRun, MetricSample, RunSummary, StoreStats};
use crate::stats::BenchmarkStats;
use crate::types::{ProtocolName, RunId};

/// Default page size for listings.
pub const DEFAULT_LIST_LIMIT: usize = 100;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS benchmark_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL UNIQUE,
    protocol TEXT NOT NULL,
    created_at TEXT NOT NULL,
    stats_json TEXT NOT NULL,
    metadata_json TEXT NOT NULL DEFAULT '{}',
    content_digest TEXT NOT NULL,
    recorded_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE TABLE IF NOT EXISTS metric_samples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL REFERENCES benchmark_runs(run_id) ON DELETE CASCADE,
    sequence_index INTEGER NOT NULL,
    request_timestamp TEXT NOT NULL,
    response_timestamp TEXT NOT NULL,
    latency_seconds REAL NOT NULL,
    UNIQUE (run_id, sequence_index)
);
CREATE INDEX IF NOT EXISTS idx_runs_protocol ON benchmark_runs(protocol);
CREATE INDEX IF NOT EXISTS idx_runs_created_at ON benchmark_runs(created_at);
CREATE INDEX IF NOT EXISTS idx_samples_run_id ON metric_samples(run_id);
";

const RUN_COLUMNS: &str = "run_id, protocol, created_at, stats_json, metadata_json";

/// Result of [`MetricsStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    /// New rows were written.
    Inserted,
    /// Identical content was already stored; nothing changed.
    Unchanged,
}

impl SaveOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// Listing filter. Protocol matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct RunFilter {
    pub protocol: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for RunFilter {
    fn default() -> Self {
        Self {
            protocol: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl RunFilter {
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Header columns of a stored run, before validation.
struct RunRow {
    run_id: String,
    protocol: String,
    created_at: String,
    stats_json: String,
    metadata_json: String,
}

impl RunRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            run_id: row.get(0)?,
            protocol: row.get(1)?,
            created_at: row.get(2)?,
            stats_json: row.get(3)?,
            metadata_json: row.get(4)?,
        })
    }

    fn into_summary(self) -> BenchResult<RunSummary> {
        let run_id = RunId::new(self.run_id).map_err(corrupt)?;
        let protocol = ProtocolName::new(self.protocol).map_err(corrupt)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(corrupt)?;
        let stats: BenchmarkStats =
            serde_json::from_str(&self.stats_json).map_err(|source| {
                StorageError::Serialization {
                    column: "stats_json",
                    source,
                }
            })?;
        let metadata: BTreeMap<String, String> = serde_json::from_str(&self.metadata_json)
            .map_err(|source| StorageError::Serialization {
                column: "metadata_json",
                source,
            })?;

        Ok(RunSummary {
            run_id,
            protocol,
            created_at,
            stats,
            metadata,
        })
    }
}

fn corrupt(err: impl std::fmt::Display) -> BenchError {
    StorageError::CorruptRow {
        reason: err.to_string(),
    }
    .into()
}

/// SQLite-backed store for benchmark runs.
pub struct MetricsStore {
    conn: Mutex<Connection>,
}

impl MetricsStore {
    /// Open or create the metrics database.
    pub fn open(path: impl AsRef<Path>) -> BenchResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BenchError::Io {
                context: "creating database directory",
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        // WAL lets dashboard readers in other processes proceed during a write.
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "Opened metrics database");

        Self::init(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> BenchResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> BenchResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> BenchResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    /// Store a run with all of its samples.
    ///
    /// Re-saving identical content is a no-op. A run id that already holds
    /// different content is rejected and the stored run is left untouched.
    pub fn save(&self, run: &BenchmarkRun) -> BenchResult<SaveOutcome> {
        let digest = run.content_digest();
        let stats_json =
            serde_json::to_string(run.stats()).map_err(|source| StorageError::Serialization {
                column: "stats_json",
                source,
            })?;
        let metadata_json = serde_json::to_string(run.metadata()).map_err(|source| {
            StorageError::Serialization {
                column: "metadata_json",
                source,
            }
        })?;

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT content_digest FROM benchmark_runs WHERE run_id = ?1",
                params![run.run_id().as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(stored) if stored == digest => {
                tracing::debug!(run_id = %run.run_id(), "Run already stored with identical content");
                return Ok(SaveOutcome::Unchanged);
            }
            Some(_) => {
                tracing::warn!(run_id = %run.run_id(), "Rejected save: run id holds different content");
                return Err(BenchError::DuplicateRunId(run.run_id().clone()));
            }
            None => {}
        }

        tx.execute(
            "INSERT INTO benchmark_runs (run_id, protocol, created_at, stats_json, metadata_json, content_digest)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.run_id().as_str(),
                run.protocol().as_str(),
                format_timestamp(run.created_at()),
                stats_json,
                metadata_json,
                digest,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO metric_samples (run_id, sequence_index, request_timestamp, response_timestamp, latency_seconds)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for sample in run.samples() {
                stmt.execute(params![
                    run.run_id().as_str(),
                    sample.request_id,
                    sample.request_timestamp,
                    sample.response_timestamp,
                    sample.latency_seconds,
                ])?;
            }
        }

        tx.commit()?;

        tracing::info!(
            run_id = %run.run_id(),
            protocol = %run.protocol(),
            samples = run.samples().len(),
            "Saved benchmark run"
        );
        Ok(SaveOutcome::Inserted)
    }

    /// Fetch one run with all of its samples.
    pub fn get(&self, run_id: &str) -> BenchResult<BenchmarkRun> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM benchmark_runs WHERE run_id = ?1", RUN_COLUMNS),
                params![run_id],
                RunRow::from_row,
            )
            .optional()?
            .ok_or_else(|| BenchError::RunNotFound(run_id.to_string()))?;

        let summary = row.into_summary()?;
        let samples = load_samples(&conn, summary.run_id.as_str())?;
        Ok(assemble(summary, samples))
    }

    /// Run summaries, newest first.
    pub fn list(&self, filter: &RunFilter) -> BenchResult<Vec<RunSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM benchmark_runs
             WHERE ?1 IS NULL OR lower(protocol) = lower(?1)
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
            RUN_COLUMNS
        ))?;

        let rows = stmt
            .query_map(
                params![
                    filter.protocol.as_deref(),
                    filter.limit as i64,
                    filter.offset as i64
                ],
                RunRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RunRow::into_summary).collect()
    }

    /// The most recent run of every stored protocol, keyed by protocol name.
    pub fn latest_per_protocol(&self) -> BenchResult<BTreeMap<String, BenchmarkRun>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM benchmark_runs r
             WHERE NOT EXISTS (
                 SELECT 1 FROM benchmark_runs n
                 WHERE n.protocol = r.protocol
                   AND (n.created_at > r.created_at
                        OR (n.created_at = r.created_at AND n.id > r.id))
             )",
            RUN_COLUMNS
        ))?;

        let rows = stmt
            .query_map([], RunRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut latest = BTreeMap::new();
        for row in rows {
            let summary = row.into_summary()?;
            let samples = load_samples(&conn, summary.run_id.as_str())?;
            latest.insert(summary.protocol.to_string(), assemble(summary, samples));
        }
        Ok(latest)
    }

    /// Remove a run and all of its samples. Returns the number of samples removed.
    pub fn delete(&self, run_id: &str) -> BenchResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let samples = tx.execute("DELETE FROM metric_samples WHERE run_id = ?1", params![run_id])?;
        let runs = tx.execute("DELETE FROM benchmark_runs WHERE run_id = ?1", params![run_id])?;

        if runs == 0 {
            // Dropping the transaction rolls it back.
            return Err(BenchError::RunNotFound(run_id.to_string()));
        }

        tx.commit()?;
        tracing::info!(run_id = %run_id, samples = samples, "Deleted benchmark run");
        Ok(samples)
    }

    /// Aggregate counts across the store.
    pub fn stats(&self) -> BenchResult<StoreStats> {
        let conn = self.conn()?;

        let total_runs: i64 =
            conn.query_row("SELECT COUNT(*) FROM benchmark_runs", [], |row| row.get(0))?;
        let total_samples: i64 =
            conn.query_row("SELECT COUNT(*) FROM metric_samples", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT protocol, COUNT(*) FROM benchmark_runs GROUP BY protocol ORDER BY protocol",
        )?;
        let protocols = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(StoreStats {
            total_runs: total_runs as u64,
            total_samples: total_samples as u64,
            protocols,
        })
    }
}

fn load_samples(conn: &Connection, run_id: &str) -> BenchResult<Vec<MetricSample>> {
    let mut stmt = conn.prepare(
        "SELECT sequence_index, request_timestamp, response_timestamp, latency_seconds
         FROM metric_samples WHERE run_id = ?1 ORDER BY sequence_index",
    )?;

    let rows = stmt
        .query_map(params![run_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(index, request_timestamp, response_timestamp, latency_seconds)| {
            Ok(MetricSample {
                request_id: u32::try_from(index).map_err(corrupt)?,
                request_timestamp,
                response_timestamp,
                latency_seconds,
            })
        })
        .collect()
}

fn assemble(summary: RunSummary, samples: Vec<MetricSample>) -> BenchmarkRun {
    BenchmarkRun::from_parts(
        summary.run_id,
        summary.protocol,
        summary.created_at,
        summary.stats,
        summary.metadata,
        samples,
    )
}
