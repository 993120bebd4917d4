// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark run data model.
//!
//! A [`BenchmarkRun`] owns its samples and the stats derived from them.
//! Runs are only built by ingestion or by loading a stored/exported run, so
//! the stats always describe exactly the samples they travel with.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::stats::BenchmarkStats;
use crate::types::{ProtocolName, RunId};

/// Metadata key holding the number of negative-latency samples.
pub const ANOMALIES_KEY: &str = "anomalies";

/// Metadata keys recording where a run came from. They are not content:
/// the same artifact stored by `run` and later by `import` is one run.
pub const PROVENANCE_KEYS: [&str; 2] = ["source", "artifact"];

/// One request/response timestamp pair and its derived latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Zero-based sequence index in arrival order.
    pub request_id: u32,
    pub request_timestamp: String,
    pub response_timestamp: String,
    pub latency_seconds: f64,
}

impl MetricSample {
    /// Negative latency indicates a clock or parsing defect.
    pub fn is_anomalous(&self) -> bool {
        self.latency_seconds < 0.0
    }
}

/// One complete execution of a protocol's benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    run_id: RunId,
    protocol: ProtocolName,
    #[serde(with = "micros_rfc3339")]
    created_at: DateTime<Utc>,
    stats: BenchmarkStats,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    samples: Vec<MetricSample>,
}

impl BenchmarkRun {
    /// Assemble a run from parts that are already known to agree.
    pub(crate) fn from_parts(
        run_id: RunId,
        protocol: ProtocolName,
        created_at: DateTime<Utc>,
        stats: BenchmarkStats,
        metadata: BTreeMap<String, String>,
        samples: Vec<MetricSample>,
    ) -> Self {
        Self {
            run_id,
            protocol,
            created_at: created_at.trunc_subsecs(6),
            stats,
            metadata,
            samples,
        }
    }

    /// Attach an annotation.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn protocol(&self) -> &ProtocolName {
        &self.protocol
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn stats(&self) -> &BenchmarkStats {
        &self.stats
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Number of samples with negative latency.
    pub fn anomaly_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_anomalous()).count()
    }

    /// Summary view without sample detail.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            protocol: self.protocol.clone(),
            created_at: self.created_at,
            stats: self.stats.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// SHA-256 over everything that defines the run's content.
    ///
    /// Stats are derived from the samples and are left out, as are the
    /// [`PROVENANCE_KEYS`].
    pub fn content_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.protocol.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(format_timestamp(self.created_at).as_bytes());
        hasher.update([0]);
        let content = self
            .metadata
            .iter()
            .filter(|(key, _)| !PROVENANCE_KEYS.contains(&key.as_str()));
        for (key, value) in content {
            hasher.update(key.as_bytes());
            hasher.update([0x1f]);
            hasher.update(value.as_bytes());
            hasher.update([0x1e]);
        }
        hasher.update([0]);
        for sample in &self.samples {
            hasher.update(sample.request_id.to_le_bytes());
            hasher.update(sample.request_timestamp.as_bytes());
            hasher.update([0x1f]);
            hasher.update(sample.response_timestamp.as_bytes());
            hasher.update([0x1f]);
            hasher.update(sample.latency_seconds.to_bits().to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// A run without its samples, as returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub protocol: ProtocolName,
    #[serde(with = "micros_rfc3339")]
    pub created_at: DateTime<Utc>,
    pub stats: BenchmarkStats,
    pub metadata: BTreeMap<String, String>,
}

/// Aggregate counts over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_runs: u64,
    pub total_samples: u64,
    pub protocols: BTreeMap<String, u64>,
}

/// Fixed-width UTC timestamp with microseconds; sorts lexicographically.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) mod micros_rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
