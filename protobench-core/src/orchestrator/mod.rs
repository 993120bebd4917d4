// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Benchmark orchestration.
//!
//! For each adapter: start the responder, wait for its port, start the
//! requester, wait for its port, hit the trigger endpoint, persist the
//! artifact, then tear both processes down. Runs are strictly sequential
//! because the reference pairs reuse the same ports.

mod process;

pub use process::{ServiceProcess, ServiceSet};

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::{AdapterConfig, OrchestratorConfig};
use crate::error::OrchestratorError;
use crate::types::ProtocolName;

/// Result of one adapter's run inside a batch.
#[derive(Debug)]
pub struct BenchmarkOutcome {
    pub protocol: ProtocolName,
    /// Wall time from first spawn to teardown complete.
    pub elapsed: Duration,
    /// Path of the produced artifact.
    pub result: Result<PathBuf, OrchestratorError>,
}

impl BenchmarkOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of a batch, in execution order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<BenchmarkOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> impl Iterator<Item = &BenchmarkOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BenchmarkOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(BenchmarkOutcome::is_success)
    }
}

/// Drives service pairs through a benchmark.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one adapter's benchmark and return the artifact path.
    ///
    /// Every process started for the run is terminated before this returns,
    /// whether the run succeeded or not.
    pub async fn run_benchmark(&self, adapter: &AdapterConfig) -> Result<PathBuf, OrchestratorError> {
        let mut services = ServiceSet::new(self.config.shutdown_grace());
        let result = self.execute(adapter, &mut services).await;
        services.shutdown().await;
        result
    }

    async fn execute(
        &self,
        adapter: &AdapterConfig,
        services: &mut ServiceSet,
    ) -> Result<PathBuf, OrchestratorError> {
        let ready = self.config.readiness_timeout();
        let poll = self.config.poll_interval();

        services
            .start(&adapter.protocol, "responder", &adapter.responder)?
            .wait_ready(ready, poll)
            .await?;
        services
            .start(&adapter.protocol, "requester", &adapter.requester)?
            .wait_ready(ready, poll)
            .await?;

        let start = Instant::now();
        let body = self.trigger(adapter).await?;
        tracing::info!(
            protocol = %adapter.protocol,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Benchmark trigger completed"
        );

        let path = self.config.output_dir.join(&adapter.output_file);
        if adapter.artifact_from_response {
            let write_err = |source| OrchestratorError::ArtifactWrite {
                path: path.clone(),
                source,
            };
            tokio::fs::create_dir_all(&self.config.output_dir)
                .await
                .map_err(write_err)?;
            tokio::fs::write(&path, &body).await.map_err(write_err)?;
        } else if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(OrchestratorError::ArtifactMissing { path });
        }

        Ok(path)
    }

    /// GET the requester's trigger path and return the response body.
    async fn trigger(&self, adapter: &AdapterConfig) -> Result<Vec<u8>, OrchestratorError> {
        let timeout = self.config.trigger_timeout();
        let url = format!(
            "http://127.0.0.1:{}{}",
            adapter.requester.port, adapter.trigger_path
        );

        let failed = |e: reqwest::Error| {
            if e.is_timeout() {
                OrchestratorError::TriggerTimeout {
                    protocol: adapter.protocol.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                }
            } else {
                OrchestratorError::TriggerFailed {
                    protocol: adapter.protocol.clone(),
                    reason: e.to_string(),
                }
            }
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(failed)?;

        tracing::debug!(protocol = %adapter.protocol, url = %url, "Triggering benchmark");
        let response = client.get(&url).send().await.map_err(failed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrchestratorError::TriggerFailed {
                protocol: adapter.protocol.clone(),
                reason: format!("HTTP {}", status),
            });
        }

        let body = response.bytes().await.map_err(failed)?;
        Ok(body.to_vec())
    }

    /// Run adapters one after another.
    ///
    /// A failed run is recorded and the batch moves on to the next adapter.
    pub async fn run_batch(&self, adapters: &[AdapterConfig]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for adapter in adapters {
            tracing::info!(protocol = %adapter.protocol, "Starting benchmark");
            let start = Instant::now();
            let result = self.run_benchmark(adapter).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(path) => tracing::info!(
                    protocol = %adapter.protocol,
                    artifact = %path.display(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Benchmark finished"
                ),
                Err(e) => tracing::error!(
                    protocol = %adapter.protocol,
                    error = %e,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Benchmark failed"
                ),
            }

            summary.outcomes.push(BenchmarkOutcome {
                protocol: adapter.protocol.clone(),
                elapsed,
                result,
            });
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::types::Port;
    use std::collections::HashMap;

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    fn service(command: &[&str], port: u16) -> ServiceConfig {
        ServiceConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            working_dir: None,
            port: Port::new(port).unwrap(),
            environment: HashMap::new(),
        }
    }

    fn adapter(protocol: &str, responder: ServiceConfig, requester: ServiceConfig) -> AdapterConfig {
        AdapterConfig {
            protocol: ProtocolName::new(protocol).unwrap(),
            responder,
            requester,
            trigger_path: "/run".to_string(),
            output_file: format!("{}_out.txt", protocol.to_lowercase()),
            request_field: "request_timestamp".to_string(),
            response_field: "response_timestamp".to_string(),
            multi_response: false,
            artifact_from_response: true,
        }
    }

    fn orchestrator(output_dir: &std::path::Path) -> Orchestrator {
        Orchestrator::new(OrchestratorConfig {
            readiness_timeout_ms: 500,
            poll_interval_ms: 25,
            trigger_timeout_ms: 5_000,
            shutdown_grace_ms: 2_000,
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Serve `body` on GET /run from an ephemeral port.
    async fn spawn_trigger_server(body: &'static str) -> u16 {
        let app = axum::Router::new().route("/run", axum::routing::get(move || async move { body }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        port
    }

    #[tokio::test]
    async fn test_readiness_timeout_and_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());

        let never_ready = adapter(
            "X",
            service(&["sleep", "30"], free_port()),
            service(&["sleep", "30"], free_port()),
        );
        let bad_command = adapter(
            "Y",
            service(&["/nonexistent/protobench-responder"], free_port()),
            service(&["sleep", "30"], free_port()),
        );

        let start = Instant::now();
        let summary = orch.run_batch(&[never_ready, bad_command]).await;
        // 500ms readiness window plus teardown of one sleeping process.
        assert!(start.elapsed() < Duration::from_secs(5));

        assert_eq!(summary.outcomes.len(), 2);
        assert!(!summary.all_succeeded());
        assert!(matches!(
            summary.outcomes[0].result,
            Err(OrchestratorError::ReadyTimeout { service: "responder", .. })
        ));
        assert!(matches!(
            summary.outcomes[1].result,
            Err(OrchestratorError::SpawnFailed { .. })
        ));
        assert_eq!(summary.failed().count(), 2);
    }

    #[tokio::test]
    async fn test_successful_run_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());

        let body = r#"[{"request_timestamp":"2025-01-05T12:00:00.000Z","response_timestamp":"2025-01-05T12:00:00.004Z"}]"#;
        let requester_port = spawn_trigger_server(body).await;
        let responder = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let responder_port = responder.local_addr().unwrap().port();

        let rest = adapter(
            "REST",
            service(&["sleep", "30"], responder_port),
            service(&["sleep", "30"], requester_port),
        );

        let summary = orch.run_batch(std::slice::from_ref(&rest)).await;
        assert!(summary.all_succeeded());
        assert_eq!(summary.succeeded().count(), 1);

        let path = summary.outcomes[0].result.as_ref().unwrap();
        assert_eq!(path, &dir.path().join("rest_out.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), body);
    }

    #[tokio::test]
    async fn test_missing_artifact_reported() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());

        let requester_port = spawn_trigger_server("ok").await;
        let responder = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let responder_port = responder.local_addr().unwrap().port();

        let mut rest = adapter(
            "REST",
            service(&["sleep", "30"], responder_port),
            service(&["sleep", "30"], requester_port),
        );
        rest.artifact_from_response = false;

        let err = orch.run_benchmark(&rest).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::ArtifactMissing { .. }));
    }

    #[tokio::test]
    async fn test_trigger_http_error_reported() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());

        let requester_port = spawn_trigger_server("ok").await;
        let responder = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let responder_port = responder.local_addr().unwrap().port();

        let mut rest = adapter(
            "REST",
            service(&["sleep", "30"], responder_port),
            service(&["sleep", "30"], requester_port),
        );
        rest.trigger_path = "/missing".to_string();

        let err = orch.run_benchmark(&rest).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::TriggerFailed { .. }));
    }
}
