// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Validates orchestrator settings and protocol adapters at boot-up time.
//! Any invalid field results in a HardValidationError that prevents startup.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult, HardValidationError};
use crate::types::{Port, ProtocolName};

/// Default configuration file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "protobench.yaml";

/// Raw service definition as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawServiceConfig {
    command: Vec<String>,
    #[serde(default)]
    working_dir: Option<String>,
    port: u16,
    #[serde(default)]
    environment: HashMap<String, String>,
}

/// Raw adapter definition.
#[derive(Debug, Deserialize)]
struct RawAdapterConfig {
    protocol: String,
    responder: RawServiceConfig,
    requester: RawServiceConfig,
    trigger_path: String,
    output_file: String,
    request_field: String,
    response_field: String,
    #[serde(default)]
    multi_response: bool,
    #[serde(default = "default_artifact_from_response")]
    artifact_from_response: bool,
}

fn default_artifact_from_response() -> bool {
    true
}

/// Raw orchestrator configuration.
#[derive(Debug, Deserialize)]
struct RawOrchestratorConfig {
    #[serde(default = "default_readiness_timeout_ms")]
    readiness_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
    #[serde(default = "default_trigger_timeout_ms")]
    trigger_timeout_ms: u64,
    #[serde(default = "default_shutdown_grace_ms")]
    shutdown_grace_ms: u64,
    #[serde(default = "default_output_dir")]
    output_dir: String,
}

fn default_readiness_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_trigger_timeout_ms() -> u64 {
    120_000
}

fn default_shutdown_grace_ms() -> u64 {
    5_000
}

fn default_output_dir() -> String {
    ".".to_string()
}

impl Default for RawOrchestratorConfig {
    fn default() -> Self {
        Self {
            readiness_timeout_ms: default_readiness_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            trigger_timeout_ms: default_trigger_timeout_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            output_dir: default_output_dir(),
        }
    }
}

/// Raw storage configuration.
#[derive(Debug, Deserialize)]
struct RawStorageConfig {
    #[serde(default = "default_database")]
    database: String,
}

fn default_database() -> String {
    "benchmark_metrics.db".to_string()
}

impl Default for RawStorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    orchestrator: RawOrchestratorConfig,
    #[serde(default)]
    storage: RawStorageConfig,
    adapters: Vec<RawAdapterConfig>,
}

/// How to launch one side of a service pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub command: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub port: Port,
    pub environment: HashMap<String, String>,
}

/// Everything needed to run and parse one protocol's benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub protocol: ProtocolName,
    pub responder: ServiceConfig,
    pub requester: ServiceConfig,
    /// HTTP path on the requester that runs the benchmark loop.
    pub trigger_path: String,
    /// Artifact file name, relative to the output/import directory.
    pub output_file: String,
    pub request_field: String,
    pub response_field: String,
    /// One request fans out into many timestamped replies.
    pub multi_response: bool,
    /// The trigger response body is the artifact. When false the requester
    /// writes `output_file` itself.
    pub artifact_from_response: bool,
}

/// Validated orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub readiness_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub trigger_timeout_ms: u64,
    pub shutdown_grace_ms: u64,
    pub output_dir: PathBuf,
}

impl OrchestratorConfig {
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn trigger_timeout(&self) -> Duration {
        Duration::from_millis(self.trigger_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let raw = RawOrchestratorConfig::default();
        Self {
            readiness_timeout_ms: raw.readiness_timeout_ms,
            poll_interval_ms: raw.poll_interval_ms,
            trigger_timeout_ms: raw.trigger_timeout_ms,
            shutdown_grace_ms: raw.shutdown_grace_ms,
            output_dir: PathBuf::from(raw.output_dir),
        }
    }
}

/// Validated storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database: PathBuf,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub orchestrator: OrchestratorConfig,
    pub storage: StorageConfig,
    pub adapters: Vec<AdapterConfig>,
}

/// Built-in adapter table for the reference protocol pairs.
const BUILTIN_CONFIG: &str = r#"
adapters:
  - protocol: gRPC
    responder: { command: [python3, main.py], working_dir: grpc_responder, port: 50051 }
    requester: { command: [uvicorn, "main:app", --host, 0.0.0.0, --port, "8000"], working_dir: grpc_requester, port: 8000 }
    trigger_path: /api/run
    output_file: grpc_out.txt
    request_field: grpc_requester_timestamp
    response_field: grpc_responder_timestamp
  - protocol: REST
    responder: { command: [uvicorn, "main:app", --host, 0.0.0.0, --port, "8000"], working_dir: rest_responder, port: 8000 }
    requester: { command: [uvicorn, "main:app", --host, 0.0.0.0, --port, "8080"], working_dir: rest_requester, port: 8080 }
    trigger_path: /run-benchmark
    output_file: rest_out.txt
    request_field: request_timestamp
    response_field: response_timestamp
  - protocol: Socket.IO
    responder: { command: [uvicorn, "main:sio_app", --host, 0.0.0.0, --port, "8000"], working_dir: sio_responder, port: 8000 }
    requester: { command: [uvicorn, "main:app", --host, 0.0.0.0, --port, "8080"], working_dir: sio_requester, port: 8080 }
    trigger_path: /send-timestamp
    output_file: sio_out.txt
    request_field: request_ts
    response_field: respond_ts
    multi_response: true
  - protocol: GraphQL
    responder: { command: [uvicorn, "main:app", --host, 0.0.0.0, --port, "8000"], working_dir: graphql_responder, port: 8000 }
    requester: { command: [uvicorn, "main:app", --host, 0.0.0.0, --port, "8080"], working_dir: graphql_requester, port: 8080 }
    trigger_path: /aggregate-timestamps
    output_file: graphql_out.txt
    request_field: requestTimestamp
    response_field: responseTimestamp
  - protocol: AVRO
    responder: { command: [uvicorn, "main:app", --host, 0.0.0.0, --port, "8000"], working_dir: avro_responder, port: 8000 }
    requester: { command: [uvicorn, "main:app", --host, 0.0.0.0, --port, "8080"], working_dir: avro_requester, port: 8080 }
    trigger_path: /run-benchmark
    output_file: avro_out.txt
    request_field: request_timestamp
    response_field: response_timestamp
  - protocol: CBOR
    responder: { command: [uvicorn, "main:app", --host, 0.0.0.0, --port, "8000"], working_dir: cbor_responder, port: 8000 }
    requester: { command: [uvicorn, "main:app", --host, 0.0.0.0, --port, "8080"], working_dir: cbor_requester, port: 8080 }
    trigger_path: /run-benchmark
    output_file: cbor_out.txt
    request_field: request_timestamp
    response_field: response_timestamp
"#;

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    /// Returns HardValidationError for any invalid fields.
    pub fn load_file(path: impl AsRef<Path>) -> BenchResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BenchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BenchError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> BenchResult<Config> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| BenchError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Self::validate(raw)
    }

    /// The built-in reference protocol table with default settings.
    pub fn builtin() -> BenchResult<Config> {
        Self::load_string(BUILTIN_CONFIG)
    }

    /// Load `path` if given, else `protobench.yaml` if present, else the built-in table.
    pub fn discover(path: Option<&Path>) -> BenchResult<Config> {
        match path {
            Some(path) => Self::load_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_file(DEFAULT_CONFIG_FILE)
            }
            None => {
                tracing::debug!("No configuration file found, using built-in adapters");
                Self::builtin()
            }
        }
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawConfig) -> BenchResult<Config> {
        let orchestrator = Self::validate_orchestrator(raw.orchestrator)?;

        if raw.storage.database.trim().is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "storage.database",
                value: raw.storage.database,
                reason: "Database path cannot be empty".to_string(),
            }
            .into());
        }
        let storage = StorageConfig {
            database: PathBuf::from(raw.storage.database),
        };

        let mut adapters = Vec::with_capacity(raw.adapters.len());
        let mut seen_slugs = HashSet::new();

        for (index, raw_adapter) in raw.adapters.into_iter().enumerate() {
            let adapter = Self::validate_adapter(raw_adapter, index)?;

            if !seen_slugs.insert(adapter.protocol.slug()) {
                return Err(HardValidationError::DuplicateProtocol {
                    name: adapter.protocol.to_string(),
                }
                .into());
            }

            adapters.push(adapter);
        }

        if adapters.is_empty() {
            return Err(HardValidationError::SchemaValidation {
                message: "At least one adapter must be defined".to_string(),
            }
            .into());
        }

        Ok(Config {
            orchestrator,
            storage,
            adapters,
        })
    }

    /// Validate orchestrator configuration.
    fn validate_orchestrator(raw: RawOrchestratorConfig) -> BenchResult<OrchestratorConfig> {
        for (field, value) in [
            ("readiness_timeout_ms", raw.readiness_timeout_ms),
            ("poll_interval_ms", raw.poll_interval_ms),
            ("trigger_timeout_ms", raw.trigger_timeout_ms),
            ("shutdown_grace_ms", raw.shutdown_grace_ms),
        ] {
            if value == 0 {
                return Err(HardValidationError::InvalidFieldValue {
                    field,
                    value: "0".to_string(),
                    reason: "Must be greater than 0".to_string(),
                }
                .into());
            }
        }

        if raw.poll_interval_ms > raw.readiness_timeout_ms {
            return Err(HardValidationError::InvalidFieldValue {
                field: "poll_interval_ms",
                value: raw.poll_interval_ms.to_string(),
                reason: format!(
                    "Must not exceed readiness_timeout_ms ({})",
                    raw.readiness_timeout_ms
                ),
            }
            .into());
        }

        Ok(OrchestratorConfig {
            readiness_timeout_ms: raw.readiness_timeout_ms,
            poll_interval_ms: raw.poll_interval_ms,
            trigger_timeout_ms: raw.trigger_timeout_ms,
            shutdown_grace_ms: raw.shutdown_grace_ms,
            output_dir: PathBuf::from(raw.output_dir),
        })
    }

    fn validate_service(
        raw: RawServiceConfig,
        field: &'static str,
        context: &str,
    ) -> BenchResult<ServiceConfig> {
        if raw.command.is_empty() || raw.command[0].trim().is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field,
                context: format!("{}: command must name a program", context),
            }
            .into());
        }

        let port = Port::new(raw.port)?;

        if raw.environment.keys().any(|k| k.is_empty()) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "environment",
                value: format!("empty key in {}", context),
                reason: "Environment variable names cannot be empty".to_string(),
            }
            .into());
        }

        Ok(ServiceConfig {
            command: raw.command,
            working_dir: raw.working_dir.map(PathBuf::from),
            port,
            environment: raw.environment,
        })
    }

    /// Validate a single adapter definition.
    fn validate_adapter(raw: RawAdapterConfig, index: usize) -> BenchResult<AdapterConfig> {
        let context = format!("adapter at index {}", index);

        let protocol = ProtocolName::new(&raw.protocol)?;
        let responder = Self::validate_service(raw.responder, "responder", &context)?;
        let requester = Self::validate_service(raw.requester, "requester", &context)?;

        if responder.port == requester.port {
            return Err(HardValidationError::InvalidPort {
                port: responder.port.value(),
                reason: format!(
                    "Responder and requester of {} cannot share a port",
                    protocol
                ),
            }
            .into());
        }

        if !raw.trigger_path.starts_with('/') {
            return Err(HardValidationError::InvalidFieldValue {
                field: "trigger_path",
                value: raw.trigger_path,
                reason: "Trigger path must start with '/'".to_string(),
            }
            .into());
        }

        let bare_name = Path::new(&raw.output_file)
            .file_name()
            .map(|n| n == raw.output_file.as_str())
            .unwrap_or(false);
        if !bare_name {
            return Err(HardValidationError::InvalidFieldValue {
                field: "output_file",
                value: raw.output_file,
                reason: "Output file must be a bare file name".to_string(),
            }
            .into());
        }

        for (field, value) in [
            ("request_field", &raw.request_field),
            ("response_field", &raw.response_field),
        ] {
            if value.trim().is_empty() {
                return Err(HardValidationError::MissingRequiredField {
                    field,
                    context: context.clone(),
                }
                .into());
            }
        }

        Ok(AdapterConfig {
            protocol,
            responder,
            requester,
            trigger_path: raw.trigger_path,
            output_file: raw.output_file,
            request_field: raw.request_field,
            response_field: raw.response_field,
            multi_response: raw.multi_response,
            artifact_from_response: raw.artifact_from_response,
        })
    }
}
