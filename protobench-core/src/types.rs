// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Following the "Newtype" pattern in Rust to ensure valid state by construction.
//! All types validate their invariants at creation time.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Maximum protocol name length.
const MAX_PROTOCOL_LEN: usize = 64;
/// Maximum run identifier length.
const MAX_RUN_ID_LEN: usize = 128;

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

/// Validated protocol name, e.g. `gRPC` or `Socket.IO`.
/// Must be non-empty, ASCII alphanumeric with `-`, `_` or `.`, max 64 chars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProtocolName(String);

impl ProtocolName {
    /// Create a new ProtocolName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "protocol",
                value: name,
                reason: "Protocol name cannot be empty".to_string(),
            });
        }

        if name.len() > MAX_PROTOCOL_LEN {
            return Err(HardValidationError::InvalidFieldValue {
                field: "protocol",
                value: name.clone(),
                reason: format!(
                    "Protocol name too long: {} chars (max {})",
                    name.len(),
                    MAX_PROTOCOL_LEN
                ),
            });
        }

        if !name.chars().all(is_identifier_char) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "protocol",
                value: name,
                reason: "Protocol name must contain only alphanumeric characters, hyphens, underscores, and dots".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase alphanumeric form used for lookups and run identifiers.
    /// `Socket.IO` becomes `socketio`.
    pub fn slug(&self) -> String {
        slugify(&self.0)
    }
}

/// Lowercase a name and drop everything that is not alphanumeric.
pub fn slugify(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl fmt::Display for ProtocolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ProtocolName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProtocolName> for String {
    fn from(name: ProtocolName) -> Self {
        name.0
    }
}

/// Globally unique, human-legible run identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Create a new RunId with validation.
    pub fn new(id: impl Into<String>) -> Result<Self, HardValidationError> {
        let id = id.into();

        if id.is_empty() || id.len() > MAX_RUN_ID_LEN {
            return Err(HardValidationError::InvalidFieldValue {
                field: "run_id",
                value: id.clone(),
                reason: format!("Run ID must be 1-{} characters", MAX_RUN_ID_LEN),
            });
        }

        if !id.chars().all(is_identifier_char) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "run_id",
                value: id,
                reason: "Run ID must contain only alphanumeric characters, hyphens, underscores, and dots".to_string(),
            });
        }

        Ok(Self(id))
    }

    /// Derive the identifier for a run of `protocol` created at `created_at`.
    pub fn derive(protocol: &ProtocolName, created_at: DateTime<Utc>) -> Self {
        Self(format!(
            "{}_{}",
            protocol.slug(),
            created_at.format("%Y%m%d_%H%M%S_%6f")
        ))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RunId {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

/// Validated network port.
/// Must be in range 1-65535 (0 is reserved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Create a new Port with validation.
    pub fn new(port: u16) -> Result<Self, HardValidationError> {
        if port == 0 {
            return Err(HardValidationError::InvalidPort {
                port,
                reason: "Port 0 is reserved and cannot be used".to_string(),
            });
        }
        Ok(Self(port))
    }

    /// Get the inner port value.
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = HardValidationError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Parse an ISO-8601 timestamp with sub-second precision.
///
/// Accepts RFC 3339 (`Z` or numeric offset) and naive
/// `YYYY-MM-DDTHH:MM:SS[.fraction]`, which is taken as UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{}': {}", text, e))
}

/// One request/response timestamp pair, keeping the original text.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampPair {
    request_text: String,
    response_text: String,
    request: DateTime<Utc>,
    response: DateTime<Utc>,
}

impl TimestampPair {
    /// Parse both timestamps; the raw text is preserved for storage.
    pub fn parse(request: &str, response: &str) -> Result<Self, String> {
        Ok(Self {
            request: parse_timestamp(request)?,
            response: parse_timestamp(response)?,
            request_text: request.to_string(),
            response_text: response.to_string(),
        })
    }

    pub fn request_text(&self) -> &str {
        &self.request_text
    }

    pub fn response_text(&self) -> &str {
        &self.response_text
    }

    pub fn request(&self) -> DateTime<Utc> {
        self.request
    }

    pub fn response(&self) -> DateTime<Utc> {
        self.response
    }

    /// `response - request` in seconds. Negative when the clocks disagree.
    pub fn latency_seconds(&self) -> Result<f64, String> {
        (self.response - self.request)
            .num_nanoseconds()
            .map(|ns| ns as f64 / 1_000_000_000.0)
            .ok_or_else(|| {
                format!(
                    "latency between {} and {} overflows",
                    self.request_text, self.response_text
                )
            })
    }
}
