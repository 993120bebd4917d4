// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Thread-safe protocol adapter registry using DashMap.
//!
//! The only place protocol identity maps to behavior. Lookups go through the
//! protocol slug, so `grpc`, `gRPC` and `GRPC` all resolve to the same entry.

use std::sync::{Mutex, MutexGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::{AdapterConfig, Config, ConfigLoader};
use crate::error::{BenchError, BenchResult, HardValidationError};
use crate::types::slugify;

/// Registry of configured protocol adapters.
/// Entries are immutable once registered.
#[derive(Debug)]
pub struct AdapterRegistry {
    /// Map of protocol slug to adapter.
    adapters: DashMap<String, AdapterConfig>,
    /// Slugs in registration order, for stable batch ordering.
    order: Mutex<Vec<String>>,
}

impl AdapterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            adapters: DashMap::new(),
            order: Mutex::new(Vec::new()),
        }
    }

    /// Build a registry holding every adapter of a validated configuration.
    pub fn from_config(config: &Config) -> BenchResult<Self> {
        let registry = Self::new();
        for adapter in &config.adapters {
            registry.register(adapter.clone())?;
        }
        Ok(registry)
    }

    /// The built-in reference protocol table.
    pub fn builtin() -> BenchResult<Self> {
        Self::from_config(&ConfigLoader::builtin()?)
    }

    /// Register a new adapter.
    /// Returns HardValidationError if the protocol slug is already taken.
    pub fn register(&self, adapter: AdapterConfig) -> BenchResult<()> {
        let slug = adapter.protocol.slug();

        match self.adapters.entry(slug.clone()) {
            Entry::Occupied(_) => {
                return Err(HardValidationError::DuplicateProtocol {
                    name: adapter.protocol.to_string(),
                }
                .into())
            }
            Entry::Vacant(slot) => {
                slot.insert(adapter);
            }
        }

        // Shard lock is released before the order lock is taken.
        self.order().push(slug);
        Ok(())
    }

    /// Look up an adapter by protocol name.
    pub fn get(&self, name: &str) -> BenchResult<AdapterConfig> {
        self.adapters
            .get(&slugify(name))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BenchError::AdapterNotFound(name.to_string()))
    }

    /// Check if a protocol is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(&slugify(name))
    }

    /// Get the number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// All adapters in registration order.
    pub fn adapters(&self) -> Vec<AdapterConfig> {
        let order = self.order().clone();
        order
            .iter()
            .filter_map(|slug| self.adapters.get(slug).map(|e| e.value().clone()))
            .collect()
    }

    fn order(&self) -> MutexGuard<'_, Vec<String>> {
        // The list is append-only, so a poisoned guard still holds valid data.
        self.order.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve a list of names, or every adapter when the list is empty.
    pub fn select(&self, names: &[String]) -> BenchResult<Vec<AdapterConfig>> {
        if names.is_empty() {
            return Ok(self.adapters());
        }
        names.iter().map(|name| self.get(name)).collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::config::ServiceConfig;
    use crate::types::{Port, ProtocolName};
    use std::collections::HashMap;

    fn make_adapter(name: &str) -> AdapterConfig {
        let service = |port| ServiceConfig {
            command: vec!["sleep".to_string(), "60".to_string()],
            working_dir: None,
            port: Port::new(port).unwrap(),
            environment: HashMap::new(),
        };
        AdapterConfig {
            protocol: ProtocolName::new(name).unwrap(),
            responder: service(9000),
            requester: service(9001),
            trigger_path: "/run".to_string(),
            output_file: format!("{}_out.txt", name.to_lowercase()),
            request_field: "req".to_string(),
            response_field: "resp".to_string(),
            multi_response: false,
            artifact_from_response: true,
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = AdapterRegistry::new();
        registry.register(make_adapter("gRPC")).unwrap();

        assert!(registry.contains("grpc"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("GRPC").unwrap().protocol.as_str(), "gRPC");
    }

    #[test]
    fn test_not_found() {
        let registry = AdapterRegistry::new();
        let err = registry.get("carrier-pigeon").unwrap_err();
        assert!(matches!(err, BenchError::AdapterNotFound(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = AdapterRegistry::new();
        assert!(registry.register(make_adapter("REST")).is_ok());
        assert!(registry.register(make_adapter("rest")).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registration_order_preserved() {
        let registry = AdapterRegistry::new();
        for name in ["REST", "gRPC", "CBOR"] {
            registry.register(make_adapter(name)).unwrap();
        }
        let names: Vec<_> = registry
            .adapters()
            .into_iter()
            .map(|a| a.protocol.to_string())
            .collect();
        assert_eq!(names, vec!["REST", "gRPC", "CBOR"]);
    }

    #[test]
    fn test_select() {
        let registry = AdapterRegistry::builtin().unwrap();
        assert_eq!(registry.select(&[]).unwrap().len(), 6);

        let picked = registry
            .select(&["socket.io".to_string(), "cbor".to_string()])
            .unwrap();
        assert_eq!(picked[0].protocol.as_str(), "Socket.IO");
        assert_eq!(picked[1].protocol.as_str(), "CBOR");

        assert!(registry.select(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let registry = Arc::new(AdapterRegistry::new());

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let reg = Arc::clone(&registry);
                thread::spawn(move || {
                    reg.register(make_adapter(&format!("proto-{}", i))).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 10);
        assert_eq!(registry.adapters().len(), 10);
    }
}
