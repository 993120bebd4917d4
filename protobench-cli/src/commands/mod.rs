// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod dashboard;
pub mod delete;
pub mod export;
pub mod import;
pub mod list;
pub mod protocols;
pub mod run;
pub mod stats;
pub mod validate;

use std::path::{Path, PathBuf};

use protobench_core::{AdapterRegistry, Config, ConfigLoader, MetricsStore};

use crate::error::{CliError, CliResult};

/// Configuration and storage location shared by every command.
pub struct Context {
    pub config: Config,
    pub db_path: PathBuf,
}

impl Context {
    pub fn load(config: Option<&Path>, db: Option<PathBuf>) -> CliResult<Self> {
        let config = ConfigLoader::discover(config)?;
        let db_path = db.unwrap_or_else(|| config.storage.database.clone());
        tracing::debug!(
            adapters = config.adapters.len(),
            db = %db_path.display(),
            "Configuration loaded"
        );
        Ok(Self { config, db_path })
    }

    pub fn registry(&self) -> CliResult<AdapterRegistry> {
        Ok(AdapterRegistry::from_config(&self.config)?)
    }

    pub fn open_store(&self) -> CliResult<MetricsStore> {
        Ok(MetricsStore::open(&self.db_path)?)
    }
}

/// Write `bytes` to `path`, creating parent directories.
pub(crate) fn write_output(path: &Path, bytes: &[u8]) -> CliResult<()> {
    let write_err = |source| CliError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, bytes).map_err(write_err)
}

/// Shorten `text` to `width` characters for table cells.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("REST", 8), "REST");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("abcdefghij", 5).chars().count(), 5);
    }

    #[test]
    fn test_write_output_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports/nested/run.csv");
        write_output(&path, b"a,b\n").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n");
    }

    #[test]
    fn test_registry_reports_duplicate_protocol() {
        let mut ctx = Context {
            config: ConfigLoader::builtin().unwrap(),
            db_path: PathBuf::from("unused.db"),
        };
        assert_eq!(ctx.registry().unwrap().len(), ctx.config.adapters.len());

        let duplicate = ctx.config.adapters[0].clone();
        ctx.config.adapters.push(duplicate);
        let err = ctx.registry().err().unwrap();
        assert!(matches!(err, CliError::Bench(_)));
    }
}
