// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Converter configuration: `polyconvert.toml` plus environment overrides

use crate::error::{ConvertError, Result};
use crate::model::Metadata;
use crate::script::SandboxLimits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// File read from the working directory when present
pub const CONFIG_FILE: &str = "polyconvert.toml";

/// Converter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Producer string embedded in output metadata
    pub producer: String,
    /// Include roots granted to scripts in addition to their own directory
    pub include_paths: Vec<PathBuf>,
    pub max_include_depth: usize,
    pub max_include_bytes: u64,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
    /// Fixed metadata timestamp in Unix seconds, from `SOURCE_DATE_EPOCH`
    #[serde(skip)]
    pub source_date_epoch: Option<i64>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        let limits = SandboxLimits::default();
        Self {
            producer: format!("polyconvert {}", env!("CARGO_PKG_VERSION")),
            include_paths: Vec::new(),
            max_include_depth: limits.max_include_depth,
            max_include_bytes: limits.max_include_bytes,
            log_filter: None,
            source_date_epoch: None,
        }
    }
}

impl ConverterConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        toml::from_str(&content)
            .map_err(|e| ConvertError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Load `polyconvert.toml` if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if Path::new(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `POLYCONVERT_*` and `SOURCE_DATE_EPOCH` overrides
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(producer) = lookup("POLYCONVERT_PRODUCER") {
            self.producer = producer;
        }

        if let Some(paths) = lookup("POLYCONVERT_INCLUDE_PATH") {
            self.include_paths
                .extend(std::env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()));
        }

        if let Some(filter) = lookup("POLYCONVERT_LOG") {
            self.log_filter = Some(filter);
        }

        if let Some(epoch) = lookup("SOURCE_DATE_EPOCH") {
            match epoch.trim().parse() {
                Ok(seconds) => self.source_date_epoch = Some(seconds),
                Err(_) => warn!(value = %epoch, "ignoring invalid SOURCE_DATE_EPOCH"),
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConvertError::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| ConvertError::io(path, e))
    }

    pub fn limits(&self) -> SandboxLimits {
        SandboxLimits {
            max_include_depth: self.max_include_depth,
            max_include_bytes: self.max_include_bytes,
        }
    }

    /// Metadata for one invocation: the fixed epoch when configured,
    /// otherwise the current time
    pub fn metadata(&self) -> Metadata {
        let timestamp = self
            .source_date_epoch
            .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
            .unwrap_or_else(Utc::now);
        Metadata::new(self.producer.clone(), timestamp)
    }
}
