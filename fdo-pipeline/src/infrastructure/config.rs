// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Configuration
//!
//! Layered configuration for the FDO pipeline: a TOML file, overridden by
//! `FDO_*` environment variables, overridden by CLI flags applied by the
//! caller after [`FdoConfig::load`] returns. Every field defaults to the
//! value the pool manager and JSONL processor use when unconfigured, so a
//! bare `FdoConfig::default()` is already a runnable configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use fdo_domain::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub enabled: bool,
    pub size: usize,
    pub base_port: u16,
    pub health_interval_secs: u64,
    pub restart_delay_secs: u64,
    pub max_restart_attempts: u32,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    pub circuit_breaker_threshold: u32,
    pub executable_path: PathBuf,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 4,
            base_port: 9100,
            health_interval_secs: 10,
            restart_delay_secs: 2,
            max_restart_attempts: 5,
            max_retries: 3,
            request_timeout_secs: 10,
            circuit_breaker_threshold: 3,
            executable_path: PathBuf::from("fdo_worker"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub bind_host: String,
    pub port: u16,
    pub token: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { bind_host: "127.0.0.1".to_string(), port: 9000, token: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonlConfig {
    pub max_frames: u64,
    pub max_time_secs: u64,
    pub max_memory_mb: u64,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self { max_frames: 10_000_000, max_time_secs: 1_800, max_memory_mb: 4_096 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FdoConfig {
    pub pool: PoolConfig,
    pub daemon: DaemonConfig,
    pub jsonl: JsonlConfig,
}

impl FdoConfig {
    /// Loads configuration layered as: defaults, then an optional TOML file
    /// at `path` (if it exists), then `FDO_*` environment variables.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, CoreError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&FdoConfig::default()).map_err(|e| CoreError::config(e.to_string()))?);

        if let Some(path) = path {
            if path.exists() {
                builder = builder.add_source(config::File::from(path));
            }
        }

        builder = builder.add_source(config::Environment::with_prefix("FDO").separator("__"));

        let cfg: FdoConfig = builder
            .build()
            .map_err(|e| CoreError::config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CoreError::config(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !(1..=20).contains(&self.pool.size) {
            return Err(CoreError::config(format!("pool.size must be in 1..=20, got {}", self.pool.size)));
        }
        let last_port = u32::from(self.pool.base_port) + self.pool.size as u32 - 1;
        if last_port > 65535 {
            return Err(CoreError::config(format!(
                "pool.base_port {} + pool.size {} overflows the port range",
                self.pool.base_port, self.pool.size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(FdoConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_oversize_pool() {
        let mut cfg = FdoConfig::default();
        cfg.pool.size = 21;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_port_range_overflow() {
        let mut cfg = FdoConfig::default();
        cfg.pool.base_port = 65530;
        cfg.pool.size = 10;
        assert!(cfg.validate().is_err());
    }
}
