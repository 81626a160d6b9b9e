// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/config.rs
// Version: 1.0.0
//
// This file defines MinerConfig, built from the command line or loaded from a
// JSON file. Missing JSON fields take their defaults.
//
// Tree Location:
// - src/config.rs (miner configuration)
// - Depends on: serde, serde_json, thiserror

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::difficulty::{HASHES_PER_DIFF_ONE_SHARE, U256, diff_one_target, parse_target_hex};
use crate::core::types::{Args, MiningMode};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCredentials {
    pub url: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Permitted accelerator indexes; empty permits all
    pub devices: Vec<usize>,
    /// First entry is the global target, entry n overrides for the n-th device
    pub temp_targets: Vec<u32>,
    pub benchmark: bool,
    pub mode: MiningMode,
    pub pool: Option<PoolCredentials>,
    pub refresh_interval_secs: u64,
    pub stats_interval_secs: u64,
    pub hashes_per_share: f64,
    /// Big-endian hex; the difficulty-one target when unset
    pub pow_limit_hex: Option<String>,
    /// CPU reference devices; 0 means one per logical CPU
    pub cpu_devices: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            temp_targets: Vec::new(),
            benchmark: false,
            mode: MiningMode::Solo,
            pool: None,
            refresh_interval_secs: 5,
            stats_interval_secs: 30,
            hashes_per_share: HASHES_PER_DIFF_ONE_SHARE,
            pow_limit_hex: None,
            cpu_devices: 0,
        }
    }
}

impl MinerConfig {
    pub fn from_args(args: &Args) -> Self {
        let pool = args.pool.as_ref().map(|url| PoolCredentials {
            url: url.clone(),
            user: args.user.clone().unwrap_or_default(),
            password: args.password.clone(),
        });
        Self {
            devices: args.devices.clone(),
            temp_targets: args.temp_targets.clone(),
            benchmark: args.benchmark,
            mode: if pool.is_some() {
                MiningMode::Pool
            } else {
                MiningMode::Solo
            },
            pool,
            refresh_interval_secs: args.refresh_interval,
            stats_interval_secs: args.stats_interval,
            pow_limit_hex: args.pow_limit.clone(),
            cpu_devices: args.cpu_devices,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval_secs == 0 || self.stats_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh and stats intervals must be at least one second".to_string(),
            ));
        }
        if !(self.hashes_per_share > 0.0) {
            return Err(ConfigError::Invalid(
                "hashes_per_share must be positive".to_string(),
            ));
        }
        if let Some(t) = self.temp_targets.iter().find(|t| **t > 100) {
            return Err(ConfigError::Invalid(format!(
                "temperature target {}C is above 100C",
                t
            )));
        }
        if !self.benchmark && self.mode == MiningMode::Pool && self.pool.is_none() {
            return Err(ConfigError::Invalid(
                "pool mode requires pool credentials".to_string(),
            ));
        }
        self.pow_limit()?;
        Ok(())
    }

    pub fn is_device_permitted(&self, index: usize) -> bool {
        self.devices.is_empty() || self.devices.contains(&index)
    }

    /// Target for the device at position `order` among enabled devices.
    pub fn temp_target_for(&self, order: usize) -> Option<u32> {
        self.temp_targets
            .get(order)
            .or_else(|| self.temp_targets.first())
            .copied()
            .filter(|t| *t > 0)
    }

    pub fn pow_limit(&self) -> Result<U256, ConfigError> {
        match &self.pow_limit_hex {
            None => Ok(diff_one_target()),
            Some(hex) => parse_target_hex(hex)
                .ok_or_else(|| ConfigError::Invalid(format!("invalid pow_limit_hex '{}'", hex))),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}
