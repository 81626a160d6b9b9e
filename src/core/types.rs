// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/types.rs
// Version: 1.0.0
//
// This file defines core data structures for rigminer, located in the core
// subdirectory. It includes the command-line arguments, the job descriptor
// handed to devices (Work), the share produced by a device (ShareResult) and
// the solo/pool mode selector.
//
// Tree Location:
// - src/core/types.rs (core data structures)
// - Depends on: clap, serde, thiserror

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::difficulty::{U256, diff_one_target};
use super::header::BlockHeader;

/// Command-line arguments for rigminer
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rigminer",
    version = "1.0.0",
    about = "Multi-accelerator proof-of-work mining coordinator with thermal control",
    long_about = "rigminer drives one work loop per accelerator, assesses the solutions they\n\
                  return against the difficulty-one bound and the job target, and keeps\n\
                  each accelerator near its temperature target.\n\n\
                  BENCHMARK: Runs a fixed job on every device with no upstream\n\
                  LIST: Enumerates the accelerators the runtime can see\n\n\
                  Examples:\n\
                    Benchmark: rigminer --benchmark --cpu-devices 4 --duration 60\n\
                    Targets:   rigminer --benchmark --devices 0,2 --temp-target 70,75\n\
                    List:      rigminer --list-devices"
)]
pub struct Args {
    /// Run a fixed benchmark job on every device (no upstream)
    #[arg(
        short = 'b',
        long,
        default_value = "false",
        help = "Run the fixed benchmark job (no upstream required)"
    )]
    pub benchmark: bool,

    /// Stop after this many seconds; 0 runs until Ctrl-C
    #[arg(
        long,
        default_value = "0",
        value_name = "SECONDS",
        help = "Run duration in seconds (0 = until Ctrl-C)"
    )]
    pub duration: u64,

    /// Accelerator indexes to use. Empty means every enumerated device.
    /// Example: --devices 0,2,3
    #[arg(
        short = 'd',
        long,
        value_delimiter = ',',
        value_name = "INDEX,...",
        help = "Comma separated accelerator indexes (default: all)"
    )]
    pub devices: Vec<usize>,

    /// Temperature targets in Celsius. The first entry applies to every
    /// device; entry n overrides it for the n-th enabled device.
    #[arg(
        long = "temp-target",
        value_delimiter = ',',
        value_name = "CELSIUS,...",
        help = "Temperature targets (first = global, n-th = per device)"
    )]
    pub temp_targets: Vec<u32>,

    /// Number of CPU reference devices
    #[arg(
        long,
        default_value = "0",
        value_name = "COUNT",
        help = "CPU reference devices (0 = auto-detect)"
    )]
    pub cpu_devices: usize,

    #[arg(long, default_value = "false", help = "List accelerators and exit")]
    pub list_devices: bool,

    /// JSON configuration file; replaces the mining options given on the
    /// command line
    #[arg(long, value_name = "FILE", help = "JSON configuration file")]
    pub config: Option<PathBuf>,

    /// log4rs YAML configuration file
    #[arg(long, value_name = "FILE", help = "log4rs configuration file")]
    pub log_config: Option<PathBuf>,

    #[arg(
        long,
        default_value = "info",
        value_name = "LEVEL",
        help = "Console log level (error, warn, info, debug, trace)"
    )]
    pub log_level: String,

    /// Pool URL; selects pool mode for embedding applications
    #[arg(short = 'o', long, value_name = "URL", help = "Mining pool URL")]
    pub pool: Option<String>,

    #[arg(short = 'u', long, value_name = "USER", help = "Pool user / worker")]
    pub user: Option<String>,

    #[arg(
        short = 'p',
        long,
        default_value = "x",
        value_name = "PASSWORD",
        help = "Pool password"
    )]
    pub password: String,

    /// Loosest admissible proof-of-work bound as big-endian hex
    #[arg(
        long,
        value_name = "HEX",
        help = "Proof-of-work limit (default: difficulty-one target)"
    )]
    pub pow_limit: Option<String>,

    #[arg(
        long,
        default_value = "30",
        value_name = "SECONDS",
        help = "Stats and thermal control interval"
    )]
    pub stats_interval: u64,

    #[arg(
        long,
        default_value = "5",
        value_name = "SECONDS",
        help = "Solo work refresh interval"
    )]
    pub refresh_interval: u64,

    /// Poll fan/temperature through nvidia-smi
    #[arg(long, default_value = "false", help = "Read telemetry via nvidia-smi")]
    pub nvidia_smi: bool,
}

impl Args {
    /// Validate arguments and return helpful errors
    pub fn validate(&self) -> Result<(), String> {
        if self.list_devices || self.config.is_some() {
            return Ok(());
        }

        if !self.benchmark {
            return Err(
                "Nothing to do. Use --benchmark, --list-devices or --config FILE".to_string(),
            );
        }

        if let Some(t) = self.temp_targets.iter().find(|t| **t > 100) {
            return Err(format!("Temperature target {}C is above 100C", t));
        }

        if self.stats_interval == 0 {
            return Err("--stats-interval must be at least 1 second".to_string());
        }

        if self.refresh_interval == 0 {
            return Err("--refresh-interval must be at least 1 second".to_string());
        }

        if let Some(ref limit) = self.pow_limit {
            if super::difficulty::parse_target_hex(limit).is_none() {
                return Err(format!("Invalid --pow-limit '{}'", limit));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningMode {
    #[default]
    Solo,
    Pool,
}

impl std::fmt::Display for MiningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiningMode::Solo => write!(f, "solo"),
            MiningMode::Pool => write!(f, "pool"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkError {
    #[error("work target must be positive")]
    ZeroTarget,
}

/// A job descriptor. Devices receive it behind an `Arc` and clone the value
/// before touching the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Work {
    pub header: BlockHeader,
    pub target: U256,
    /// Server-issued header time
    pub job_time: u32,
    /// Local unix time the job was received
    pub time_received: u32,
    /// Pull-style (getwork) job; only these may roll the timestamp
    pub is_getwork: bool,
    pub job_id: Option<String>,
}

impl Work {
    pub fn new(
        header: BlockHeader,
        target: U256,
        job_time: u32,
        time_received: u32,
        is_getwork: bool,
        job_id: Option<String>,
    ) -> Result<Self, WorkError> {
        if target.is_zero() {
            return Err(WorkError::ZeroTarget);
        }
        Ok(Self {
            header,
            target,
            job_time,
            time_received,
            is_getwork,
            job_id,
        })
    }

    /// Header timestamp for a dispatch at `now`. Push-style jobs keep the
    /// server time verbatim.
    pub fn timestamp_at(&self, now: u32) -> u32 {
        if self.is_getwork {
            self.job_time
                .wrapping_add(now.saturating_sub(self.time_received))
        } else {
            self.job_time
        }
    }

    /// Fixed job used by benchmark mode.
    pub fn benchmark() -> Self {
        let header = BlockHeader {
            version: 7,
            prev_block: [
                0x4b, 0x6c, 0x0f, 0x9b, 0x3e, 0x1a, 0x2c, 0x55, 0x90, 0x21, 0x7e, 0x0d, 0xa3,
                0x5f, 0x61, 0x08, 0xc4, 0x1b, 0x87, 0x36, 0x12, 0xfe, 0x6a, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ],
            merkle_root: [
                0x8d, 0x3a, 0x51, 0xc7, 0x02, 0x6e, 0x94, 0xb8, 0x1f, 0x7c, 0x33, 0xe0, 0x5a,
                0x29, 0xd4, 0x6b, 0x90, 0x0e, 0x47, 0xa1, 0xfb, 0x38, 0x62, 0x15, 0xcc, 0x7d,
                0x04, 0x99, 0xb2, 0x5e, 0x13, 0xaf,
            ],
            bits: 0x1d00ffff,
            timestamp: 1_585_000_000,
            nonce: 0,
            extra_data: [0; 32],
            solution: Vec::new(),
        };
        Self {
            header,
            target: diff_one_target(),
            job_time: 1_585_000_000,
            time_received: unix_time(),
            is_getwork: false,
            job_id: None,
        }
    }
}

/// A solution that cleared the job target.
#[derive(Debug, Clone)]
pub struct ShareResult {
    pub device_index: usize,
    pub solution: Vec<u8>,
    /// Work snapshot the solution was found against, solution attached
    pub work: Work,
    /// Serialized header ready for submission
    pub data: Vec<u8>,
    pub hash: [u8; 32],
}

pub fn unix_time() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
