// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/lib.rs
// Version: 1.0.0
//
// This file serves as the main library entry point for rigminer, located at
// the root of the source tree. Embedding applications plug their accelerator
// runtime, telemetry backend and node/pool protocol into the traits exported
// here and drive a Miner.
//
// Tree Location:
// - src/lib.rs (root library file)
// - Exports modules: accelerator, config, core, miner, telemetry, upstream, utils

pub mod accelerator;
pub mod config;
pub mod core;
pub mod miner;
pub mod telemetry;
pub mod upstream;
pub mod utils;

// Re-export commonly used types at the crate root for convenience
pub use crate::accelerator::{AcceleratorBinding, AcceleratorRuntime, CpuRuntime, DeviceInfo, DeviceKind};
pub use crate::config::MinerConfig;
pub use crate::core::{BlockHeader, ShareResult, Work, difficulty};
pub use crate::miner::{Miner, MinerError, MinerStats};
pub use crate::telemetry::{HealthTelemetry, NoTelemetry, NvidiaSmiTelemetry};
pub use crate::upstream::{NodeClient, PoolState, PoolSubmitter, Upstream, UpstreamError};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

// Changelog:
// - v1.0.0 (2026-10-16): Initial library layout.
//   - Purpose: Establishes the library root around the device/orchestration
//     engine, with accelerator, telemetry and upstream seams.
//   - Features: Defines the common Result type used by the binary.
