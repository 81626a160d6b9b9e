// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/mod.rs
// Version: 1.0.0
//
// This file is the module declaration for statistics tracking in rigminer.
//
// Tree Location:
// - src/miner/stats/mod.rs (stats module entry point)
// - Submodules: device_stats, miner_stats

pub mod device_stats;
pub mod miner_stats;

// Re-export key types for convenience
pub use device_stats::{DeviceCounters, DeviceStatus, average_hash_rate};
pub use miner_stats::{MinerStats, MinerStatus};
