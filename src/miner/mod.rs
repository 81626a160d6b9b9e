// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/mod.rs
// Version: 1.0.0
//
// This file is the module declaration for the mining engine: per-device work
// loops, the coordinator that drives them and the statistics they report.
//
// Tree Location:
// - src/miner/mod.rs (miner module entry point)
// - Submodules: coordinator, device, stats

pub mod coordinator;
pub mod device;
pub mod stats;

pub use coordinator::{Miner, MinerError};
pub use device::{Device, DeviceError, DeviceState};
pub use stats::{MinerStats, MinerStatus};
