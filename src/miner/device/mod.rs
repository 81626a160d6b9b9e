// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/device/mod.rs
// Version: 1.0.0
//
// This file is the module declaration for per-device mining logic.
//
// Tree Location:
// - src/miner/device/mod.rs (device module entry point)
// - Submodules: arena, assess, device, nonce, thermal

pub mod arena;
pub mod assess;
#[allow(clippy::module_inception)]
pub mod device;
pub mod nonce;
pub mod thermal;

pub use arena::{DeviceArena, DeviceHandle, SolutionRouter};
pub use assess::{Assessment, ShareAssessor};
pub use device::{Device, DeviceCore, DeviceError, DeviceSetup, DeviceState};
pub use nonce::{ExtraNonce, MAX_DEVICE_INDEX};
pub use thermal::{ControlPhase, ThermalState};
