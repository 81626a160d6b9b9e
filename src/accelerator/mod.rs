// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/accelerator/mod.rs
// Version: 1.0.0
//
// This file defines the accelerator seam: a runtime enumerates bindings, each
// binding runs a search kernel over a header prefix and reports solutions
// through the SolutionRouter it is handed. Driver libraries that need global
// setup use OnceInit.
//
// Tree Location:
// - src/accelerator/mod.rs (accelerator traits)
// - Submodules: cpu
// - Depends on: anyhow, serde

pub mod cpu;

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::miner::device::arena::{DeviceHandle, SolutionRouter};

pub use cpu::{CpuBinding, CpuRuntime};

/// Hardware class of an accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Nvml,
    Adl,
    AmdGpu,
    Cpu,
}

impl DeviceKind {
    /// Only the AMD management paths can command fan duty.
    pub fn supports_fan_control(&self) -> bool {
        matches!(self, DeviceKind::Adl | DeviceKind::AmdGpu)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Nvml => "nvml",
            DeviceKind::Adl => "adl",
            DeviceKind::AmdGpu => "amdgpu",
            DeviceKind::Cpu => "cpu",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub kind: DeviceKind,
}

/// One enumerated accelerator, owned exclusively by a single device worker.
pub trait AcceleratorBinding: Send {
    fn info(&self) -> &DeviceInfo;

    /// Run the search kernel over `header` starting at `nonce`. Blocks until
    /// the kernel completes. Solutions are passed to `router` with `handle`,
    /// possibly from another thread, before this returns.
    fn solve(
        &mut self,
        header: &[u8],
        nonce: u32,
        handle: DeviceHandle,
        router: &SolutionRouter,
    ) -> anyhow::Result<()>;

    /// Free driver resources. Called once, on the worker thread, before it exits.
    fn release(&mut self) {}
}

pub trait AcceleratorRuntime: Send + Sync {
    fn name(&self) -> &str;

    fn enumerate(&self) -> anyhow::Result<Vec<Box<dyn AcceleratorBinding>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized,
    AlreadyInitialized,
}

/// Idempotent one-time initialization for driver or management libraries.
/// A failed attempt leaves it uninitialized so a later call may retry.
#[derive(Debug, Default)]
pub struct OnceInit {
    done: AtomicBool,
    lock: Mutex<()>,
}

impl OnceInit {
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    pub fn run<E>(&self, init: impl FnOnce() -> Result<(), E>) -> Result<InitOutcome, E> {
        if self.done.load(Ordering::Acquire) {
            return Ok(InitOutcome::AlreadyInitialized);
        }
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.done.load(Ordering::Acquire) {
            return Ok(InitOutcome::AlreadyInitialized);
        }
        init()?;
        self.done.store(true, Ordering::Release);
        Ok(InitOutcome::Initialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}
