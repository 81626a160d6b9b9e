// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/accelerator/cpu.rs
// Version: 1.0.0
//
// This file contains the CPU reference runtime. Each binding brute-forces an
// 8-byte solution appended to the header prefix and reports every candidate
// whose hash clears the proof-of-work limit. It stands in for a GPU kernel so
// the device loop can run without vendor drivers.
//
// Tree Location:
// - src/accelerator/cpu.rs (CPU reference accelerator)
// - Depends on: anyhow, log, num_cpus

use std::sync::Arc;

use log::{debug, info};

use super::{AcceleratorBinding, AcceleratorRuntime, DeviceInfo, DeviceKind};
use crate::core::difficulty::{U256, hash_to_u256};
use crate::core::header::HeaderHasher;
use crate::miner::device::arena::{DeviceHandle, SolutionRouter};

const LOG_TARGET: &str = "rigminer::accelerator::cpu";

/// Hash attempts per dispatch. Small enough that shutdown is noticed quickly.
pub const DEFAULT_ATTEMPTS_PER_DISPATCH: u32 = 1 << 18;

pub struct CpuRuntime {
    devices: usize,
    attempts_per_dispatch: u32,
    pow_limit: U256,
    hasher: Arc<dyn HeaderHasher>,
}

impl CpuRuntime {
    /// `devices == 0` uses one device per logical CPU.
    pub fn new(devices: usize, pow_limit: U256, hasher: Arc<dyn HeaderHasher>) -> Self {
        let devices = if devices == 0 { num_cpus::get() } else { devices };
        Self {
            devices,
            attempts_per_dispatch: DEFAULT_ATTEMPTS_PER_DISPATCH,
            pow_limit,
            hasher,
        }
    }

    pub fn with_attempts_per_dispatch(mut self, attempts: u32) -> Self {
        self.attempts_per_dispatch = attempts.max(1);
        self
    }

    pub fn device_count(&self) -> usize {
        self.devices
    }
}

impl AcceleratorRuntime for CpuRuntime {
    fn name(&self) -> &str {
        "cpu"
    }

    fn enumerate(&self) -> anyhow::Result<Vec<Box<dyn AcceleratorBinding>>> {
        info!(target: LOG_TARGET,"Enumerated {} CPU reference devices", self.devices);
        Ok((0..self.devices)
            .map(|index| {
                Box::new(CpuBinding {
                    info: DeviceInfo {
                        index,
                        name: format!("CPU worker {}", index),
                        kind: DeviceKind::Cpu,
                    },
                    attempts: self.attempts_per_dispatch,
                    pow_limit: self.pow_limit,
                    hasher: Arc::clone(&self.hasher),
                }) as Box<dyn AcceleratorBinding>
            })
            .collect())
    }
}

pub struct CpuBinding {
    info: DeviceInfo,
    attempts: u32,
    pow_limit: U256,
    hasher: Arc<dyn HeaderHasher>,
}

impl CpuBinding {
    /// Solution bytes for one attempt: the dispatch nonce in the high half,
    /// the attempt counter in the low half.
    fn candidate(nonce: u32, attempt: u32) -> [u8; 8] {
        ((u64::from(nonce) << 32) | u64::from(attempt)).to_le_bytes()
    }
}

impl AcceleratorBinding for CpuBinding {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn solve(
        &mut self,
        header: &[u8],
        nonce: u32,
        handle: DeviceHandle,
        router: &SolutionRouter,
    ) -> anyhow::Result<()> {
        if header.is_empty() {
            anyhow::bail!("empty header handed to {}", self.info.name);
        }
        let mut data = Vec::with_capacity(header.len() + 8);
        data.extend_from_slice(header);
        data.extend_from_slice(&[0u8; 8]);
        let tail = header.len();

        for attempt in 0..self.attempts {
            let solution = Self::candidate(nonce, attempt);
            data[tail..].copy_from_slice(&solution);
            let hash = self.hasher.hash(&data);
            if hash_to_u256(&hash) <= self.pow_limit {
                debug!(target: LOG_TARGET,
                    "{} candidate at attempt {} (nonce {:08x})",
                    self.info.name, attempt, nonce
                );
                router.deliver(handle, &solution);
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        debug!(target: LOG_TARGET,"Released {}", self.info.name);
    }
}
