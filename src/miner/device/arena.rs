// Rigminer - Free and Open Source Software Statement
//
// File: src/miner/device/arena.rs
// Version: 1.0.0
//
// Completion callbacks identify their device by a plain integer handle. The
// arena maps handles back to live devices with a bounds-checked lookup;
// released slots resolve to nothing, so a late callback is dropped instead of
// reaching a device that has already shut down.

use std::sync::{Arc, RwLock};

use log::debug;

use super::device::DeviceCore;

const LOG_TARGET: &str = "rigminer::device::arena";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(usize);

impl DeviceHandle {
    pub fn slot(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct DeviceArena<T> {
    slots: RwLock<Vec<Option<Arc<T>>>>,
}

impl<T> Default for DeviceArena<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }
}

impl<T> DeviceArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: Arc<T>) -> DeviceHandle {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.push(Some(item));
        DeviceHandle(slots.len() - 1)
    }

    pub fn resolve(&self, handle: DeviceHandle) -> Option<Arc<T>> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.get(handle.0).and_then(|slot| slot.clone())
    }

    /// Empty the slot. Returns false if it was already empty or never existed.
    pub fn release(&self, handle: DeviceHandle) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        match slots.get_mut(handle.0) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    pub fn live(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.iter().filter(|s| s.is_some()).count()
    }
}

/// What accelerator bindings call with each solution.
#[derive(Clone)]
pub struct SolutionRouter {
    arena: Arc<DeviceArena<DeviceCore>>,
}

impl std::fmt::Debug for SolutionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolutionRouter")
            .field("live_devices", &self.arena.live())
            .finish()
    }
}

impl SolutionRouter {
    pub fn new(arena: Arc<DeviceArena<DeviceCore>>) -> Self {
        Self { arena }
    }

    /// Hand `solution` to the device behind `handle`. Returns false when the
    /// device is gone.
    pub fn deliver(&self, handle: DeviceHandle, solution: &[u8]) -> bool {
        match self.arena.resolve(handle) {
            Some(core) => {
                core.handle_solution(solution);
                true
            }
            None => {
                debug!(target: LOG_TARGET,
                    "Dropping solution for released device slot {}",
                    handle.slot()
                );
                false
            }
        }
    }
}
