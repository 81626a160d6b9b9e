// Rigminer - Free and Open Source Software Statement
//
// File: src/upstream/pool.rs
// Version: 1.0.0
//
// Shared pool job slot. The protocol client publishes, the refresh task takes.
// The lock covers only the flag check and the job copy.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::types::Work;

#[derive(Debug, Default)]
pub struct PoolWork {
    pub job: Option<Work>,
    pub new_work: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PoolState {
    inner: Arc<Mutex<PoolWork>>,
}

impl PoolState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PoolWork> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the current job and flag it as new.
    pub fn publish(&self, work: Work) {
        let mut pool = self.lock();
        pool.job = Some(work);
        pool.new_work = true;
    }

    /// Copy out the job if it has not been taken yet, clearing the flag.
    pub fn take_new_work(&self) -> Option<Work> {
        let mut pool = self.lock();
        if !pool.new_work {
            return None;
        }
        pool.new_work = false;
        pool.job.clone()
    }

    pub fn has_new_work(&self) -> bool {
        self.lock().new_work
    }

    pub fn current(&self) -> Option<Work> {
        self.lock().job.clone()
    }
}
