// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/device/device.rs
// Version: 1.0.0
//
// This file contains the per-accelerator Device. Each device runs its work
// loop on a dedicated OS thread: take the latest job from a one-slot handoff
// queue, stamp the extra-nonce, timestamp and a random starting nonce into a
// private copy of the header, and block in the accelerator until the kernel
// returns. Solutions come back through the arena and are assessed against
// the header snapshot that was dispatched.
//
// Tree Location:
// - src/miner/device/device.rs (device work loop and state machine)
// - Depends on: crossbeam, rand, tokio (result channel), thiserror, log

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};
use crossbeam::select;
use log::{debug, error, info, trace, warn};
use rand::rngs::OsRng;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use super::arena::{DeviceArena, DeviceHandle, SolutionRouter};
use super::assess::{Assessment, ShareAssessor};
use super::nonce::{ExtraNonce, MAX_DEVICE_INDEX, random_start_nonce};
use super::thermal::ThermalState;
use crate::accelerator::{AcceleratorBinding, DeviceKind, InitOutcome};
use crate::core::types::{ShareResult, Work, unix_time};
use crate::miner::stats::{DeviceCounters, DeviceStatus, average_hash_rate};
use crate::telemetry::HealthTelemetry;

const LOG_TARGET: &str = "rigminer::device";

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("DEV #{index}: temperature target {target}C set but {kind} devices have no fan control")]
    FanControlUnsupported {
        index: usize,
        target: u32,
        kind: DeviceKind,
    },
    #[error("DEV #{index}: failed to spawn worker thread: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("DEV #{index}: index exceeds the {max} devices the extra nonce can partition")]
    IndexOutOfRange { index: usize, max: usize },
    #[error("DEV #{index}: worker already started")]
    AlreadyStarted { index: usize },
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    AwaitingWork = 0,
    Dispatching = 1,
    Assessing = 2,
    Stopping = 3,
    Stopped = 4,
}

impl DeviceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DeviceState::AwaitingWork,
            1 => DeviceState::Dispatching,
            2 => DeviceState::Assessing,
            3 => DeviceState::Stopping,
            _ => DeviceState::Stopped,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Collaborators shared by every device of one miner.
#[derive(Clone)]
pub struct DeviceSetup {
    pub telemetry: Arc<dyn HealthTelemetry>,
    pub assessor: Arc<ShareAssessor>,
    pub results: UnboundedSender<ShareResult>,
    pub arena: Arc<DeviceArena<DeviceCore>>,
}

/// The part of a device reachable from completion callbacks and reports.
pub struct DeviceCore {
    index: usize,
    name: String,
    kind: DeviceKind,
    counters: DeviceCounters,
    state: AtomicU8,
    dispatched: Mutex<Option<Work>>,
    thermal: Mutex<ThermalState>,
    assessor: Arc<ShareAssessor>,
    results: UnboundedSender<ShareResult>,
    started: Instant,
}

impl DeviceCore {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn counters(&self) -> &DeviceCounters {
        &self.counters
    }

    pub fn state(&self) -> DeviceState {
        DeviceState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: DeviceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn transition(&self, from: DeviceState, to: DeviceState) {
        let _ = self.state.compare_exchange(
            from as u8,
            to as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn thermal(&self) -> ThermalState {
        lock(&self.thermal).clone()
    }

    /// Completion callback target. Assesses `solution` against the header
    /// that was last dispatched.
    pub fn handle_solution(&self, solution: &[u8]) {
        self.transition(DeviceState::Dispatching, DeviceState::Assessing);
        let snapshot = lock(&self.dispatched).clone();
        match snapshot {
            Some(work) => {
                if let Assessment::Share(share) =
                    self.assessor
                        .assess(self.index, &work, solution, &self.counters)
                {
                    if self.results.send(*share).is_err() {
                        error!(target: LOG_TARGET,
                            "DEV #{}: result channel closed, share dropped",
                            self.index
                        );
                    }
                }
            }
            None => {
                debug!(target: LOG_TARGET,"DEV #{}: solution with no dispatched work", self.index);
            }
        }
        self.transition(DeviceState::Assessing, DeviceState::Dispatching);
    }

    pub fn status(&self, hashes_per_share: f64) -> DeviceStatus {
        let uptime = self.started.elapsed();
        let (fan_percent, temperature) = {
            let thermal = lock(&self.thermal);
            (thermal.fan_percent, thermal.temperature)
        };
        let diff_one = self.counters.diff_one();
        DeviceStatus {
            index: self.index,
            name: self.name.clone(),
            hash_rate: average_hash_rate(hashes_per_share, diff_one, uptime.as_secs()),
            fan_percent,
            temperature,
            diff_one,
            valid: self.counters.valid(),
            invalid: self.counters.invalid(),
            uptime,
        }
    }
}

pub struct Device {
    core: Arc<DeviceCore>,
    handle: DeviceHandle,
    telemetry: Arc<dyn HealthTelemetry>,
    telemetry_active: bool,
    job_tx: Sender<Arc<Work>>,
    quit_tx: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<DeviceWorker>>,
}

impl Device {
    /// Bind a device to `binding`. Fails when the index has no extra-nonce
    /// partition or a temperature target is requested for hardware without
    /// fan control; the binding is released before the error is returned.
    pub fn new(
        mut binding: Box<dyn AcceleratorBinding>,
        temp_target: Option<u32>,
        setup: &DeviceSetup,
    ) -> Result<Self, DeviceError> {
        let info = binding.info().clone();
        let index = info.index;
        let temp_target = temp_target.filter(|t| *t > 0);

        if index > MAX_DEVICE_INDEX {
            binding.release();
            return Err(DeviceError::IndexOutOfRange {
                index,
                max: MAX_DEVICE_INDEX + 1,
            });
        }

        if let Some(target) = temp_target {
            if !info.kind.supports_fan_control() {
                binding.release();
                return Err(DeviceError::FanControlUnsupported {
                    index,
                    target,
                    kind: info.kind,
                });
            }
        }

        match setup.telemetry.initialize() {
            Ok(InitOutcome::Initialized) => {
                info!(target: LOG_TARGET,"Telemetry backend initialized")
            }
            Ok(InitOutcome::AlreadyInitialized) => {}
            Err(e) => warn!(target: LOG_TARGET,"Telemetry initialization failed: {}", e),
        }

        // Idle boards may report a stopped fan, so only the temperature
        // decides whether telemetry works.
        let reading = match setup.telemetry.poll(index) {
            Ok(reading) if reading.temperature != 0 => Some(reading),
            Ok(_) => {
                warn!(target: LOG_TARGET,"DEV #{}: telemetry reports no temperature", index);
                None
            }
            Err(e) => {
                debug!(target: LOG_TARGET,"DEV #{}: telemetry unavailable: {}", index, e);
                None
            }
        };

        let mut thermal = ThermalState::new(None);
        if let Some(reading) = reading {
            thermal.record_reading(reading);
        }
        if let Some(target) = temp_target {
            if reading.is_some() {
                thermal.target = Some(target);
                info!(target: LOG_TARGET,"DEV #{}: temperature target {}C", index, target);
            } else {
                warn!(target: LOG_TARGET,
                    "DEV #{}: cannot read temperature, ignoring target {}C",
                    index, target
                );
            }
        }

        let core = Arc::new(DeviceCore {
            index,
            name: info.name.clone(),
            kind: info.kind,
            counters: DeviceCounters::new(),
            state: AtomicU8::new(DeviceState::AwaitingWork as u8),
            dispatched: Mutex::new(None),
            thermal: Mutex::new(thermal),
            assessor: Arc::clone(&setup.assessor),
            results: setup.results.clone(),
            started: Instant::now(),
        });
        let handle = setup.arena.insert(Arc::clone(&core));

        let (job_tx, job_rx) = channel::bounded(1);
        let (quit_tx, quit_rx) = channel::bounded(0);

        let worker = DeviceWorker {
            core: Arc::clone(&core),
            handle,
            binding,
            router: SolutionRouter::new(Arc::clone(&setup.arena)),
            arena: Arc::clone(&setup.arena),
            job_rx,
            quit_rx,
            extra_nonce: ExtraNonce::for_device(index),
            work: None,
            work_id: 0,
        };

        info!(target: LOG_TARGET,"🎮 DEV #{}: {} ({})", index, info.name, info.kind);

        Ok(Self {
            core,
            handle,
            telemetry: Arc::clone(&setup.telemetry),
            telemetry_active: reading.is_some(),
            job_tx,
            quit_tx: Mutex::new(Some(quit_tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn index(&self) -> usize {
        self.core.index
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    pub fn core(&self) -> &Arc<DeviceCore> {
        &self.core
    }

    pub fn state(&self) -> DeviceState {
        self.core.state()
    }

    pub fn telemetry_active(&self) -> bool {
        self.telemetry_active
    }

    pub fn fan_control_active(&self) -> bool {
        self.telemetry_active && lock(&self.core.thermal).target.is_some()
    }

    /// Offer a job without blocking. Returns false if the device still has
    /// an untaken job queued, in which case it keeps that one.
    pub fn set_work(&self, work: Arc<Work>) -> bool {
        match self.job_tx.try_send(work) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(target: LOG_TARGET,"DEV #{}: handoff queue full, keeping current job", self.index());
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Start the work loop on its own thread.
    pub fn spawn(&self) -> Result<JoinHandle<()>, DeviceError> {
        let index = self.index();
        let mut worker = lock(&self.worker)
            .take()
            .ok_or(DeviceError::AlreadyStarted { index })?;
        thread::Builder::new()
            .name(format!("rigminer-dev-{}", index))
            .spawn(move || {
                worker.run();
                worker.finish();
            })
            .map_err(|source| DeviceError::Spawn { index, source })
    }

    /// Close the quit signal. The loop exits at its next top-of-loop check.
    pub fn stop(&self) {
        if lock(&self.quit_tx).take().is_some() {
            debug!(target: LOG_TARGET,"DEV #{}: quit signalled", self.index());
        }
    }

    pub fn update_fan_temp(&self) {
        if !self.telemetry_active {
            return;
        }
        match self.telemetry.poll(self.index()) {
            Ok(reading) => lock(&self.core.thermal).record_reading(reading),
            Err(e) => debug!(target: LOG_TARGET,"DEV #{}: telemetry poll failed: {}", self.index(), e),
        }
    }

    /// Run one thermal control cycle and send its fan command, if any.
    pub fn fan_control(&self) {
        let index = self.index();
        let (adjustment, fan_cur) = {
            let mut thermal = lock(&self.core.thermal);
            (thermal.control_cycle(index), thermal.fan_percent)
        };
        let Some(adjustment) = adjustment else {
            return;
        };
        info!(target: LOG_TARGET,
            "🌡️ DEV #{}: fan {}% -> {}% ({:?} temperature, {:?} step)",
            index,
            fan_cur,
            adjustment.apply(fan_cur),
            adjustment.target,
            adjustment.level
        );
        if let Err(e) = self.telemetry.adjust_fan(index, fan_cur, adjustment) {
            error!(target: LOG_TARGET,"DEV #{}: fan adjustment failed: {}", index, e);
        }
    }

    pub fn status(&self, hashes_per_share: f64) -> DeviceStatus {
        self.core.status(hashes_per_share)
    }

    pub fn print_stats(&self, hashes_per_share: f64) {
        let status = self.status(hashes_per_share);
        info!(target: LOG_TARGET,"{}", status.summary_line());
        debug!(target: LOG_TARGET,"{}", status.share_line());
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // Never started: release the binding here instead of on the worker.
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(worker) = worker {
            worker.finish();
        }
    }
}

enum Acquire {
    Ready,
    Quit,
}

struct DeviceWorker {
    core: Arc<DeviceCore>,
    handle: DeviceHandle,
    binding: Box<dyn AcceleratorBinding>,
    router: SolutionRouter,
    arena: Arc<DeviceArena<DeviceCore>>,
    job_rx: Receiver<Arc<Work>>,
    quit_rx: Receiver<()>,
    extra_nonce: ExtraNonce,
    work: Option<Work>,
    work_id: u64,
}

impl DeviceWorker {
    fn run(&mut self) {
        info!(target: LOG_TARGET,"🚀 Started DEV #{} ({})", self.core.index, self.core.name);
        loop {
            if self.should_quit() {
                break;
            }
            if let Acquire::Quit = self.update_current_work() {
                break;
            }
            self.dispatch();
        }
    }

    fn should_quit(&self) -> bool {
        matches!(self.quit_rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Block for the first job; afterwards only pick up a newer one if it is
    /// already waiting.
    fn update_current_work(&mut self) -> Acquire {
        if self.work.is_none() {
            self.core.set_state(DeviceState::AwaitingWork);
            let next = select! {
                recv(self.job_rx) -> msg => msg.ok(),
                recv(self.quit_rx) -> _ => None,
            };
            return match next {
                Some(work) => {
                    self.accept(work);
                    Acquire::Ready
                }
                None => Acquire::Quit,
            };
        }
        match self.job_rx.try_recv() {
            Ok(work) => self.accept(work),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return Acquire::Quit,
        }
        Acquire::Ready
    }

    fn accept(&mut self, work: Arc<Work>) {
        self.work_id += 1;
        debug!(target: LOG_TARGET,
            "DEV #{}: new work #{}{}",
            self.core.index,
            self.work_id,
            work.job_id
                .as_deref()
                .map(|id| format!(" (job {})", id))
                .unwrap_or_default()
        );
        self.work = Some(Work::clone(&work));
    }

    fn dispatch(&mut self) {
        let index = self.core.index;
        let Some(work) = self.work.as_mut() else {
            return;
        };

        self.extra_nonce.roll();
        work.header.set_extra_nonce(self.extra_nonce.value());
        work.header.timestamp = work.timestamp_at(unix_time());
        let nonce = random_start_nonce(&mut OsRng, index);
        work.header.nonce = nonce;

        let header = work.header.serialize_prefix();
        *lock(&self.core.dispatched) = Some(work.clone());
        self.core.set_state(DeviceState::Dispatching);

        let started = Instant::now();
        if let Err(e) = self
            .binding
            .solve(&header, nonce, self.handle, &self.router)
        {
            error!(target: LOG_TARGET,"DEV #{}: kernel dispatch failed: {:#}", index, e);
        }
        trace!(target: LOG_TARGET,
            "DEV #{}: kernel for extra nonce {:08x} took {:?}",
            index,
            self.extra_nonce.value(),
            started.elapsed()
        );
    }

    /// Detach from the arena, then free the accelerator.
    fn finish(mut self) {
        self.core.set_state(DeviceState::Stopping);
        self.arena.release(self.handle);
        self.binding.release();
        self.core.set_state(DeviceState::Stopped);
        info!(target: LOG_TARGET,"⏹️ DEV #{} stopped after {} jobs", self.core.index, self.work_id);
    }
}
