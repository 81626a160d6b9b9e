// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/coordinator.rs
// Version: 1.0.0
//
// This file contains the Miner, which owns the device set and the three
// background tasks around it: submission routing (single consumer of the
// shared result channel), work refresh (solo polling or pool hand-off) and
// periodic stats/thermal reporting. One cancellation token stops everything.
//
// Tree Location:
// - src/miner/coordinator.rs (multi-device orchestration)
// - Depends on: tokio, tokio-util, thiserror, anyhow, log

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::device::{Device, DeviceArena, DeviceError, DeviceSetup, ShareAssessor};
use super::stats::{DeviceStatus, MinerStats, MinerStatus};
use crate::accelerator::AcceleratorRuntime;
use crate::config::MinerConfig;
use crate::core::header::HeaderHasher;
use crate::core::sha256::Sha256dHasher;
use crate::core::types::{MiningMode, ShareResult, Work};
use crate::telemetry::HealthTelemetry;
use crate::upstream::{Upstream, UpstreamError};

const LOG_TARGET: &str = "rigminer::miner";

#[derive(Debug, Error)]
pub enum MinerError {
    #[error("no usable devices")]
    NoDevices,
    #[error("failed to enumerate accelerators: {0:#}")]
    Enumerate(anyhow::Error),
    #[error("invalid miner configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("miner is already running")]
    AlreadyRunning,
}

pub struct Miner {
    config: MinerConfig,
    devices: Vec<Device>,
    stats: Arc<MinerStats>,
    upstream: Option<Upstream>,
    results_rx: Mutex<Option<UnboundedReceiver<ShareResult>>>,
    needs_refresh: Notify,
    shutdown: CancellationToken,
}

impl Miner {
    pub fn new(
        config: MinerConfig,
        runtime: &dyn AcceleratorRuntime,
        telemetry: Arc<dyn HealthTelemetry>,
        upstream: Option<Upstream>,
    ) -> Result<Self, MinerError> {
        Self::with_hasher(config, runtime, telemetry, upstream, Arc::new(Sha256dHasher))
    }

    pub fn with_hasher(
        config: MinerConfig,
        runtime: &dyn AcceleratorRuntime,
        telemetry: Arc<dyn HealthTelemetry>,
        upstream: Option<Upstream>,
        hasher: Arc<dyn HeaderHasher>,
    ) -> Result<Self, MinerError> {
        config
            .validate()
            .map_err(|e| MinerError::Config(e.to_string()))?;

        let upstream = if config.benchmark {
            if upstream.is_some() {
                warn!(target: LOG_TARGET,"Benchmark mode ignores the configured upstream");
            }
            None
        } else {
            match upstream {
                None => {
                    return Err(MinerError::Config(format!(
                        "{} mining needs an upstream",
                        config.mode
                    )));
                }
                Some(u) if u.mode() != config.mode => {
                    return Err(MinerError::Config(format!(
                        "configured for {} mining but given a {} upstream",
                        config.mode,
                        u.mode()
                    )));
                }
                Some(u) => Some(u),
            }
        };

        let pow_limit = config
            .pow_limit()
            .map_err(|e| MinerError::Config(e.to_string()))?;
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let setup = DeviceSetup {
            telemetry,
            assessor: Arc::new(ShareAssessor::new(pow_limit, config.benchmark, hasher)),
            results: results_tx,
            arena: Arc::new(DeviceArena::new()),
        };

        let bindings = runtime.enumerate().map_err(MinerError::Enumerate)?;
        info!(target: LOG_TARGET,"{} runtime reports {} accelerator(s)", runtime.name(), bindings.len());

        let mut devices = Vec::new();
        for (order, binding) in bindings
            .into_iter()
            .filter(|b| config.is_device_permitted(b.info().index))
            .enumerate()
        {
            match Device::new(binding, config.temp_target_for(order), &setup) {
                Ok(device) => devices.push(device),
                Err(e) => error!(target: LOG_TARGET,"Skipping device: {}", e),
            }
        }
        if devices.is_empty() {
            return Err(MinerError::NoDevices);
        }

        Ok(Self {
            config,
            devices,
            stats: Arc::new(MinerStats::new()),
            upstream,
            results_rx: Mutex::new(Some(results_rx)),
            needs_refresh: Notify::new(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn stats(&self) -> Arc<MinerStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn mode(&self) -> MiningMode {
        self.upstream
            .as_ref()
            .map(Upstream::mode)
            .unwrap_or(self.config.mode)
    }

    /// Start every device and background task, then wait for [`Miner::stop`]
    /// and join the device threads.
    pub async fn run(self: Arc<Self>) -> Result<(), MinerError> {
        let results_rx = self
            .results_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(MinerError::AlreadyRunning)?;

        info!(target: LOG_TARGET,
            "🚀 Starting {} device(s){}",
            self.devices.len(),
            if self.config.benchmark {
                " in benchmark mode".to_string()
            } else {
                format!(" in {} mode", self.mode())
            }
        );

        let mut threads = Vec::with_capacity(self.devices.len());
        for device in &self.devices {
            match device.spawn() {
                Ok(handle) => threads.push(handle),
                Err(e) => {
                    error!(target: LOG_TARGET,"{}", e);
                    self.stop();
                    Self::join_devices(threads).await;
                    return Err(e.into());
                }
            }
        }

        let mut tasks = vec![tokio::spawn(Arc::clone(&self).submission_task(results_rx))];
        if self.config.benchmark {
            warn!(target: LOG_TARGET,"⚠️ Running in benchmark mode! No work will be submitted");
            self.broadcast(Arc::new(Work::benchmark()));
        } else {
            tasks.push(tokio::spawn(Arc::clone(&self).refresh_task()));
        }
        tasks.push(tokio::spawn(Arc::clone(&self).stats_task()));

        self.shutdown.cancelled().await;
        self.stop();

        for task in tasks {
            if let Err(e) = task.await {
                error!(target: LOG_TARGET,"Background task failed: {}", e);
            }
        }
        Self::join_devices(threads).await;
        info!(target: LOG_TARGET,"👋 Miner stopped");
        Ok(())
    }

    /// Idempotent. Cancels the shared token and closes every device's quit
    /// signal; in-flight kernels finish first.
    pub fn stop(&self) {
        if !self.shutdown.is_cancelled() {
            info!(target: LOG_TARGET,"🛑 Shutdown requested");
        }
        self.shutdown.cancel();
        for device in &self.devices {
            device.stop();
        }
    }

    async fn join_devices(threads: Vec<JoinHandle<()>>) {
        let joined = tokio::task::spawn_blocking(move || {
            for thread in threads {
                if thread.join().is_err() {
                    error!(target: LOG_TARGET,"Device thread panicked");
                }
            }
        })
        .await;
        if let Err(e) = joined {
            error!(target: LOG_TARGET,"Failed to join device threads: {}", e);
        }
    }

    /// Offer `work` to every device. Returns how many took it.
    pub fn broadcast(&self, work: Arc<Work>) -> usize {
        let accepted = self
            .devices
            .iter()
            .filter(|device| device.set_work(Arc::clone(&work)))
            .count();
        debug!(target: LOG_TARGET,
            "Broadcast work{} to {}/{} device(s)",
            work.job_id
                .as_deref()
                .map(|id| format!(" {}", id))
                .unwrap_or_default(),
            accepted,
            self.devices.len()
        );
        accepted
    }

    pub fn request_refresh(&self) {
        self.stats.record_refresh_signal();
        self.needs_refresh.notify_one();
    }

    async fn submission_task(self: Arc<Self>, mut results: UnboundedReceiver<ShareResult>) {
        loop {
            let share = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                share = results.recv() => match share {
                    Some(share) => share,
                    None => break,
                },
            };
            self.route_share(share).await;
        }
        debug!(target: LOG_TARGET,"Submission task finished");
    }

    async fn route_share(&self, share: ShareResult) {
        let Some(upstream) = &self.upstream else {
            debug!(target: LOG_TARGET,"DEV #{}: share dropped, no upstream", share.device_index);
            return;
        };
        let device = share.device_index;
        self.stats.record_submission();

        match upstream {
            Upstream::Solo(node) => match node.submit_work(share.data).await {
                Ok(true) => {
                    self.stats.record_valid();
                    info!(target: LOG_TARGET,"✅ DEV #{}: block accepted", device);
                    self.request_refresh();
                }
                Ok(false) => {
                    self.stats.record_invalid();
                    warn!(target: LOG_TARGET,"❌ DEV #{}: block rejected", device);
                    self.request_refresh();
                }
                // The share is not resent; the next refresh replaces the job.
                Err(e) => {
                    self.stats.record_invalid();
                    error!(target: LOG_TARGET,"Error submitting work: {}", e);
                }
            },
            Upstream::Pool { submitter, .. } => match submitter.submit(share.data).await {
                Ok(true) => {
                    self.stats.record_valid();
                    info!(target: LOG_TARGET,"✅ DEV #{}: share submitted", device);
                    self.request_refresh();
                }
                Ok(false) => {
                    self.stats.record_invalid();
                    warn!(target: LOG_TARGET,"❌ DEV #{}: pool refused share", device);
                    self.request_refresh();
                }
                Err(UpstreamError::Stale) => {
                    self.stats.record_stale();
                    debug!(target: LOG_TARGET,"DEV #{}: stale share", device);
                }
                Err(e) => {
                    self.stats.record_invalid();
                    error!(target: LOG_TARGET,"Error submitting share: {}", e);
                    self.request_refresh();
                }
            },
        }
    }

    async fn refresh_task(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            self.refresh_work().await;
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
                _ = self.needs_refresh.notified() => ticker.reset(),
            }
        }
        debug!(target: LOG_TARGET,"Refresh task finished");
    }

    async fn refresh_work(&self) {
        match &self.upstream {
            Some(Upstream::Solo(node)) => match node.get_work().await {
                Ok(work) => {
                    self.broadcast(Arc::new(work));
                }
                Err(e) => error!(target: LOG_TARGET,"Error in getwork: {}", e),
            },
            Some(Upstream::Pool { state, .. }) => {
                // take_new_work releases the pool lock before returning
                if let Some(work) = state.take_new_work() {
                    self.broadcast(Arc::new(work));
                }
            }
            None => {}
        }
    }

    async fn stats_task(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.stats_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            // Telemetry backends may shell out or block on drivers.
            let miner = Arc::clone(&self);
            if let Err(e) = tokio::task::spawn_blocking(move || miner.report()).await {
                error!(target: LOG_TARGET,"Stats report failed: {}", e);
            }
        }
        debug!(target: LOG_TARGET,"Stats task finished");
    }

    /// Log global and per-device stats, refresh telemetry and run one thermal
    /// control cycle on every device with a temperature target.
    pub fn report(&self) {
        if !self.config.benchmark {
            self.status().log();
        }
        for device in &self.devices {
            device.update_fan_temp();
            device.print_stats(self.config.hashes_per_share);
            if device.fan_control_active() {
                device.fan_control();
            }
        }
    }

    pub fn status(&self) -> MinerStatus {
        self.stats.snapshot(self.mode())
    }

    pub fn device_statuses(&self) -> Vec<DeviceStatus> {
        self.devices
            .iter()
            .map(|d| d.status(self.config.hashes_per_share))
            .collect()
    }
}
