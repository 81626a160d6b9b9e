// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/miner_stats.rs
// Version: 1.0.0
//
// This file holds the miner-wide submission counters. They are written only
// by the submission task and read by the stats task and callers of
// Miner::status.
//
// Tree Location:
// - src/miner/stats/miner_stats.rs (global statistics)
// - Depends on: log

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::info;

use crate::core::types::MiningMode;
use crate::utils::format::FormatUtils;

const LOG_TARGET: &str = "rigminer::stats";

#[derive(Debug)]
pub struct MinerStats {
    pub valid: AtomicU64,
    pub invalid: AtomicU64,
    pub stale: AtomicU64,
    pub submissions: AtomicU64,
    pub refresh_signals: AtomicU64,
    start_time: Instant,
}

impl Default for MinerStats {
    fn default() -> Self {
        Self::new()
    }
}

impl MinerStats {
    pub fn new() -> Self {
        Self {
            valid: AtomicU64::new(0),
            invalid: AtomicU64::new(0),
            stale: AtomicU64::new(0),
            submissions: AtomicU64::new(0),
            refresh_signals: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_submission(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_valid(&self) {
        self.valid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_signal(&self) {
        self.refresh_signals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self, mode: MiningMode) -> MinerStatus {
        let valid = self.valid.load(Ordering::Relaxed);
        let elapsed = self.uptime();
        MinerStatus {
            mode,
            valid,
            invalid: self.invalid.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            submissions: self.submissions.load(Ordering::Relaxed),
            refresh_signals: self.refresh_signals.load(Ordering::Relaxed),
            utility: match mode {
                MiningMode::Pool => utility(valid, elapsed),
                MiningMode::Solo => None,
            },
            uptime: elapsed,
        }
    }
}

/// Accepted shares per elapsed minute. `None` during the first minute.
pub fn utility(accepted: u64, elapsed: Duration) -> Option<f64> {
    if elapsed.as_secs() < 60 {
        return None;
    }
    Some(accepted as f64 / (elapsed.as_secs_f64() / 60.0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinerStatus {
    pub mode: MiningMode,
    pub valid: u64,
    pub invalid: u64,
    pub stale: u64,
    pub submissions: u64,
    pub refresh_signals: u64,
    pub utility: Option<f64>,
    pub uptime: Duration,
}

impl MinerStatus {
    pub fn log(&self) {
        info!(target: LOG_TARGET,"📊 MINER STATUS ({})", self.mode);
        info!(target: LOG_TARGET,"├─ Uptime: {}", FormatUtils::format_uptime(self.uptime));
        info!(target: LOG_TARGET,
            "├─ Shares: {} valid / {} invalid / {} stale ({} submitted)",
            self.valid, self.invalid, self.stale, self.submissions
        );
        match self.utility {
            Some(u) => info!(target: LOG_TARGET,"└─ Utility: {}", FormatUtils::format_utility(u)),
            None => info!(target: LOG_TARGET,"└─ Refresh signals: {}", self.refresh_signals),
        }
    }
}
