// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/device_stats.rs
// Version: 1.0.0
//
// This file tracks per-device share counters and renders the per-device line
// of the periodic stats report. Counters have a single writer (the device's
// work loop and its completion callback) and are read lock-free.
//
// Tree Location:
// - src/miner/stats/device_stats.rs (per-device statistics)
// - Depends on: std

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::utils::format::FormatUtils;

#[derive(Debug, Default)]
pub struct DeviceCounters {
    diff_one: AtomicU64,
    valid: AtomicU64,
    invalid: AtomicU64,
}

impl DeviceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a solution that cleared the difficulty-one bound
    pub fn record_diff_one(&self) {
        self.diff_one.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a solution that cleared the job target
    pub fn record_valid(&self) {
        self.valid.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a hardware anomaly (hash above the difficulty-one bound)
    pub fn record_invalid(&self) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn diff_one(&self) -> u64 {
        self.diff_one.load(Ordering::Relaxed)
    }

    pub fn valid(&self) -> u64 {
        self.valid.load(Ordering::Relaxed)
    }

    pub fn invalid(&self) -> u64 {
        self.invalid.load(Ordering::Relaxed)
    }
}

/// Average hash rate implied by `diff_one_shares` over `elapsed_secs`.
/// `None` while no whole second has elapsed.
pub fn average_hash_rate(hashes_per_share: f64, diff_one_shares: u64, elapsed_secs: u64) -> Option<f64> {
    if elapsed_secs == 0 {
        return None;
    }
    Some(hashes_per_share * diff_one_shares as f64 / elapsed_secs as f64)
}

/// Point-in-time view of one device for reports.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub index: usize,
    pub name: String,
    pub hash_rate: Option<f64>,
    pub fan_percent: u32,
    pub temperature: u32,
    pub diff_one: u64,
    pub valid: u64,
    pub invalid: u64,
    pub uptime: Duration,
}

impl DeviceStatus {
    /// `DEV #i (name) <rate> Fan=x% T=yC`; zero readings and an unknown rate
    /// are left out.
    pub fn summary_line(&self) -> String {
        let mut line = format!("DEV #{} ({})", self.index, self.name);
        if let Some(rate) = self.hash_rate {
            line.push(' ');
            line.push_str(&FormatUtils::format_hashrate(rate));
        }
        if self.fan_percent != 0 {
            line.push_str(&format!(" Fan={}%", self.fan_percent));
        }
        if self.temperature != 0 {
            line.push_str(&format!(" T={}C", self.temperature));
        }
        line
    }

    pub fn share_line(&self) -> String {
        format!(
            "DEV #{} shares: diff1={} valid={} invalid={} uptime={}",
            self.index,
            FormatUtils::format_number(self.diff_one),
            self.valid,
            self.invalid,
            FormatUtils::format_uptime(self.uptime)
        )
    }
}
