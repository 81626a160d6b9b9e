// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/utils/format.rs
// Version: 1.0.0
//
// This file provides formatting helpers for the stats reports: hash rates,
// uptimes, share counts and the accepted-shares-per-minute utility figure.
//
// Tree Location:
// - src/utils/format.rs (formatting utilities)
// - Depends on: std

use std::time::Duration;

/// Utility functions for formatting miner statistics
pub struct FormatUtils;

impl FormatUtils {
    /// Format hashrate in appropriate units (H/s .. TH/s)
    pub fn format_hashrate(hashrate: f64) -> String {
        const UNITS: [(f64, &str); 4] = [
            (1e12, "TH/s"),
            (1e9, "GH/s"),
            (1e6, "MH/s"),
            (1e3, "KH/s"),
        ];
        for (scale, unit) in UNITS {
            if hashrate >= scale {
                return format!("{:.2} {}", hashrate / scale, unit);
            }
        }
        format!("{:.2} H/s", hashrate)
    }

    /// Format an uptime as `1h 02m 03s`, dropping leading zero units
    pub fn format_uptime(duration: Duration) -> String {
        let secs = duration.as_secs();
        let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
        if h > 0 {
            format!("{}h {:02}m {:02}s", h, m, s)
        } else if m > 0 {
            format!("{}m {:02}s", m, s)
        } else {
            format!("{}s", s)
        }
    }

    /// Format large numbers with suffixes (K, M, B)
    pub fn format_number(num: u64) -> String {
        if num >= 1_000_000_000 {
            format!("{:.1}B", num as f64 / 1_000_000_000.0)
        } else if num >= 1_000_000 {
            format!("{:.1}M", num as f64 / 1_000_000.0)
        } else if num >= 1_000 {
            format!("{:.1}K", num as f64 / 1_000.0)
        } else {
            num.to_string()
        }
    }

    pub fn format_utility(utility: f64) -> String {
        format!("{:.2}/m", utility)
    }
}


// Changelog:
// - v1.0.0 (2026-10-16): Stats formatting for device and miner reports.
//   - Hash rates gain a TH/s tier; durations are rendered as uptimes.
//   - Added the utility (accepted shares per minute) formatter.
