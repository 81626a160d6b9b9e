// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/telemetry/nvidia_smi.rs
// Version: 1.0.0
//
// This file reads per-GPU fan duty and temperature through the nvidia-smi
// command line tool. NVIDIA boards expose no fan control on this path, so
// adjust_fan always reports Unsupported.
//
// Tree Location:
// - src/telemetry/nvidia_smi.rs (nvidia-smi telemetry)
// - Depends on: log, std::process

use std::process::Command;

use log::{debug, info};

use super::{FanAdjustment, FanTemp, HealthTelemetry, TelemetryError};
use crate::accelerator::{InitOutcome, OnceInit};

const LOG_TARGET: &str = "rigminer::telemetry::nvidia_smi";

#[derive(Debug, Default)]
pub struct NvidiaSmiTelemetry {
    init: OnceInit,
}

impl NvidiaSmiTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    fn run(args: &[&str]) -> Result<String, TelemetryError> {
        let output = Command::new("nvidia-smi").args(args).output().map_err(|e| {
            debug!(target: LOG_TARGET,"nvidia-smi command not found: {}", e);
            TelemetryError::Command(format!("nvidia-smi not available: {}", e))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TelemetryError::Command(format!(
                "nvidia-smi failed: {}",
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Parse a `fan.speed, temperature.gpu` csv line (noheader, nounits).
    /// Fields nvidia-smi cannot report read as zero.
    pub fn parse_fan_temp_line(line: &str) -> Result<FanTemp, TelemetryError> {
        let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return Err(TelemetryError::Parse(format!(
                "expected 2 fields, got {}: '{}'",
                parts.len(),
                line
            )));
        }
        Ok(FanTemp {
            fan_percent: Self::parse_reading(parts[0], "fan.speed")?,
            temperature: Self::parse_reading(parts[1], "temperature.gpu")?,
        })
    }

    fn parse_reading(value: &str, field_name: &str) -> Result<u32, TelemetryError> {
        if value.is_empty()
            || value == "N/A"
            || value == "[N/A]"
            || value == "[Not Supported]"
            || value == "[Unknown Error]"
        {
            return Ok(0);
        }
        value
            .parse::<f32>()
            .map(|v| v.max(0.0).round() as u32)
            .map_err(|e| {
                TelemetryError::Parse(format!("failed to parse {} '{}': {}", field_name, value, e))
            })
    }
}

impl HealthTelemetry for NvidiaSmiTelemetry {
    fn initialize(&self) -> Result<InitOutcome, TelemetryError> {
        self.init.run(|| {
            let listing = Self::run(&["-L"])?;
            info!(target: LOG_TARGET,
                "nvidia-smi reports {} GPU(s)",
                listing.lines().filter(|l| !l.trim().is_empty()).count()
            );
            Ok(())
        })
    }

    fn poll(&self, index: usize) -> Result<FanTemp, TelemetryError> {
        let id = index.to_string();
        let stdout = Self::run(&[
            "--query-gpu=fan.speed,temperature.gpu",
            "--format=csv,noheader,nounits",
            "-i",
            &id,
        ])?;
        let line = stdout
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or(TelemetryError::Unavailable { index })?;
        Self::parse_fan_temp_line(line)
    }

    fn adjust_fan(&self, _: usize, _: u32, _: FanAdjustment) -> Result<(), TelemetryError> {
        Err(TelemetryError::Unsupported {
            operation: "nvidia-smi fan control",
        })
    }
}
