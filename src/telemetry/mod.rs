// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/telemetry/mod.rs
// Version: 1.0.0
//
// This file defines the health telemetry seam (fan duty and temperature per
// device) and the relative fan commands the thermal controller issues.
//
// Tree Location:
// - src/telemetry/mod.rs (telemetry traits and fan command types)
// - Submodules: nvidia_smi
// - Depends on: thiserror

pub mod nvidia_smi;

use thiserror::Error;

use crate::accelerator::InitOutcome;

pub use nvidia_smi::NvidiaSmiTelemetry;

/// Fan step for a low-severity correction, in percent duty.
pub const FAN_CHANGE_SMALL: u32 = 5;
/// Fan step for a high-severity correction, in percent duty.
pub const FAN_CHANGE_LARGE: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("telemetry unavailable for device {index}")]
    Unavailable { index: usize },
    #[error("{operation} is not supported by this telemetry backend")]
    Unsupported { operation: &'static str },
    #[error("telemetry command failed: {0}")]
    Command(String),
    #[error("failed to parse telemetry: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FanTemp {
    pub fan_percent: u32,
    pub temperature: u32,
}

/// Desired temperature movement. A fan increase is an intent to lower it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempTarget {
    None,
    Lower,
    Raise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeLevel {
    None,
    Small,
    Large,
}

impl ChangeLevel {
    pub fn percent(&self) -> u32 {
        match self {
            ChangeLevel::None => 0,
            ChangeLevel::Small => FAN_CHANGE_SMALL,
            ChangeLevel::Large => FAN_CHANGE_LARGE,
        }
    }
}

/// A relative fan command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanAdjustment {
    pub target: TempTarget,
    pub level: ChangeLevel,
}

impl FanAdjustment {
    pub fn new(target: TempTarget, level: ChangeLevel) -> Self {
        Self { target, level }
    }

    /// Signed change in fan duty.
    pub fn delta(&self) -> i32 {
        let step = self.level.percent() as i32;
        match self.target {
            TempTarget::Lower => step,
            TempTarget::Raise => -step,
            TempTarget::None => 0,
        }
    }

    /// Resulting duty when applied to `current`, clamped to 0..=100.
    pub fn apply(&self, current: u32) -> u32 {
        (current as i32 + self.delta()).clamp(0, 100) as u32
    }
}

pub trait HealthTelemetry: Send + Sync {
    /// One-time backend setup; repeat calls report `AlreadyInitialized`.
    fn initialize(&self) -> Result<InitOutcome, TelemetryError>;

    fn poll(&self, index: usize) -> Result<FanTemp, TelemetryError>;

    fn adjust_fan(
        &self,
        index: usize,
        current_percent: u32,
        adjustment: FanAdjustment,
    ) -> Result<(), TelemetryError>;
}

/// Telemetry for rigs without a management backend. Every poll is unavailable,
/// which disables temperature targeting.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTelemetry;

impl HealthTelemetry for NoTelemetry {
    fn initialize(&self) -> Result<InitOutcome, TelemetryError> {
        Ok(InitOutcome::AlreadyInitialized)
    }

    fn poll(&self, index: usize) -> Result<FanTemp, TelemetryError> {
        Err(TelemetryError::Unavailable { index })
    }

    fn adjust_fan(&self, _: usize, _: u32, _: FanAdjustment) -> Result<(), TelemetryError> {
        Err(TelemetryError::Unsupported {
            operation: "fan control",
        })
    }
}
