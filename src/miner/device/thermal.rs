// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/device/thermal.rs
// Version: 1.0.0
//
// This file contains the per-device fan controller. Each stats cycle it
// compares the latest temperature with the target band and issues at most one
// relative fan step. The previous cycle's fan reading tells it what the last
// command tried to do, so a correction that is not working gets reinforced and
// one that overshot gets walked back gently.
//
// Tree Location:
// - src/miner/device/thermal.rs (thermal control loop)
// - Depends on: log

use log::trace;

use crate::telemetry::{
    ChangeLevel, FAN_CHANGE_LARGE, FAN_CHANGE_SMALL, FanAdjustment, FanTemp, TempTarget,
};

const LOG_TARGET: &str = "rigminer::device::thermal";

/// Half-width of the no-op band around the target, in Celsius.
pub const FAN_CONTROL_HYSTERESIS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPhase {
    /// No reading yet
    Unknown,
    /// Readings exist, no control cycle has run
    FirstRun,
    Steady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Stable,
    Up,
    Down,
}

/// Thermal fields of one device. Guarded by the device's thermal lock.
#[derive(Debug, Clone)]
pub struct ThermalState {
    pub fan_percent: u32,
    pub temperature: u32,
    /// Fan reading seen by the previous control cycle
    pub last_fan_percent: u32,
    /// Temperature seen by the previous control cycle
    pub last_temperature: u32,
    /// `None` when temperature targeting is off
    pub target: Option<u32>,
    pub hysteresis: u32,
    phase: ControlPhase,
}

impl ThermalState {
    pub fn new(target: Option<u32>) -> Self {
        Self {
            fan_percent: 0,
            temperature: 0,
            last_fan_percent: 0,
            last_temperature: 0,
            target,
            hysteresis: FAN_CONTROL_HYSTERESIS,
            phase: ControlPhase::Unknown,
        }
    }

    pub fn phase(&self) -> ControlPhase {
        self.phase
    }

    pub fn record_reading(&mut self, reading: FanTemp) {
        self.fan_percent = reading.fan_percent;
        self.temperature = reading.temperature;
        if self.phase == ControlPhase::Unknown {
            self.phase = ControlPhase::FirstRun;
        }
    }

    /// Inclusive `(min, max)` temperatures that need no action.
    pub fn band(&self) -> Option<(u32, u32)> {
        self.target.map(|t| {
            (
                t.saturating_sub(self.hysteresis),
                t.saturating_add(self.hysteresis),
            )
        })
    }

    /// Run one control cycle and return the fan command to issue, if any.
    pub fn control_cycle(&mut self, device_index: usize) -> Option<FanAdjustment> {
        let (min_allowed, max_allowed) = self.band()?;
        if self.phase == ControlPhase::Unknown {
            return None;
        }

        let first_run = self.phase == ControlPhase::FirstRun;
        let fan_cur = self.fan_percent;
        let temp_cur = self.temperature;
        let (fan_last, temp_last) = if first_run {
            (fan_cur, temp_cur)
        } else {
            (self.last_fan_percent, self.last_temperature)
        };
        self.last_fan_percent = fan_cur;
        self.last_temperature = temp_cur;
        self.phase = ControlPhase::Steady;

        if (min_allowed..=max_allowed).contains(&temp_cur) {
            trace!(target: LOG_TARGET,
                "DEV #{} within acceptable limits: {}C in [{}, {}]",
                device_index, temp_cur, min_allowed, max_allowed
            );
            return None;
        }

        let (direction, severity) = if temp_cur > max_allowed {
            (
                TempTarget::Lower,
                severity_of(temp_cur - max_allowed, self.hysteresis),
            )
        } else {
            (
                TempTarget::Raise,
                severity_of(min_allowed - temp_cur, self.hysteresis),
            )
        };

        let (intent, fan_change) = fan_intent(fan_last, fan_cur);
        let fan_level = classify_fan_change(fan_change);
        let (trend, temp_change) = temperature_trend(temp_last, temp_cur);
        let temp_level = if temp_change == 0 {
            ChangeLevel::None
        } else if temp_change > self.hysteresis {
            ChangeLevel::Large
        } else {
            ChangeLevel::Small
        };
        trace!(target: LOG_TARGET,
            "DEV #{} first_run={} fan_change={} fan_level={:?} intent={:?} \
             temp_change={} temp_level={:?} trend={:?} severity={:?} direction={:?}",
            device_index, first_run, fan_change, fan_level, intent,
            temp_change, temp_level, trend, severity, direction
        );

        // Cold start or hot restart is unknowable, so only nudge upwards.
        if first_run {
            return match direction {
                TempTarget::Lower => Some(FanAdjustment::new(direction, ChangeLevel::Small)),
                _ => None,
            };
        }

        let level = if intent == TempTarget::None || intent == direction {
            match severity {
                Severity::Low => ChangeLevel::Small,
                Severity::High => ChangeLevel::Large,
            }
        } else {
            ChangeLevel::Small
        };
        Some(FanAdjustment::new(direction, level))
    }
}

fn severity_of(overshoot: u32, hysteresis: u32) -> Severity {
    if overshoot > hysteresis {
        Severity::High
    } else {
        Severity::Low
    }
}

/// What the previous command tried to do to the temperature, and by how much
/// the fan moved.
fn fan_intent(fan_last: u32, fan_cur: u32) -> (TempTarget, u32) {
    if fan_cur > fan_last {
        (TempTarget::Lower, fan_cur - fan_last)
    } else if fan_cur < fan_last {
        (TempTarget::Raise, fan_last - fan_cur)
    } else {
        (TempTarget::None, 0)
    }
}

/// Bucket a fan delta. Some drivers round or override requested duties, so a
/// delta that matches neither step goes to the nearest bucket.
pub fn classify_fan_change(change: u32) -> ChangeLevel {
    match change {
        0 => ChangeLevel::None,
        FAN_CHANGE_SMALL => ChangeLevel::Small,
        FAN_CHANGE_LARGE => ChangeLevel::Large,
        c if c < FAN_CHANGE_SMALL => ChangeLevel::Small,
        _ => ChangeLevel::Large,
    }
}

fn temperature_trend(temp_last: u32, temp_cur: u32) -> (Trend, u32) {
    if temp_cur > temp_last {
        (Trend::Up, temp_cur - temp_last)
    } else if temp_cur < temp_last {
        (Trend::Down, temp_last - temp_cur)
    } else {
        (Trend::Stable, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(target: u32, fan: u32, temp: u32) -> ThermalState {
        let mut s = ThermalState::new(Some(target));
        s.record_reading(FanTemp {
            fan_percent: fan,
            temperature: temp,
        });
        s
    }

    /// Run the first cycle, then feed a new reading.
    fn steady(target: u32, last_fan: u32, last_temp: u32, fan: u32, temp: u32) -> ThermalState {
        let mut s = state(target, last_fan, target);
        s.temperature = last_temp;
        s.control_cycle(0);
        s.record_reading(FanTemp {
            fan_percent: fan,
            temperature: temp,
        });
        s
    }

    fn adj(target: TempTarget, level: ChangeLevel) -> Option<FanAdjustment> {
        Some(FanAdjustment::new(target, level))
    }

    #[test]
    fn no_command_inside_band() {
        for temp in 67..=73 {
            assert_eq!(state(70, 40, temp).control_cycle(0), None);
            assert_eq!(steady(70, 40, 70, 50, temp).control_cycle(0), None);
        }
    }

    #[test]
    fn first_run_only_nudges_fans_up() {
        assert_eq!(
            state(70, 40, 90).control_cycle(0),
            adj(TempTarget::Lower, ChangeLevel::Small)
        );
        assert_eq!(state(70, 40, 50).control_cycle(0), None);
    }

    #[test]
    fn phases_advance_once() {
        let mut s = ThermalState::new(Some(70));
        assert_eq!(s.phase(), ControlPhase::Unknown);
        assert_eq!(s.control_cycle(0), None);
        s.record_reading(FanTemp {
            fan_percent: 40,
            temperature: 70,
        });
        assert_eq!(s.phase(), ControlPhase::FirstRun);
        s.control_cycle(0);
        assert_eq!(s.phase(), ControlPhase::Steady);
        s.record_reading(FanTemp {
            fan_percent: 40,
            temperature: 90,
        });
        assert_eq!(s.phase(), ControlPhase::Steady);
    }

    #[test]
    fn unchanged_fan_steps_by_severity() {
        // 75 is 2C over the band: low severity
        assert_eq!(
            steady(70, 40, 70, 40, 75).control_cycle(0),
            adj(TempTarget::Lower, ChangeLevel::Small)
        );
        // 80 is 7C over the band: high severity
        assert_eq!(
            steady(70, 40, 70, 40, 80).control_cycle(0),
            adj(TempTarget::Lower, ChangeLevel::Large)
        );
        // 60 is 7C under the band: high severity
        assert_eq!(
            steady(70, 40, 70, 40, 60).control_cycle(0),
            adj(TempTarget::Raise, ChangeLevel::Large)
        );
        // 65 is 2C under the band: low severity
        assert_eq!(
            steady(70, 40, 70, 40, 65).control_cycle(0),
            adj(TempTarget::Raise, ChangeLevel::Small)
        );
    }

    #[test]
    fn failed_correction_is_reinforced() {
        // Fan went up (trying to cool) and it is still far too hot.
        assert_eq!(
            steady(70, 40, 82, 50, 81).control_cycle(0),
            adj(TempTarget::Lower, ChangeLevel::Large)
        );
    }

    #[test]
    fn overshoot_is_corrected_gently() {
        // Fan went down (trying to warm up) but now it is far too hot.
        assert_eq!(
            steady(70, 50, 60, 40, 85).control_cycle(0),
            adj(TempTarget::Lower, ChangeLevel::Small)
        );
        // Fan went up (trying to cool) but now it is far too cold.
        assert_eq!(
            steady(70, 40, 80, 50, 55).control_cycle(0),
            adj(TempTarget::Raise, ChangeLevel::Small)
        );
    }

    #[test]
    fn unexpected_fan_deltas_round_to_a_bucket() {
        assert_eq!(classify_fan_change(0), ChangeLevel::None);
        assert_eq!(classify_fan_change(3), ChangeLevel::Small);
        assert_eq!(classify_fan_change(5), ChangeLevel::Small);
        assert_eq!(classify_fan_change(7), ChangeLevel::Large);
        assert_eq!(classify_fan_change(10), ChangeLevel::Large);
        assert_eq!(classify_fan_change(25), ChangeLevel::Large);
    }

    #[test]
    fn disabled_targeting_never_commands() {
        let mut s = ThermalState::new(None);
        s.record_reading(FanTemp {
            fan_percent: 40,
            temperature: 99,
        });
        assert_eq!(s.control_cycle(0), None);
    }

    #[test]
    fn low_targets_do_not_underflow() {
        assert_eq!(state(2, 40, 2).band(), Some((0, 5)));
        assert_eq!(state(2, 40, 0).control_cycle(0), None);
    }
}
