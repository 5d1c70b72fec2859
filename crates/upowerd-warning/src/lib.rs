//! Per-device and global warning-level computation.
//!
//! Thresholds are configurable (see [`upowerd_config::Config`]); crossing one
//! while discharging raises the device's level, but leaving a tier requires
//! the percentage to recover past the entry point *and* the device to stop
//! discharging, so a reading that blips a fraction of a point above a
//! threshold doesn't flap the level back and forth.

use upowerd_config::Config;
use upowerd_device::{Device, DeviceKind, DeviceState, WarningLevel};

/// Hysteresis state the caller keeps per device, alongside the device
/// itself, across calls to [`update`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceWarningState {
    level: WarningLevel,
    entry_percentage: f64,
}

impl DeviceWarningState {
    /// Creates a fresh hysteresis state for a newly registered device.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently held warning level.
    pub fn level(&self) -> WarningLevel {
        self.level
    }
}

/// Recomputes a device's warning level, applying hysteresis against the
/// level it was last holding.
///
/// Returns the new level; `state` is updated in place so the next call sees
/// the right entry point.
pub fn update(state: &mut DeviceWarningState, device: &Device, config: &Config) -> WarningLevel {
    let raw = raw_threshold_level(device, config);

    let natural = if device.state == DeviceState::Discharging {
        if raw == WarningLevel::None && device.kind == DeviceKind::Ups {
            WarningLevel::Discharging
        } else {
            raw
        }
    } else {
        WarningLevel::None
    };

    let in_tier = is_hysteresis_tier(state.level);

    let next = if in_tier && natural < state.level {
        let cleared = device.percentage >= state.entry_percentage + 1.0
            && device.state != DeviceState::Discharging;
        if cleared { natural } else { state.level }
    } else {
        natural
    };

    if is_hysteresis_tier(next) && !in_tier {
        state.entry_percentage = device.percentage;
    }

    state.level = next;
    next
}

fn is_hysteresis_tier(level: WarningLevel) -> bool {
    matches!(level, WarningLevel::Low | WarningLevel::Critical | WarningLevel::Action)
}

/// Pure threshold evaluation, ignoring hysteresis and the UPS-discharging
/// default: what level would this device be at right now, in isolation.
fn raw_threshold_level(device: &Device, config: &Config) -> WarningLevel {
    let pct = device.percentage;
    let time_crosses = |threshold_secs: u64| {
        !config.use_percentage_for_policy && device.time_to_empty > 0 && device.time_to_empty <= threshold_secs
    };

    if pct <= config.percentage_action || time_crosses(config.time_action) {
        WarningLevel::Action
    } else if pct <= config.percentage_critical || time_crosses(config.time_critical) {
        WarningLevel::Critical
    } else if pct <= config.percentage_low || time_crosses(config.time_low) {
        WarningLevel::Low
    } else {
        WarningLevel::None
    }
}

/// Worst warning level across every currently-present `power_supply` device
/// (batteries, UPS, and line-power sources able to report one).
pub fn global_level<'a>(devices: impl Iterator<Item = &'a Device>) -> WarningLevel {
    devices
        .filter(|d| d.power_supply && d.is_present)
        .map(|d| d.warning_level)
        .max()
        .unwrap_or(WarningLevel::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use upowerd_device::{RawSnapshot, RawStatus, Scope};

    fn discharging_battery(percentage_energy_now_uwh: f64) -> Device {
        let raw = RawSnapshot {
            native_path: "BAT0".to_string(),
            kind: DeviceKind::Battery,
            scope: Scope::System,
            status: RawStatus::Discharging,
            energy_full_uwh: Some(100_000_000.0),
            energy_now_uwh: Some(percentage_energy_now_uwh),
            ..Default::default()
        };
        Device::normalize(None, &raw, 0, false)
    }

    #[test]
    fn percentage_exactly_two_is_action() {
        let device = discharging_battery(2_000_000.0);
        assert_eq!(device.percentage, 2.0);

        let config = Config::default();
        let mut state = DeviceWarningState::new();
        let level = update(&mut state, &device, &config);
        assert_eq!(level, WarningLevel::Action);
    }

    #[test]
    fn hysteresis_holds_action_on_small_rise_while_discharging() {
        let config = Config::default();
        let mut state = DeviceWarningState::new();

        let first = discharging_battery(2_000_000.0);
        update(&mut state, &first, &config);

        let second = discharging_battery(2_500_000.0);
        assert_eq!(second.percentage, 2.5);
        let level = update(&mut state, &second, &config);
        assert_eq!(level, WarningLevel::Action);
    }

    #[test]
    fn clears_once_risen_past_entry_and_not_discharging() {
        let config = Config::default();
        let mut state = DeviceWarningState::new();

        let low = discharging_battery(2_000_000.0);
        update(&mut state, &low, &config);

        let raw = RawSnapshot {
            native_path: "BAT0".to_string(),
            kind: DeviceKind::Battery,
            scope: Scope::System,
            status: RawStatus::Charging,
            energy_full_uwh: Some(100_000_000.0),
            energy_now_uwh: Some(4_000_000.0),
            ..Default::default()
        };
        let recovering = Device::normalize(Some(&low), &raw, 20, false);
        let level = update(&mut state, &recovering, &config);
        assert_eq!(level, WarningLevel::None);
    }

    #[test]
    fn escalates_immediately_without_hysteresis_delay() {
        let config = Config::default();
        let mut state = DeviceWarningState::new();

        let low = discharging_battery(9_000_000.0);
        assert_eq!(update(&mut state, &low, &config), WarningLevel::Low);

        let action = discharging_battery(1_000_000.0);
        assert_eq!(update(&mut state, &action, &config), WarningLevel::Action);
    }

    #[test]
    fn not_discharging_device_reports_none() {
        let raw = RawSnapshot {
            native_path: "BAT0".to_string(),
            kind: DeviceKind::Battery,
            scope: Scope::System,
            status: RawStatus::Charging,
            energy_full_uwh: Some(100_000_000.0),
            energy_now_uwh: Some(1_000_000.0),
            ..Default::default()
        };
        let device = Device::normalize(None, &raw, 0, false);
        let config = Config::default();
        let mut state = DeviceWarningState::new();
        assert_eq!(update(&mut state, &device, &config), WarningLevel::None);
    }

    #[test]
    fn discharging_ups_below_thresholds_gets_discharging_level() {
        let raw = RawSnapshot {
            native_path: "ups0".to_string(),
            kind: DeviceKind::Ups,
            scope: Scope::System,
            status: RawStatus::Discharging,
            energy_full_uwh: Some(100_000_000.0),
            energy_now_uwh: Some(90_000_000.0),
            ..Default::default()
        };
        let device = Device::normalize(None, &raw, 0, false);
        let config = Config::default();
        let mut state = DeviceWarningState::new();
        assert_eq!(update(&mut state, &device, &config), WarningLevel::Discharging);
    }

    #[test]
    fn global_level_is_worst_among_present_power_supply_devices() {
        let mut none_device = discharging_battery(50_000_000.0);
        none_device.power_supply = true;
        none_device.is_present = true;
        none_device.warning_level = WarningLevel::None;

        let mut critical_device = discharging_battery(3_000_000.0);
        critical_device.power_supply = true;
        critical_device.is_present = true;
        critical_device.warning_level = WarningLevel::Critical;

        let mut peripheral = discharging_battery(1_000_000.0);
        peripheral.power_supply = false;
        peripheral.warning_level = WarningLevel::Action;

        let devices = vec![none_device, critical_device, peripheral];
        assert_eq!(global_level(devices.iter()), WarningLevel::Critical);
    }
}
