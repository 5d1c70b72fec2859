//! Device model and the normalization algorithm that produces it from raw
//! native-source snapshots.

use upowerd_common::sanitize::sanitize_str;

use crate::rate::RateSmoother;
use crate::snapshot::{RawSnapshot, RawStatus};
use crate::types::{DeviceKind, DeviceState, Scope, Technology, WarningLevel, object_path_for};

/// Time estimates outside this window are reported as unknown (`0`), per the
/// normalization algorithm's clamp.
const MIN_TIME_ESTIMATE_SECS: u64 = 60;
const MAX_TIME_ESTIMATE_SECS: u64 = 240 * 3600;

/// A fully normalized power device, as published on the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Stable object path, derived from `(kind, native_path)`.
    pub object_path: String,
    /// What kind of device this is.
    pub kind: DeviceKind,
    /// Current charge/discharge state.
    pub state: DeviceState,
    /// Line-power only: whether mains power is present.
    pub online: bool,
    /// Whether the device is currently present/attached.
    pub is_present: bool,
    /// Whether the device holds a rechargeable cell.
    pub is_rechargeable: bool,
    /// Whether this device can power the host.
    pub power_supply: bool,
    /// Charge percentage, clamped to `[0, 100]`.
    pub percentage: f64,
    /// Current energy, in Wh.
    pub energy: f64,
    /// Energy at which the device is considered empty, in Wh.
    pub energy_empty: f64,
    /// Energy at full charge, in Wh.
    pub energy_full: f64,
    /// Design energy capacity when new, in Wh.
    pub energy_full_design: f64,
    /// Magnitude of charge/discharge rate, in W.
    pub energy_rate: f64,
    /// Terminal voltage, in V.
    pub voltage: f64,
    /// Temperature, in °C.
    pub temperature: f64,
    /// Seconds until empty; `0` means unknown.
    pub time_to_empty: u64,
    /// Seconds until full; `0` means unknown.
    pub time_to_full: u64,
    /// Health, `energy_full / energy_full_design * 100`.
    pub capacity: f64,
    /// Battery chemistry.
    pub technology: Technology,
    /// Current warning severity. Carried forward from the prior sample;
    /// recomputed by the warning engine, not by normalization.
    pub warning_level: WarningLevel,
    /// Sanitized vendor string.
    pub vendor: String,
    /// Sanitized model string.
    pub model: String,
    /// Sanitized serial string.
    pub serial: String,
    /// Monotonic timestamp of this update, in seconds.
    pub update_time: u64,
    /// Opaque native identity string.
    pub native_path: String,

    rate_smoother: RateSmoother,
}

impl Device {
    /// Produces a new [`Device`] from a raw snapshot and the prior sample for
    /// the same `object_path`, if any.
    ///
    /// `ac_online` resolves the `state = unknown` fallback when there is no
    /// prior sample to compare trend against: it reflects whether any
    /// system-scope line-power source is currently online, which a single
    /// device's own snapshot cannot know on its own.
    pub fn normalize(prior: Option<&Device>, raw: &RawSnapshot, now: u64, ac_online: bool) -> Device {
        let object_path = object_path_for(raw.kind, &raw.native_path);

        let is_present = raw.present.unwrap_or(true);
        let online = raw.online.unwrap_or(false);
        let power_supply =
            matches!(raw.scope, Scope::System) && matches!(raw.kind, DeviceKind::Battery | DeviceKind::Ups | DeviceKind::LinePower);

        let voltage = raw.voltage_now_uv.map(|v| v / 1_000_000.0).unwrap_or(0.0);
        let temperature = raw
            .temperature_decidegrees
            .map(|t| t / 10.0)
            .unwrap_or(0.0);

        let (mut energy, mut energy_full, mut energy_full_design, mut percentage) =
            derive_energy(raw, voltage);

        let state = resolve_state(raw.status, prior, energy, ac_online);

        if matches!(state, DeviceState::FullyCharged) && percentage > 100.0 {
            percentage = 100.0;
            energy_full = energy;
        }
        percentage = percentage.clamp(0.0, 100.0);

        if energy > energy_full {
            energy_full = energy;
        }
        if energy_full > energy_full_design {
            energy_full_design = energy_full;
        }

        let capacity = if energy_full_design > 0.0 {
            (energy_full / energy_full_design * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        let mut rate_smoother = prior.map(|p| p.rate_smoother).unwrap_or_default();
        let instantaneous_w = raw
            .power_now_uw
            .map(|p| p / 1_000_000.0)
            .or_else(|| {
                raw.current_now_ua
                    .map(|i| i / 1_000_000.0 * voltage)
            });
        let energy_rate = rate_smoother.update(energy, now, state, instantaneous_w);

        if matches!(state, DeviceState::FullyCharged) {
            energy = energy_full;
            percentage = 100.0;
        }

        let (time_to_empty, time_to_full) = estimate_times(state, energy, energy_full, energy_rate);

        let vendor = raw.vendor.as_deref().map(sanitize_str).unwrap_or_default();
        let model = raw.model.as_deref().map(sanitize_str).unwrap_or_default();
        let serial = raw.serial.as_deref().map(sanitize_str).unwrap_or_default();

        let technology = raw
            .technology
            .as_deref()
            .map(Technology::parse)
            .unwrap_or(Technology::Unknown);

        let warning_level = prior.map(|p| p.warning_level).unwrap_or(WarningLevel::Unknown);

        Device {
            object_path,
            kind: raw.kind,
            state,
            online,
            is_present,
            is_rechargeable: !matches!(raw.kind, DeviceKind::LinePower),
            power_supply,
            percentage,
            energy,
            energy_empty: 0.0,
            energy_full,
            energy_full_design,
            energy_rate,
            voltage,
            temperature,
            time_to_empty,
            time_to_full,
            capacity,
            technology,
            warning_level,
            vendor,
            model,
            serial,
            update_time: now,
            native_path: raw.native_path.clone(),
            rate_smoother,
        }
    }
}

/// Implements the precedence table in the normalization algorithm: which raw
/// inputs determine `energy`, `energy_full`, `energy_full_design`, and
/// `percentage`.
fn derive_energy(raw: &RawSnapshot, voltage: f64) -> (f64, f64, f64, f64) {
    let energy_full_design = raw
        .energy_full_design_uwh
        .map(|v| v / 1_000_000.0)
        .or_else(|| raw.charge_full_design_uah.map(|v| v / 1_000_000.0 * voltage));

    // energy_full + energy_now: energy fields win outright (also covers the
    // "energy fields + capacity" row: a present capacity is ignored).
    if let (Some(e), Some(ef)) = (raw.energy_now_uwh, raw.energy_full_uwh) {
        let energy = e / 1_000_000.0;
        let energy_full = ef / 1_000_000.0;
        let percentage = if energy_full > 0.0 { energy / energy_full * 100.0 } else { 0.0 };
        return (energy, energy_full, energy_full_design.unwrap_or(energy_full), percentage);
    }

    // charge_full + charge_now + voltage_now.
    if let (Some(c), Some(cf)) = (raw.charge_now_uah, raw.charge_full_uah) {
        let energy = c / 1_000_000.0 * voltage;
        let energy_full = cf / 1_000_000.0 * voltage;
        let percentage = if energy_full > 0.0 { energy / energy_full * 100.0 } else { 0.0 };
        return (energy, energy_full, energy_full_design.unwrap_or(energy_full), percentage);
    }

    // charge_full + capacity + voltage_now (no charge_now).
    if let (Some(cf), Some(cap)) = (raw.charge_full_uah, raw.capacity_percent) {
        let energy_full = cf / 1_000_000.0 * voltage;
        let energy = energy_full * cap / 100.0;
        return (energy, energy_full, energy_full_design.unwrap_or(energy_full), cap);
    }

    // capacity only: percentage = capacity, energy fields stay unknown (0).
    if let Some(cap) = raw.capacity_percent {
        return (0.0, 0.0, energy_full_design.unwrap_or(0.0), cap);
    }

    (0.0, 0.0, energy_full_design.unwrap_or(0.0), 0.0)
}

/// Resolves `state`, falling back to trend comparison when the source
/// reports an unrecognized or absent status.
fn resolve_state(status: RawStatus, prior: Option<&Device>, energy: f64, ac_online: bool) -> DeviceState {
    match status {
        RawStatus::Charging => DeviceState::Charging,
        RawStatus::Discharging => DeviceState::Discharging,
        RawStatus::Full => DeviceState::FullyCharged,
        RawStatus::NotCharging => DeviceState::PendingCharge,
        RawStatus::Unknown => match prior {
            Some(prior) => {
                if energy > prior.energy {
                    DeviceState::Charging
                } else if energy < prior.energy {
                    DeviceState::Discharging
                } else if prior.percentage >= 100.0 {
                    DeviceState::FullyCharged
                } else {
                    prior.state
                }
            }
            None if ac_online => DeviceState::Charging,
            None => DeviceState::Discharging,
        },
    }
}

/// Implements the `[60s, 240h]` clamp: values outside the window mean
/// "unknown" and are reported as `0`.
///
/// Exposed beyond this crate so the display device's aggregate estimates
/// (summed energy and rate across every battery) clamp the same way a
/// single device's do.
pub fn estimate_times(state: DeviceState, energy: f64, energy_full: f64, rate_w: f64) -> (u64, u64) {
    if rate_w <= 0.0 {
        return (0, 0);
    }

    match state {
        DeviceState::Discharging => {
            let secs = (energy / rate_w * 3600.0) as u64;
            (clamp_estimate(secs), 0)
        }
        DeviceState::Charging => {
            let remaining = (energy_full - energy).max(0.0);
            let secs = (remaining / rate_w * 3600.0) as u64;
            (0, clamp_estimate(secs))
        }
        _ => (0, 0),
    }
}

fn clamp_estimate(secs: u64) -> u64 {
    if secs < MIN_TIME_ESTIMATE_SECS || secs > MAX_TIME_ESTIMATE_SECS {
        0
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery_snapshot() -> RawSnapshot {
        RawSnapshot {
            native_path: "BAT0".to_string(),
            kind: DeviceKind::Battery,
            scope: Scope::System,
            status: RawStatus::Discharging,
            present: Some(true),
            energy_full_uwh: Some(60_000_000.0),
            energy_full_design_uwh: Some(80_000_000.0),
            energy_now_uwh: Some(48_000_000.0),
            voltage_now_uv: Some(12_000_000.0),
            ..Default::default()
        }
    }

    #[test]
    fn scenario_offline_ac_single_battery() {
        let device = Device::normalize(None, &battery_snapshot(), 0, false);
        assert_eq!(device.percentage, 80.0);
        assert_eq!(device.energy, 48.0);
        assert_eq!(device.energy_full, 60.0);
        assert_eq!(device.energy_full_design, 80.0);
        assert_eq!(device.voltage, 12.0);
        assert_eq!(device.state, DeviceState::Discharging);
    }

    #[test]
    fn scenario_critical_battery() {
        let mut raw = battery_snapshot();
        raw.energy_now_uwh = Some(1_500_000.0);
        let device = Device::normalize(None, &raw, 0, false);
        assert_eq!(device.percentage, 2.5);
    }

    #[test]
    fn scenario_overfull_full_battery() {
        let raw = RawSnapshot {
            native_path: "BAT0".to_string(),
            kind: DeviceKind::Battery,
            scope: Scope::System,
            status: RawStatus::Full,
            charge_now_uah: Some(11_000_000.0),
            charge_full_uah: Some(10_000_000.0),
            charge_full_design_uah: Some(11_000_000.0),
            capacity_percent: Some(110.0),
            voltage_now_uv: Some(12_000_000.0),
            ..Default::default()
        };
        let device = Device::normalize(None, &raw, 0, false);
        assert_eq!(device.percentage, 100.0);
        assert_eq!(device.state, DeviceState::FullyCharged);
        assert_eq!(device.energy, 132.0);
        assert_eq!(device.energy_full, 132.0);
        assert_eq!(device.energy_full_design, 132.0);
        assert_eq!(device.energy_rate, 0.0);
        assert_eq!(device.time_to_empty, 0);
        assert_eq!(device.time_to_full, 0);
    }

    #[test]
    fn scenario_capacity_only_battery() {
        let raw = RawSnapshot {
            native_path: "BAT0".to_string(),
            kind: DeviceKind::Battery,
            scope: Scope::System,
            status: RawStatus::Discharging,
            charge_full_uah: Some(10_500_000.0),
            charge_full_design_uah: Some(11_000_000.0),
            capacity_percent: Some(40.0),
            voltage_now_uv: Some(12_000_000.0),
            ..Default::default()
        };
        let device = Device::normalize(None, &raw, 0, false);
        assert_eq!(device.percentage, 40.0);
        assert_eq!(device.energy, 50.4);
        assert_eq!(device.energy_full, 126.0);
        assert_eq!(device.energy_full_design, 132.0);
    }

    #[test]
    fn empty_battery_reports_zero_percent_without_changing_state() {
        let mut raw = battery_snapshot();
        raw.energy_now_uwh = Some(0.0);
        let device = Device::normalize(None, &raw, 0, false);
        assert_eq!(device.percentage, 0.0);
        assert_eq!(device.state, DeviceState::Discharging);
    }

    #[test]
    fn unknown_state_resolves_via_energy_trend() {
        let first = Device::normalize(None, &battery_snapshot(), 0, false);

        let mut raw = battery_snapshot();
        raw.status = RawStatus::Unknown;
        raw.energy_now_uwh = Some(50_000_000.0);
        let second = Device::normalize(Some(&first), &raw, 100, false);
        assert_eq!(second.state, DeviceState::Charging);
    }

    #[test]
    fn unknown_state_with_no_prior_falls_back_to_ac_online() {
        let mut raw = battery_snapshot();
        raw.status = RawStatus::Unknown;
        let device = Device::normalize(None, &raw, 0, true);
        assert_eq!(device.state, DeviceState::Charging);
    }

    #[test]
    fn peripheral_has_no_power_supply_flag() {
        let raw = RawSnapshot {
            native_path: "mouse0".to_string(),
            kind: DeviceKind::Mouse,
            scope: Scope::Device,
            status: RawStatus::Discharging,
            capacity_percent: Some(30.0),
            ..Default::default()
        };
        let device = Device::normalize(None, &raw, 0, false);
        assert!(!device.power_supply);
        assert_eq!(device.percentage, 30.0);
    }

    #[test]
    fn time_estimates_outside_clamp_window_are_unknown() {
        // 0.001W rate against 1Wh remaining would take ~40 days: within the
        // 240h clamp, still valid; push further out to exceed it.
        let mut raw = battery_snapshot();
        raw.energy_now_uwh = Some(59_999_000.0); // nearly full, tiny remaining energy
        let first = Device::normalize(None, &raw, 0, false);
        raw.energy_now_uwh = Some(59_998_999.0);
        let second = Device::normalize(Some(&first), &raw, 20, false);
        assert_eq!(second.time_to_empty, 0);
    }
}
