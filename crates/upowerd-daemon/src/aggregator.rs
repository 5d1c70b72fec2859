//! Registry mutation, `OnBattery`, the synthesized display device, and the
//! global warning level: the parts of the daemon core with no I/O, so they
//! can be exercised directly without a bus connection or a native source.

use std::collections::HashMap;

use upowerd_config::Config;
use upowerd_device::{Device, DeviceKind, DeviceState, Registry, Technology, WarningLevel, estimate_times};
use upowerd_warning::DeviceWarningState;

/// Object path of the synthesized aggregate device.
pub const DISPLAY_DEVICE_PATH: &str = "/org/freedesktop/UPower/devices/DisplayDevice";

/// Registry plus the state derived from it: per-device warning-level
/// hysteresis and `OnBattery`.
#[derive(Debug)]
pub struct Aggregator {
    registry: Registry,
    warning_states: HashMap<String, DeviceWarningState>,
    config: Config,
}

impl Aggregator {
    /// An aggregator with an empty registry, evaluated against `config`.
    pub fn new(config: Config) -> Self {
        Self {
            registry: Registry::new(),
            warning_states: HashMap::new(),
            config,
        }
    }

    /// The warning-threshold configuration devices are evaluated against.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read access to the underlying registry, e.g. for `EnumerateDevices`.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Inserts or replaces `device`, recomputing its warning level against
    /// the hysteresis state kept for its `object_path`. Returns the device
    /// with the recomputed level, for the caller to publish.
    pub fn upsert(&mut self, mut device: Device) -> Device {
        let state = self.warning_states.entry(device.object_path.clone()).or_default();
        device.warning_level = upowerd_warning::update(state, &device, &self.config);
        self.registry.upsert(device.clone());
        device
    }

    /// Removes the device at `path`, dropping its warning-level hysteresis
    /// state along with it. Whether this is called at all for a vanished
    /// peripheral, versus quarantining it first, is the debounce window's
    /// decision upstream, not this type's.
    pub fn remove(&mut self, path: &str) -> Option<Device> {
        self.warning_states.remove(path);
        self.registry.remove(path)
    }

    /// True iff some `power_supply` battery or UPS is discharging and no
    /// `power_supply` line-power source is online.
    pub fn on_battery(&self) -> bool {
        let discharging_source = self.registry.iter().any(|device| {
            device.power_supply
                && matches!(device.kind, DeviceKind::Battery | DeviceKind::Ups)
                && matches!(device.state, DeviceState::Discharging | DeviceState::PendingDischarge)
        });

        let online_line_power = self
            .registry
            .iter()
            .any(|device| device.power_supply && matches!(device.kind, DeviceKind::LinePower) && device.online);

        discharging_source && !online_line_power
    }

    /// Worst warning level across every currently-present `power_supply`
    /// device (excludes the synthetic display device itself).
    pub fn global_warning_level(&self) -> WarningLevel {
        upowerd_warning::global_level(self.registry.iter())
    }

    /// Synthesizes the aggregate display device from every `power_supply`
    /// battery/UPS currently registered, and recomputes its warning level
    /// the same way any other device's is computed.
    pub fn display_device(&mut self) -> Device {
        let sources: Vec<&Device> = self
            .registry
            .iter()
            .filter(|device| device.power_supply && matches!(device.kind, DeviceKind::Battery | DeviceKind::Ups))
            .collect();

        let mut device = match sources.as_slice() {
            [] => empty_display_device(),
            [only] => mirror_display_device(only),
            many => aggregate_display_device(many),
        };

        let state = self.warning_states.entry(DISPLAY_DEVICE_PATH.to_string()).or_default();
        device.warning_level = upowerd_warning::update(state, &device, &self.config);
        device
    }
}

fn empty_display_device() -> Device {
    let raw = upowerd_device::RawSnapshot {
        native_path: "DisplayDevice".to_string(),
        kind: DeviceKind::Unknown,
        scope: upowerd_device::Scope::System,
        status: upowerd_device::RawStatus::Full,
        present: Some(false),
        ..Default::default()
    };
    let mut device = Device::normalize(None, &raw, 0, false);
    device.object_path = DISPLAY_DEVICE_PATH.to_string();
    device
}

fn mirror_display_device(only: &Device) -> Device {
    let mut mirrored = only.clone();
    mirrored.object_path = DISPLAY_DEVICE_PATH.to_string();
    mirrored
}

/// Sums energy and rate across every source and recomputes the
/// aggregate's own percentage, state, and time estimates from those sums,
/// rather than averaging any individual source's derived fields.
///
/// Seeded from `sources[0]` purely to obtain a valid rate-smoother value
/// for the struct (that field is private to `upowerd-device` and not part
/// of this aggregate's own math); every field the aggregate actually
/// reports is overwritten below.
fn aggregate_display_device(sources: &[&Device]) -> Device {
    let energy: f64 = sources.iter().map(|d| d.energy).sum();
    let energy_full: f64 = sources.iter().map(|d| d.energy_full).sum();
    let energy_full_design: f64 = sources.iter().map(|d| d.energy_full_design).sum();
    let energy_rate: f64 = sources.iter().map(|d| d.energy_rate).sum();
    let now = sources.iter().map(|d| d.update_time).max().unwrap_or(0);

    let state = if sources.iter().any(|d| matches!(d.state, DeviceState::Charging)) {
        DeviceState::Charging
    } else if sources.iter().all(|d| matches!(d.state, DeviceState::FullyCharged)) {
        DeviceState::FullyCharged
    } else if sources.iter().any(|d| matches!(d.state, DeviceState::Discharging)) {
        DeviceState::Discharging
    } else {
        DeviceState::Unknown
    };

    let percentage = if energy_full > 0.0 { (energy / energy_full * 100.0).clamp(0.0, 100.0) } else { 0.0 };
    let capacity = if energy_full_design > 0.0 { (energy_full / energy_full_design * 100.0).clamp(0.0, 100.0) } else { 0.0 };
    let (time_to_empty, time_to_full) = estimate_times(state, energy, energy_full, energy_rate);

    let mut device = sources[0].clone();
    device.object_path = DISPLAY_DEVICE_PATH.to_string();
    device.kind = DeviceKind::Battery;
    device.native_path = "DisplayDevice".to_string();
    device.state = state;
    device.online = false;
    device.is_present = true;
    device.is_rechargeable = true;
    device.power_supply = true;
    device.percentage = percentage;
    device.energy = energy;
    device.energy_empty = 0.0;
    device.energy_full = energy_full;
    device.energy_full_design = energy_full_design;
    device.energy_rate = energy_rate;
    device.voltage = 0.0;
    device.temperature = 0.0;
    device.time_to_empty = time_to_empty;
    device.time_to_full = time_to_full;
    device.capacity = capacity;
    device.technology = Technology::Unknown;
    device.vendor = String::new();
    device.model = String::new();
    device.serial = String::new();
    device.update_time = now;
    device
}

#[cfg(test)]
mod tests {
    use upowerd_device::{RawSnapshot, RawStatus, Scope};

    use super::*;

    fn battery(native_path: &str, energy_now_uwh: f64, energy_full_uwh: f64, status: RawStatus) -> Device {
        let raw = RawSnapshot {
            native_path: native_path.to_string(),
            kind: DeviceKind::Battery,
            scope: Scope::System,
            status,
            present: Some(true),
            energy_now_uwh: Some(energy_now_uwh),
            energy_full_uwh: Some(energy_full_uwh),
            ..Default::default()
        };
        Device::normalize(None, &raw, 0, false)
    }

    fn line_power(online: bool) -> Device {
        let raw = RawSnapshot {
            native_path: "AC0".to_string(),
            kind: DeviceKind::LinePower,
            scope: Scope::System,
            online: Some(online),
            present: Some(true),
            ..Default::default()
        };
        Device::normalize(None, &raw, 0, false)
    }

    #[test]
    fn on_battery_true_when_discharging_and_no_line_power_online() {
        let mut aggregator = Aggregator::new(Config::default());
        aggregator.upsert(battery("BAT0", 48_000_000.0, 60_000_000.0, RawStatus::Discharging));
        assert!(aggregator.on_battery());
    }

    #[test]
    fn on_battery_false_when_line_power_online() {
        let mut aggregator = Aggregator::new(Config::default());
        aggregator.upsert(battery("BAT0", 48_000_000.0, 60_000_000.0, RawStatus::Discharging));
        aggregator.upsert(line_power(true));
        assert!(!aggregator.on_battery());
    }

    #[test]
    fn on_battery_false_with_no_battery_or_line_power() {
        let aggregator = Aggregator::new(Config::default());
        assert!(!aggregator.on_battery());
    }

    #[test]
    fn display_device_with_no_batteries_is_unknown_and_fully_charged() {
        let mut aggregator = Aggregator::new(Config::default());
        let display = aggregator.display_device();
        assert_eq!(display.kind, DeviceKind::Unknown);
        assert_eq!(display.state, DeviceState::FullyCharged);
        assert_eq!(display.warning_level, WarningLevel::None);
        assert_eq!(display.object_path, DISPLAY_DEVICE_PATH);
    }

    #[test]
    fn display_device_with_one_battery_mirrors_it() {
        let mut aggregator = Aggregator::new(Config::default());
        aggregator.upsert(battery("BAT0", 48_000_000.0, 60_000_000.0, RawStatus::Discharging));

        let display = aggregator.display_device();
        assert_eq!(display.percentage, 80.0);
        assert_eq!(display.object_path, DISPLAY_DEVICE_PATH);
    }

    #[test]
    fn display_device_aggregates_multiple_batteries() {
        let mut aggregator = Aggregator::new(Config::default());
        aggregator.upsert(battery("BAT0", 30_000_000.0, 60_000_000.0, RawStatus::Discharging));
        aggregator.upsert(battery("BAT1", 3_000_000.0, 20_000_000.0, RawStatus::Discharging));

        let display = aggregator.display_device();
        assert_eq!(display.energy, 33.0);
        assert_eq!(display.energy_full, 80.0);
        assert_eq!(display.percentage, 41.25);
        assert_eq!(display.state, DeviceState::Discharging);
    }

    #[test]
    fn display_device_is_charging_if_any_source_is_charging() {
        let mut aggregator = Aggregator::new(Config::default());
        aggregator.upsert(battery("BAT0", 30_000_000.0, 60_000_000.0, RawStatus::Charging));
        aggregator.upsert(battery("BAT1", 20_000_000.0, 20_000_000.0, RawStatus::Full));

        let display = aggregator.display_device();
        assert_eq!(display.state, DeviceState::Charging);
    }

    #[test]
    fn remove_drops_device_from_registry() {
        let mut aggregator = Aggregator::new(Config::default());
        let device = aggregator.upsert(battery("BAT0", 48_000_000.0, 60_000_000.0, RawStatus::Discharging));
        assert!(aggregator.remove(&device.object_path).is_some());
        assert!(aggregator.registry().is_empty());
    }
}
