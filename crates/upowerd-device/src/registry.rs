//! Mapping from stable object path to the current `Device` sample for it.

use std::collections::HashMap;

use crate::device::Device;

/// Registry of currently known devices, keyed by `object_path`.
///
/// Insertion order is irrelevant; `object_path` stability across refreshes
/// (and across a peripheral's remove/re-add debounce window) is what lets
/// history and warning-level state survive a refresh.
#[derive(Debug, Default)]
pub struct Registry {
    devices: HashMap<String, Device>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the device at its `object_path`.
    pub fn upsert(&mut self, device: Device) {
        self.devices.insert(device.object_path.clone(), device);
    }

    /// Removes the device at `path`, if present.
    pub fn remove(&mut self, path: &str) -> Option<Device> {
        self.devices.remove(path)
    }

    /// Looks up a device by object path.
    pub fn get(&self, path: &str) -> Option<&Device> {
        self.devices.get(path)
    }

    /// Iterates over all currently registered devices.
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Number of currently registered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the registry currently holds no devices.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{RawSnapshot, RawStatus};
    use crate::types::{DeviceKind, Scope};

    fn sample(native_path: &str) -> Device {
        let raw = RawSnapshot {
            native_path: native_path.to_string(),
            kind: DeviceKind::Battery,
            scope: Scope::System,
            status: RawStatus::Discharging,
            energy_now_uwh: Some(1_000_000.0),
            energy_full_uwh: Some(2_000_000.0),
            ..Default::default()
        };
        Device::normalize(None, &raw, 0, false)
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let mut registry = Registry::new();
        let device = sample("BAT0");
        let path = device.object_path.clone();
        registry.upsert(device);
        assert!(registry.get(&path).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_drops_device() {
        let mut registry = Registry::new();
        let device = sample("BAT0");
        let path = device.object_path.clone();
        registry.upsert(device);
        let removed = registry.remove(&path);
        assert!(removed.is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn same_native_path_reuses_object_path() {
        let mut registry = Registry::new();
        let first = sample("mouse0");
        let path = first.object_path.clone();
        registry.upsert(first);

        let second = sample("mouse0");
        assert_eq!(second.object_path, path);
    }
}
