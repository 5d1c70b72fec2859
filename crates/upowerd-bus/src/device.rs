//! The `org.freedesktop.UPower.Device` object, one instance per registry
//! entry plus the synthetic display device.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use derive_more::Debug;
use upowerd_common::Property;
use upowerd_device::Device;
use upowerd_history::{HistoryStore, SeriesKind};
use zbus::interface;

use crate::wire;

/// D-Bus object wrapping a [`Device`] snapshot.
///
/// `device` is a [`Property`] rather than a plain field so the bus
/// surface's coalescing task can subscribe to changes with
/// [`Property::watch`] independently of however often the aggregator
/// mutates it.
#[derive(Debug)]
pub struct DeviceObject {
    pub(crate) device: Property<Device>,
    #[debug(skip)]
    history: Arc<HistoryStore>,
}

impl DeviceObject {
    /// Wraps `device`, backed by `history` for the history/statistics
    /// methods.
    pub fn new(device: Device, history: Arc<HistoryStore>) -> Self {
        Self {
            device: Property::new(device),
            history,
        }
    }
}

#[interface(name = "org.freedesktop.UPower.Device")]
impl DeviceObject {
    #[zbus(property)]
    async fn native_path(&self) -> String {
        self.device.get().native_path
    }

    #[zbus(property)]
    async fn vendor(&self) -> String {
        self.device.get().vendor
    }

    #[zbus(property)]
    async fn model(&self) -> String {
        self.device.get().model
    }

    #[zbus(property)]
    async fn serial(&self) -> String {
        self.device.get().serial
    }

    #[zbus(property)]
    async fn update_time(&self) -> u64 {
        self.device.get().update_time
    }

    #[zbus(property(name = "Type"))]
    async fn type_(&self) -> u32 {
        wire::kind_code(self.device.get().kind)
    }

    #[zbus(property)]
    async fn power_supply(&self) -> bool {
        self.device.get().power_supply
    }

    #[zbus(property)]
    async fn has_history(&self) -> bool {
        true
    }

    #[zbus(property)]
    async fn has_statistics(&self) -> bool {
        true
    }

    #[zbus(property)]
    async fn online(&self) -> bool {
        self.device.get().online
    }

    #[zbus(property)]
    async fn energy(&self) -> f64 {
        self.device.get().energy
    }

    #[zbus(property)]
    async fn energy_empty(&self) -> f64 {
        self.device.get().energy_empty
    }

    #[zbus(property)]
    async fn energy_full(&self) -> f64 {
        self.device.get().energy_full
    }

    #[zbus(property)]
    async fn energy_full_design(&self) -> f64 {
        self.device.get().energy_full_design
    }

    #[zbus(property)]
    async fn energy_rate(&self) -> f64 {
        self.device.get().energy_rate
    }

    #[zbus(property)]
    async fn voltage(&self) -> f64 {
        self.device.get().voltage
    }

    #[zbus(property)]
    async fn temperature(&self) -> f64 {
        self.device.get().temperature
    }

    #[zbus(property)]
    async fn time_to_empty(&self) -> i64 {
        self.device.get().time_to_empty as i64
    }

    #[zbus(property)]
    async fn time_to_full(&self) -> i64 {
        self.device.get().time_to_full as i64
    }

    #[zbus(property)]
    async fn percentage(&self) -> f64 {
        self.device.get().percentage
    }

    #[zbus(property)]
    async fn is_present(&self) -> bool {
        self.device.get().is_present
    }

    #[zbus(property)]
    async fn state(&self) -> u32 {
        wire::state_code(self.device.get().state)
    }

    #[zbus(property)]
    async fn is_rechargeable(&self) -> bool {
        self.device.get().is_rechargeable
    }

    #[zbus(property)]
    async fn capacity(&self) -> f64 {
        self.device.get().capacity
    }

    #[zbus(property)]
    async fn technology(&self) -> u32 {
        wire::technology_code(self.device.get().technology)
    }

    #[zbus(property)]
    async fn warning_level(&self) -> u32 {
        wire::warning_level_code(self.device.get().warning_level)
    }

    #[zbus(property)]
    async fn icon_name(&self) -> String {
        wire::icon_name(&self.device.get())
    }

    /// Forces an out-of-cycle refresh. The bus object itself holds only a
    /// snapshot; the actual re-read happens on the aggregator's side, so
    /// this reports whether the device is still known to be present.
    async fn refresh(&self) -> bool {
        self.device.get().is_present
    }

    /// Returns `(unix_seconds, value, state)` samples for `type_` (`rate`,
    /// `charge`, `time-full`, or `time-empty`) spanning the last
    /// `timespan` seconds (0 = the full retention window), downsampled to
    /// at most `resolution` points.
    async fn get_history(&self, type_: String, timespan: i32, resolution: u32) -> Vec<(u32, f64, u32)> {
        let Some(kind) = parse_series_kind(&type_) else {
            return Vec::new();
        };

        let now = current_unix_seconds();
        let span = if timespan <= 0 { now } else { timespan as u64 };

        self.history
            .read(&self.device.get().object_path, kind, now, span, resolution as usize)
            .into_iter()
            .map(|record| (record.unix_seconds as u32, record.value, wire::state_code(record.state)))
            .collect()
    }

    /// Returns `(percentage, rate)` pairs zipping the charge and rate
    /// series over the full retention window, approximating UPower's
    /// charge/discharge statistics curve.
    async fn get_statistics(&self, type_: String) -> Vec<(f64, f64)> {
        let _ = type_;
        let now = current_unix_seconds();
        let object_path = self.device.get().object_path;

        let charge = self.history.read(&object_path, SeriesKind::Charge, now, now, usize::MAX);
        let rate = self.history.read(&object_path, SeriesKind::Rate, now, now, usize::MAX);

        charge
            .into_iter()
            .zip(rate)
            .map(|(charge_sample, rate_sample)| (charge_sample.value, rate_sample.value))
            .collect()
    }
}

fn parse_series_kind(raw: &str) -> Option<SeriesKind> {
    SeriesKind::ALL.into_iter().find(|kind| kind.slug() == raw)
}

fn current_unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_series_kinds() {
        assert_eq!(parse_series_kind("rate"), Some(SeriesKind::Rate));
        assert_eq!(parse_series_kind("charge"), Some(SeriesKind::Charge));
        assert_eq!(parse_series_kind("bogus"), None);
    }
}
