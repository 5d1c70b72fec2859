//! Linux adapter: enumerates the `power_supply` sysfs class and subscribes
//! to kernel uevents on the subsystems that can create or remove a source.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_udev::{AsyncMonitorSocket, EventType, MonitorBuilder};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use upowerd_device::{DeviceKind, RawSnapshot, RawStatus, Scope};

use async_trait::async_trait;

use crate::error::Error;
use crate::source::{NativeSource, SourceEvent};

const DEFAULT_CLASS_ROOT: &str = "/sys/class/power_supply";

/// Reads a `power_supply`-shaped sysfs class tree and, when rooted at the
/// real sysfs path, watches udev for `power_supply` changes. Rooting it
/// elsewhere (`UPOWERD_MOCK_TREE`) disables udev and runs poll-only, which
/// is exactly what a fixture tree needs.
#[derive(Debug)]
pub struct SysfsSource {
    class_root: PathBuf,
    watch_udev: bool,
}

impl SysfsSource {
    /// An adapter rooted at the standard sysfs class path, with live udev
    /// subscriptions enabled.
    pub fn new() -> Self {
        Self {
            class_root: PathBuf::from(DEFAULT_CLASS_ROOT),
            watch_udev: true,
        }
    }

    /// An adapter rooted at an arbitrary directory shaped like
    /// `power_supply`, for `UPOWERD_MOCK_TREE` and tests. Udev subscription
    /// is skipped since a fixture tree generates no kernel events.
    pub fn with_root(class_root: PathBuf) -> Self {
        Self {
            class_root,
            watch_udev: false,
        }
    }
}

impl Default for SysfsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NativeSource for SysfsSource {
    async fn enumerate(&self) -> Result<Vec<RawSnapshot>, Error> {
        let mut entries = fs::read_dir(&self.class_root)
            .await
            .map_err(|err| Error::Enumerate(err.to_string()))?;

        let mut snapshots = Vec::new();
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|err| Error::Enumerate(err.to_string()))?;
            let Some(entry) = entry else { break };

            let name = entry.file_name().to_string_lossy().into_owned();
            match read_snapshot(&self.class_root, &name).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => warn!(device = %name, %err, "skipping unreadable power supply"),
            }
        }

        Ok(snapshots)
    }

    async fn subscribe(&self, sink: mpsc::Sender<SourceEvent>, cancel: CancellationToken) -> Result<(), Error> {
        if !self.watch_udev {
            cancel.cancelled().await;
            return Ok(());
        }

        let monitor = MonitorBuilder::new()
            .map_err(|err| Error::EventSourceUnavailable(err.to_string()))?
            .match_subsystem("power_supply")
            .map_err(|err| Error::EventSourceUnavailable(err.to_string()))?
            .listen()
            .map_err(|err| Error::EventSourceUnavailable(err.to_string()))?;

        let mut events = AsyncMonitorSocket::new(monitor)
            .map_err(|err| Error::EventSourceUnavailable(err.to_string()))?;

        loop {
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                event = events.next() => {
                    let Some(event) = event else { return Ok(()) };
                    let Ok(event) = event else { continue };

                    let Some(name) = event.sysname().to_str() else { continue };
                    let name = name.to_string();

                    let outcome = match event.event_type() {
                        EventType::Remove => Some(SourceEvent::Removed { native_path: name }),
                        EventType::Add => read_snapshot(&self.class_root, &name).await.ok().map(SourceEvent::Added),
                        _ => read_snapshot(&self.class_root, &name).await.ok().map(SourceEvent::Changed),
                    };

                    if let Some(event) = outcome {
                        if sink.send(event).await.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn refresh(&self, native_path: &str) -> Result<RawSnapshot, Error> {
        read_snapshot(&self.class_root, native_path).await
    }
}

async fn read_snapshot(class_root: &Path, name: &str) -> Result<RawSnapshot, Error> {
    let base = class_root.join(name);
    if fs::metadata(&base).await.is_err() {
        return Err(Error::Enumerate(format!("{name} has no sysfs entry")));
    }

    let (kind, scope) = classify(&base, name).await;

    Ok(RawSnapshot {
        native_path: name.to_string(),
        kind,
        scope,
        status: read_attr(&base, "status").await.map_or(RawStatus::Unknown, |s| RawStatus::parse(&s)),
        online: read_attr_bool(&base, "online").await,
        present: read_attr_bool(&base, "present").await,
        energy_now_uwh: read_attr_f64(&base, "energy_now").await,
        energy_full_uwh: read_attr_f64(&base, "energy_full").await,
        energy_full_design_uwh: read_attr_f64(&base, "energy_full_design").await,
        charge_now_uah: read_attr_f64(&base, "charge_now").await,
        charge_full_uah: read_attr_f64(&base, "charge_full").await,
        charge_full_design_uah: read_attr_f64(&base, "charge_full_design").await,
        capacity_percent: read_attr_f64(&base, "capacity").await,
        voltage_now_uv: read_attr_f64(&base, "voltage_now").await,
        power_now_uw: read_attr_f64(&base, "power_now").await,
        current_now_ua: read_attr_f64(&base, "current_now").await,
        temperature_decidegrees: read_attr_f64(&base, "temp").await,
        technology: read_attr(&base, "technology").await,
        vendor: read_attr(&base, "manufacturer").await,
        model: read_attr(&base, "model_name").await,
        serial: read_attr(&base, "serial_number").await,
    })
}

/// Classifies a sysfs `power_supply` entry by its `type` attribute, and by
/// walking up the device tree to see whether it hangs off an `input` or
/// `bluetooth` ancestor, which marks it as a peripheral battery instead of a
/// system-scope source.
async fn classify(base: &Path, name: &str) -> (DeviceKind, Scope) {
    let type_attr = read_attr(base, "type").await.unwrap_or_default();
    let is_peripheral_ancestor = has_peripheral_ancestor(base).await;

    let kind = match type_attr.as_str() {
        "Mains" => DeviceKind::LinePower,
        "UPS" => DeviceKind::Ups,
        "Battery" if is_peripheral_ancestor => classify_peripheral_name(name),
        "Battery" => DeviceKind::Battery,
        _ => DeviceKind::Unknown,
    };

    let scope = if kind.is_peripheral() { Scope::Device } else { Scope::System };
    (kind, scope)
}

/// `power_supply` devices created for an attached peripheral (bluetooth
/// mice, keyboards) hang off a `device/` symlink whose target lives under an
/// `input*` or `bluetooth` path in `/sys/devices`.
async fn has_peripheral_ancestor(base: &Path) -> bool {
    let Ok(target) = fs::canonicalize(base.join("device")).await else {
        return false;
    };
    let path = target.to_string_lossy();
    path.contains("/input") || path.contains("/bluetooth")
}

fn classify_peripheral_name(name: &str) -> DeviceKind {
    let lower = name.to_ascii_lowercase();
    if lower.contains("mouse") {
        DeviceKind::Mouse
    } else if lower.contains("keyboard") || lower.contains("kbd") {
        DeviceKind::Keyboard
    } else if lower.contains("gamepad") || lower.contains("joystick") || lower.contains("controller") {
        DeviceKind::GamingInput
    } else {
        DeviceKind::BluetoothGeneric
    }
}

async fn read_attr(base: &Path, attr: &str) -> Option<String> {
    fs::read_to_string(base.join(attr)).await.ok().map(|s| s.trim().to_string())
}

async fn read_attr_bool(base: &Path, attr: &str) -> Option<bool> {
    read_attr(base, attr).await.map(|s| s == "1")
}

async fn read_attr_f64(base: &Path, attr: &str) -> Option<f64> {
    read_attr(base, attr).await.and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_entry_is_not_enumerated() {
        let err = read_snapshot(Path::new(DEFAULT_CLASS_ROOT), "definitely-not-a-real-entry").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn mock_tree_classifies_battery_and_mains() {
        let dir = tempfile::tempdir().unwrap();
        let battery = dir.path().join("BAT0");
        std::fs::create_dir_all(&battery).unwrap();
        std::fs::write(battery.join("type"), "Battery\n").unwrap();
        std::fs::write(battery.join("status"), "Discharging\n").unwrap();
        std::fs::write(battery.join("capacity"), "42\n").unwrap();

        let ac = dir.path().join("AC0");
        std::fs::create_dir_all(&ac).unwrap();
        std::fs::write(ac.join("type"), "Mains\n").unwrap();
        std::fs::write(ac.join("online"), "1\n").unwrap();

        let source = SysfsSource::with_root(dir.path().to_path_buf());
        let mut snapshots = source.enumerate().await.unwrap();
        snapshots.sort_by(|a, b| a.native_path.cmp(&b.native_path));

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].kind, DeviceKind::LinePower);
        assert_eq!(snapshots[0].online, Some(true));
        assert_eq!(snapshots[1].kind, DeviceKind::Battery);
        assert_eq!(snapshots[1].status, RawStatus::Discharging);
        assert_eq!(snapshots[1].capacity_percent, Some(42.0));
    }

    #[test]
    fn peripheral_name_classification_prefers_specific_kinds() {
        assert_eq!(classify_peripheral_name("hid-aa-bb-mouse"), DeviceKind::Mouse);
        assert_eq!(classify_peripheral_name("hid-aa-bb-keyboard"), DeviceKind::Keyboard);
        assert_eq!(classify_peripheral_name("hid-aa-bb-battery"), DeviceKind::BluetoothGeneric);
    }
}
