//! HID-UPS adapter: enumerates USB HID devices against a small table of
//! known UPS vendor/product IDs and polls a Power Device Class feature
//! report at a configurable cadence, since HID devices have no equivalent
//! to a udev change-event stream.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use upowerd_device::{DeviceKind, RawSnapshot, RawStatus, Scope};

use async_trait::async_trait;

use crate::error::Error;
use crate::source::{NativeSource, SourceEvent};

/// Default poll cadence when the caller doesn't override it.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// `(vendor_id, product_id)` pairs for UPSes known to expose a USB HID
/// Power Device Class interface.
const KNOWN_UPS_IDS: &[(u16, u16)] = &[
    (0x0463, 0xffff), // Eaton / MGE
    (0x051d, 0x0002), // APC
    (0x0665, 0x5161), // CyberPower
];

/// Report ID for the simplified "battery system" feature report this
/// adapter reads: byte 0 is the report ID, byte 1 is remaining capacity as
/// a percentage, byte 2 is a status bitmask (bit 0 = charging, bit 1 =
/// discharging, bit 2 = AC present).
const BATTERY_SYSTEM_REPORT_ID: u8 = 0x06;
const STATUS_CHARGING: u8 = 0b001;
const STATUS_DISCHARGING: u8 = 0b010;
const STATUS_AC_PRESENT: u8 = 0b100;

/// Polls known UPS vendor/product IDs over HID at `poll_interval`.
pub struct HidUpsSource {
    poll_interval: Duration,
}

impl HidUpsSource {
    /// An adapter polling at the default cadence.
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// An adapter polling at a caller-chosen cadence.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for HidUpsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NativeSource for HidUpsSource {
    async fn enumerate(&self) -> Result<Vec<RawSnapshot>, Error> {
        tokio::task::spawn_blocking(enumerate_blocking)
            .await
            .map_err(|err| Error::Hid(err.to_string()))?
    }

    async fn subscribe(&self, sink: mpsc::Sender<SourceEvent>, cancel: CancellationToken) -> Result<(), Error> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    let Ok(snapshots) = self.enumerate().await else { continue };
                    for snapshot in snapshots {
                        if sink.send(SourceEvent::Changed(snapshot)).await.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn refresh(&self, native_path: &str) -> Result<RawSnapshot, Error> {
        self.enumerate()
            .await?
            .into_iter()
            .find(|snapshot| snapshot.native_path == native_path)
            .ok_or_else(|| Error::Hid(format!("{native_path} no longer present")))
    }
}

fn enumerate_blocking() -> Result<Vec<RawSnapshot>, Error> {
    let api = hidapi::HidApi::new().map_err(|err| Error::Hid(err.to_string()))?;
    let mut snapshots = Vec::new();

    for info in api.device_list() {
        if !KNOWN_UPS_IDS.contains(&(info.vendor_id(), info.product_id())) {
            continue;
        }

        let Ok(device) = api.open_path(info.path()) else {
            continue;
        };

        let native_path = info.path().to_string_lossy().into_owned();
        let mut report = [0u8; 3];
        report[0] = BATTERY_SYSTEM_REPORT_ID;

        match device.get_feature_report(&mut report) {
            Ok(_) => snapshots.push(decode_report(native_path, &report)),
            Err(_) => snapshots.push(RawSnapshot {
                native_path,
                kind: DeviceKind::Ups,
                scope: Scope::System,
                ..Default::default()
            }),
        }
    }

    Ok(snapshots)
}

fn decode_report(native_path: String, report: &[u8; 3]) -> RawSnapshot {
    let capacity = report[1];
    let status_bits = report[2];

    let status = if status_bits & STATUS_CHARGING != 0 {
        RawStatus::Charging
    } else if status_bits & STATUS_DISCHARGING != 0 {
        RawStatus::Discharging
    } else {
        RawStatus::Unknown
    };

    RawSnapshot {
        native_path,
        kind: DeviceKind::Ups,
        scope: Scope::System,
        status,
        online: Some(status_bits & STATUS_AC_PRESENT != 0),
        present: Some(true),
        capacity_percent: Some(f64::from(capacity)),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_charging_report() {
        let snapshot = decode_report("hid:0".into(), &[BATTERY_SYSTEM_REPORT_ID, 80, STATUS_CHARGING | STATUS_AC_PRESENT]);
        assert_eq!(snapshot.status, RawStatus::Charging);
        assert_eq!(snapshot.capacity_percent, Some(80.0));
        assert_eq!(snapshot.online, Some(true));
    }

    #[test]
    fn decodes_discharging_report() {
        let snapshot = decode_report("hid:0".into(), &[BATTERY_SYSTEM_REPORT_ID, 42, STATUS_DISCHARGING]);
        assert_eq!(snapshot.status, RawStatus::Discharging);
        assert_eq!(snapshot.online, Some(false));
    }
}
