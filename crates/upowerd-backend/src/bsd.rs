//! BSD APM adapter: a single `/dev/apm` character device, read via ioctl,
//! with synthetic AC and battery sources derived from the one composite
//! reading. Deliberately smaller than the Linux adapter — APM exposes far
//! less detail than sysfs, and there is no equivalent kernel event stream
//! to subscribe to, so this adapter always operates in polling mode.

use std::fs::File;
use std::os::unix::io::AsRawFd;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use upowerd_device::{DeviceKind, RawSnapshot, RawStatus, Scope};

use async_trait::async_trait;

use crate::error::Error;
use crate::source::{NativeSource, SourceEvent};

const APM_DEVICE: &str = "/dev/apm";

// TODO: confirm against the target kernel's apm_bios.h; this mirrors the
// FreeBSD/OpenBSD `struct apm_info` layout as of their APMIO_GETINFO ioctl.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct ApmInfo {
    major: libc::c_uint,
    minor: libc::c_uint,
    acline: libc::c_uint,
    batt_stat: libc::c_uint,
    batt_life: libc::c_uint,
    batt_time: libc::c_uint,
    status: libc::c_uint,
}

const APMIO_GETINFO: libc::c_ulong = 0x4100_4101;

const AC_LINE_ON: libc::c_uint = 1;
const BATT_STAT_CHARGING: libc::c_uint = 3;
const BATT_STAT_ABSENT: libc::c_uint = 4;

/// Polls `/dev/apm` via ioctl and synthesizes one line-power and one
/// battery source from the composite reading.
pub struct ApmSource;

impl ApmSource {
    /// A new adapter over the default `/dev/apm` device.
    pub fn new() -> Self {
        Self
    }

    fn read_info(&self) -> Result<ApmInfo, Error> {
        let file = File::open(APM_DEVICE).map_err(|err| Error::Enumerate(err.to_string()))?;
        let mut info = ApmInfo::default();

        // SAFETY: `file` stays open for the duration of the call, and
        // `info` is a plain-old-data struct sized to match the ioctl's
        // expected output buffer.
        let result = unsafe { libc::ioctl(file.as_raw_fd(), APMIO_GETINFO, std::ptr::addr_of_mut!(info)) };
        if result != 0 {
            return Err(Error::Enumerate(std::io::Error::last_os_error().to_string()));
        }

        Ok(info)
    }
}

impl Default for ApmSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NativeSource for ApmSource {
    async fn enumerate(&self) -> Result<Vec<RawSnapshot>, Error> {
        let info = self.read_info()?;
        Ok(synthesize(&info))
    }

    async fn subscribe(&self, _sink: mpsc::Sender<SourceEvent>, cancel: CancellationToken) -> Result<(), Error> {
        // No kernel event-notification primitive is wired up here; the
        // aggregator falls back to scheduled polling via `refresh`.
        cancel.cancelled().await;
        Ok(())
    }

    async fn refresh(&self, native_path: &str) -> Result<RawSnapshot, Error> {
        let info = self.read_info()?;
        synthesize(&info)
            .into_iter()
            .find(|snapshot| snapshot.native_path == native_path)
            .ok_or_else(|| Error::Enumerate(format!("{native_path} not present in apm_info")))
    }
}

fn synthesize(info: &ApmInfo) -> Vec<RawSnapshot> {
    let ac_online = info.acline == AC_LINE_ON;
    let battery_present = info.batt_stat != BATT_STAT_ABSENT;

    let ac = RawSnapshot {
        native_path: "apm-ac".to_string(),
        kind: DeviceKind::LinePower,
        scope: Scope::System,
        online: Some(ac_online),
        present: Some(true),
        ..Default::default()
    };

    if !battery_present {
        return vec![ac];
    }

    let status = if info.batt_stat == BATT_STAT_CHARGING {
        RawStatus::Charging
    } else if ac_online {
        RawStatus::NotCharging
    } else {
        RawStatus::Discharging
    };

    let battery = RawSnapshot {
        native_path: "apm-battery".to_string(),
        kind: DeviceKind::Battery,
        scope: Scope::System,
        status,
        present: Some(true),
        capacity_percent: Some(f64::from(info.batt_life)),
        ..Default::default()
    };

    vec![ac, battery]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_battery_yields_only_ac() {
        let info = ApmInfo {
            acline: AC_LINE_ON,
            batt_stat: BATT_STAT_ABSENT,
            ..Default::default()
        };
        let sources = synthesize(&info);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].kind, DeviceKind::LinePower);
    }

    #[test]
    fn charging_battery_maps_to_charging_status() {
        let info = ApmInfo {
            acline: AC_LINE_ON,
            batt_stat: BATT_STAT_CHARGING,
            batt_life: 55,
            ..Default::default()
        };
        let sources = synthesize(&info);
        let battery = sources.iter().find(|s| s.kind == DeviceKind::Battery).unwrap();
        assert_eq!(battery.status, RawStatus::Charging);
        assert_eq!(battery.capacity_percent, Some(55.0));
    }

    #[test]
    fn offline_ac_with_present_battery_is_discharging() {
        let info = ApmInfo {
            acline: 0,
            batt_stat: 1,
            batt_life: 40,
            ..Default::default()
        };
        let sources = synthesize(&info);
        let battery = sources.iter().find(|s| s.kind == DeviceKind::Battery).unwrap();
        assert_eq!(battery.status, RawStatus::Discharging);
    }
}
