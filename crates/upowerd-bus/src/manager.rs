//! The `org.freedesktop.UPower` manager object at
//! `/org/freedesktop/UPower`.

use derive_more::Debug;
use upowerd_common::Property;
use upowerd_config::CriticalPowerAction;
use zbus::interface;
use zbus::object_server::SignalEmitter;
use zbus::zvariant::OwnedObjectPath;

/// The manager object: a registry-path listing plus the system-wide
/// `OnBattery` flag.
#[derive(Debug)]
pub struct ManagerObject {
    pub(crate) device_paths: Property<Vec<String>>,
    pub(crate) on_battery: Property<bool>,
    display_device_path: OwnedObjectPath,
    critical_power_action: CriticalPowerAction,
}

impl ManagerObject {
    /// A manager with an empty registry and `OnBattery = false`, reporting
    /// `display_device_path` from `GetDisplayDevice` and
    /// `critical_power_action` from `GetCriticalAction`.
    pub fn new(display_device_path: OwnedObjectPath, critical_power_action: CriticalPowerAction) -> Self {
        Self {
            device_paths: Property::new(Vec::new()),
            on_battery: Property::new(false),
            display_device_path,
            critical_power_action,
        }
    }
}

#[interface(name = "org.freedesktop.UPower")]
impl ManagerObject {
    #[zbus(property)]
    async fn daemon_version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    #[zbus(property)]
    async fn on_battery(&self) -> bool {
        self.on_battery.get()
    }

    /// No adapter in this daemon reports a lid switch; both lid properties
    /// are fixed rather than wired to a nonexistent source.
    #[zbus(property)]
    async fn lid_is_present(&self) -> bool {
        false
    }

    #[zbus(property)]
    async fn lid_is_closed(&self) -> bool {
        false
    }

    async fn enumerate_devices(&self) -> Vec<OwnedObjectPath> {
        self.device_paths
            .get()
            .into_iter()
            .filter_map(|path| OwnedObjectPath::try_from(path).ok())
            .collect()
    }

    async fn get_display_device(&self) -> OwnedObjectPath {
        self.display_device_path.clone()
    }

    async fn get_critical_action(&self) -> String {
        self.critical_power_action.as_str().to_string()
    }

    #[zbus(signal)]
    pub async fn device_added(ctx: &SignalEmitter<'_>, device: OwnedObjectPath) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn device_removed(ctx: &SignalEmitter<'_>, device: OwnedObjectPath) -> zbus::Result<()>;
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn display_path() -> OwnedObjectPath {
        OwnedObjectPath::from_str("/org/freedesktop/UPower/devices/DisplayDevice")
            .expect("static path is valid")
    }

    #[tokio::test]
    async fn enumerate_devices_reflects_current_registry_paths() {
        let manager = ManagerObject::new(display_path(), CriticalPowerAction::HybridSleep);
        manager.device_paths.set(vec!["/org/freedesktop/UPower/devices/battery_BAT0".to_string()]);

        let paths = manager.enumerate_devices().await;
        assert_eq!(paths.len(), 1);
    }

    #[tokio::test]
    async fn get_critical_action_reflects_configured_value() {
        let manager = ManagerObject::new(display_path(), CriticalPowerAction::Hibernate);
        assert_eq!(manager.get_critical_action().await, CriticalPowerAction::Hibernate.as_str());
    }

    #[tokio::test]
    async fn no_lid_switch_reports_absent() {
        let manager = ManagerObject::new(display_path(), CriticalPowerAction::HybridSleep);
        assert!(!manager.lid_is_present().await);
        assert!(!manager.lid_is_closed().await);
    }
}
