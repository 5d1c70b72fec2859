//! Maps the internal, already-normalized [`Device`] model onto the numeric
//! codes and icon-name convention `org.freedesktop.UPower` clients expect on
//! the wire.

use upowerd_device::{Device, DeviceKind, DeviceState, Technology, WarningLevel};

/// `UpDeviceKind` wire code.
pub fn kind_code(kind: DeviceKind) -> u32 {
    match kind {
        DeviceKind::Unknown => 0,
        DeviceKind::LinePower => 1,
        DeviceKind::Battery => 2,
        DeviceKind::Ups => 3,
        DeviceKind::Mouse => 5,
        DeviceKind::Keyboard => 6,
        DeviceKind::Pda => 7,
        DeviceKind::Phone => 8,
        DeviceKind::MediaPlayer => 9,
        DeviceKind::Tablet => 10,
        DeviceKind::Computer => 11,
        DeviceKind::GamingInput => 12,
        DeviceKind::BluetoothGeneric => 28,
    }
}

/// `UpDeviceState` wire code.
pub fn state_code(state: DeviceState) -> u32 {
    match state {
        DeviceState::Unknown => 0,
        DeviceState::Charging => 1,
        DeviceState::Discharging => 2,
        DeviceState::Empty => 3,
        DeviceState::FullyCharged => 4,
        DeviceState::PendingCharge => 5,
        DeviceState::PendingDischarge => 6,
    }
}

/// `UpDeviceTechnology` wire code.
pub fn technology_code(technology: Technology) -> u32 {
    match technology {
        Technology::Unknown => 0,
        Technology::LithiumIon => 1,
        Technology::LithiumPolymer => 2,
        Technology::LithiumIronPhosphate => 3,
        Technology::LeadAcid => 4,
        Technology::NickelCadmium => 5,
        Technology::NickelMetalHydride => 6,
    }
}

/// `UpDeviceLevel` wire code, shared between `WarningLevel` and the
/// (unmodeled) `BatteryLevel` property.
pub fn warning_level_code(level: WarningLevel) -> u32 {
    match level {
        WarningLevel::Unknown => 0,
        WarningLevel::None => 1,
        WarningLevel::Discharging => 2,
        WarningLevel::Low => 3,
        WarningLevel::Critical => 4,
        WarningLevel::Action => 5,
    }
}

/// A `-symbolic` icon name following the `battery-level-N(-charging)`
/// convention most desktop icon themes ship.
pub fn icon_name(device: &Device) -> String {
    if !device.is_present {
        return "battery-missing-symbolic".to_string();
    }

    if matches!(device.state, DeviceState::FullyCharged) {
        return "battery-full-charged-symbolic".to_string();
    }

    let bucket = ((device.percentage / 10.0).round() as i64).clamp(0, 10) * 10;
    let charging = matches!(device.state, DeviceState::Charging);
    if charging {
        format!("battery-level-{bucket}-charging-symbolic")
    } else {
        format!("battery-level-{bucket}-symbolic")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_match_the_upower_wire_enum() {
        assert_eq!(kind_code(DeviceKind::Battery), 2);
        assert_eq!(kind_code(DeviceKind::BluetoothGeneric), 28);
    }

    #[test]
    fn icon_name_reflects_presence_and_charge_bucket() {
        let mut device = sample_device();
        device.is_present = false;
        assert_eq!(icon_name(&device), "battery-missing-symbolic");

        device.is_present = true;
        device.percentage = 54.0;
        device.state = DeviceState::Discharging;
        assert_eq!(icon_name(&device), "battery-level-50-symbolic");

        device.state = DeviceState::Charging;
        assert_eq!(icon_name(&device), "battery-level-50-charging-symbolic");
    }

    fn sample_device() -> Device {
        Device::normalize(
            None,
            &upowerd_device::RawSnapshot {
                native_path: "BAT0".into(),
                kind: DeviceKind::Battery,
                ..Default::default()
            },
            0,
            false,
        )
    }
}
