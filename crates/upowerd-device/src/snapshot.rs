//! Flat, OS-agnostic view of a device's attributes exactly as read from a
//! native source, prior to unit normalization.

use crate::types::{DeviceKind, Scope};

/// Charge/discharge status as reported by the native source, before mapping
/// to [`crate::types::DeviceState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawStatus {
    /// Source reported an unrecognized or absent status string.
    #[default]
    Unknown,
    /// Source reported "Charging".
    Charging,
    /// Source reported "Discharging".
    Discharging,
    /// Source reported "Not charging".
    NotCharging,
    /// Source reported "Full".
    Full,
}

impl RawStatus {
    /// Parses a sysfs-style `status` attribute value.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Charging" => Self::Charging,
            "Discharging" => Self::Discharging,
            "Not charging" => Self::NotCharging,
            "Full" => Self::Full,
            _ => Self::Unknown,
        }
    }
}

/// A single refresh's worth of raw attributes from a native source, with
/// values already read as their natural microunit (the unit sysfs itself
/// uses) but not yet converted to the normalized units `upowerd-device`
/// publishes.
///
/// Fields absent on the source are `None` and propagate as "unknown" through
/// normalization rather than failing the refresh.
#[derive(Debug, Clone, Default)]
pub struct RawSnapshot {
    /// Opaque, OS-specific identity string (e.g. a sysfs directory name).
    pub native_path: String,
    /// Device kind, already classified by the adapter.
    pub kind: DeviceKind,
    /// System vs. peripheral scope, already classified by the adapter.
    pub scope: Scope,
    /// Raw `status` string, parsed.
    pub status: RawStatus,
    /// `online` for line-power sources.
    pub online: Option<bool>,
    /// `present` attribute.
    pub present: Option<bool>,
    /// `energy_now`, in µWh.
    pub energy_now_uwh: Option<f64>,
    /// `energy_full`, in µWh.
    pub energy_full_uwh: Option<f64>,
    /// `energy_full_design`, in µWh.
    pub energy_full_design_uwh: Option<f64>,
    /// `charge_now`, in µAh.
    pub charge_now_uah: Option<f64>,
    /// `charge_full`, in µAh.
    pub charge_full_uah: Option<f64>,
    /// `charge_full_design`, in µAh.
    pub charge_full_design_uah: Option<f64>,
    /// `capacity`, a percentage in [0, 100] (may exceed 100 on overfull packs).
    pub capacity_percent: Option<f64>,
    /// `voltage_now`, in µV.
    pub voltage_now_uv: Option<f64>,
    /// `power_now`, in µW, if the source reports instantaneous power directly.
    pub power_now_uw: Option<f64>,
    /// `current_now`, in µA, if the source reports instantaneous current.
    pub current_now_ua: Option<f64>,
    /// `temp`, in tenths of a degree Celsius.
    pub temperature_decidegrees: Option<f64>,
    /// `technology` string (e.g. `Li-ion`).
    pub technology: Option<String>,
    /// Raw vendor/manufacturer string, pre-sanitization.
    pub vendor: Option<String>,
    /// Raw model string, pre-sanitization.
    pub model: Option<String>,
    /// Raw serial string, pre-sanitization.
    pub serial: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_status_strings() {
        assert_eq!(RawStatus::parse("Charging"), RawStatus::Charging);
        assert_eq!(RawStatus::parse("Not charging"), RawStatus::NotCharging);
        assert_eq!(RawStatus::parse("garbage"), RawStatus::Unknown);
    }
}
