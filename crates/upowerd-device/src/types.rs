//! Device attribute enums and object-path derivation.

use std::fmt;

/// What kind of power device this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceKind {
    /// Kind could not be determined.
    #[default]
    Unknown,
    /// Mains/AC adapter.
    LinePower,
    /// A system battery.
    Battery,
    /// An uninterruptible power supply.
    Ups,
    /// A peripheral mouse battery.
    Mouse,
    /// A peripheral keyboard battery.
    Keyboard,
    /// A PDA battery.
    Pda,
    /// A phone battery.
    Phone,
    /// A media player battery.
    MediaPlayer,
    /// A tablet battery.
    Tablet,
    /// A computer (e.g. laptop reported as a whole) battery.
    Computer,
    /// A gaming controller battery.
    GamingInput,
    /// An unclassified bluetooth peripheral battery.
    BluetoothGeneric,
}

impl DeviceKind {
    /// The lowercase identifier used in object paths and history filenames.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::LinePower => "line_power",
            Self::Battery => "battery",
            Self::Ups => "ups",
            Self::Mouse => "mouse",
            Self::Keyboard => "keyboard",
            Self::Pda => "pda",
            Self::Phone => "phone",
            Self::MediaPlayer => "media_player",
            Self::Tablet => "tablet",
            Self::Computer => "computer",
            Self::GamingInput => "gaming_input",
            Self::BluetoothGeneric => "bluetooth_generic",
        }
    }

    /// True for kinds that are peripherals rather than system-scope devices.
    pub fn is_peripheral(self) -> bool {
        matches!(
            self,
            Self::Mouse
                | Self::Keyboard
                | Self::Pda
                | Self::Phone
                | Self::MediaPlayer
                | Self::Tablet
                | Self::GamingInput
                | Self::BluetoothGeneric
        )
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Whether a raw source is scoped to the system itself or to a peripheral
/// device attached to it. Drives the `power_supply` invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// The source can power the host (internal battery, UPS, line power).
    System,
    /// The source belongs to an attached peripheral.
    #[default]
    Device,
}

/// Charge/discharge state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// State could not be determined.
    Unknown,
    /// Gaining energy.
    Charging,
    /// Losing energy.
    Discharging,
    /// Depleted.
    Empty,
    /// At full capacity.
    FullyCharged,
    /// Will charge once conditions allow (e.g. plugged in, waiting).
    PendingCharge,
    /// Will discharge once conditions allow.
    PendingDischarge,
}

impl DeviceState {
    /// Lowercase identifier used in history record state tags.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Charging => "charging",
            Self::Discharging => "discharging",
            Self::Empty => "empty",
            Self::FullyCharged => "fully_charged",
            Self::PendingCharge => "pending_charge",
            Self::PendingDischarge => "pending_discharge",
        }
    }

    /// Parses a state tag produced by [`DeviceState::slug`]. Unrecognized
    /// tags (e.g. from a history file written by a future version) map to
    /// `Unknown` rather than failing the read.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "charging" => Self::Charging,
            "discharging" => Self::Discharging,
            "empty" => Self::Empty,
            "fully_charged" => Self::FullyCharged,
            "pending_charge" => Self::PendingCharge,
            "pending_discharge" => Self::PendingDischarge,
            _ => Self::Unknown,
        }
    }
}

/// Battery chemistry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technology {
    /// Chemistry could not be determined.
    Unknown,
    /// Lithium-ion.
    LithiumIon,
    /// Lithium-polymer.
    LithiumPolymer,
    /// Lithium iron phosphate.
    LithiumIronPhosphate,
    /// Lead-acid.
    LeadAcid,
    /// Nickel-cadmium.
    NickelCadmium,
    /// Nickel-metal hydride.
    NickelMetalHydride,
}

impl Technology {
    /// Parses a sysfs-style technology string (e.g. `Li-ion`, `Li-poly`).
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Li-ion" | "Lithium" => Self::LithiumIon,
            "Li-poly" | "LiP" => Self::LithiumPolymer,
            "LiFe" => Self::LithiumIronPhosphate,
            "Pb" | "PbAc" => Self::LeadAcid,
            "NiCd" => Self::NickelCadmium,
            "NiMH" => Self::NickelMetalHydride,
            _ => Self::Unknown,
        }
    }
}

/// Warning severity for a device, or the system as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WarningLevel {
    /// Has not been computed yet.
    Unknown,
    /// No warning.
    None,
    /// Discharging on UPS power with no threshold crossed yet.
    Discharging,
    /// Below the low threshold.
    Low,
    /// Below the critical threshold.
    Critical,
    /// Below the action threshold; a policy action should be taken.
    Action,
}

/// Derives the stable object path for a device from its kind and native path.
///
/// The result is deterministic across refreshes, letting a re-added
/// peripheral with the same native path reuse history under the same key.
pub fn object_path_for(kind: DeviceKind, native_path: &str) -> String {
    let slug = slugify(native_path);
    format!("/org/freedesktop/UPower/devices/{}_{}", kind.slug(), slug)
}

fn slugify(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_is_stable_for_same_input() {
        let a = object_path_for(DeviceKind::Battery, "BAT0");
        let b = object_path_for(DeviceKind::Battery, "BAT0");
        assert_eq!(a, b);
    }

    #[test]
    fn object_path_differs_by_kind() {
        let battery = object_path_for(DeviceKind::Battery, "foo");
        let mouse = object_path_for(DeviceKind::Mouse, "foo");
        assert_ne!(battery, mouse);
    }

    #[test]
    fn slugify_replaces_non_alphanumeric() {
        assert_eq!(slugify("hid:04-05/bat"), "hid_04_05_bat");
    }

    #[test]
    fn technology_parses_known_strings() {
        assert_eq!(Technology::parse("Li-ion"), Technology::LithiumIon);
        assert_eq!(Technology::parse("NiMH"), Technology::NickelMetalHydride);
        assert_eq!(Technology::parse("whatever"), Technology::Unknown);
    }

    #[test]
    fn peripheral_kinds_are_flagged() {
        assert!(DeviceKind::Mouse.is_peripheral());
        assert!(!DeviceKind::Battery.is_peripheral());
    }

    #[test]
    fn device_state_slug_round_trips() {
        for state in [
            DeviceState::Charging,
            DeviceState::Discharging,
            DeviceState::Empty,
            DeviceState::FullyCharged,
            DeviceState::PendingCharge,
            DeviceState::PendingDischarge,
        ] {
            assert_eq!(DeviceState::parse(state.slug()), state);
        }
        assert_eq!(DeviceState::parse("garbage"), DeviceState::Unknown);
    }
}
