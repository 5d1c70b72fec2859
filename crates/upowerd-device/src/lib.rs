//! Device model, normalization algorithm, and the device registry.
//!
//! This is the backend-agnostic core: [`device::Device::normalize`] turns a
//! [`snapshot::RawSnapshot`] plus the prior sample into a consistent
//! `Device`, applying unit conversion, the energy precedence table, rate
//! smoothing, and time-to-empty/full estimation. Everything OS-specific
//! (sysfs, HID, ioctl) lives downstream in `upowerd-backend` and produces
//! `RawSnapshot`s for this crate to consume.

mod device;
mod rate;
mod registry;
mod snapshot;
mod types;

pub use device::{Device, estimate_times};
pub use rate::RateSmoother;
pub use registry::Registry;
pub use snapshot::{RawSnapshot, RawStatus};
pub use types::{DeviceKind, DeviceState, Scope, Technology, WarningLevel, object_path_for};
