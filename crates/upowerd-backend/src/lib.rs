//! Per-OS adapters translating heterogeneous kernel/hardware signals into
//! the flat [`upowerd_device::RawSnapshot`] shape, plus the refresh-cadence
//! and peripheral-debounce bookkeeping the daemon drives them with.

mod debounce;
#[cfg(any(target_os = "freebsd", target_os = "openbsd"))]
#[allow(unsafe_code)]
mod bsd;
mod dummy;
mod error;
mod hid;
#[cfg(target_os = "linux")]
mod linux;
mod schedule;
mod source;

#[cfg(any(target_os = "freebsd", target_os = "openbsd"))]
pub use bsd::ApmSource;
pub use debounce::{Debouncer, QUARANTINE_WINDOW};
pub use dummy::DummySource;
pub use error::Error;
pub use hid::{HidUpsSource, DEFAULT_POLL_INTERVAL as HID_DEFAULT_POLL_INTERVAL};
#[cfg(target_os = "linux")]
pub use linux::SysfsSource;
pub use schedule::{RefreshSchedule, BATTERY_INTERVAL, LINE_POWER_OR_PERIPHERAL_INTERVAL, POST_TRANSITION_INTERVAL, POST_TRANSITION_WINDOW};
pub use source::{NativeSource, SourceEvent};
