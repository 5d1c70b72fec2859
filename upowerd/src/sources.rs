//! Assembles the platform-appropriate set of native sources.

use std::sync::Arc;

use upowerd_backend::NativeSource;

/// The sources this host can poll. `hidapi` enumeration works on any
/// platform libusb/hidraw supports, so the HID-UPS adapter is unconditional;
/// the battery/line-power adapter is platform-gated.
pub fn platform_sources() -> Vec<Arc<dyn NativeSource>> {
    let mut sources: Vec<Arc<dyn NativeSource>> = Vec::new();

    #[cfg(target_os = "linux")]
    sources.push(Arc::new(upowerd_backend::SysfsSource::new()));

    #[cfg(any(target_os = "freebsd", target_os = "openbsd"))]
    sources.push(Arc::new(upowerd_backend::ApmSource::new()));

    sources.push(Arc::new(upowerd_backend::HidUpsSource::new()));

    sources
}
