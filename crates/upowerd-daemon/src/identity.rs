//! Stable identity for a peripheral source, used to match a `Removed` event
//! against a later `Added` one across the debounce window.
//!
//! `native_path` alone is not always reusable across a replug: some
//! adapters regenerate it (e.g. a fresh HID device-node name). Vendor,
//! model, and serial survive a replug for the same physical peripheral, so
//! they take precedence when present; `native_path` is the fallback for
//! sources that never fill them in.

use upowerd_device::RawSnapshot;

/// Derives the identity key a [`upowerd_backend::Debouncer`] quarantines and
/// resurrects peripherals under.
pub fn peripheral_identity(raw: &RawSnapshot) -> String {
    let vendor = raw.vendor.as_deref().unwrap_or_default();
    let model = raw.model.as_deref().unwrap_or_default();
    let serial = raw.serial.as_deref().unwrap_or_default();

    if vendor.is_empty() && model.is_empty() && serial.is_empty() {
        format!("{}:{}", raw.kind.slug(), raw.native_path)
    } else {
        format!("{}:{vendor}:{model}:{serial}", raw.kind.slug())
    }
}
