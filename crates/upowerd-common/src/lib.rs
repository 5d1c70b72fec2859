//! Common utilities shared across upowerd crates.
//!
//! Provides the reactive [`Property`] primitive used to expose device and
//! aggregator state without locking, plus text sanitization helpers for
//! values read from untrusted kernel/USB sources.

mod property;
/// Sanitization helpers for vendor/model/serial text read from hardware.
pub mod sanitize;

pub use property::{ComputedProperty, Property, PropertyStream};
