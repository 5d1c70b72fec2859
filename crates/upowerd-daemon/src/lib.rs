//! Daemon core: the registry/warning/display-device aggregator and the
//! event loop that drives native sources, history, and the bus surface
//! from it.
//!
//! Everything OS-specific lives in `upowerd-backend`; everything wire-format
//! specific lives in `upowerd-bus`. This crate is the glue between them plus
//! the pure aggregation logic neither of those owns.

mod aggregator;
mod error;
mod identity;
mod runtime;

pub use aggregator::{Aggregator, DISPLAY_DEVICE_PATH};
pub use error::Error;
pub use identity::peripheral_identity;
pub use runtime::{Daemon, ExitPolicy};
