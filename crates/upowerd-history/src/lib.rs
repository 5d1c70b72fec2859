//! Per-device history and statistics store.
//!
//! Four series are tracked per device — `rate`, `charge`, `time-full`,
//! `time-empty` — in a 10-minute in-memory ring, with a periodic flush
//! downsampling to one persisted sample every two minutes, capped at seven
//! days per series. Reads return a uniformly downsampled window.

mod error;
mod record;
mod store;

pub use error::Error;
pub use record::{Record, SeriesKind};
pub use store::HistoryStore;
