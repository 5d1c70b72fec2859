//! A fixed in-memory inventory, for unit tests that want a `NativeSource`
//! without touching the filesystem at all.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use upowerd_device::RawSnapshot;

use async_trait::async_trait;

use crate::error::Error;
use crate::source::{NativeSource, SourceEvent};

/// Serves a fixed list of snapshots and never emits change events; `cancel`
/// is simply awaited.
pub struct DummySource {
    snapshots: Vec<RawSnapshot>,
}

impl DummySource {
    /// Serves exactly `snapshots` from every `enumerate`/`refresh` call.
    pub fn new(snapshots: Vec<RawSnapshot>) -> Self {
        Self { snapshots }
    }
}

#[async_trait]
impl NativeSource for DummySource {
    async fn enumerate(&self) -> Result<Vec<RawSnapshot>, Error> {
        Ok(self.snapshots.clone())
    }

    async fn subscribe(&self, _sink: mpsc::Sender<SourceEvent>, cancel: CancellationToken) -> Result<(), Error> {
        cancel.cancelled().await;
        Ok(())
    }

    async fn refresh(&self, native_path: &str) -> Result<RawSnapshot, Error> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.native_path == native_path)
            .cloned()
            .ok_or_else(|| Error::Enumerate(format!("{native_path} not in fixture inventory")))
    }
}
