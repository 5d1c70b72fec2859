//! The uniform operation set every adapter implements: enumerate, subscribe
//! to change events, and refresh a single source on demand.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use upowerd_device::RawSnapshot;

use crate::error::Error;

/// A change observed by a native source between or in place of scheduled
/// refreshes.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A new source appeared.
    Added(RawSnapshot),
    /// An existing source's attributes changed.
    Changed(RawSnapshot),
    /// A source disappeared, identified by its native path.
    Removed {
        /// The native path that was removed.
        native_path: String,
    },
}

/// Per-OS adapter over a class of power sources.
///
/// Implementations must never fail a whole [`Self::enumerate`] or
/// [`Self::refresh`] call because one attribute could not be read; per the
/// failure semantics, an unreadable attribute becomes `None` on the
/// resulting [`RawSnapshot`] and normalization treats it as unknown.
#[async_trait]
pub trait NativeSource: Send + Sync {
    /// Lists every source currently present.
    ///
    /// # Errors
    /// Returns an error only if the source class itself could not be
    /// enumerated (e.g. the sysfs class directory is missing).
    async fn enumerate(&self) -> Result<Vec<RawSnapshot>, Error>;

    /// Runs until `cancel` fires, pushing [`SourceEvent`]s into `sink` as the
    /// underlying hardware changes.
    ///
    /// # Errors
    /// Returns an error if the change-event transport (netlink socket,
    /// kqueue, ...) could not be opened at all. Callers should treat this as
    /// non-fatal and fall back to polling via [`Self::refresh`].
    async fn subscribe(&self, sink: mpsc::Sender<SourceEvent>, cancel: CancellationToken) -> Result<(), Error>;

    /// Re-reads a single source by its native path.
    ///
    /// # Errors
    /// Returns an error if the source no longer exists at all, as opposed to
    /// individual attributes being unreadable.
    async fn refresh(&self, native_path: &str) -> Result<RawSnapshot, Error>;
}
