/// Errors produced by native source adapters.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The kernel event device (netlink, kqueue, ...) could not be opened.
    /// Per the failure semantics, this disables change-driven updates
    /// rather than failing the adapter outright; callers fall back to
    /// polling at a slower cadence.
    #[error("cannot open change-event source: {0}")]
    EventSourceUnavailable(String),

    /// Enumeration of the underlying device class failed entirely (as
    /// opposed to a single attribute read, which degrades to "unknown").
    #[error("cannot enumerate power sources: {0}")]
    Enumerate(String),

    /// A HID transport error from `hidapi`.
    #[error("hid error: {0}")]
    Hid(String),
}
