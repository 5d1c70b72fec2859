/// Errors from registering or operating the bus surface.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The system bus connection could not be established.
    #[error("cannot connect to the system bus")]
    Connect(#[source] zbus::Error),

    /// A device or manager object could not be registered on the object
    /// server.
    #[error("cannot register object at '{path}'")]
    Register {
        /// The object path that failed to register.
        path: String,
        /// The underlying zbus error.
        #[source]
        source: zbus::Error,
    },

    /// A previously registered object could not be removed.
    #[error("cannot remove object at '{path}'")]
    Unregister {
        /// The object path that failed to unregister.
        path: String,
        /// The underlying zbus error.
        #[source]
        source: zbus::Error,
    },

    /// The well-known bus name could not be acquired.
    #[error("cannot acquire bus name '{name}'")]
    RequestName {
        /// The name that could not be acquired.
        name: String,
        /// The underlying zbus error.
        #[source]
        source: zbus::Error,
    },

    /// Emitting a signal failed.
    #[error("cannot emit signal")]
    Signal(#[source] zbus::Error),
}
