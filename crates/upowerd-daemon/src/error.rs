/// Errors that can abort daemon startup or the run loop.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error("loading configuration: {0}")]
    Config(#[from] upowerd_config::Error),

    /// The bus connection could not be established or the object tree could
    /// not be exported. Per the bus-acquisition failure semantics, this
    /// maps to a distinct process exit code from other init failures.
    #[error("bus setup: {0}")]
    Bus(#[from] upowerd_bus::Error),

    /// A native source's initial enumeration failed outright.
    #[error("enumerating native source: {0}")]
    Source(#[from] upowerd_backend::Error),

    /// Cannot parse D-Bus object path.
    #[error("cannot parse D-Bus object path: {0}")]
    InvalidObjectPath(
        #[from]
        #[source]
        zbus::zvariant::Error,
    ),

    /// The well-known name could not be (re-)acquired after the retry
    /// budget was exhausted.
    #[error("could not acquire {name} after {attempts} attempts")]
    NameAcquisitionExhausted {
        /// The well-known name that was being claimed.
        name: String,
        /// How many attempts were made before giving up.
        attempts: u32,
    },
}
