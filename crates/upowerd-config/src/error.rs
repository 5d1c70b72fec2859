use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading or parsing the daemon configuration file.
#[derive(Error, Debug)]
pub enum Error {
    /// The config file exists but could not be read.
    #[error("cannot read config file '{}'", path.display())]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A line in the config file is not a recognized `key=value` pair.
    #[error("malformed config line {line_no} in '{}': {line}", path.display())]
    MalformedLine {
        /// Path of the config file.
        path: PathBuf,
        /// 1-based line number.
        line_no: usize,
        /// The offending line, verbatim.
        line: String,
    },

    /// A recognized key had a value that could not be parsed to its expected type.
    #[error("invalid value for '{key}' in '{}': {value}", path.display())]
    InvalidValue {
        /// Path of the config file.
        path: PathBuf,
        /// The config key.
        key: String,
        /// The offending raw value.
        value: String,
    },
}
