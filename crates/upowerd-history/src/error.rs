use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the history store.
///
/// Per the daemon's error taxonomy, persistence failures are logged and
/// swallowed by the public API rather than propagated to callers — history
/// is best-effort. This type exists for the store's internal plumbing and
/// for tests that want to assert on a specific failure.
#[derive(Error, Debug)]
pub enum Error {
    /// Could not create the history directory.
    #[error("cannot create history directory '{}'", path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Could not open a per-series history file for append.
    #[error("cannot open history file '{}'", path.display())]
    OpenFile {
        /// File that could not be opened.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Could not write a record to a history file.
    #[error("cannot write to history file '{}'", path.display())]
    WriteFile {
        /// File that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
