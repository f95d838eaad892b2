//! Definition of the library's error and result types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The library's error enum.
///
/// Out-of-order doc ids and other corrupted internal states are not
/// represented here: they are programmer errors and abort the process with a
/// diagnostic instead of being reported to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed query text, or a query that analyzed down to nothing.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// Unknown analyzer name, invalid field list, or similar misconfiguration.
    #[error("config error: {0}")]
    Config(String),
    /// A chunk file failed its magic / version / checksum validation.
    #[error("format error in '{path:?}': {msg}")]
    Format {
        /// Path of the offending chunk file.
        path: PathBuf,
        /// What failed to validate.
        msg: String,
    },
    /// Filesystem failure.
    #[error("an io error occurred: '{0}'")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn format(path: impl Into<PathBuf>, msg: impl Into<String>) -> Error {
        Error::Format {
            path: path.into(),
            msg: msg.into(),
        }
    }
}
