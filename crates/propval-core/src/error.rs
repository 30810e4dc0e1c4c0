//! Error type shared by every fallible operation in the crate.
//!
//! Only I/O, persistence and configuration can fail. Degenerate statistics
//! (no samples, zero spread) are reported as `NaN` values, never as errors.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used across `propval-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading inputs or persisting results.
#[derive(Error, Debug)]
pub enum Error {
    /// A document, sample file or aggregate could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A JSON document did not match the expected shape.
    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Field name not in the known report field set.
    #[error("unknown report field '{0}'")]
    UnknownField(String),
}

impl Error {
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// True when the error only concerns the band being processed and the
    /// caller may continue with the next one.
    pub fn is_band_local(&self) -> bool {
        matches!(self, Error::Io { .. } | Error::Json { .. })
    }
}
