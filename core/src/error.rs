//! Error kinds shared across the engine.
//!
//! Nothing in the key-event path propagates failure to the host: callers
//! reduce every error to a local degradation (fewer candidate sources, a
//! skipped config entry, a quarantined database). The kinds below exist so
//! that the degradation site can log what happened and tests can assert on
//! the class of failure.

use std::fmt;
use std::io;

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Classified failure.
#[derive(Debug)]
pub enum Error {
    /// An I/O failure on a retriable resource (dictionary file, artifact).
    /// The affected source is dropped for the current query after one retry.
    TransientIo { context: String, source: io::Error },

    /// Malformed external data: a bad compose-file line, an unknown keysym
    /// in a keybinding, an unparsable config value. The offending entry is
    /// skipped and the rest is loaded.
    MalformedInput { file: String, line: usize, message: String },

    /// The user database could not be opened or no longer round-trips.
    /// The store is quarantined (renamed) and a fresh one is created.
    UserDbCorruption { path: String, message: String },

    /// A configured ceiling was exceeded; the eviction policy has already
    /// been applied. Never surfaced to the user.
    ResourceLimit { what: &'static str, limit: usize },

    /// An internal invariant was violated. The current preedit is cleared
    /// and the engine returns to its empty state.
    ProgrammerError { message: String },
}

impl Error {
    pub fn malformed(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Error::MalformedInput {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn transient(context: impl Into<String>, source: io::Error) -> Self {
        Error::TransientIo {
            context: context.into(),
            source,
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Error::ProgrammerError {
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TransientIo { context, source } => {
                write!(f, "i/o failure ({context}): {source}")
            }
            Error::MalformedInput { file, line, message } => {
                write!(f, "{file}:{line}: {message}")
            }
            Error::UserDbCorruption { path, message } => {
                write!(f, "user database corrupt at {path}: {message}")
            }
            Error::ResourceLimit { what, limit } => {
                write!(f, "{what} exceeded configured limit {limit}")
            }
            Error::ProgrammerError { message } => {
                write!(f, "invariant violated: {message}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::TransientIo { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::TransientIo {
            context: String::new(),
            source,
        }
    }
}
