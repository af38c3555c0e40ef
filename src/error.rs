//! Error types for the caster
//!
//! Errors raised while handling one connection stay local to that
//! connection's task; the dispatcher logs them and drops the socket.

use std::fmt;
use std::io;

use crate::registry::RegistryError;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Transport error on a socket (reset, broken pipe, ...)
    Io(io::Error),
    /// A socket operation did not complete within its configured timeout
    Timeout(&'static str),
    /// Configuration could not be parsed or is inconsistent
    Config(String),
    /// Registry rejected an operation
    Registry(RegistryError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Timeout(op) => write!(f, "Timed out during {}", op),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl Error {
    /// Whether this error is an ordinary end of a peer's session
    /// (disconnect, reset, timeout) rather than a server fault.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}
