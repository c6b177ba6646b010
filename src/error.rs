use crate::parser::ReturnCode;
use std::{fmt, io};

/// Why the engine shut down, attached to [`Error::ConnectionShutdown`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownCause {
    /// The transport failed or reached end of stream.
    Io(io::ErrorKind),
    /// The server sent bytes that do not parse as a meta-protocol frame.
    MalformedFrame,
    /// The engine stopped accepting work, either cleanly or because its
    /// task was cancelled.
    Terminated,
}

/// Errors surfaced by the client.
#[derive(Debug)]
pub enum Error {
    /// Failed to establish the connection.
    Connect(io::Error),
    /// The transport failed mid-stream.
    Io(io::Error),
    /// The key was rejected before anything was written to the wire.
    InvalidKey(String),
    /// The value exceeds the configured server limit.
    ValueTooLarge {
        /// Size of the offending value, in bytes.
        size: usize,
        /// Configured limit, in bytes.
        limit: usize,
    },
    /// The key does not exist on the server.
    KeyNotFound,
    /// The key already exists on the server.
    KeyExists,
    /// Arithmetic was requested for a type that is not numeric on the wire.
    TypeMismatch,
    /// Stored bytes could not be decoded into the requested type.
    Decode(String),
    /// A response frame violated the protocol grammar.
    MalformedFrame(String),
    /// The server answered with a code the command cannot produce.
    UnexpectedReturnCode(ReturnCode),
    /// The engine terminated; outstanding and future requests fail with this.
    ConnectionShutdown(ShutdownCause),
    /// `run()` was invoked more than once.
    AlreadyRunning,
    /// The engine went away without completing the request.
    Cancelled,
}

impl ShutdownCause {
    pub(crate) fn from_error(error: &Error) -> ShutdownCause {
        match error {
            Error::Connect(e) | Error::Io(e) => ShutdownCause::Io(e.kind()),
            Error::MalformedFrame(_) => ShutdownCause::MalformedFrame,
            _ => ShutdownCause::Terminated,
        }
    }
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "transport failed: {}", kind),
            Self::MalformedFrame => write!(f, "malformed response frame"),
            Self::Terminated => write!(f, "engine terminated"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "connect: {}", e),
            Self::Io(e) => write!(f, "io: {}", e),
            Self::InvalidKey(reason) => write!(f, "invalid key: {}", reason),
            Self::ValueTooLarge { size, limit } => {
                write!(f, "value of {} bytes exceeds limit of {} bytes", size, limit)
            }
            Self::KeyNotFound => write!(f, "key not found"),
            Self::KeyExists => write!(f, "key already exists"),
            Self::TypeMismatch => write!(f, "type is not numeric on the wire"),
            Self::Decode(reason) => write!(f, "decode: {}", reason),
            Self::MalformedFrame(reason) => write!(f, "malformed frame: {}", reason),
            Self::UnexpectedReturnCode(code) => write!(f, "unexpected return code: {}", code),
            Self::ConnectionShutdown(cause) => write!(f, "connection shut down: {}", cause),
            Self::AlreadyRunning => write!(f, "engine is already running"),
            Self::Cancelled => write!(f, "request cancelled"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
