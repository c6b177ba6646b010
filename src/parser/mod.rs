//! Response model and the incremental frame decoder.

use btoi::btou;
use nom::{bytes::streaming::take_while_m_n, character::is_digit, combinator::map_res, IResult};
use std::fmt;

mod meta;
pub use meta::parse_meta_response;

/// The two-letter header prefix of a response frame, plus the server's
/// free-form error lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReturnCode {
    /// `HD`: the operation succeeded.
    Stored,
    /// `NS`: the value was not stored.
    NotStored,
    /// `EX`: the key already exists.
    Exists,
    /// `NF`: the key was not found.
    NotFound,
    /// `VA`: a value block follows.
    Value,
    /// `EN`: cache miss.
    Miss,
    /// Bare `ERROR`: the command does not exist.
    NonexistentCommand,
    /// A `CLIENT_ERROR` line with its message.
    ClientError(String),
    /// A `SERVER_ERROR` line with its message.
    ServerError(String),
}

/// One framed response from the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// The return code.
    pub code: ReturnCode,
    /// Echoed flags, one `(token, value)` pair each; the value may be empty.
    pub flags: Vec<(u8, Vec<u8>)>,
    /// The value block of a `VA` frame.
    pub data: Option<Vec<u8>>,
}

impl Response {
    /// Returns the echoed value for `token`, if the server sent it.
    pub fn flag(&self, token: u8) -> Option<&[u8]> {
        self.flags
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, value)| value.as_slice())
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Stored => write!(f, "stored"),
            Self::NotStored => write!(f, "not stored"),
            Self::Exists => write!(f, "exists"),
            Self::NotFound => write!(f, "not found"),
            Self::Value => write!(f, "value"),
            Self::Miss => write!(f, "miss"),
            Self::NonexistentCommand => write!(f, "command does not exist"),
            Self::ClientError(s) => write!(f, "client error: {}", s),
            Self::ServerError(s) => write!(f, "server error: {}", s),
        }
    }
}

pub(crate) fn parse_u32(buf: &[u8]) -> IResult<&[u8], u32> {
    map_res(take_while_m_n(1, 10, is_digit), btou)(buf)
}
