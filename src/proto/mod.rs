//! The request model: command shapes, per-command flags, and TTLs.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::Error;

mod encode;
pub(crate) use encode::encode_request;

/// Longest key the server accepts, in bytes.
pub const MAX_KEY_LENGTH: usize = 250;

/// Relative TTLs beyond this many seconds are read by the server as
/// absolute Unix times, so the encoder renders them that way.
const RELATIVE_TTL_LIMIT: u64 = 30 * 86400;

/// Time-to-live for a stored item.
///
/// Deadlines are kept as monotonic instants and rendered to seconds at send
/// time, so time spent queued does not shrink the effective TTL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ttl {
    /// The item never expires (`T0` on the wire).
    Indefinitely,
    /// The item expires at the given deadline.
    ExpiresAt(Instant),
}

impl Ttl {
    /// A TTL expiring `duration` from now.
    pub fn expires_in(duration: Duration) -> Ttl {
        Ttl::ExpiresAt(Instant::now() + duration)
    }

    /// Renders the TTL as the integer the `T` flag carries.
    ///
    /// Deadlines in the past clamp to one second. Deadlines more than 30
    /// days out are rendered as absolute Unix times.
    pub(crate) fn wire_seconds(&self) -> u64 {
        match self {
            Ttl::Indefinitely => 0,
            Ttl::ExpiresAt(deadline) => {
                let remaining = deadline
                    .saturating_duration_since(Instant::now())
                    .as_secs()
                    .max(1);
                if remaining > RELATIVE_TTL_LIMIT {
                    let epoch = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or(Duration::ZERO)
                        .as_secs();
                    epoch + remaining
                } else {
                    remaining
                }
            }
        }
    }
}

/// Mode switch for `ms` and `ma` commands. Plain `set` carries no mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageMode {
    /// Store only if the key does not exist (`ME`).
    Add,
    /// Append to an existing value (`MA`).
    Append,
    /// Prepend to an existing value (`MP`).
    Prepend,
    /// Store only if the key exists (`MR`).
    Replace,
    /// Arithmetic increment (`MI`).
    Increment,
    /// Arithmetic decrement (`MD`).
    Decrement,
}

impl StorageMode {
    pub(crate) fn token(&self) -> &'static str {
        match self {
            StorageMode::Add => "ME",
            StorageMode::Append => "MA",
            StorageMode::Prepend => "MP",
            StorageMode::Replace => "MR",
            StorageMode::Increment => "MI",
            StorageMode::Decrement => "MD",
        }
    }
}

/// The per-command protocol flags, rendered in a fixed order:
/// `v`, `T<ttl>`, `N<ttl>`, `M<mode>`, `J<initial>`, `D<delta>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    /// Ask the server to include the value block in its response (`v`).
    pub return_value: bool,
    /// Time-to-live (`T<seconds>`).
    pub ttl: Option<Ttl>,
    /// Create a missing key on arithmetic, with this TTL (`N<seconds>`).
    /// The server only applies `J` when this is present.
    pub auto_vivify_ttl: Option<Ttl>,
    /// Storage mode or arithmetic direction (`M<token>`).
    pub storage_mode: Option<StorageMode>,
    /// Seed for arithmetic on a missing key (`J<u64>`).
    pub initial_value: Option<u64>,
    /// Arithmetic step (`D<u64>`).
    pub delta: Option<u64>,
}

/// A single command, ready for the encoder.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// `ms`: set and its storage-mode variants (add/append/prepend/replace).
    Set {
        /// Validated key bytes.
        key: Vec<u8>,
        /// Opaque payload.
        value: Vec<u8>,
        /// Command flags.
        flags: Flags,
    },
    /// `mg`: get, and touch when `flags.ttl` is set without `return_value`.
    Get {
        /// Validated key bytes.
        key: Vec<u8>,
        /// Command flags.
        flags: Flags,
    },
    /// `md`: delete.
    Delete {
        /// Validated key bytes.
        key: Vec<u8>,
    },
    /// `ma`: increment or decrement, per `flags.storage_mode`.
    Arithmetic {
        /// Validated key bytes.
        key: Vec<u8>,
        /// Command flags.
        flags: Flags,
    },
}

/// Command kind, kept with each pending continuation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Set,
    Get,
    Delete,
    Arithmetic,
}

impl Request {
    pub(crate) fn kind(&self) -> RequestKind {
        match self {
            Request::Set { .. } => RequestKind::Set,
            Request::Get { .. } => RequestKind::Get,
            Request::Delete { .. } => RequestKind::Delete,
            Request::Arithmetic { .. } => RequestKind::Arithmetic,
        }
    }
}

fn is_key_byte(byte: u8) -> bool {
    // No whitespace or control bytes; high bytes pass for UTF-8 keys.
    byte > 32 && byte != 127
}

/// Checks a key against the server's rules and returns it as owned bytes.
pub(crate) fn validated_key(key: &[u8]) -> Result<Vec<u8>, Error> {
    if key.is_empty() {
        return Err(Error::InvalidKey("empty key".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(Error::InvalidKey(format!(
            "key of {} bytes exceeds maximum of {} bytes",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }
    if let Some(byte) = key.iter().find(|b| !is_key_byte(**b)) {
        return Err(Error::InvalidKey(format!(
            "key contains forbidden byte {:#04x}",
            byte
        )));
    }
    Ok(key.to_vec())
}
