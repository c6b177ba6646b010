//! Typed translation between caller values and stored bytes.

use std::borrow::Cow;

use crate::error::Error;

/// A value that can be stored to and read back from the cache.
///
/// `is_numeric` marks types rendered as ASCII decimal on the wire; only
/// those are eligible for the arithmetic (`ma`) command family.
pub trait MemcachedValue: Sized {
    /// The bytes stored for this value.
    fn to_bytes(&self) -> Cow<'_, [u8]>;

    /// Rebuilds the value from stored bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>;

    /// Whether the wire form is ASCII decimal, as increment/decrement require.
    fn is_numeric() -> bool {
        false
    }
}

impl MemcachedValue for Vec<u8> {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Ok(bytes.to_vec())
    }
}

impl MemcachedValue for String {
    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| Error::Decode(format!("invalid utf-8: {}", e)))
    }
}

macro_rules! impl_memcached_value_for_uint {
    ($ty:ident) => {
        impl MemcachedValue for $ty {
            fn to_bytes(&self) -> Cow<'_, [u8]> {
                let mut buf = itoa::Buffer::new();
                Cow::Owned(buf.format(*self).as_bytes().to_vec())
            }

            fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
                btoi::btou(bytes).map_err(|_| {
                    Error::Decode(format!(
                        "not an unsigned decimal: {:?}",
                        String::from_utf8_lossy(bytes)
                    ))
                })
            }

            fn is_numeric() -> bool {
                true
            }
        }
    };
}

macro_rules! impl_memcached_value_for_int {
    ($ty:ident) => {
        impl MemcachedValue for $ty {
            fn to_bytes(&self) -> Cow<'_, [u8]> {
                let mut buf = itoa::Buffer::new();
                Cow::Owned(buf.format(*self).as_bytes().to_vec())
            }

            fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
                btoi::btoi(bytes).map_err(|_| {
                    Error::Decode(format!(
                        "not a signed decimal: {:?}",
                        String::from_utf8_lossy(bytes)
                    ))
                })
            }

            fn is_numeric() -> bool {
                true
            }
        }
    };
}

impl_memcached_value_for_uint!(u8);
impl_memcached_value_for_uint!(u16);
impl_memcached_value_for_uint!(u32);
impl_memcached_value_for_uint!(u64);
impl_memcached_value_for_uint!(usize);

impl_memcached_value_for_int!(i8);
impl_memcached_value_for_int!(i16);
impl_memcached_value_for_int!(i32);
impl_memcached_value_for_int!(i64);
impl_memcached_value_for_int!(isize);
