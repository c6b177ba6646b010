//! Serialises a [`Request`] into meta-protocol wire bytes.

use bytes::{BufMut, BytesMut};

use super::{Flags, Request};

/// Appends the wire rendering of `request` to `buf`.
///
/// Keys are assumed validated; the encoder writes them verbatim.
pub(crate) fn encode_request(request: &Request, buf: &mut BytesMut) {
    let mut digits = itoa::Buffer::new();
    match request {
        // ms <key> <valuelen> <flags>\r\n<value>\r\n
        Request::Set { key, value, flags } => {
            buf.put_slice(b"ms ");
            buf.put_slice(key);
            buf.put_u8(b' ');
            buf.put_slice(digits.format(value.len()).as_bytes());
            buf.put_u8(b' ');
            put_flags(flags, buf, false);
            buf.put_slice(b"\r\n");
            buf.put_slice(value);
            buf.put_slice(b"\r\n");
        }
        // mg <key> <flags>\r\n
        Request::Get { key, flags } => {
            buf.put_slice(b"mg ");
            buf.put_slice(key);
            put_flags(flags, buf, true);
            buf.put_slice(b"\r\n");
        }
        // md <key>\r\n
        Request::Delete { key } => {
            buf.put_slice(b"md ");
            buf.put_slice(key);
            buf.put_slice(b"\r\n");
        }
        // ma <key> <flags>\r\n
        Request::Arithmetic { key, flags } => {
            buf.put_slice(b"ma ");
            buf.put_slice(key);
            put_flags(flags, buf, true);
            buf.put_slice(b"\r\n");
        }
    }
}

// Flag tokens in table order: v, T, N, M, J, D. With `leading_space` a space
// precedes every token; otherwise the first token lands directly after the
// space the caller already wrote.
fn put_flags(flags: &Flags, buf: &mut BytesMut, leading_space: bool) {
    let mut digits = itoa::Buffer::new();
    let mut first = true;
    let separate = |buf: &mut BytesMut, first: &mut bool| {
        if !*first || leading_space {
            buf.put_u8(b' ');
        }
        *first = false;
    };

    if flags.return_value {
        separate(buf, &mut first);
        buf.put_u8(b'v');
    }
    if let Some(ttl) = flags.ttl {
        separate(buf, &mut first);
        buf.put_u8(b'T');
        buf.put_slice(digits.format(ttl.wire_seconds()).as_bytes());
    }
    if let Some(ttl) = flags.auto_vivify_ttl {
        separate(buf, &mut first);
        buf.put_u8(b'N');
        buf.put_slice(digits.format(ttl.wire_seconds()).as_bytes());
    }
    if let Some(mode) = flags.storage_mode {
        separate(buf, &mut first);
        buf.put_slice(mode.token().as_bytes());
    }
    if let Some(initial) = flags.initial_value {
        separate(buf, &mut first);
        buf.put_u8(b'J');
        buf.put_slice(digits.format(initial).as_bytes());
    }
    if let Some(delta) = flags.delta {
        separate(buf, &mut first);
        buf.put_u8(b'D');
        buf.put_slice(digits.format(delta).as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::super::{StorageMode, Ttl};
    use super::*;

    fn encoded(request: &Request) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_request(request, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn test_encode_plain_set() {
        let request = Request::Set {
            key: b"bar".to_vec(),
            value: b"foo".to_vec(),
            flags: Flags::default(),
        };
        assert_eq!(encoded(&request), b"ms bar 3 \r\nfoo\r\n");
    }

    #[test]
    fn test_encode_set_with_indefinite_ttl() {
        let request = Request::Set {
            key: b"bar".to_vec(),
            value: b"foo".to_vec(),
            flags: Flags {
                ttl: Some(Ttl::Indefinitely),
                ..Flags::default()
            },
        };
        assert_eq!(encoded(&request), b"ms bar 3 T0\r\nfoo\r\n");
    }

    #[test]
    fn test_encode_add_mode() {
        let request = Request::Set {
            key: b"adds".to_vec(),
            value: b"foo".to_vec(),
            flags: Flags {
                storage_mode: Some(StorageMode::Add),
                ..Flags::default()
            },
        };
        assert_eq!(encoded(&request), b"ms adds 3 ME\r\nfoo\r\n");
    }

    #[test]
    fn test_encode_replace_with_ttl_keeps_flag_order() {
        let request = Request::Set {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
            flags: Flags {
                ttl: Some(Ttl::Indefinitely),
                storage_mode: Some(StorageMode::Replace),
                ..Flags::default()
            },
        };
        assert_eq!(encoded(&request), b"ms k 1 T0 MR\r\nv\r\n");
    }

    #[test]
    fn test_encode_get() {
        let request = Request::Get {
            key: b"bar".to_vec(),
            flags: Flags {
                return_value: true,
                ..Flags::default()
            },
        };
        assert_eq!(encoded(&request), b"mg bar v\r\n");
    }

    #[test]
    fn test_encode_touch_is_get_with_ttl_only() {
        let request = Request::Get {
            key: b"bar".to_vec(),
            flags: Flags {
                ttl: Some(Ttl::Indefinitely),
                ..Flags::default()
            },
        };
        assert_eq!(encoded(&request), b"mg bar T0\r\n");
    }

    #[test]
    fn test_encode_delete() {
        let request = Request::Delete {
            key: b"bar".to_vec(),
        };
        assert_eq!(encoded(&request), b"md bar\r\n");
    }

    #[test]
    fn test_encode_increment_with_all_flags() {
        let request = Request::Arithmetic {
            key: b"counter".to_vec(),
            flags: Flags {
                return_value: true,
                ttl: Some(Ttl::Indefinitely),
                storage_mode: Some(StorageMode::Increment),
                initial_value: Some(5),
                delta: Some(2),
                ..Flags::default()
            },
        };
        assert_eq!(encoded(&request), b"ma counter v T0 MI J5 D2\r\n");
    }

    #[test]
    fn test_encode_seeded_increment_carries_vivify_flag() {
        let request = Request::Arithmetic {
            key: b"counter".to_vec(),
            flags: Flags {
                return_value: true,
                auto_vivify_ttl: Some(Ttl::Indefinitely),
                storage_mode: Some(StorageMode::Increment),
                initial_value: Some(5),
                delta: Some(10),
                ..Flags::default()
            },
        };
        assert_eq!(encoded(&request), b"ma counter v N0 MI J5 D10\r\n");
    }

    #[test]
    fn test_encode_decrement() {
        let request = Request::Arithmetic {
            key: b"counter".to_vec(),
            flags: Flags {
                return_value: true,
                storage_mode: Some(StorageMode::Decrement),
                delta: Some(100),
                ..Flags::default()
            },
        };
        assert_eq!(encoded(&request), b"ma counter v MD D100\r\n");
    }

    #[test]
    fn test_encode_empty_value() {
        let request = Request::Set {
            key: b"empty".to_vec(),
            value: Vec::new(),
            flags: Flags::default(),
        };
        assert_eq!(encoded(&request), b"ms empty 0 \r\n\r\n");
    }
}
