use std::fmt;
use std::str::from_utf8_unchecked;

use rand::{Rng, thread_rng};
use sha1::Sha1;

/// WebSocket GUID constant from RFC 6455
pub const GUID: &'static str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The `Sec-WebSocket-Accept` header value
///
/// You can add it using `enc.format_header("Sec-WebSocket-Accept", accept)`.
/// Or use any other thing that supports `Display`.
pub struct Accept([u8; 20]);

/// The `Sec-WebSocket-Key` header value
///
/// You can add it using `enc.format_header("Sec-WebSocket-Key", key)`.
/// Or use any other thing that supports `Display`.
pub struct Key([u8; 16]);

fn write_base64(data: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    const CHARS: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                                   abcdefghijklmnopqrstuvwxyz\
                                   0123456789+/";
    for chunk in data.chunks(3) {
        let n = ((chunk[0] as usize) << 16)
            | ((*chunk.get(1).unwrap_or(&0) as usize) << 8)
            | (*chunk.get(2).unwrap_or(&0) as usize);
        let quad = [
            CHARS[(n >> 18) & 63],
            CHARS[(n >> 12) & 63],
            if chunk.len() > 1 { CHARS[(n >> 6) & 63] } else { b'=' },
            if chunk.len() > 2 { CHARS[n & 63] } else { b'=' },
        ];
        // only takes bytes of the base64 alphabet
        f.write_str(unsafe { from_utf8_unchecked(&quad) })?;
    }
    Ok(())
}

impl Key {
    /// Create a new (random) key, eligible to use for client connection
    pub fn new() -> Key {
        let mut key = [0u8; 16];
        thread_rng().fill_bytes(&mut key);
        return Key(key);
    }
}

impl Accept {
    /// Create an Accept header value from a key received in header
    ///
    /// Note: key here is a key as passed in header value (base64-encoded)
    /// despite that it's accepted as bytes (not as 16 bytes stored in Key)
    ///
    /// Note 2: this does not validate a key, RFC 6455 doesn't require that
    pub fn from_key_bytes(key: &[u8]) -> Accept {
        let mut sha1 = Sha1::new();
        sha1.update(key);
        sha1.update(GUID.as_bytes());
        Accept(sha1.digest().bytes())
    }
}

impl fmt::Display for Accept {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_base64(&self.0, f)
    }
}

impl fmt::Debug for Accept {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "websocket::Accept({})", self)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_base64(&self.0, f)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "websocket::Key({})", self)
    }
}
