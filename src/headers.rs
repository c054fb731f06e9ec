//! Scanners for the header values the protocol machinery itself cares about
//!
//! Header values are byte sequences; we need case insensitive comparison
//! with the surrounding whitespace stripped out.

pub fn bytes_trim(mut x: &[u8]) -> &[u8] {
    while x.len() > 0 && matches!(x[0], b'\r' | b'\n' | b' ' | b'\t') {
        x = &x[1..];
    }
    while x.len() > 0 && matches!(x[x.len()-1], b'\r' | b'\n' | b' ' | b'\t')
    {
        x = &x[..x.len()-1];
    }
    return x;
}

fn token_eq(val: &[u8], token: &[u8]) -> bool {
    let val = bytes_trim(val);
    val.len() == token.len() &&
        val.iter().zip(token.iter())
           .all(|(&a, &b)| a.to_ascii_lowercase() == b)
}

pub fn is_identity(val: &[u8]) -> bool {
    token_eq(val, b"identity")
}

pub fn is_close(val: &[u8]) -> bool {
    token_eq(val, b"close")
}

pub fn is_upgrade(val: &[u8]) -> bool {
    token_eq(val, b"upgrade")
}

pub fn is_continue(val: &[u8]) -> bool {
    token_eq(val, b"100-continue")
}

pub fn is_content_length(name: &str) -> bool {
    name.eq_ignore_ascii_case("Content-Length")
}

pub fn is_transfer_encoding(name: &str) -> bool {
    name.eq_ignore_ascii_case("Transfer-Encoding")
}

pub fn is_connection(name: &str) -> bool {
    name.eq_ignore_ascii_case("Connection")
}

pub fn is_expect(name: &str) -> bool {
    name.eq_ignore_ascii_case("Expect")
}

#[cfg(test)]
mod test {
    use super::{is_content_length, is_transfer_encoding, is_connection};
    use super::{is_expect};
    use super::{is_close, is_continue, is_identity, is_upgrade};

    #[test]
    fn test_names() {
        assert!(is_content_length("Content-Length"));
        assert!(is_content_length("CONTENT-LENGTH"));
        assert!(is_transfer_encoding("transfer-ENCODING"));
        assert!(is_connection("ConneCTION"));
        assert!(is_expect("expect"));
        assert!(!is_content_length("Content-Type"));
    }

    #[test]
    fn test_identity() {
        assert!(is_identity(b"identity"));
        assert!(is_identity(b" Identity "));
        assert!(!is_identity(b"gzip"));
    }

    #[test]
    fn test_close() {
        assert!(is_close(b"close"));
        assert!(is_close(b" CLOSE"));
        assert!(is_close(b"   close   "));
        assert!(!is_close(b"Close  1 "));
        assert!(!is_close(b" xclose   "));
    }

    #[test]
    fn test_upgrade() {
        assert!(is_upgrade(b"Upgrade"));
        assert!(is_upgrade(b" upgrade "));
        assert!(!is_upgrade(b"downgrade"));
    }

    #[test]
    fn test_continue() {
        assert!(is_continue(b"100-continue"));
        assert!(is_continue(b"  100-CONTINUE"));
        assert!(!is_continue(b"100-continue y  "));
        assert!(!is_continue(b"100-coztinue   "));
    }
}
