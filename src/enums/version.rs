use std::fmt;

/// Enum representing HTTP version.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {

    /// Convert from the minor version number httparse reports.
    ///
    /// Anything other than `HTTP/1.0` and `HTTP/1.1` is rejected by
    /// httparse itself, so other values can't reach this point.
    pub fn from_httparse(v: u8) -> Version {
        match v {
            0 => Version::Http10,
            1 => Version::Http11,
            x => panic!("unexpected http minor version {:?}", x),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Version::Http10 => f.write_str("HTTP/1.0"),
            Version::Http11 => f.write_str("HTTP/1.1"),
        }
    }
}
