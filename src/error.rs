use std::io;

use httparse;

use body::BodyError;
use enums::Status;

quick_error! {
    /// Fatal error of an HTTP parser
    ///
    /// Any of these aborts the message currently being parsed; the caller
    /// is expected to answer with `Error::status()` (server side) or just
    /// drop the connection (client side). There is no way to resynchronize
    /// a corrupted stream.
    #[derive(Debug)]
    pub enum Error {
        /// Socket IO error
        Io(err: io::Error) {
            description("I/O error")
            display("I/O error: {}", err)
            from()
        }
        /// Error parsing the start line or the headers
        Header(err: httparse::Error) {
            description("malformed message head")
            display("malformed message head: {:?}", err)
        }
        /// Error parsing a chunk of chunked transfer encoding
        ChunkSize(err: httparse::InvalidChunkSize) {
            description("malformed body chunk")
            from()
        }
        /// Start line is longer than the configured limit
        RequestLineTooLong {
            description("start line is too long")
        }
        /// The header section is larger than the configured limit
        HeadersTooLarge {
            description("headers are too large")
        }
        /// Entity body is larger than the configured limit
        BodyTooLarge {
            description("entity body is too large")
        }
        /// Version is not HTTP/1.0 or HTTP/1.1
        UnsupportedVersion {
            description("unsupported HTTP version")
        }
        /// Status code of a response is out of the 100-599 range
        BadStatus(code: u16) {
            description("status code out of range")
            display("status code out of range: {}", code)
        }
        /// Content-Length header is not a plain decimal number
        BadContentLength {
            description("invalid content-length header")
        }
        /// Duplicate Content-Length header, prohibited due to security
        DuplicateContentLength {
            description("duplicate content-length header")
        }
        /// The peer closed the connection in the middle of a message
        ConnectionReset {
            description("connection reset mid-message")
        }
    }
}

impl Error {
    /// The status code a server should answer this parse error with
    pub fn status(&self) -> Status {
        use self::Error::*;
        match *self {
            RequestLineTooLong => Status::UriTooLong,
            HeadersTooLarge => Status::RequestHeaderFieldsTooLarge,
            BodyTooLarge => Status::PayloadTooLarge,
            UnsupportedVersion => Status::VersionNotSupported,
            _ => Status::BadRequest,
        }
    }
}

impl From<httparse::Error> for Error {
    fn from(err: httparse::Error) -> Error {
        match err {
            httparse::Error::Version => Error::UnsupportedVersion,
            err => Error::Header(err),
        }
    }
}

impl From<BodyError> for Error {
    fn from(err: BodyError) -> Error {
        match err {
            BodyError::TooLarge => Error::BodyTooLarge,
            BodyError::Io(err) => Error::Io(err),
        }
    }
}

quick_error! {
    /// Fatal error of a writer
    ///
    /// Writers never retry: on any of these the caller should finish as if
    /// the write completed and close the connection, since a half-written
    /// message can not be resumed safely.
    #[derive(Debug)]
    pub enum WriteError {
        /// The destination accepted zero bytes while still "open"
        DestinationGone {
            description("destination is gone")
        }
        /// Socket IO error
        Io(err: io::Error) {
            description("I/O error")
            display("I/O error: {}", err)
            from()
        }
    }
}

#[cfg(test)]
mod test {
    use httparse;
    use enums::Status;
    use super::Error;

    #[test]
    fn status_mapping() {
        assert_eq!(Error::HeadersTooLarge.status().code(), 431);
        assert_eq!(Error::BodyTooLarge.status().code(), 413);
        assert_eq!(Error::RequestLineTooLong.status().code(), 414);
        assert_eq!(Error::UnsupportedVersion.status().code(), 505);
        assert_eq!(Error::DuplicateContentLength.status(), Status::BadRequest);
    }

    #[test]
    fn version_error_is_505() {
        let err: Error = httparse::Error::Version.into();
        assert!(matches!(err, Error::UnsupportedVersion));
    }

    #[test]
    fn send_sync() {
        fn send_sync<T: Send + Sync>(_: T) {}
        send_sync(Error::HeadersTooLarge);
    }
}
