//! Head and body serialization state machine, shared between the
//! request and the response side of `writer::Encoder`
//!
//! The state lives separately from the buffer; every method takes the
//! buffer as an argument and the caller is expected to pass the same one
//! each time.

use std::fmt::Display;
use std::io::Write;
#[allow(unused_imports)]
use std::ascii::AsciiExt;

use netbuf::Buf;

use enums::Version;

quick_error! {
    #[derive(Debug)]
    pub enum HeaderError {
        DuplicateContentLength {
            description("Content-Length is added twice")
        }
        DuplicateTransferEncoding {
            description("Transfer-Encoding is added twice")
        }
        InvalidHeaderName {
            description("header name contains invalid characters")
        }
        InvalidHeaderValue {
            description("header value contains invalid characters")
        }
        TransferEncodingAfterContentLength {
            description("Transfer-Encoding set when Content-Length \
                is already present")
        }
        ContentLengthAfterTransferEncoding {
            description("Content-Length set after Transfer-Encoding")
        }
        CantDetermineBodySize {
            description("neither Content-Length nor Transfer-Encoding \
                is present in the headers")
        }
        BodyLengthHeader {
            description("Content-Length and Transfer-Encoding must be set \
                using the specialized methods")
        }
        RequireBodyless {
            description("this message must not carry body length fields")
        }
    }
}

/// Serialization progress of one message, request or response
#[derive(Debug)]
pub enum MessageState {
    /// Nothing written yet.
    ResponseStart { version: Version, body: Body, close: bool },
    /// An interim 100 (Continue) went out, the final response is next.
    FinalResponseStart { version: Version, body: Body, close: bool },
    /// Nothing written yet.
    RequestStart,
    /// The start line is in the buffer, headers may follow.
    Headers { version: Version, body: Body, close: bool },
    /// Headers with a Content-Length already among them.
    FixedHeaders { is_head: bool, close: bool, content_length: u64 },
    /// Headers with chunked transfer encoding declared.
    ChunkedHeaders { is_head: bool, close: bool },
    /// Headers of a body that runs until the connection closes.
    ///
    /// The HTTP/1.0 fallback for bodies of length unknown in advance.
    StreamHeaders { is_head: bool },
    /// Header section closed, no body may follow.
    ///
    /// Requests without a length header, all 1xx, 204 and 304
    /// responses end up here.
    Bodyless,
    /// Body of a declared fixed length being written.
    FixedBody { is_head: bool, content_length: u64 },
    /// Chunked body being written.
    ChunkedBody { is_head: bool },
    /// Close-delimited body being written.
    StreamBody { is_head: bool },
    /// Everything including the body finalizer is in the buffer.
    Done,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Body {
    /// A body is expected.
    Normal,
    /// Response to a HEAD request: lengths are real, payload is dropped.
    Head,
    /// A body is forbidden (1xx, 204, 304 responses).
    Denied,
    /// Requests always may carry a body, possibly an empty one.
    Request,
}

fn invalid_header(value: &[u8]) -> bool {
    return value.iter().any(|&x| x == b'\r' || x == b'\n')
}

impl MessageState {
    /// Write the status line into the buffer
    ///
    /// # Panics
    ///
    /// When the status line was already written, and on code 100: the
    /// interim continue response goes through `response_continue`
    /// instead.
    pub fn response_status(&mut self, buf: &mut Buf, code: u16, reason: &str) {
        use self::Body::*;
        use self::MessageState::*;
        match *self {
            ResponseStart { version, mut body, close } |
            FinalResponseStart { version, mut body, close } => {
                assert!(code != 100);
                write!(buf, "{} {} {}\r\n",
                    version, code, reason).unwrap();
                // 1xx, 204 and 304 must not carry a body no matter what
                // headers follow
                if (code >= 100 && code < 200) || code == 204 || code == 304 {
                    body = Denied
                }
                *self = Headers {
                    version: version,
                    body: body,
                    close: close,
                };
            }
            ref state => {
                panic!("response_status() called in state {:?}", state)
            }
        }
    }

    /// Write the request line into the buffer
    ///
    /// # Panics
    ///
    /// When the request line was already written.
    pub fn request_line(&mut self, buf: &mut Buf,
        method: &str, path: &str, version: Version)
    {
        use self::Body::*;
        use self::MessageState::*;
        match *self {
            RequestStart => {
                write!(buf, "{} {} {}\r\n",
                    method, path, version).unwrap();
                *self = Headers {
                    version: version,
                    body: Request,
                    close: false,
                };
            }
            ref state => {
                panic!("request_line() called in state {:?}", state)
            }
        }
    }

    /// Write an interim 100 (Continue) response
    ///
    /// The final status line still has to follow through
    /// `response_status`.
    ///
    /// # Panics
    ///
    /// When the response is already started.
    pub fn response_continue(&mut self, buf: &mut Buf) {
        use self::MessageState::*;
        match *self {
            ResponseStart { version, body, close } => {
                write!(buf, "{} 100 Continue\r\n\r\n", version).unwrap();
                *self = FinalResponseStart { version: version,
                                            body: body,
                                            close: close }
            }
            ref state => {
                panic!("response_continue() called in state {:?}", state)
            }
        }
    }

    fn write_header(&mut self, buf: &mut Buf, name: &str, value: &[u8])
        -> Result<(), HeaderError>
    {
        if invalid_header(name.as_bytes()) {
            return Err(HeaderError::InvalidHeaderName);
        }
        let start = buf.len();
        buf.write_all(name.as_bytes()).unwrap();
        buf.write_all(b": ").unwrap();

        let value_start = buf.len();
        buf.write_all(value).unwrap();
        if invalid_header(&buf[value_start..]) {
            // roll the partial header line back out of the buffer
            buf.remove_range(start..);
            return Err(HeaderError::InvalidHeaderValue);
        }

        buf.write_all(b"\r\n").unwrap();
        Ok(())
    }

    fn write_formatted<D: Display>(&mut self, buf: &mut Buf,
        name: &str, value: D)
        -> Result<(), HeaderError>
    {
        if invalid_header(name.as_bytes()) {
            return Err(HeaderError::InvalidHeaderName);
        }
        let start = buf.len();
        buf.write_all(name.as_bytes()).unwrap();
        buf.write_all(b": ").unwrap();

        let value_start = buf.len();
        write!(buf, "{}", value).unwrap();
        if invalid_header(&buf[value_start..]) {
            buf.remove_range(start..);
            return Err(HeaderError::InvalidHeaderValue);
        }

        buf.write_all(b"\r\n").unwrap();
        Ok(())
    }

    /// Write one header line into the buffer
    ///
    /// The body framing headers are off limits here: `Content-Length`
    /// goes through `add_length` and `Transfer-Encoding: chunked` through
    /// `add_chunked`, so the body writing methods always agree with what
    /// was declared. A `Result` (rather than a panic) makes proxying
    /// arbitrary header lists practical; plain handlers are expected to
    /// unwrap.
    ///
    /// # Panics
    ///
    /// When called before the start line or after `done_headers`.
    pub fn add_header(&mut self, buf: &mut Buf, name: &str, value: &[u8])
        -> Result<(), HeaderError>
    {
        use self::MessageState::*;
        use self::HeaderError::*;
        if name.eq_ignore_ascii_case("Content-Length")
            || name.eq_ignore_ascii_case("Transfer-Encoding") {
            return Err(BodyLengthHeader)
        }
        match *self {
            Headers { .. } | FixedHeaders { .. } | ChunkedHeaders { .. } |
            StreamHeaders { .. } => {
                self.write_header(buf, name, value)?;
                Ok(())
            }
            ref state => {
                panic!("add_header() called in state {:?}", state)
            }
        }
    }

    /// Like `add_header`, with the value formatted into the buffer
    /// directly; handy for dates and numbers
    pub fn format_header<D: Display>(&mut self, buf: &mut Buf,
        name: &str, value: D)
        -> Result<(), HeaderError>
    {
        use self::MessageState::*;
        use self::HeaderError::*;
        if name.eq_ignore_ascii_case("Content-Length")
            || name.eq_ignore_ascii_case("Transfer-Encoding") {
            return Err(BodyLengthHeader)
        }
        match *self {
            Headers { .. } | FixedHeaders { .. } | ChunkedHeaders { .. } |
            StreamHeaders { .. } => {
                self.write_formatted(buf, name, value)?;
                Ok(())
            }
            ref state => {
                panic!("format_header() called in state {:?}", state)
            }
        }
    }

    /// Add a `Content-Type` header
    ///
    /// Bare `text/*` types get `charset=utf-8` appended; anything else,
    /// including text types that already spell a charset, is written as is.
    pub fn add_content_type(&mut self, buf: &mut Buf, mime: &str)
        -> Result<(), HeaderError>
    {
        if mime.starts_with("text/") && !mime.contains("charset") {
            self.format_header(buf, "Content-Type",
                format_args!("{}; charset=utf-8", mime))
        } else {
            self.add_header(buf, "Content-Type", mime.as_bytes())
        }
    }

    /// Declare a fixed body length, writing the `Content-Length` header
    ///
    /// The declared length is enforced while the body is written.
    ///
    /// # Panics
    ///
    /// When called before the start line or after `done_headers`.
    pub fn add_length(&mut self, buf: &mut Buf, n: u64)
        -> Result<(), HeaderError> {
        use self::MessageState::*;
        use self::HeaderError::*;
        use self::Body::*;
        match *self {
            FixedHeaders { .. } => Err(DuplicateContentLength),
            ChunkedHeaders { .. } | StreamHeaders { .. }
                => Err(ContentLengthAfterTransferEncoding),
            Headers { body: Denied, .. } => Err(RequireBodyless),
            Headers { body, close, .. } => {
                self.write_formatted(buf, "Content-Length", n)?;
                *self = FixedHeaders { is_head: body == Head,
                                        close: close,
                                        content_length: n };
                Ok(())
            }
            ref state => {
                panic!("add_length() called in state {:?}", state)
            }
        }
    }

    /// Declare a chunked body, writing the `Transfer-Encoding` header
    ///
    /// Chunked is the only transfer coding the serializer produces.
    ///
    /// # Panics
    ///
    /// When called before the start line or after `done_headers`.
    pub fn add_chunked(&mut self, buf: &mut Buf)
        -> Result<(), HeaderError> {
            use self::MessageState::*;
            use self::HeaderError::*;
            use self::Body::*;
            match *self {
                FixedHeaders { .. } => Err(TransferEncodingAfterContentLength),
                ChunkedHeaders { .. } | StreamHeaders { .. }
                    => Err(DuplicateTransferEncoding),
                Headers { body: Denied, .. } => Err(RequireBodyless),
                Headers { body, close, .. } => {
                    self.write_header(buf, "Transfer-Encoding", b"chunked")?;
                    *self = ChunkedHeaders { is_head: body == Head,
                                              close: close };
                    Ok(())
                }
            ref state => {
                panic!("add_chunked() called in state {:?}", state)
            }
        }
    }

    /// Declare a body of length unknown in advance
    ///
    /// On HTTP/1.1 this is plain chunked encoding. HTTP/1.0 peers don't
    /// understand chunks, so the body is streamed as is and delimited by
    /// closing the connection; the caller must close after `done()`.
    ///
    /// # Panics
    ///
    /// When called before the start line or after `done_headers`.
    pub fn add_stream(&mut self, buf: &mut Buf)
        -> Result<(), HeaderError>
    {
        use self::MessageState::*;
        use self::HeaderError::*;
        use self::Body::*;
        match *self {
            FixedHeaders { .. } => Err(TransferEncodingAfterContentLength),
            ChunkedHeaders { .. } | StreamHeaders { .. }
                => Err(DuplicateTransferEncoding),
            Headers { body: Denied, .. } => Err(RequireBodyless),
            Headers { version: Version::Http11, .. } => self.add_chunked(buf),
            Headers { version: Version::Http10, body, .. } => {
                *self = StreamHeaders { is_head: body == Head };
                Ok(())
            }
            ref state => {
                panic!("add_stream() called in state {:?}", state)
            }
        }
    }

    /// Whether the start line went out already
    ///
    /// Once it has, it's too late to replace the message with an error
    /// page.
    pub fn is_started(&self) -> bool {
        !matches!(*self,
            MessageState::RequestStart |
            MessageState::ResponseStart { .. } |
            MessageState::FinalResponseStart { .. })
    }

    /// Close the header section, returning whether a body will go out
    ///
    /// `false` means the payload is suppressed: 1xx, 204, 304 statuses
    /// and responses to HEAD requests (a zero-length body still counts
    /// as `true`). Also stamps `Connection: close` when the message
    /// terminates the connection.
    ///
    /// # Panics
    ///
    /// When called twice or before the start line.
    pub fn done_headers(&mut self, buf: &mut Buf)
        -> Result<bool, HeaderError>
    {
        use self::Body::*;
        use self::MessageState::*;
        if matches!(*self,
                    Headers { close: true, .. } |
                    FixedHeaders { close: true, .. } |
                    ChunkedHeaders { close: true, .. }) {
            self.add_header(buf, "Connection", b"close").unwrap();
        }
        let expect_body = match *self {
            Headers { body: Denied, .. } => {
                *self = Bodyless;
                false
            }
            Headers { body: Request, .. } => {
                // a request without length headers has an empty body
                *self = FixedBody { is_head: false, content_length: 0 };
                true
            }
            Headers { body: Normal, .. } | Headers { body: Head, .. } => {
                return Err(HeaderError::CantDetermineBodySize);
            }
            FixedHeaders { is_head, content_length, .. } => {
                *self = FixedBody { is_head: is_head,
                                     content_length: content_length };
                !is_head
            }
            ChunkedHeaders { is_head, .. } => {
                *self = ChunkedBody { is_head: is_head };
                !is_head
            }
            StreamHeaders { is_head } => {
                *self = StreamBody { is_head: is_head };
                !is_head
            }
            ref state => {
                panic!("done_headers() called in state {:?}", state)
            }
        };
        buf.write(b"\r\n").unwrap();
        Ok(expect_body)
    }

    /// Put a piece of the body into the buffer
    ///
    /// Fixed bodies are counted against the declared length, chunked
    /// bodies get their framing here, stream bodies go out verbatim.
    /// For responses to HEAD requests the bytes are silently dropped,
    /// so the same handler code works for GET and HEAD (though not
    /// building the body at all is cheaper).
    ///
    /// # Panics
    ///
    /// When the headers aren't closed yet, when the message can't have
    /// a body, and when a fixed body overruns its declared length.
    pub fn write_body(&mut self, buf: &mut Buf, data: &[u8]) {
        use self::MessageState::*;
        match *self {
            Bodyless => panic!("message must not contain a body"),
            FixedBody { is_head, ref mut content_length } => {
                if data.len() as u64 > *content_length {
                    panic!("fixed body overrun: {} bytes left, \
                        {} more written", content_length, data.len());
                }
                if !is_head {
                    buf.write(data).unwrap();
                }
                *content_length -= data.len() as u64;
            }
            ChunkedBody { is_head } => if !is_head && data.len() > 0 {
                write!(buf, "{:x}\r\n", data.len()).unwrap();
                buf.write(data).unwrap();
                buf.write(b"\r\n").unwrap();
            },
            StreamBody { is_head } => if !is_head {
                buf.write(data).unwrap();
            },
            ref state => {
                panic!("write_body() called in state {:?}", state)
            }
        }
    }

    /// Whether the header section is already serialized
    pub fn is_after_headers(&self) -> bool {
        use self::MessageState::*;
        matches!(*self, Bodyless | Done |
            FixedBody {..} | ChunkedBody {..} | StreamBody {..})
    }

    /// Whether `done()` already ran
    pub fn is_complete(&self) -> bool {
        matches!(*self, MessageState::Done)
    }

    /// Finish the message, writing the body finalizer if one is needed
    ///
    /// Calling it again on a finished message is a no-op.
    ///
    /// # Panics
    ///
    /// When the message is mid-headers, or a fixed body hasn't received
    /// all its declared bytes. Underruns on responses to HEAD requests
    /// pass, since the payload wasn't going out anyway.
    pub fn done(&mut self, buf: &mut Buf) {
        use self::MessageState::*;
        match *self {
            Bodyless => *self = Done,
            FixedBody { is_head: true, .. } |
            ChunkedBody { is_head: true } |
            StreamBody { is_head: true } => *self = Done,
            FixedBody { is_head: false, content_length: 0 } => *self = Done,
            FixedBody { is_head: false, content_length } =>
                panic!("done() with {} body bytes still unwritten",
                       content_length),
            ChunkedBody { is_head: false } => {
                buf.write(b"0\r\n\r\n").unwrap();
                *self = Done;
            }
            StreamBody { is_head: false } => *self = Done,
            Done => {}
            ref state => {
                panic!("done() called in state {:?}", state);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use netbuf::Buf;

    use super::{MessageState, Body};
    use enums::Version;

    fn do_request<F>(fun: F) -> Buf
        where F: FnOnce(MessageState, &mut Buf)
    {
        let mut buf = Buf::new();
        fun(MessageState::RequestStart, &mut buf);
        buf
    }
    fn do_response10<F>(fun: F) -> Buf
        where F: FnOnce(MessageState, &mut Buf)
    {
        let mut buf = Buf::new();
        fun(MessageState::ResponseStart {
            version: Version::Http10,
            body: Body::Normal,
            close: false,
        }, &mut buf);
        buf
    }
    fn do_response11<F>(close: bool, fun: F) -> Buf
        where F: FnOnce(MessageState, &mut Buf)
    {
        let mut buf = Buf::new();
        fun(MessageState::ResponseStart {
            version: Version::Http11,
            body: Body::Normal,
            close: close,
        }, &mut buf);
        buf
    }

    fn do_head_response11<F>(close: bool, fun: F)
        -> Buf
        where F: FnOnce(MessageState, &mut Buf)
    {
        let mut buf = Buf::new();
        fun(MessageState::ResponseStart {
            version: Version::Http11,
            body: Body::Head,
            close: close,
        }, &mut buf);
        buf
    }

    #[test]
    fn minimal_request() {
        assert_eq!(&do_request(|mut msg, buf| {
            msg.request_line(buf, "GET", "/", Version::Http10);
            msg.done_headers(buf).unwrap();
        })[..], "GET / HTTP/1.0\r\n\r\n".as_bytes());
    }

    #[test]
    fn minimal_response() {
        assert_eq!(&do_response10(|mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 0).unwrap();
            msg.done_headers(buf).unwrap();
        })[..], "HTTP/1.0 200 OK\r\nContent-Length: 0\r\n\r\n".as_bytes());
    }

    #[test]
    fn minimal_response11() {
        assert_eq!(&do_response11(false, |mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 0).unwrap();
            msg.done_headers(buf, ).unwrap();
        })[..], "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n".as_bytes());
    }

    #[test]
    fn close_response11() {
        assert_eq!(&do_response11(true, |mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 0).unwrap();
            msg.done_headers(buf).unwrap();
        })[..], concat!("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n",
                        "Connection: close\r\n\r\n").as_bytes());
    }

    #[test]
    fn head_request() {
        assert_eq!(&do_request(|mut msg, buf| {
            msg.request_line(buf, "HEAD", "/", Version::Http11);
            msg.add_length(buf, 5).unwrap();
            msg.done_headers(buf, ).unwrap();
            msg.write_body(buf, b"Hello");
        })[..], "HEAD / HTTP/1.1\r\nContent-Length: 5\r\n\r\nHello".as_bytes());
    }

    #[test]
    fn head_response() {
        // the response to a HEAD request carries the real body length
        assert_eq!(&do_head_response11(false, |mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 500).unwrap();
            msg.done_headers(buf).unwrap();
        })[..], "HTTP/1.1 200 OK\r\nContent-Length: 500\r\n\r\n".as_bytes());
    }

    #[test]
    fn informational_response() {
        // 1xx responses must not declare a body length
        assert_eq!(&do_response11(false, |mut msg, buf| {
            msg.response_status(buf, 142, "Foo");
            msg.add_length(buf, 500).unwrap_err();
            msg.done_headers(buf).unwrap();
        })[..], "HTTP/1.1 142 Foo\r\n\r\n".as_bytes());
    }

    #[test]
    fn chunked_response() {
        assert_eq!(&do_response11(false, |mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_stream(buf).unwrap();
            msg.done_headers(buf).unwrap();
            msg.write_body(buf, b"Hello");
            msg.write_body(buf, b"");
            msg.done(buf);
        })[..], concat!("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n",
                        "\r\n5\r\nHello\r\n0\r\n\r\n").as_bytes());
    }

    #[test]
    fn stream_response10() {
        // HTTP/1.0 can't do chunked, the body runs until close
        assert_eq!(&do_response10(|mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_stream(buf).unwrap();
            msg.done_headers(buf).unwrap();
            msg.write_body(buf, b"Hello ");
            msg.write_body(buf, b"world");
            msg.done(buf);
        })[..], "HTTP/1.0 200 OK\r\n\r\nHello world".as_bytes());
    }

    #[test]
    fn content_type_charset() {
        assert_eq!(&do_response11(false, |mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_content_type(buf, "text/plain").unwrap();
            msg.add_length(buf, 0).unwrap();
            msg.done_headers(buf).unwrap();
        })[..], concat!("HTTP/1.1 200 OK\r\n",
                        "Content-Type: text/plain; charset=utf-8\r\n",
                        "Content-Length: 0\r\n\r\n").as_bytes());
    }
}
