use std::io;
use std::fmt::Display;

use netbuf::Buf;

use base_serializer::{MessageState, HeaderError};
use enums::{Method, Status, Version};
use parser::Message;
use super::BufferWriter;

/// Serializer for a single message head and body
///
/// Methods of this structure ensure that everything you write into the
/// buffer is consistent and valid protocol
pub struct Encoder {
    state: MessageState,
    buf: Buf,
}

/// This structure returned from `Encoder::done` and holds the fully
/// serialized message, ready to be drained into the socket
pub struct EncoderDone {
    buf: Buf,
}

/// This structure contains all needed info to start response of the request
/// in a correct manner
#[derive(Debug, Clone, Copy)]
pub struct ResponseConfig {
    /// Whether request is a HEAD request
    pub is_head: bool,
    /// Is `Connection: close` in request or HTTP version == 1.0
    pub do_close: bool,
    /// Version of HTTP request
    pub version: Version,
}

impl ResponseConfig {
    pub fn from(req: &Message) -> ResponseConfig {
        ResponseConfig {
            version: req.version(),
            is_head: req.method() == Some(&Method::Head),
            do_close: req.connection_close(),
        }
    }
}

impl Encoder {
    /// Create an encoder for a response to a request described by `cfg`
    pub fn response(cfg: ResponseConfig) -> Encoder {
        use base_serializer::Body::*;
        Encoder {
            state: MessageState::ResponseStart {
                body: if cfg.is_head { Head } else { Normal },
                version: cfg.version,
                close: cfg.do_close || cfg.version == Version::Http10,
            },
            buf: Buf::new(),
        }
    }

    /// Create an encoder for an outgoing request (client side)
    pub fn request() -> Encoder {
        Encoder {
            state: MessageState::RequestStart,
            buf: Buf::new(),
        }
    }

    /// Write a 100 (Continue) response.
    ///
    /// A server should respond with the 100 status code if it receives a
    /// 100-continue expectation.
    ///
    /// # Panics
    ///
    /// When the response is already started. It's expected that your response
    /// handler state machine will never call the method twice.
    pub fn response_continue(&mut self) {
        self.state.response_continue(&mut self.buf)
    }

    /// Write status line using `Status` enum
    ///
    /// This puts status line into a buffer immediately.
    ///
    /// # Panics
    ///
    /// When status line is already written. It's expected that your request
    /// handler state machine will never call the method twice.
    ///
    /// When the status code is 100 (Continue). 100 is not allowed
    /// as a final status code.
    pub fn status(&mut self, status: Status) {
        self.state.response_status(&mut self.buf,
            status.code(), status.reason())
    }

    /// Write custom status line
    ///
    /// # Panics
    ///
    /// Same as `status()`.
    pub fn custom_status(&mut self, code: u16, reason: &str) {
        self.state.response_status(&mut self.buf, code, reason)
    }

    /// Write request line.
    ///
    /// # Panics
    ///
    /// When request line is already written.
    pub fn request_line(&mut self, method: &str, path: &str,
        version: Version)
    {
        self.state.request_line(&mut self.buf, method, path, version)
    }

    /// Add a header to the message.
    ///
    /// `Content-Length` header must be set using the `add_length` method
    /// and `Transfer-Encoding: chunked` must be set with the `add_chunked`
    /// method. These two headers are important for the security of HTTP.
    ///
    /// We return Result here to make implementing proxies easier. In the
    /// application handler it's okay to unwrap the result and to get
    /// a meaningful panic (that is basically an assertion).
    ///
    /// # Panics
    ///
    /// Panics when `add_header` is called in the wrong state.
    pub fn add_header<V: AsRef<[u8]>>(&mut self, name: &str, value: V)
        -> Result<(), HeaderError>
    {
        self.state.add_header(&mut self.buf, name, value.as_ref())
    }

    /// Same as `add_header` but allows value to be formatted directly into
    /// the buffer
    ///
    /// Useful for dates and numeric headers, as well as some strongly typed
    /// wrappers
    pub fn format_header<D: Display>(&mut self, name: &str, value: D)
        -> Result<(), HeaderError>
    {
        self.state.format_header(&mut self.buf, name, value)
    }

    /// Add a content length to the message.
    ///
    /// # Panics
    ///
    /// Panics when `add_length` is called in the wrong state.
    pub fn add_length(&mut self, n: u64)
        -> Result<(), HeaderError>
    {
        self.state.add_length(&mut self.buf, n)
    }

    /// Sets the transfer encoding to chunked.
    ///
    /// # Panics
    ///
    /// Panics when `add_chunked` is called in the wrong state.
    pub fn add_chunked(&mut self)
        -> Result<(), HeaderError>
    {
        self.state.add_chunked(&mut self.buf)
    }

    /// Declare a body of unknown length.
    ///
    /// Chunked on HTTP/1.1, close-delimited on HTTP/1.0.
    ///
    /// # Panics
    ///
    /// Panics when `add_stream` is called in the wrong state.
    pub fn add_stream(&mut self)
        -> Result<(), HeaderError>
    {
        self.state.add_stream(&mut self.buf)
    }

    /// Add a `Content-Type` header, defaulting the charset for text types
    pub fn add_content_type(&mut self, mime: &str)
        -> Result<(), HeaderError>
    {
        self.state.add_content_type(&mut self.buf, mime)
    }

    /// Add a date header with the current date
    ///
    /// This is barely a shortcut for:
    /// ```rust,ignore
    /// enc.format_header("Date", HttpDate::from(SystemTime::now()));
    /// ```
    #[cfg(feature="date_header")]
    pub fn add_date(&mut self) {
        use httpdate::HttpDate;
        use std::time::SystemTime;
        self.format_header("Date", HttpDate::from(SystemTime::now()))
            .expect("always valid to add a date")
    }

    /// Add a `Server` header
    pub fn add_server(&mut self, name: &str) -> Result<(), HeaderError> {
        self.add_header("Server", name.as_bytes())
    }

    /// Returns true if at least `status()` method has been called
    ///
    /// This is mostly useful to find out whether we can build an error page
    /// or it's already too late.
    pub fn is_started(&self) -> bool {
        self.state.is_started()
    }

    /// Closes the HTTP header and returns `true` if entity body is expected.
    ///
    /// Specifically `false` is returned when status is 1xx, 204, 304 or in
    /// the response to a `HEAD` request but not if the body has zero-length.
    ///
    /// # Panics
    ///
    /// Panics when the response is in a wrong state.
    pub fn done_headers(&mut self) -> Result<bool, HeaderError> {
        self.state.done_headers(&mut self.buf)
    }

    /// Write a chunk of the message body.
    ///
    /// Works for fixed-size, chunked and close-delimited bodies.
    ///
    /// You may write a body in responses to HEAD requests just like in real
    /// requests but the data is not sent to the network. Of course it is
    /// more efficient to not construct the message body at all.
    ///
    /// # Panics
    ///
    /// When response is in wrong state. Or there is no headers which
    /// determine response body length (either Content-Length or
    /// Transfer-Encoding).
    pub fn write_body(&mut self, data: &[u8]) {
        self.state.write_body(&mut self.buf, data)
    }

    /// Returns true if headers are already serialized
    ///
    /// Streaming writers take over at this point: serialize the head with
    /// the encoder, then hand the buffer to a `StreamWriter` or a range
    /// writer for the body.
    pub fn is_after_headers(&self) -> bool {
        self.state.is_after_headers()
    }

    /// Returns true if `done()` method is already called and everything
    /// was okay.
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Writes needed finalization data into the buffer and asserts
    /// that response is in the appropriate state for that.
    ///
    /// # Panics
    ///
    /// When the response is in the wrong state.
    pub fn done(mut self) -> EncoderDone {
        self.state.done(&mut self.buf);
        EncoderDone { buf: self.buf }
    }

    /// Take the serialized head without finishing the body
    ///
    /// This is the entry point of the streaming writers: the body bytes
    /// come from elsewhere (a file, an iterator), only the head goes
    /// through the encoder.
    ///
    /// # Panics
    ///
    /// This method panics if it's called when headers are not written yet.
    pub fn into_head(self) -> Buf {
        assert!(self.state.is_after_headers());
        self.buf
    }
}

impl EncoderDone {
    /// Wrap the serialized message into a drainable writer
    pub fn into_writer(self) -> BufferWriter {
        BufferWriter::from_buf(self.buf)
    }
    pub fn into_buf(self) -> Buf {
        self.buf
    }
}

impl io::Write for Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
