//! Incremental HTTP/1.x message parser
//!
//! The parser is fed raw bytes as they arrive from a non-blocking socket
//! and yields complete messages. All progress lives in the parser instance,
//! so feeding may stop and resume at any byte boundary:
//!
//! ```rust,ignore
//! let config = Config::new().done();
//! let mut parser = Parser::request(&config);
//! match parser.feed(&bytes_read)? {
//!     Some(ParseEvent::Message(msg)) => handle(msg),
//!     Some(ParseEvent::HeadersParsed) => { /* streaming body follows */ }
//!     None => { /* wait for the socket to become readable again */ }
//! }
//! ```
//!
//! After a message is yielded the parser has already reset itself, so the
//! same instance keeps going with the next pipelined message; feed an empty
//! slice to drain messages that are fully buffered already.

use std::borrow::Cow;
use std::cmp::min;
use std::mem;
use std::path::{Path, PathBuf};
use std::str::from_utf8;
use std::sync::Arc;

use httparse;
use netbuf::Buf;

use body::BodyBuffer;
use chunked;
use enums::{Method, Version};
use error::Error;
use headers;

/// Number of headers to allocate on a stack
const MIN_HEADERS: usize = 16;
/// A hard limit on the number of headers
const MAX_HEADERS: usize = 1024;

/// Parser configuration
///
/// All limits are enforced before the respective data is buffered, so a
/// misbehaving peer can't make the parser allocate without bounds.
#[derive(Debug, Clone)]
pub struct Config {
    max_request_line: usize,
    max_headers_size: usize,
    max_body_size: usize,
    body_memory_threshold: usize,
    spool_dir: Option<PathBuf>,
    emit_headers_early: bool,
}

impl Config {
    /// Create a config with defaults
    pub fn new() -> Config {
        Config {
            max_request_line: 8192,
            max_headers_size: 32768,
            max_body_size: 64 << 20,
            body_memory_threshold: 128 << 10,
            spool_dir: None,
            emit_headers_early: false,
        }
    }
    /// Maximum length of the request line (or status line)
    ///
    /// Longer start lines map to a 414 response.
    pub fn max_request_line(&mut self, value: usize) -> &mut Self {
        self.max_request_line = value;
        self
    }
    /// Maximum size of the whole header section, start line included
    ///
    /// Larger header sections map to a 431 response.
    pub fn max_headers_size(&mut self, value: usize) -> &mut Self {
        self.max_headers_size = value;
        self
    }
    /// Maximum size of an entity body, fatal when exceeded (413)
    pub fn max_body_size(&mut self, value: usize) -> &mut Self {
        self.max_body_size = value;
        self
    }
    /// Bodies beyond this size are spooled to disk instead of kept in memory
    ///
    /// Only effective when a spool directory is configured.
    pub fn body_memory_threshold(&mut self, value: usize) -> &mut Self {
        self.body_memory_threshold = value;
        self
    }
    /// Directory for body spool files
    ///
    /// Without one, bodies stay in memory regardless of the threshold.
    pub fn spool_dir(&mut self, dir: &Path) -> &mut Self {
        self.spool_dir = Some(dir.to_path_buf());
        self
    }
    /// Report `ParseEvent::HeadersParsed` before the body is read
    ///
    /// Useful for consumers that want to start routing (or reject the
    /// message) while its body is still arriving. The head is accessible
    /// through `Parser::current_head` at that point.
    pub fn emit_headers_early(&mut self, value: bool) -> &mut Self {
        self.emit_headers_early = value;
        self
    }
    /// Create an Arc'd config clone to pass to the constructor
    ///
    /// This is just a convenience method.
    pub fn done(&mut self) -> Arc<Config> {
        Arc::new(self.clone())
    }
}

/// Whether the parser reads requests or responses, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Request,
    Response,
}

#[derive(Debug)]
enum Kind {
    Request { method: Method, target: String },
    Response { code: u16, reason: String },
}

/// A completely parsed HTTP message
#[derive(Debug)]
pub struct Message {
    version: Version,
    kind: Kind,
    headers: Vec<(String, Vec<u8>)>,
    body: Option<BodyBuffer>,
    raw_head: Vec<u8>,
    close: bool,
    expect_continue: bool,
}

impl Message {
    pub fn version(&self) -> Version {
        self.version
    }
    /// Request method, `None` in response mode
    pub fn method(&self) -> Option<&Method> {
        match self.kind {
            Kind::Request { ref method, .. } => Some(method),
            Kind::Response { .. } => None,
        }
    }
    /// Request target, `None` in response mode
    pub fn target(&self) -> Option<&str> {
        match self.kind {
            Kind::Request { ref target, .. } => Some(target),
            Kind::Response { .. } => None,
        }
    }
    /// Response status code, `None` in request mode
    pub fn code(&self) -> Option<u16> {
        match self.kind {
            Kind::Request { .. } => None,
            Kind::Response { code, .. } => Some(code),
        }
    }
    /// Response reason phrase, `None` in request mode
    pub fn reason(&self) -> Option<&str> {
        match self.kind {
            Kind::Request { .. } => None,
            Kind::Response { ref reason, .. } => Some(reason),
        }
    }
    /// All headers in arrival order
    ///
    /// Hop-by-hop headers (`Connection`, `Transfer-Encoding`) are not
    /// stripped; skip them if you proxy these headers somewhere.
    pub fn headers(&self) -> &[(String, Vec<u8>)] {
        &self.headers
    }
    /// First value of the named header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers.iter()
            .find(|&&(ref n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, ref v)| &v[..])
    }
    /// All values of the named header, in arrival order
    pub fn header_all(&self, name: &str) -> Vec<&[u8]> {
        self.headers.iter()
            .filter(|&&(ref n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, ref v)| &v[..])
            .collect()
    }
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
    /// Body buffer, rewound to the start; `None` when no body is allowed
    pub fn body(&mut self) -> Option<&mut BodyBuffer> {
        self.body.as_mut()
    }
    /// Take ownership of the body buffer
    pub fn take_body(&mut self) -> Option<BodyBuffer> {
        self.body.take()
    }
    /// Raw bytes of the start line and headers, exactly as received
    ///
    /// Useful for protocols that have to re-emit the head, e.g. a reverse
    /// proxy relaying the message.
    pub fn raw_head(&self) -> &[u8] {
        &self.raw_head
    }
    /// Whether the connection must close after this message
    pub fn connection_close(&self) -> bool {
        self.close
    }
    /// Whether the peer sent `Expect: 100-continue`
    pub fn expects_continue(&self) -> bool {
        self.expect_continue
    }
}

/// One item of parser output
#[derive(Debug)]
pub enum ParseEvent {
    /// The head is parsed, the body is still arriving
    ///
    /// Only reported when `Config::emit_headers_early` is set and the
    /// message actually has a body.
    HeadersParsed,
    /// A complete message
    Message(Message),
}

#[derive(Debug, Clone, PartialEq)]
enum BodyKind {
    NoBody,
    Fixed(u64),
    Chunked,
    Eof,
}

#[derive(Debug)]
enum BodyProgress {
    Fixed(u64),
    Chunked(chunked::State),
    Eof,
}

#[derive(Debug)]
enum State {
    Head,
    Body { message: Message, progress: BodyProgress },
}

/// Incremental parser for one side of one connection
///
/// Exclusively owned by its connection; reusable for any number of
/// sequential (pipelined) messages on it.
pub struct Parser {
    mode: Mode,
    config: Arc<Config>,
    buf: Buf,
    state: State,
    head_reported: bool,
    head_response: bool,
    eof: bool,
}

struct HeadFlags {
    body: BodyKind,
    close: bool,
    expect_continue: bool,
}

fn scan_headers(headers: &[(String, Vec<u8>)]) -> Result<HeadFlags, Error> {
    // Implements the body length part of
    // http://httpwg.github.io/specs/rfc7230.html#message.body.length
    let mut has_content_length = false;
    let mut flags = HeadFlags {
        body: BodyKind::NoBody,
        close: false,
        expect_continue: false,
    };
    for &(ref name, ref value) in headers {
        if headers::is_transfer_encoding(name) {
            if let Some(enc) = value.split(|&x| x == b',').last() {
                if !headers::is_identity(enc) {
                    if has_content_length {
                        // override but don't allow keep-alive
                        flags.close = true;
                    }
                    flags.body = BodyKind::Chunked;
                }
            }
        } else if headers::is_content_length(name) {
            if has_content_length {
                return Err(Error::DuplicateContentLength);
            }
            has_content_length = true;
            if flags.body != BodyKind::Chunked {
                let s = from_utf8(value)
                    .map_err(|_| Error::BadContentLength)?;
                let len = s.parse()
                    .map_err(|_| Error::BadContentLength)?;
                flags.body = BodyKind::Fixed(len);
            } else {
                // transfer-encoding takes precedence, no keep-alive then
                flags.close = true;
            }
        } else if headers::is_connection(name) {
            if value.split(|&x| x == b',').any(headers::is_close) {
                flags.close = true;
            }
        } else if headers::is_expect(name) {
            if headers::is_continue(value) {
                flags.expect_continue = true;
            }
        }
    }
    Ok(flags)
}

fn request_body(method: &Method, flags: &HeadFlags) -> BodyKind {
    match *method {
        // A HEAD or TRACE request never carries an entity
        Method::Head | Method::Trace => BodyKind::NoBody,
        _ => flags.body.clone(),
    }
}

fn response_body(code: u16, is_head: bool, flags: &HeadFlags) -> BodyKind {
    if is_head || code < 200 || code == 204 || code == 304 {
        return BodyKind::NoBody;
    }
    match flags.body {
        // A response without a length is delimited by connection close
        BodyKind::NoBody => BodyKind::Eof,
        ref kind => kind.clone(),
    }
}

/// Index one past the empty line terminating the head, if present
///
/// Empty lines before the start line are skipped, like httparse does.
fn find_head_end(data: &[u8]) -> Option<usize> {
    let mut start = 0;
    let mut seen_any = false;
    for (idx, &b) in data.iter().enumerate() {
        if b != b'\n' {
            continue;
        }
        let mut line = &data[start..idx];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        if line.is_empty() {
            if seen_any {
                return Some(idx + 1);
            }
        } else {
            seen_any = true;
        }
        start = idx + 1;
    }
    None
}

fn start_line_too_long(data: &[u8], limit: usize) -> bool {
    let mut start = 0;
    for (idx, &b) in data.iter().enumerate() {
        if b == b'\n' {
            let mut line = &data[start..idx];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            if !line.is_empty() {
                return line.len() > limit;
            }
            start = idx + 1;
        }
    }
    data.len() - start > limit
}

fn needs_unfold(head: &[u8]) -> bool {
    head.windows(2)
        .any(|w| w[0] == b'\n' && (w[1] == b' ' || w[1] == b'\t'))
}

/// Merge obs-fold continuation lines into the preceding header value
fn unfold(head: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(head.len());
    let mut i = 0;
    while i < head.len() {
        if head[i] == b'\n' && i + 1 < head.len()
            && (head[i + 1] == b' ' || head[i + 1] == b'\t')
        {
            if out.last() == Some(&b'\r') {
                out.pop();
            }
            out.push(b' ');
            i += 1;
            while i < head.len() && (head[i] == b' ' || head[i] == b'\t') {
                i += 1;
            }
        } else {
            out.push(head[i]);
            i += 1;
        }
    }
    out
}

impl Parser {
    /// Create a parser for incoming requests (server side)
    pub fn request(config: &Arc<Config>) -> Parser {
        Parser::new(Mode::Request, config)
    }
    /// Create a parser for incoming responses (client side)
    pub fn response(config: &Arc<Config>) -> Parser {
        Parser::new(Mode::Response, config)
    }
    fn new(mode: Mode, config: &Arc<Config>) -> Parser {
        Parser {
            mode: mode,
            config: config.clone(),
            buf: Buf::new(),
            state: State::Head,
            head_reported: false,
            head_response: false,
            eof: false,
        }
    }

    /// Mark the next response as answering a HEAD request
    ///
    /// Such a response carries no body regardless of its headers. Only
    /// meaningful in response mode; reset after each parsed message.
    pub fn response_to_head(&mut self, is_head: bool) {
        self.head_response = is_head;
    }

    /// Head of the message currently being parsed
    ///
    /// Present from the `HeadersParsed` event until the message completes;
    /// the body buffer is still filling at that point.
    pub fn current_head(&self) -> Option<&Message> {
        match self.state {
            State::Head => None,
            State::Body { ref message, .. } => Some(message),
        }
    }

    /// Feed bytes read from the socket
    ///
    /// `Ok(None)` means more data is needed. Feeding an empty slice
    /// continues parsing from the internal buffer, which is how pipelined
    /// messages after the first one are drained.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Option<ParseEvent>, Error> {
        self.buf.extend(bytes);
        self.process()
    }

    /// Signal end of stream
    ///
    /// Completes a close-delimited response body; anything else that is
    /// still in progress becomes `Error::ConnectionReset`.
    pub fn feed_eof(&mut self) -> Result<Option<ParseEvent>, Error> {
        self.eof = true;
        self.process()
    }

    fn process(&mut self) -> Result<Option<ParseEvent>, Error> {
        if matches!(self.state, State::Head) {
            match self.parse_head()? {
                Some((message, progress)) => {
                    let early = self.config.emit_headers_early
                        && message.has_body();
                    self.state = State::Body {
                        message: message,
                        progress: progress,
                    };
                    if early && !self.head_reported {
                        self.head_reported = true;
                        return Ok(Some(ParseEvent::HeadersParsed));
                    }
                }
                None => {
                    if self.eof && self.buf.len() > 0 {
                        return Err(Error::ConnectionReset);
                    }
                    return Ok(None);
                }
            }
        }
        let done = match self.state {
            State::Head => unreachable!(),
            State::Body { ref mut message, ref mut progress } => {
                advance_body(progress, &mut self.buf, message, self.eof)?
            }
        };
        if !done {
            if self.eof {
                return Err(Error::ConnectionReset);
            }
            return Ok(None);
        }
        let message = match mem::replace(&mut self.state, State::Head) {
            State::Body { mut message, .. } => {
                if let Some(ref mut body) = message.body {
                    body.rewind();
                }
                message
            }
            State::Head => unreachable!(),
        };
        self.head_reported = false;
        self.head_response = false;
        Ok(Some(ParseEvent::Message(message)))
    }

    fn parse_head(&mut self)
        -> Result<Option<(Message, BodyProgress)>, Error>
    {
        let end = match find_head_end(&self.buf[..]) {
            Some(end) => end,
            None => {
                if self.buf.len() > self.config.max_headers_size {
                    return Err(Error::HeadersTooLarge);
                }
                if start_line_too_long(&self.buf[..],
                    self.config.max_request_line)
                {
                    return Err(Error::RequestLineTooLong);
                }
                return Ok(None);
            }
        };
        if end > self.config.max_headers_size {
            return Err(Error::HeadersTooLarge);
        }
        let (message, body_kind) = {
            let head = &self.buf[..end];
            if start_line_too_long(head, self.config.max_request_line) {
                return Err(Error::RequestLineTooLong);
            }
            let parsed = if needs_unfold(head) {
                Cow::Owned(unfold(head))
            } else {
                Cow::Borrowed(head)
            };
            self.parse_head_block(&parsed, head)?
        };
        self.buf.consume(end);
        let progress = match body_kind {
            BodyKind::NoBody => BodyProgress::Fixed(0),
            BodyKind::Fixed(n) => {
                if n > self.config.max_body_size as u64 {
                    return Err(Error::BodyTooLarge);
                }
                BodyProgress::Fixed(n)
            }
            BodyKind::Chunked => BodyProgress::Chunked(chunked::State::new()),
            BodyKind::Eof => BodyProgress::Eof,
        };
        Ok(Some((message, progress)))
    }

    fn parse_head_block(&self, data: &[u8], raw: &[u8])
        -> Result<(Message, BodyKind), Error>
    {
        let (version, kind, hlist) = match self.mode {
            Mode::Request => {
                let mut vec;
                let mut headers = [httparse::EMPTY_HEADER; MIN_HEADERS];
                let mut req = httparse::Request::new(&mut headers);
                let mut result = req.parse(data);
                if matches!(result, Err(httparse::Error::TooManyHeaders)) {
                    vec = vec![httparse::EMPTY_HEADER; MAX_HEADERS];
                    req = httparse::Request::new(&mut vec);
                    result = req.parse(data);
                }
                match result? {
                    httparse::Status::Complete(bytes) => {
                        if bytes != data.len() {
                            // residue between the last header line and the
                            // empty line smells like header injection
                            debug!("{} bytes of residue after headers",
                                data.len() - bytes);
                            return Err(Error::Header(
                                httparse::Error::Token));
                        }
                        let hlist = req.headers.iter()
                            .map(|h| (h.name.to_string(), h.value.to_vec()))
                            .collect::<Vec<_>>();
                        let version = Version::from_httparse(
                            req.version.unwrap());
                        let kind = Kind::Request {
                            method: Method::from(req.method.unwrap()),
                            target: req.path.unwrap().to_string(),
                        };
                        (version, kind, hlist)
                    }
                    httparse::Status::Partial => {
                        return Err(Error::Header(httparse::Error::Token));
                    }
                }
            }
            Mode::Response => {
                let mut vec;
                let mut headers = [httparse::EMPTY_HEADER; MIN_HEADERS];
                let mut resp = httparse::Response::new(&mut headers);
                let mut result = resp.parse(data);
                if matches!(result, Err(httparse::Error::TooManyHeaders)) {
                    vec = vec![httparse::EMPTY_HEADER; MAX_HEADERS];
                    resp = httparse::Response::new(&mut vec);
                    result = resp.parse(data);
                }
                match result? {
                    httparse::Status::Complete(bytes) => {
                        if bytes != data.len() {
                            return Err(Error::Header(
                                httparse::Error::Token));
                        }
                        let code = resp.code.unwrap();
                        if code < 100 || code > 599 {
                            return Err(Error::BadStatus(code));
                        }
                        let hlist = resp.headers.iter()
                            .map(|h| (h.name.to_string(), h.value.to_vec()))
                            .collect::<Vec<_>>();
                        let version = Version::from_httparse(
                            resp.version.unwrap());
                        let kind = Kind::Response {
                            code: code,
                            reason: resp.reason.unwrap_or("").to_string(),
                        };
                        (version, kind, hlist)
                    }
                    httparse::Status::Partial => {
                        return Err(Error::Header(httparse::Error::Token));
                    }
                }
            }
        };
        let flags = scan_headers(&hlist)?;
        let body_kind = match kind {
            Kind::Request { ref method, .. } => request_body(method, &flags),
            Kind::Response { code, .. } => {
                response_body(code, self.head_response, &flags)
            }
        };
        let body = if body_kind == BodyKind::NoBody {
            None
        } else {
            Some(BodyBuffer::new(
                self.config.body_memory_threshold,
                self.config.max_body_size,
                self.config.spool_dir.as_ref().map(|p| p.as_path())))
        };
        // We could honor `Connection: keep-alive` for HTTP/1.0 here, but
        // hopefully it's rare enough to ignore nowadays
        let close = flags.close || version == Version::Http10
            || body_kind == BodyKind::Eof;
        let message = Message {
            version: version,
            kind: kind,
            headers: hlist,
            body: body,
            raw_head: raw.to_vec(),
            close: close,
            expect_continue: flags.expect_continue,
        };
        Ok((message, body_kind))
    }
}

fn advance_body(progress: &mut BodyProgress, buf: &mut Buf,
    message: &mut Message, eof: bool)
    -> Result<bool, Error>
{
    match *progress {
        BodyProgress::Fixed(ref mut left) => {
            if *left > 0 && buf.len() > 0 {
                let take = min(*left, buf.len() as u64) as usize;
                append_body(message, buf, take)?;
                *left -= take as u64;
            }
            Ok(*left == 0)
        }
        BodyProgress::Chunked(ref mut state) => {
            state.parse(buf)?;
            let take = state.buffered();
            if take > 0 {
                append_body(message, buf, take)?;
                state.consume(take);
            }
            Ok(state.is_done())
        }
        BodyProgress::Eof => {
            let take = buf.len();
            if take > 0 {
                append_body(message, buf, take)?;
            }
            Ok(eof)
        }
    }
}

fn append_body(message: &mut Message, buf: &mut Buf, take: usize)
    -> Result<(), Error>
{
    match message.body {
        Some(ref mut body) => body.append(&buf[..take])?,
        // bodyless messages never get body bytes routed here
        None => unreachable!(),
    }
    buf.consume(take);
    Ok(())
}
