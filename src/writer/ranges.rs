use std::io::{Read, Seek, Write};

use netbuf::Buf;
use rand::{thread_rng, Rng};

use error::WriteError;
use super::StreamWriter;
use super::{drain, BURST};

/// One byte range of a partial-content response, both ends inclusive,
/// as in `Content-Range: bytes start-end/total`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Range {
    pub fn new(start: u64, end: u64) -> Range {
        assert!(start <= end);
        Range { start: start, end: end }
    }
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Generate a MIME boundary for a multipart response
pub fn boundary() -> String {
    let mut rng = thread_rng();
    format!("{:016x}{:016x}", rng.gen::<u64>(), rng.gen::<u64>())
}

/// Writer for a single-range 206 response
///
/// The `Content-Range` header belongs in the head (use
/// `Encoder::format_header`), this writer only copies the byte span.
pub struct RangeWriter<F> {
    inner: StreamWriter<F>,
}

impl<F: Read + Seek> RangeWriter<F> {
    pub fn new(source: F, head: Buf, range: Range) -> RangeWriter<F> {
        RangeWriter {
            inner: StreamWriter::new(source, head, range.start, range.len()),
        }
    }
    pub fn write<W: Write>(&mut self, dest: &mut W)
        -> Result<bool, WriteError>
    {
        self.inner.write(dest)
    }
}

/// Writer for a `multipart/byteranges` 206 response
///
/// Alternates between emitting a part header (boundary, `Content-Type`,
/// `Content-Range`) and copying the corresponding span from the source,
/// then finishes with the closing boundary. The first boundary carries no
/// leading CRLF, the body starts right after the response head.
pub struct MultipartRangeWriter<F> {
    source: F,
    boundary: String,
    content_type: String,
    total: u64,
    ranges: Vec<Range>,
    index: usize,
    offset: u64,
    left: u64,
    closed: bool,
    buf: Buf,
}

impl<F: Read + Seek> MultipartRangeWriter<F> {
    pub fn new(source: F, head: Buf, boundary: String, content_type: &str,
               total: u64, ranges: Vec<Range>)
        -> MultipartRangeWriter<F>
    {
        MultipartRangeWriter {
            source: source,
            boundary: boundary,
            content_type: content_type.to_string(),
            total: total,
            ranges: ranges,
            index: 0,
            offset: 0,
            left: 0,
            closed: false,
            buf: head,
        }
    }

    fn part_header(&self, range: &Range) -> String {
        let lead = if self.index == 0 { "" } else { "\r\n" };
        format!("{}--{}\r\nContent-Type: {}\r\n\
                 Content-Range: bytes {}-{}/{}\r\n\r\n",
            lead, self.boundary, self.content_type,
            range.start, range.end, self.total)
    }

    fn close_delimiter(&self) -> String {
        format!("\r\n--{}--\r\n", self.boundary)
    }

    /// Exact length of the multipart body, for the `Content-Length` header
    pub fn content_length(boundary: &str, content_type: &str, total: u64,
                          ranges: &[Range]) -> u64
    {
        let mut sum = 0;
        for (idx, range) in ranges.iter().enumerate() {
            let lead = if idx == 0 { "" } else { "\r\n" };
            sum += format!("{}--{}\r\nContent-Type: {}\r\n\
                            Content-Range: bytes {}-{}/{}\r\n\r\n",
                lead, boundary, content_type,
                range.start, range.end, total).len() as u64;
            sum += range.len();
        }
        sum + format!("\r\n--{}--\r\n", boundary).len() as u64
    }

    /// Push the next burst into the destination
    ///
    /// Body bytes are bounded per call like `StreamWriter`; part headers
    /// and the closing delimiter are small and don't count.
    pub fn write<W: Write>(&mut self, dest: &mut W)
        -> Result<bool, WriteError>
    {
        let mut budget = BURST;
        loop {
            if !drain(&mut self.buf, dest)? {
                return Ok(false);
            }
            if self.left > 0 {
                if budget == 0 {
                    return Ok(false);
                }
                budget -= self.refill(budget)?;
                continue;
            }
            if self.index < self.ranges.len() {
                let range = self.ranges[self.index];
                let header = self.part_header(&range);
                self.buf.extend(header.as_bytes());
                self.offset = range.start;
                self.left = range.len();
                self.index += 1;
                continue;
            }
            if !self.closed {
                let delim = self.close_delimiter();
                self.buf.extend(delim.as_bytes());
                self.closed = true;
                continue;
            }
            return Ok(true);
        }
    }

    fn refill(&mut self, cap: u64) -> Result<u64, WriteError> {
        use std::cmp::min;
        use std::io;
        use std::io::SeekFrom;

        self.source.seek(SeekFrom::Start(self.offset))?;
        let want = min(self.left, cap) as usize;
        let mut chunk = vec![0u8; want];
        let got = self.source.read(&mut chunk)?;
        if got == 0 {
            return Err(WriteError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "source is shorter than the declared ranges")));
        }
        self.buf.extend(&chunk[..got]);
        self.offset += got as u64;
        self.left -= got as u64;
        Ok(got as u64)
    }
}
