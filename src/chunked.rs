//! Incremental decoder for chunked transfer encoding
//!
//! The decoder strips chunk framing from the buffer in place, so the first
//! `buffered()` bytes of the buffer are always pure payload ready to be
//! moved into the body sink. Trailers after the zero-size chunk are parsed
//! and dropped; there is currently no API to expose them.

use httparse::{InvalidChunkSize, parse_chunk_size};
use netbuf::Buf;

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    /// Expecting a chunk-size line
    Size,
    /// Expecting chunk payload, this many bytes of it still to come
    Data(usize),
    /// Expecting the CRLF that closes a chunk's payload
    DataEnd,
    /// Zero chunk seen, dropping trailer lines until the empty one
    Trailers,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    buffered: usize,
    phase: Phase,
}

impl State {
    pub fn new() -> State {
        State {
            buffered: 0,
            phase: Phase::Size,
        }
    }

    /// Consume as much chunk framing as the buffer allows
    ///
    /// After the call the first `buffered()` bytes of `buf` are decoded
    /// payload. Returning `Ok` with an unchanged state means more bytes
    /// are needed.
    pub fn parse(&mut self, buf: &mut Buf) -> Result<(), InvalidChunkSize> {
        use self::Phase::*;
        loop {
            match self.phase {
                Size => {
                    match parse_chunk_size(&buf[self.buffered..])? {
                        ::httparse::Status::Complete((framing, 0)) => {
                            buf.remove_range(
                                self.buffered..self.buffered + framing);
                            self.phase = Trailers;
                        }
                        ::httparse::Status::Complete((framing, size)) => {
                            if size > usize::max_value() as u64 {
                                return Err(InvalidChunkSize);
                            }
                            buf.remove_range(
                                self.buffered..self.buffered + framing);
                            self.phase = Data(size as usize);
                        }
                        ::httparse::Status::Partial => return Ok(()),
                    }
                }
                Data(ref mut pending) => {
                    let avail = buf.len() - self.buffered;
                    if avail == 0 {
                        return Ok(());
                    }
                    let take = ::std::cmp::min(avail, *pending);
                    self.buffered += take;
                    *pending -= take;
                    if *pending > 0 {
                        return Ok(());
                    }
                    self.phase = DataEnd;
                }
                DataEnd => {
                    // a chunk's payload is closed by CRLF (bare LF tolerated)
                    if buf.len() < self.buffered + 1 {
                        return Ok(());
                    }
                    match buf[self.buffered] {
                        b'\n' => {
                            buf.remove_range(
                                self.buffered..self.buffered + 1);
                        }
                        b'\r' => {
                            if buf.len() < self.buffered + 2 {
                                return Ok(());
                            }
                            if buf[self.buffered + 1] != b'\n' {
                                return Err(InvalidChunkSize);
                            }
                            buf.remove_range(
                                self.buffered..self.buffered + 2);
                        }
                        _ => return Err(InvalidChunkSize),
                    }
                    self.phase = Size;
                }
                Trailers => {
                    let nl = buf[self.buffered..].iter()
                        .position(|&b| b == b'\n');
                    let nl = match nl {
                        Some(idx) => idx,
                        None => return Ok(()),
                    };
                    let empty = nl == 0 ||
                        (nl == 1 && buf[self.buffered] == b'\r');
                    if !empty {
                        debug!("dropping {} bytes of chunked trailers", nl);
                    }
                    buf.remove_range(self.buffered..self.buffered + nl + 1);
                    if empty {
                        self.phase = Done;
                    }
                }
                Done => return Ok(()),
            }
        }
    }

    /// Decoded payload bytes sitting at the start of the buffer
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Tell the decoder the caller moved `n` payload bytes out of the buffer
    pub fn consume(&mut self, n: usize) {
        assert!(self.buffered >= n);
        self.buffered -= n;
    }
}
