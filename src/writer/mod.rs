//! Resumable writers for HTTP responses
//!
//! Every writer here follows the same contract: `write(dest)` pushes as
//! much as the destination accepts and returns `Ok(true)` once everything
//! is delivered. `Ok(false)` means the destination would block; re-invoke
//! when it is writable again, all progress is kept in the writer itself.
//!
//! A destination that accepts zero bytes without raising `WouldBlock` is
//! considered gone and the write fails with `WriteError::DestinationGone`.

use std::io;
use std::io::Write;

use netbuf::Buf;

use error::WriteError;

mod chunked;
mod encoder;
mod ranges;
mod stream;

pub use self::chunked::ChunkedWriter;
pub use self::encoder::{Encoder, EncoderDone, ResponseConfig};
pub use self::ranges::{Range, RangeWriter, MultipartRangeWriter};
pub use self::stream::StreamWriter;

/// Upper bound on body bytes a streaming writer moves per `write` call
///
/// A destination with unlimited appetite would otherwise let one
/// connection push its whole body inside a single readiness callback,
/// starving the rest of the loop.
pub(crate) const BURST: u64 = 65536;

/// Push buffered bytes into the destination
///
/// `Ok(true)` means the buffer is empty now.
pub(crate) fn drain<W: Write>(buf: &mut Buf, dest: &mut W)
    -> Result<bool, WriteError>
{
    while buf.len() > 0 {
        match dest.write(&buf[..]) {
            Ok(0) => return Err(WriteError::DestinationGone),
            Ok(n) => buf.consume(n),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock ||
                          e.kind() == io::ErrorKind::Interrupted
                => return Ok(false),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// The simplest writer: a fixed chunk of bytes, usually headers plus a
/// short body prepared by `Encoder`
pub struct BufferWriter {
    buf: Buf,
}

impl BufferWriter {
    pub fn new(data: &[u8]) -> BufferWriter {
        let mut buf = Buf::new();
        buf.extend(data);
        BufferWriter { buf: buf }
    }

    pub(crate) fn from_buf(buf: Buf) -> BufferWriter {
        BufferWriter { buf: buf }
    }

    /// Bytes not yet accepted by the destination
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn write<W: Write>(&mut self, dest: &mut W)
        -> Result<bool, WriteError>
    {
        drain(&mut self.buf, dest)
    }
}
