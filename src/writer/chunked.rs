use std::io::Write;

use netbuf::Buf;

use error::WriteError;
use super::{drain, BURST};

/// Writer producing a chunked-encoded body from an iterator of fragments
///
/// Each `write` call flushes whatever is buffered and then pulls fragments
/// from the source, up to a burst of payload per call so one connection
/// can't monopolize the loop. Empty fragments are skipped, a zero-size
/// chunk on the wire would terminate the body early. Once the source is
/// exhausted the terminal chunk is emitted and the writer reports
/// completion.
pub struct ChunkedWriter<I> {
    source: I,
    buf: Buf,
    source_done: bool,
}

impl<I: Iterator<Item=Vec<u8>>> ChunkedWriter<I> {
    /// Create a writer with the serialized head already in `head`
    ///
    /// Pass an empty buffer to write a bare chunked body.
    pub fn new(source: I, head: Buf) -> ChunkedWriter<I> {
        ChunkedWriter {
            source: source,
            buf: head,
            source_done: false,
        }
    }

    pub fn write<W: Write>(&mut self, dest: &mut W)
        -> Result<bool, WriteError>
    {
        let mut budget = BURST as usize;
        loop {
            if !drain(&mut self.buf, dest)? {
                return Ok(false);
            }
            if self.source_done {
                return Ok(true);
            }
            if budget == 0 {
                return Ok(false);
            }
            match self.source.next() {
                Some(ref chunk) if chunk.len() == 0 => continue,
                Some(chunk) => {
                    write!(self.buf, "{:x}\r\n", chunk.len()).unwrap();
                    budget = budget.saturating_sub(chunk.len());
                    self.buf.extend(&chunk);
                    self.buf.extend(b"\r\n");
                }
                None => {
                    self.buf.extend(b"0\r\n\r\n");
                    self.source_done = true;
                }
            }
        }
    }
}
