use std::cmp::min;
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};

use netbuf::Buf;

use error::WriteError;
use super::{drain, BURST};

/// Writer for a body of known length read from a seekable source
///
/// The writer tracks its own offset and seeks before every read, so many
/// connections may stream from one shared file handle clone concurrently;
/// nothing is duplicated per connection except the small transfer buffer.
pub struct StreamWriter<F> {
    source: F,
    offset: u64,
    left: u64,
    buf: Buf,
}

impl<F: Read + Seek> StreamWriter<F> {
    /// Stream `len` bytes of `source` starting at `offset`
    ///
    /// `head` carries the serialized message head (see
    /// `Encoder::into_head`); pass an empty buffer to stream the bare body.
    pub fn new(source: F, head: Buf, offset: u64, len: u64)
        -> StreamWriter<F>
    {
        StreamWriter {
            source: source,
            offset: offset,
            left: len,
            buf: head,
        }
    }

    /// Body bytes not yet read from the source
    pub fn bytes_left(&self) -> u64 {
        self.left
    }

    /// Push the next burst into the destination
    ///
    /// At most one `BURST` of body bytes is moved per call even when the
    /// destination keeps accepting; `Ok(false)` asks the caller to re-arm
    /// writability and call again, which keeps connections fair.
    pub fn write<W: Write>(&mut self, dest: &mut W)
        -> Result<bool, WriteError>
    {
        if !drain(&mut self.buf, dest)? {
            return Ok(false);
        }
        if self.left == 0 {
            return Ok(true);
        }
        self.refill()?;
        if !drain(&mut self.buf, dest)? {
            return Ok(false);
        }
        Ok(self.left == 0)
    }

    fn refill(&mut self) -> Result<(), WriteError> {
        // the handle may be shared, position it every time
        self.source.seek(SeekFrom::Start(self.offset))?;
        let want = min(self.left, BURST) as usize;
        let mut chunk = vec![0u8; want];
        let got = self.source.read(&mut chunk)?;
        if got == 0 {
            return Err(WriteError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "source is shorter than the declared body length")));
        }
        self.buf.extend(&chunk[..got]);
        self.offset += got as u64;
        self.left -= got as u64;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use netbuf::Buf;

    use super::StreamWriter;
    use super::super::mock::Dest;

    #[test]
    fn streams_a_range() {
        let source = Cursor::new(b"0123456789".to_vec());
        let mut wr = StreamWriter::new(source, Buf::new(), 2, 5);
        let mut dest = Dest::unlimited();
        assert_eq!(wr.write(&mut dest).unwrap(), true);
        assert_eq!(&dest.written[..], b"23456");
    }

    #[test]
    fn head_goes_first() {
        let source = Cursor::new(b"abcdef".to_vec());
        let mut head = Buf::new();
        head.extend(b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\n");
        let mut wr = StreamWriter::new(source, head, 0, 6);
        let mut dest = Dest::unlimited();
        assert_eq!(wr.write(&mut dest).unwrap(), true);
        assert_eq!(&dest.written[..],
            "HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\nabcdef".as_bytes());
    }

    #[test]
    fn resumes_mid_body() {
        let source = Cursor::new(b"hello world".to_vec());
        let mut wr = StreamWriter::new(source, Buf::new(), 0, 11);
        let mut dest = Dest::with_quotas(&[3, 0, 4, 0]);
        assert_eq!(wr.write(&mut dest).unwrap(), false);
        assert_eq!(wr.write(&mut dest).unwrap(), false);
        assert_eq!(wr.write(&mut dest).unwrap(), true);
        assert_eq!(&dest.written[..], b"hello world");
    }

    #[test]
    fn one_burst_per_call() {
        let body = vec![0x2Au8; 200 * 1024];
        let source = Cursor::new(body.clone());
        let mut wr = StreamWriter::new(source, Buf::new(), 0,
            body.len() as u64);
        let mut dest = Dest::unlimited();
        // an unlimited destination still only gets one burst per call
        assert_eq!(wr.write(&mut dest).unwrap(), false);
        assert_eq!(dest.written.len(), 64 * 1024);
        let mut calls = 1;
        while !wr.write(&mut dest).unwrap() {
            calls += 1;
        }
        assert_eq!(dest.written, body);
        assert!(calls >= 3);
    }

    #[test]
    fn truncated_source_is_an_error() {
        let source = Cursor::new(b"abc".to_vec());
        let mut wr = StreamWriter::new(source, Buf::new(), 0, 10);
        let mut dest = Dest::unlimited();
        assert!(wr.write(&mut dest).is_err());
    }
}
