//! Entity body buffer with memory-to-disk spillover
//!
//! Bodies start in an in-memory buffer and transparently move to a spool
//! file once they outgrow the configured threshold. The parser only ever
//! appends; once the message is complete the buffer is rewound and exposed
//! through `io::Read`.

use std::fs::{File, OpenOptions, remove_file};
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use netbuf::Buf;
use rand::{thread_rng, Rng};

quick_error! {
    #[derive(Debug)]
    pub enum BodyError {
        /// Appending would exceed the configured maximum body size
        TooLarge {
            description("body is larger than the configured limit")
        }
        /// Spool file IO error
        Io(err: io::Error) {
            description("I/O error on the spool file")
            display("I/O error on the spool file: {}", err)
            from()
        }
    }
}

/// Append-only body sink, readable once the message is complete
///
/// The buffer is owned by the message it backs; dropping it removes the
/// spool file, if one was created.
#[derive(Debug)]
pub struct BodyBuffer {
    limit: usize,
    threshold: usize,
    spool_dir: Option<PathBuf>,
    len: usize,
    pos: usize,
    mem: Buf,
    spill: Option<Spill>,
}

#[derive(Debug)]
struct Spill {
    file: File,
    path: PathBuf,
}

impl Drop for Spill {
    fn drop(&mut self) {
        if let Err(e) = remove_file(&self.path) {
            debug!("can't remove spool file {:?}: {}", self.path, e);
        }
    }
}

fn open_spool(dir: &Path) -> io::Result<Spill> {
    // create_new loops on the astronomically unlikely name collision
    let mut rng = thread_rng();
    loop {
        let name = format!("body.{:08x}{:08x}.spool",
            rng.gen::<u32>(), rng.gen::<u32>());
        let path = dir.join(name);
        match OpenOptions::new()
            .read(true).write(true).create_new(true)
            .open(&path)
        {
            Ok(file) => return Ok(Spill { file: file, path: path }),
            Err(ref e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
}

impl BodyBuffer {
    /// Create a buffer holding at most `limit` bytes, of which at most
    /// `threshold` stay in memory when a spool directory is configured
    pub fn new(threshold: usize, limit: usize, spool_dir: Option<&Path>)
        -> BodyBuffer
    {
        BodyBuffer {
            limit: limit,
            threshold: threshold,
            spool_dir: spool_dir.map(|p| p.to_path_buf()),
            len: 0,
            pos: 0,
            mem: Buf::new(),
            spill: None,
        }
    }

    /// Total number of bytes appended so far
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the body crossed the threshold into the spool file
    pub fn is_spilled(&self) -> bool {
        self.spill.is_some()
    }

    /// Append a slice of body bytes
    ///
    /// Returns `BodyError::TooLarge` when the configured maximum would be
    /// exceeded; the message being parsed must be aborted in that case, a
    /// truncated body is never exposed.
    pub fn append(&mut self, data: &[u8]) -> Result<(), BodyError> {
        if data.len() > self.limit - self.len {
            return Err(BodyError::TooLarge);
        }
        if self.spill.is_none()
            && self.len + data.len() > self.threshold
            && self.spool_dir.is_some()
        {
            let mut spill = {
                let dir = self.spool_dir.as_ref().unwrap();
                open_spool(dir)?
            };
            debug!("body exceeded {} bytes, spooling to {:?}",
                self.threshold, spill.path);
            spill.file.write_all(&self.mem[..])?;
            let buffered = self.mem.len();
            self.mem.consume(buffered);
            self.spill = Some(spill);
        }
        match self.spill {
            Some(ref mut spill) => {
                // reads seek the shared cursor around, go back to the end
                spill.file.seek(SeekFrom::End(0))?;
                spill.file.write_all(data)?;
            }
            None => self.mem.extend(data),
        }
        self.len += data.len();
        Ok(())
    }

    /// Reset the read position to the beginning of the body
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Read the whole body into a vector, consuming the read position
    ///
    /// Used by the websocket message assembly where the payload has to be
    /// materialized anyway; HTTP consumers should prefer streaming via
    /// `io::Read`.
    pub fn take_bytes(&mut self) -> io::Result<Vec<u8>> {
        self.rewind();
        let mut data = Vec::with_capacity(self.len);
        self.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl Read for BodyBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match self.spill {
            Some(ref mut spill) => {
                spill.file.seek(SeekFrom::Start(self.pos as u64))?;
                spill.file.read(buf)?
            }
            None => {
                let data = &self.mem[self.pos..];
                let n = ::std::cmp::min(data.len(), buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                n
            }
        };
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod test {
    use std::env::temp_dir;
    use std::io::Read;

    use super::{BodyBuffer, BodyError};

    #[test]
    fn memory_only() {
        let mut body = BodyBuffer::new(1024, 4096, None);
        body.append(b"hello ").unwrap();
        body.append(b"world").unwrap();
        assert_eq!(body.len(), 11);
        assert!(!body.is_spilled());
        body.rewind();
        let mut data = String::new();
        body.read_to_string(&mut data).unwrap();
        assert_eq!(data, "hello world");
    }

    #[test]
    fn limit_is_fatal() {
        let mut body = BodyBuffer::new(1024, 8, None);
        body.append(b"12345678").unwrap();
        match body.append(b"9") {
            Err(BodyError::TooLarge) => {}
            res => panic!("unexpected result {:?}", res),
        }
    }

    #[test]
    fn no_spool_dir_keeps_memory() {
        let mut body = BodyBuffer::new(4, 4096, None);
        body.append(b"more than four bytes").unwrap();
        assert!(!body.is_spilled());
    }

    #[test]
    fn spillover_roundtrip() {
        let dir = temp_dir();
        let mut body = BodyBuffer::new(8, 4096, Some(&dir));
        body.append(b"0123").unwrap();
        assert!(!body.is_spilled());
        body.append(b"456789abcdef").unwrap();
        assert!(body.is_spilled());
        body.append(b"ghij").unwrap();
        assert_eq!(body.len(), 20);
        assert_eq!(body.take_bytes().unwrap(), b"0123456789abcdefghij");
        // reading twice works after a rewind
        body.rewind();
        let mut again = Vec::new();
        body.read_to_end(&mut again).unwrap();
        assert_eq!(again, b"0123456789abcdefghij");
    }
}
