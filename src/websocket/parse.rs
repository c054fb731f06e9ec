use std::cmp::min;
use std::mem;
use std::str::from_utf8;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use netbuf::Buf;

use body::{BodyBuffer, BodyError};
use super::{Config, Error, FrameInfo, Opcode, Role};

/// Payload of a reassembled incoming message
#[derive(Debug)]
pub enum Data {
    /// Text message, utf-8 validated over the whole reassembled payload
    Text(String),
    /// Binary message; large payloads stay spooled, read them out
    Binary(BodyBuffer),
    /// Ping frame, answer with a pong carrying the same payload
    Ping(Vec<u8>),
    /// Pong frame
    Pong(Vec<u8>),
    /// Close frame; code is 1005 when the peer sent an empty payload
    Close(u16, String),
}

/// A complete incoming message
///
/// Control frames arrive as messages of their own, even in the middle of
/// a fragmented data message.
#[derive(Debug)]
pub struct Message {
    pub data: Data,
    /// Metadata of the frames the message arrived in, in wire order
    pub frames: Vec<FrameInfo>,
}

#[derive(Debug, Clone)]
struct FrameHead {
    fin: bool,
    opcode: Opcode,
    mask: Option<[u8; 4]>,
    len: u64,
}

#[derive(Debug)]
enum State {
    Head,
    Payload { head: FrameHead, consumed: u64 },
}

/// Incremental frame parser and message reassembler for one connection
pub struct FrameParser {
    role: Role,
    config: Arc<Config>,
    buf: Buf,
    state: State,
    frames: Vec<FrameInfo>,
    message_opcode: Option<Opcode>,
    message_len: u64,
    body: Option<BodyBuffer>,
    control: Vec<u8>,
}

fn parse_close(payload: Vec<u8>) -> Result<Data, Error> {
    if payload.len() == 0 {
        // peer sent no status code
        return Ok(Data::Close(1005, String::new()));
    }
    if payload.len() == 1 {
        return Err(Error::BadCloseFrame);
    }
    let code = BigEndian::read_u16(&payload[..2]);
    let reason = from_utf8(&payload[2..])
        .map_err(|_| Error::BadCloseFrame)?
        .to_string();
    Ok(Data::Close(code, reason))
}

impl FrameParser {
    pub fn new(role: Role, config: &Arc<Config>) -> FrameParser {
        FrameParser {
            role: role,
            config: config.clone(),
            buf: Buf::new(),
            state: State::Head,
            frames: Vec::new(),
            message_opcode: None,
            message_len: 0,
            body: None,
            control: Vec::new(),
        }
    }

    /// Feed bytes read from the socket
    ///
    /// `Ok(None)` means more data is needed. One message is returned per
    /// call; feed an empty slice to drain further fully-buffered frames.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Option<Message>, Error> {
        self.buf.extend(bytes);
        self.process()
    }

    fn process(&mut self) -> Result<Option<Message>, Error> {
        loop {
            if matches!(self.state, State::Head) {
                match self.parse_head()? {
                    Some(head) => {
                        self.state = State::Payload {
                            head: head,
                            consumed: 0,
                        };
                    }
                    None => return Ok(None),
                }
            }
            let complete = self.advance_payload()?;
            if !complete {
                return Ok(None);
            }
            let head = match mem::replace(&mut self.state, State::Head) {
                State::Payload { head, .. } => head,
                State::Head => unreachable!(),
            };
            let info = FrameInfo {
                opcode: head.opcode,
                len: head.len,
                fin: head.fin,
            };
            if head.opcode.is_control() {
                let payload = mem::replace(&mut self.control, Vec::new());
                let data = match head.opcode {
                    Opcode::Ping => Data::Ping(payload),
                    Opcode::Pong => Data::Pong(payload),
                    Opcode::Close => parse_close(payload)?,
                    _ => unreachable!(),
                };
                return Ok(Some(Message { data: data, frames: vec![info] }));
            }
            self.frames.push(info);
            if self.message_opcode.is_none() {
                self.message_opcode = Some(head.opcode);
            }
            if !head.fin {
                continue;
            }
            return self.finish_message(head.opcode).map(Some);
        }
    }

    /// Parse and validate one frame header, if fully buffered
    fn parse_head(&mut self) -> Result<Option<FrameHead>, Error> {
        if self.buf.len() < 2 {
            return Ok(None);
        }
        let first = self.buf[0];
        let second = self.buf[1];
        let (len, hsize) = match second & 0x7F {
            126 => {
                if self.buf.len() < 4 {
                    return Ok(None);
                }
                (BigEndian::read_u16(&self.buf[2..4]) as u64, 4)
            }
            127 => {
                if self.buf.len() < 10 {
                    return Ok(None);
                }
                let len = BigEndian::read_u64(&self.buf[2..10]);
                if len & (1 << 63) != 0 {
                    return Err(Error::BadLength);
                }
                (len, 10)
            }
            len => (len as u64, 2),
        };
        let masked = second & 0x80 != 0;
        if masked && self.buf.len() < hsize + 4 {
            return Ok(None);
        }
        if first & 0x70 != 0 {
            return Err(Error::ReservedBits);
        }
        let fin = first & 0x80 != 0;
        let opcode = match Opcode::from_code(first & 0x0F) {
            Some(opcode) => opcode,
            None => return Err(Error::InvalidOpcode(first & 0x0F)),
        };
        if opcode.is_control() {
            if !fin {
                return Err(Error::ControlFragmented);
            }
            if len > 125 {
                return Err(Error::ControlTooLong);
            }
        } else {
            if len > self.config.max_frame_size as u64 {
                return Err(Error::FrameTooLong);
            }
            if self.message_len + len > self.config.max_message_size as u64 {
                return Err(Error::MessageTooLong);
            }
            match opcode {
                Opcode::Continuation => {
                    if self.message_opcode.is_none() {
                        return Err(Error::UnexpectedContinuation);
                    }
                }
                _ => {
                    if self.message_opcode.is_some() {
                        return Err(Error::MessageInterrupted);
                    }
                }
            }
            self.message_len += len;
        }
        if self.role == Role::Server && !masked {
            return Err(Error::Unmasked);
        }
        let mask = if masked {
            Some([self.buf[hsize], self.buf[hsize + 1],
                  self.buf[hsize + 2], self.buf[hsize + 3]])
        } else {
            None
        };
        self.buf.consume(hsize + if masked { 4 } else { 0 });
        Ok(Some(FrameHead {
            fin: fin,
            opcode: opcode,
            mask: mask,
            len: len,
        }))
    }

    /// Unmask and route whatever payload bytes are buffered
    fn advance_payload(&mut self) -> Result<bool, Error> {
        match self.state {
            State::Payload { ref head, ref mut consumed } => {
                let avail = min(self.buf.len() as u64,
                                head.len - *consumed) as usize;
                if avail > 0 {
                    if let Some(key) = head.mask {
                        for i in 0..avail {
                            let shift = (*consumed as usize + i) % 4;
                            self.buf[i] ^= key[shift];
                        }
                    }
                    if head.opcode.is_control() {
                        self.control.extend(&self.buf[..avail]);
                    } else {
                        if self.body.is_none() {
                            self.body = Some(BodyBuffer::new(
                                self.config.body_memory_threshold,
                                self.config.max_message_size,
                                self.config.spool_dir.as_ref()
                                    .map(|p| p.as_path())));
                        }
                        self.body.as_mut().unwrap()
                            .append(&self.buf[..avail])?;
                    }
                    self.buf.consume(avail);
                    *consumed += avail as u64;
                }
                Ok(*consumed == head.len)
            }
            State::Head => unreachable!(),
        }
    }

    /// Build the reassembled message once the final frame is in
    fn finish_message(&mut self, last_opcode: Opcode)
        -> Result<Message, Error>
    {
        let opcode = self.message_opcode.take().unwrap_or(last_opcode);
        let frames = mem::replace(&mut self.frames, Vec::new());
        self.message_len = 0;
        let mut body = self.body.take().unwrap_or_else(|| {
            BodyBuffer::new(
                self.config.body_memory_threshold,
                self.config.max_message_size,
                self.config.spool_dir.as_ref().map(|p| p.as_path()))
        });
        body.rewind();
        let data = match opcode {
            Opcode::Text => {
                let bytes = body.take_bytes()?;
                let text = String::from_utf8(bytes)
                    .map_err(|e| Error::InvalidUtf8(e.utf8_error()))?;
                Data::Text(text)
            }
            Opcode::Binary => Data::Binary(body),
            _ => unreachable!(),
        };
        Ok(Message { data: data, frames: frames })
    }
}

impl From<BodyError> for Error {
    fn from(err: BodyError) -> Error {
        match err {
            BodyError::TooLarge => Error::MessageTooLong,
            BodyError::Io(err) => Error::Io(err),
        }
    }
}
