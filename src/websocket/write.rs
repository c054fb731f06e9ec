use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use netbuf::Buf;
use rand::{thread_rng, Rng};

use error::WriteError;
use writer::drain;
use super::{FrameInfo, Opcode, Packet, Role};

struct Entry {
    control: bool,
    seq: u64,
    opcode: Opcode,
    payload: Vec<u8>,
    fin: bool,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Entry) -> bool {
        self.seq == other.seq
    }
}
impl Eq for Entry {}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Entry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Entry {
    fn cmp(&self, other: &Entry) -> Ordering {
        // BinaryHeap is a max-heap: control frames beat data frames,
        // among equals the lower sequence number goes first
        self.control.cmp(&other.control)
            .then(other.seq.cmp(&self.seq))
    }
}

/// Queueing serializer for outgoing frames
///
/// Frames are enqueued in any order; extraction pulls control frames
/// (close, ping, pong) ahead of data frames, so a ping reply or a close
/// never waits behind a long payload. Frames of the same priority keep
/// their enqueue order.
///
/// `write` serializes and pushes one frame at a time, returning its
/// metadata once it is fully delivered.
pub struct FrameWriter {
    role: Role,
    queue: BinaryHeap<Entry>,
    next_seq: u64,
    buf: Buf,
    current: Option<FrameInfo>,
}

impl FrameWriter {
    pub fn new(role: Role) -> FrameWriter {
        FrameWriter {
            role: role,
            queue: BinaryHeap::new(),
            next_seq: 0,
            buf: Buf::new(),
            current: None,
        }
    }

    /// Enqueue a whole message as a single frame
    pub fn enqueue(&mut self, packet: Packet) {
        match packet {
            Packet::Ping(data) => {
                self.enqueue_frame(Opcode::Ping, data, true)
            }
            Packet::Pong(data) => {
                self.enqueue_frame(Opcode::Pong, data, true)
            }
            Packet::Text(text) => {
                self.enqueue_frame(Opcode::Text, text.into_bytes(), true)
            }
            Packet::Binary(data) => {
                self.enqueue_frame(Opcode::Binary, data, true)
            }
            Packet::Close(code, reason) => {
                let mut payload = Vec::with_capacity(reason.len() + 2);
                payload.write_u16::<BigEndian>(code)
                    .expect("writes to a vector always succeed");
                payload.extend(reason.as_bytes());
                self.enqueue_frame(Opcode::Close, payload, true)
            }
        }
    }

    /// Enqueue a single frame, for manual fragmentation
    ///
    /// A fragmented message is a `Text` or `Binary` frame with `fin`
    /// unset followed by `Continuation` frames, the last one with `fin`
    /// set. Interleaving another data message is a protocol violation the
    /// peer will kill the connection over; interleaved control frames are
    /// fine (and jump the queue anyway).
    ///
    /// # Panics
    ///
    /// When a control frame is fragmented or its payload exceeds
    /// 125 bytes.
    pub fn enqueue_frame(&mut self, opcode: Opcode, payload: Vec<u8>,
        fin: bool)
    {
        if opcode.is_control() {
            assert!(fin, "control frames can't be fragmented");
            assert!(payload.len() <= 125,
                "control frame payload is limited to 125 bytes");
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Entry {
            control: opcode.is_control(),
            seq: seq,
            opcode: opcode,
            payload: payload,
            fin: fin,
        });
    }

    /// Whether the caller should keep the writable subscription on
    pub fn wants_write(&self) -> bool {
        self.current.is_some() || !self.queue.is_empty()
    }

    /// Push the highest-priority frame into the destination
    ///
    /// Returns the frame's metadata once it is fully delivered; `None`
    /// means either an empty queue or a destination that stopped
    /// accepting bytes mid-frame (check `wants_write`).
    pub fn write<W: Write>(&mut self, dest: &mut W)
        -> Result<Option<FrameInfo>, WriteError>
    {
        if self.current.is_none() {
            match self.queue.pop() {
                Some(entry) => {
                    let info = FrameInfo {
                        opcode: entry.opcode,
                        len: entry.payload.len() as u64,
                        fin: entry.fin,
                    };
                    self.serialize(entry);
                    self.current = Some(info);
                }
                None => return Ok(None),
            }
        }
        if drain(&mut self.buf, dest)? {
            Ok(self.current.take())
        } else {
            Ok(None)
        }
    }

    fn serialize(&mut self, entry: Entry) {
        let first = entry.opcode.code() |
            if entry.fin { 0x80 } else { 0 };
        let mask_bit: u8 = match self.role {
            Role::Client => 0x80,
            Role::Server => 0,
        };
        self.buf.extend(&[first]);
        match entry.payload.len() {
            len @ 0...125 => {
                self.buf.extend(&[mask_bit | len as u8]);
            }
            len @ 126...65535 => {
                self.buf.extend(&[mask_bit | 126]);
                self.buf.write_u16::<BigEndian>(len as u16)
                    .expect("writes to a buffer always succeed");
            }
            len => {
                self.buf.extend(&[mask_bit | 127]);
                self.buf.write_u64::<BigEndian>(len as u64)
                    .expect("writes to a buffer always succeed");
            }
        }
        match self.role {
            Role::Server => self.buf.extend(&entry.payload),
            Role::Client => {
                let key: [u8; 4] = thread_rng().gen();
                self.buf.extend(&key);
                let masked: Vec<u8> = entry.payload.iter().enumerate()
                    .map(|(idx, &b)| b ^ key[idx % 4])
                    .collect();
                self.buf.extend(&masked);
            }
        }
    }
}
