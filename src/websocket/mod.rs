//! Websocket framing support
//!
//! `FrameParser` turns raw socket bytes into reassembled messages, the
//! opposite `FrameWriter` keeps a priority queue of outgoing frames and
//! serializes them one at a time. Both are resumable the same way the
//! HTTP parser and writers are: feed or write whenever the socket is
//! ready, all progress lives in the instance.
//!
//! The handshake (`get_handshake` plus the key types in this module) is
//! plain HTTP and runs through the HTTP parser/encoder before the
//! connection switches to framing.

use std::path::PathBuf;

mod config;
mod error;
mod handshake;
mod keys;
mod parse;
mod write;

pub use self::error::Error;
pub use self::handshake::{get_handshake, Handshake};
pub use self::keys::{Accept, Key, GUID};
pub use self::parse::{FrameParser, Message, Data};
pub use self::write::FrameWriter;

/// Which side of the connection this endpoint is
///
/// The role decides masking: clients must mask every frame they send and
/// servers must reject unmasked frames they receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// Websocket frame opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    pub fn is_control(self) -> bool {
        matches!(self, Opcode::Close | Opcode::Ping | Opcode::Pong)
    }
    fn code(self) -> u8 {
        use self::Opcode::*;
        match self {
            Continuation => 0x0,
            Text => 0x1,
            Binary => 0x2,
            Close => 0x8,
            Ping => 0x9,
            Pong => 0xA,
        }
    }
    fn from_code(code: u8) -> Option<Opcode> {
        use self::Opcode::*;
        match code {
            0x0 => Some(Continuation),
            0x1 => Some(Text),
            0x2 => Some(Binary),
            0x8 => Some(Close),
            0x9 => Some(Ping),
            0xA => Some(Pong),
            _ => None,
        }
    }
}

/// Frame-level metadata, kept for callers that care how a message was
/// split on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub opcode: Opcode,
    pub len: u64,
    pub fin: bool,
}

/// An outgoing websocket packet
///
/// Data is allocated on the heap so the packet has a static lifetime and
/// may sit in the outgoing queue for a while.
#[derive(Debug, Clone)]
pub enum Packet {
    /// Ping packet (with data)
    Ping(Vec<u8>),
    /// Pong packet (with data)
    Pong(Vec<u8>),
    /// Text (utf-8) messsage
    Text(String),
    /// Binary message
    Binary(Vec<u8>),
    /// Close message
    Close(u16, String),
}

/// Configuration of the frame parser
#[derive(Debug, Clone)]
pub struct Config {
    max_frame_size: usize,
    max_message_size: usize,
    body_memory_threshold: usize,
    spool_dir: Option<PathBuf>,
}
