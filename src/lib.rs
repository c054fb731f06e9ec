//! Resumable HTTP/1.x and websocket protocol machines for reactor-style
//! servers
//!
//! This crate contains no event loop and opens no sockets. It provides the
//! byte-level protocol engine that a connection handler drives from readiness
//! callbacks:
//!
//! * `parser::Parser` turns partially delivered socket bytes into parsed
//!   HTTP/1.x messages (request or response mode), including chunked and
//!   close-delimited bodies with spillover buffering for large entities.
//! * `writer` contains the response serializer (`writer::Encoder`) and a
//!   family of backpressure-aware writers: plain buffer, streamed resource,
//!   chunked encoding, byte ranges and multipart byte ranges.
//! * `websocket` contains the RFC 6455 frame parser (with fragmentation
//!   reassembly) and the frame writer with a control-frame priority queue.
//!
//! All state machines keep their progress in instance fields, so a call can
//! be repeated whenever the socket becomes readable or writable again.
#![recursion_limit="100"]

extern crate byteorder;
extern crate httparse;
extern crate netbuf;
extern crate rand;
extern crate sha1;
#[macro_use(quick_error)] extern crate quick_error;
#[macro_use] extern crate matches;
#[macro_use] extern crate log;
#[cfg(feature="date_header")] extern crate httpdate;

mod enums;
mod headers;
mod error;
mod body;
mod chunked;
mod base_serializer;
pub mod parser;
pub mod writer;
pub mod websocket;

pub use enums::{Version, Status, Method};
pub use error::{Error, WriteError};
pub use body::BodyBuffer;
pub use base_serializer::HeaderError;
