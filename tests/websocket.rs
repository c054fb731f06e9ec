#[macro_use] extern crate matches;
extern crate tk_proto;

use tk_proto::Version;
use tk_proto::parser::{Config as HttpConfig, ParseEvent, Parser};
use tk_proto::websocket::{get_handshake, Config, Data, Error};
use tk_proto::websocket::{FrameParser, FrameWriter, Opcode, Packet, Role};
use tk_proto::writer::{Encoder, ResponseConfig};

fn parse_request(wire: &[u8]) -> tk_proto::parser::Message {
    let mut parser = Parser::request(&HttpConfig::new().done());
    match parser.feed(wire) {
        Ok(Some(ParseEvent::Message(msg))) => msg,
        res => panic!("expected a complete request, got {:?}", res),
    }
}

fn server() -> FrameParser {
    FrameParser::new(Role::Server, &Config::new().done())
}

#[test]
fn handshake_end_to_end() {
    let req = parse_request(concat!(
        "GET /chat HTTP/1.1\r\n",
        "Host: server.example.com\r\n",
        "Upgrade: websocket\r\n",
        "Connection: Upgrade\r\n",
        "Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n",
        "Sec-WebSocket-Protocol: chat, superchat\r\n",
        "Sec-WebSocket-Version: 13\r\n\r\n").as_bytes());
    let hs = get_handshake(&req).unwrap().unwrap();
    assert_eq!(hs.accept.to_string(), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    assert_eq!(hs.protocols, ["chat", "superchat"]);

    let mut enc = Encoder::response(ResponseConfig::from(&req));
    enc.custom_status(101, "Switching Protocols");
    enc.add_header("Upgrade", "websocket").unwrap();
    enc.add_header("Connection", "Upgrade").unwrap();
    enc.format_header("Sec-WebSocket-Accept", &hs.accept).unwrap();
    enc.done_headers().unwrap();
    let buf = enc.done().into_buf();
    assert_eq!(String::from_utf8_lossy(&buf[..]), concat!(
        "HTTP/1.1 101 Switching Protocols\r\n",
        "Upgrade: websocket\r\n",
        "Connection: Upgrade\r\n",
        "Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n"));
}

#[test]
fn plain_request_is_not_a_handshake() {
    let req = parse_request(b"GET / HTTP/1.1\r\nHost: h\r\n\r\n");
    assert!(get_handshake(&req).unwrap().is_none());
}

#[test]
fn wrong_version_is_rejected() {
    let req = parse_request(concat!(
        "GET / HTTP/1.1\r\n",
        "Upgrade: websocket\r\n",
        "Connection: Upgrade\r\n",
        "Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n",
        "Sec-WebSocket-Version: 8\r\n\r\n").as_bytes());
    assert!(get_handshake(&req).is_err());
}

#[test]
fn fragmented_text_with_interleaved_ping() {
    let mut parser = server();
    let mut wire = Vec::new();
    // text "hel", fin unset (zero mask leaves the payload as is)
    wire.extend(b"\x01\x83\x00\x00\x00\x00hel");
    // a ping arrives in the middle of the message
    wire.extend(b"\x89\x81\x00\x00\x00\x00x");
    // continuation "lo", fin set
    wire.extend(b"\x80\x82\x00\x00\x00\x00lo");

    let ping = parser.feed(&wire).unwrap().unwrap();
    assert!(matches!(ping.data, Data::Ping(ref p) if p == b"x"));
    assert_eq!(ping.frames.len(), 1);

    let msg = parser.feed(b"").unwrap().unwrap();
    assert!(matches!(msg.data, Data::Text(ref t) if t == "hello"));
    assert_eq!(msg.frames.len(), 2);
    assert_eq!(msg.frames[0].opcode, Opcode::Text);
    assert_eq!(msg.frames[0].len, 3);
    assert!(!msg.frames[0].fin);
    assert_eq!(msg.frames[1].opcode, Opcode::Continuation);
    assert!(msg.frames[1].fin);
}

#[test]
fn code_point_split_across_frames() {
    let mut parser = server();
    // "é" is \xC3\xA9; each frame alone is invalid utf-8
    assert!(parser.feed(b"\x01\x81\x00\x00\x00\x00\xC3").unwrap()
        .is_none());
    let msg = parser.feed(b"\x80\x81\x00\x00\x00\x00\xA9")
        .unwrap().unwrap();
    assert!(matches!(msg.data, Data::Text(ref t) if t == "\u{e9}"));
}

#[test]
fn invalid_utf8_maps_to_1007() {
    let mut parser = server();
    match parser.feed(b"\x81\x81\x00\x00\x00\x00\xFF") {
        Err(ref e @ Error::InvalidUtf8(..)) => {
            assert_eq!(e.close_code(), 1007);
        }
        res => panic!("unexpected result {:?}", res),
    }
}

#[test]
fn client_writer_to_server_parser() {
    let mut wr = FrameWriter::new(Role::Client);
    wr.enqueue(Packet::Text("round trip".to_string()));
    let mut wire = Vec::new();
    let info = wr.write(&mut wire).unwrap().unwrap();
    assert_eq!(info.opcode, Opcode::Text);

    // masked with a random key, so the server side accepts it
    let mut parser = server();
    let msg = parser.feed(&wire).unwrap().unwrap();
    assert!(matches!(msg.data, Data::Text(ref t) if t == "round trip"));
}

#[test]
fn priority_survives_the_wire() {
    let mut wr = FrameWriter::new(Role::Client);
    wr.enqueue(Packet::Binary(b"first".to_vec()));
    wr.enqueue(Packet::Binary(b"second".to_vec()));
    wr.enqueue(Packet::Ping(b"now".to_vec()));
    let mut wire = Vec::new();
    while wr.wants_write() {
        wr.write(&mut wire).unwrap();
    }

    let mut parser = server();
    let mut got = Vec::new();
    got.push(parser.feed(&wire).unwrap().unwrap());
    got.push(parser.feed(b"").unwrap().unwrap());
    got.push(parser.feed(b"").unwrap().unwrap());
    assert!(parser.feed(b"").unwrap().is_none());

    assert!(matches!(got[0].data, Data::Ping(ref p) if p == b"now"));
    let payloads: Vec<Vec<u8>> = got.drain(1..)
        .map(|msg| match msg.data {
            Data::Binary(mut body) => body.take_bytes().unwrap(),
            ref data => panic!("unexpected message {:?}", data),
        })
        .collect();
    assert_eq!(payloads, [b"first".to_vec(), b"second".to_vec()]);
}

#[test]
fn manual_fragmentation_round_trip() {
    let mut wr = FrameWriter::new(Role::Client);
    wr.enqueue_frame(Opcode::Text, b"he".to_vec(), false);
    wr.enqueue_frame(Opcode::Continuation, b"llo".to_vec(), true);
    let mut wire = Vec::new();
    while wr.wants_write() {
        wr.write(&mut wire).unwrap();
    }

    let mut parser = server();
    let msg = parser.feed(&wire).unwrap().unwrap();
    assert!(matches!(msg.data, Data::Text(ref t) if t == "hello"));
    assert_eq!(msg.frames.len(), 2);
}

#[test]
fn upgrade_keeps_http_version() {
    // the handshake response must be HTTP/1.1 no matter what
    let req = parse_request(concat!(
        "GET / HTTP/1.1\r\n",
        "Upgrade: websocket\r\n",
        "Connection: Upgrade\r\n",
        "Sec-WebSocket-Key: AQIDBAUGBwgJCgsMDQ4PEA==\r\n",
        "Sec-WebSocket-Version: 13\r\n\r\n").as_bytes());
    let cfg = ResponseConfig::from(&req);
    assert_eq!(cfg.version, Version::Http11);
    assert!(!cfg.is_head);
    assert!(get_handshake(&req).unwrap().is_some());
}
