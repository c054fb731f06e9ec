#[macro_use] extern crate matches;
extern crate tk_proto;

use std::sync::Arc;

use tk_proto::{Error, Method, Version};
use tk_proto::parser::{Config, Message, ParseEvent, Parser};

fn config() -> Arc<Config> {
    Config::new().done()
}

fn unwrap_message(event: Option<ParseEvent>) -> Message {
    match event {
        Some(ParseEvent::Message(msg)) => msg,
        other => panic!("expected a complete message, got {:?}", other),
    }
}

fn parse_request(bytes: &[u8]) -> Message {
    let mut parser = Parser::request(&config());
    unwrap_message(parser.feed(bytes).unwrap())
}

fn body_string(msg: &mut Message) -> String {
    let bytes = msg.take_body().unwrap().take_bytes().unwrap();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn simple_get() {
    let wire = b"GET /x HTTP/1.1\r\nHost: h\r\n\r\n";
    let msg = parse_request(wire);
    assert_eq!(msg.method(), Some(&Method::Get));
    assert_eq!(msg.target(), Some("/x"));
    assert_eq!(msg.version(), Version::Http11);
    assert_eq!(msg.header("host"), Some(&b"h"[..]));
    assert!(!msg.has_body());
    assert!(!msg.connection_close());
    assert_eq!(msg.raw_head(), &wire[..]);
}

#[test]
fn incremental_equivalence() {
    let wire = b"POST /submit HTTP/1.1\r\nHost: example.com\r\n\
                 Content-Length: 11\r\n\r\nhello world";
    let mut whole = parse_request(wire);
    for cut in 1..wire.len() {
        let mut parser = Parser::request(&config());
        assert!(parser.feed(&wire[..cut]).unwrap().is_none(),
            "cut at {}", cut);
        let mut msg = unwrap_message(parser.feed(&wire[cut..]).unwrap());
        assert_eq!(msg.method(), whole.method(), "cut at {}", cut);
        assert_eq!(msg.target(), whole.target(), "cut at {}", cut);
        assert_eq!(msg.headers(), whole.headers(), "cut at {}", cut);
        assert_eq!(body_string(&mut msg), "hello world", "cut at {}", cut);
    }
    assert_eq!(body_string(&mut whole), "hello world");
}

#[test]
fn fixed_body_needs_every_byte() {
    let mut parser = Parser::request(&config());
    assert!(parser.feed(
        b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nabc").unwrap()
        .is_none());
    let mut msg = unwrap_message(parser.feed(b"de").unwrap());
    assert_eq!(body_string(&mut msg), "abcde");
}

#[test]
fn pipelined_requests() {
    let mut parser = Parser::request(&config());
    let wire = b"GET /one HTTP/1.1\r\nHost: h\r\n\r\n\
                 GET /two HTTP/1.1\r\nHost: h\r\n\r\n";
    let first = unwrap_message(parser.feed(wire).unwrap());
    assert_eq!(first.target(), Some("/one"));
    // the rest is already buffered
    let second = unwrap_message(parser.feed(b"").unwrap());
    assert_eq!(second.target(), Some("/two"));
    assert!(parser.feed(b"").unwrap().is_none());
}

#[test]
fn chunked_request_body() {
    let mut parser = Parser::request(&config());
    let wire = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n\
                 6\r\nhello \r\n5\r\nworld\r\n0\r\n\r\n";
    let mut msg = unwrap_message(parser.feed(wire).unwrap());
    assert_eq!(body_string(&mut msg), "hello world");
}

#[test]
fn headers_too_large_is_431() {
    let mut parser = Parser::request(
        &Config::new().max_headers_size(128).done());
    let mut wire = b"GET / HTTP/1.1\r\n".to_vec();
    for _ in 0..20 {
        wire.extend(b"X-Filler: aaaaaaaaaaaaaaaa\r\n");
    }
    wire.extend(b"\r\n");
    match parser.feed(&wire) {
        Err(ref e @ Error::HeadersTooLarge) => {
            assert_eq!(e.status().code(), 431);
        }
        res => panic!("unexpected result {:?}", res),
    }
}

#[test]
fn long_start_line_is_414() {
    let mut parser = Parser::request(
        &Config::new().max_request_line(32).done());
    let mut wire = b"GET /".to_vec();
    wire.extend(vec![b'a'; 64]);
    match parser.feed(&wire) {
        Err(ref e @ Error::RequestLineTooLong) => {
            assert_eq!(e.status().code(), 414);
        }
        res => panic!("unexpected result {:?}", res),
    }
}

#[test]
fn body_too_large_is_413() {
    let mut parser = Parser::request(
        &Config::new().max_body_size(4).done());
    match parser.feed(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\n") {
        Err(ref e @ Error::BodyTooLarge) => {
            assert_eq!(e.status().code(), 413);
        }
        res => panic!("unexpected result {:?}", res),
    }
}

#[test]
fn duplicate_content_length_is_fatal() {
    let mut parser = Parser::request(&config());
    let wire = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\
                 Content-Length: 2\r\n\r\nhi";
    assert!(matches!(parser.feed(wire),
        Err(Error::DuplicateContentLength)));
}

#[test]
fn http2_version_is_505() {
    let mut parser = Parser::request(&config());
    match parser.feed(b"GET / HTTP/2.0\r\n\r\n") {
        Err(ref e @ Error::UnsupportedVersion) => {
            assert_eq!(e.status().code(), 505);
        }
        res => panic!("unexpected result {:?}", res),
    }
}

#[test]
fn folded_header_is_unfolded() {
    let msg = parse_request(
        b"GET / HTTP/1.1\r\nX-Long: first\r\n second\r\n\r\n");
    assert_eq!(msg.header("x-long"), Some(&b"first second"[..]));
}

#[test]
fn expect_continue_is_reported() {
    let msg = parse_request(
        b"POST / HTTP/1.1\r\nExpect: 100-continue\r\n\
          Content-Length: 0\r\n\r\n");
    assert!(msg.expects_continue());
}

#[test]
fn header_multimap_keeps_order() {
    let msg = parse_request(
        b"GET / HTTP/1.1\r\nX-Tag: one\r\nHost: h\r\nX-Tag: two\r\n\r\n");
    assert_eq!(msg.header("x-tag"), Some(&b"one"[..]));
    assert_eq!(msg.header_all("X-Tag"), [&b"one"[..], &b"two"[..]]);
}

#[test]
fn head_request_has_no_body() {
    let msg = parse_request(
        b"HEAD / HTTP/1.1\r\nContent-Length: 10\r\n\r\n");
    assert_eq!(msg.method(), Some(&Method::Head));
    assert!(!msg.has_body());
}

#[test]
fn close_delimited_response() {
    let mut parser = Parser::response(&config());
    assert!(parser.feed(b"HTTP/1.1 200 OK\r\n\r\nsome ").unwrap()
        .is_none());
    assert!(parser.feed(b"data").unwrap().is_none());
    let mut msg = unwrap_message(parser.feed_eof().unwrap());
    assert_eq!(msg.code(), Some(200));
    assert!(msg.connection_close());
    assert_eq!(body_string(&mut msg), "some data");
}

#[test]
fn response_to_head_has_no_body() {
    let mut parser = Parser::response(&config());
    parser.response_to_head(true);
    let msg = unwrap_message(parser.feed(
        b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n").unwrap());
    assert!(!msg.has_body());
}

#[test]
fn no_content_response_completes_immediately() {
    let mut parser = Parser::response(&config());
    let msg = unwrap_message(parser.feed(
        b"HTTP/1.1 204 No Content\r\n\r\n").unwrap());
    assert_eq!(msg.code(), Some(204));
    assert_eq!(msg.reason(), Some("No Content"));
    assert!(!msg.has_body());
}

#[test]
fn eof_mid_message_is_connection_reset() {
    let mut parser = Parser::request(&config());
    assert!(parser.feed(
        b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc").unwrap()
        .is_none());
    assert!(matches!(parser.feed_eof(), Err(Error::ConnectionReset)));
}

#[test]
fn clean_eof_between_messages() {
    let mut parser = Parser::request(&config());
    unwrap_message(parser.feed(b"GET / HTTP/1.1\r\nHost: h\r\n\r\n")
        .unwrap());
    assert!(parser.feed_eof().unwrap().is_none());
}

#[test]
fn early_headers_event() {
    let mut parser = Parser::request(
        &Config::new().emit_headers_early(true).done());
    let event = parser.feed(
        b"POST /up HTTP/1.1\r\nContent-Length: 4\r\n\r\nab").unwrap();
    assert!(matches!(event, Some(ParseEvent::HeadersParsed)));
    {
        let head = parser.current_head().unwrap();
        assert_eq!(head.target(), Some("/up"));
    }
    assert!(parser.feed(b"").unwrap().is_none());
    let mut msg = unwrap_message(parser.feed(b"cd").unwrap());
    assert_eq!(body_string(&mut msg), "abcd");
}

#[test]
fn large_body_spills_to_disk() {
    let dir = std::env::temp_dir();
    let mut parser = Parser::request(
        &Config::new()
            .body_memory_threshold(16)
            .spool_dir(&dir)
            .done());
    let mut wire = b"POST / HTTP/1.1\r\nContent-Length: 100\r\n\r\n"
        .to_vec();
    wire.extend(vec![b'x'; 100]);
    let mut msg = unwrap_message(parser.feed(&wire).unwrap());
    {
        let body = msg.body().unwrap();
        assert!(body.is_spilled());
        assert_eq!(body.len(), 100);
    }
    assert_eq!(body_string(&mut msg), "x".repeat(100));
}
