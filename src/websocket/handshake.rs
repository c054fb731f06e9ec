#[allow(unused_imports)]
use std::ascii::AsciiExt;
use std::str::from_utf8;

use headers::{bytes_trim, is_connection, is_upgrade};
use parser::Message;
use super::keys::Accept;

/// Parsed `Upgrade: websocket` request data
pub struct Handshake {
    /// The destination value of `Sec-WebSocket-Accept`
    pub accept: Accept,
    /// List of `Sec-WebSocket-Protocol` tokens
    pub protocols: Vec<String>,
    /// List of `Sec-WebSocket-Extensions` tokens
    pub extensions: Vec<String>,
}

/// Check whether a parsed request is a websocket handshake
///
/// `Ok(None)` is a regular HTTP request, `Err(())` is a malformed
/// handshake the server should answer with a 400.
pub fn get_handshake(req: &Message) -> Result<Option<Handshake>, ()> {
    let conn_upgrade = req.headers().iter()
        .filter(|&&(ref name, _)| is_connection(name))
        .any(|&(_, ref value)| {
            value.split(|&x| x == b',').any(is_upgrade)
        });
    if !conn_upgrade {
        return Ok(None);
    }
    let mut upgrade = false;
    let mut version = false;
    let mut accept = None;
    let mut protocols = Vec::new();
    let mut extensions = Vec::new();
    for &(ref name, ref value) in req.headers() {
        if name.eq_ignore_ascii_case("Sec-WebSocket-Key") {
            if accept.is_some() {
                debug!("Duplicate Sec-WebSocket-Key");
                return Err(());
            }
            accept = Some(Accept::from_key_bytes(bytes_trim(value)));
        } else if name.eq_ignore_ascii_case("Sec-WebSocket-Version") {
            // Only version 13 is supported
            if bytes_trim(value) != b"13" {
                debug!("Bad websocket version {:?}",
                    String::from_utf8_lossy(value));
                return Err(());
            } else {
                version = true;
            }
        } else if name.eq_ignore_ascii_case("Sec-WebSocket-Protocol") {
            let tokens = from_utf8(value)
                .map_err(|_| debug!("Bad utf-8 in Sec-Websocket-Protocol"))?;
            protocols.extend(tokens.split(",")
                .map(|x| x.trim())
                .filter(|x| x.len() > 0)
                .map(|x| x.to_string()));
        } else if name.eq_ignore_ascii_case("Sec-WebSocket-Extensions") {
            let tokens = from_utf8(value)
                .map_err(|_| debug!("Bad utf-8 in Sec-Websocket-Extensions"))?;
            extensions.extend(tokens.split(",")
                .map(|x| x.trim())
                .filter(|x| x.len() > 0)
                .map(|x| x.to_string()));
        } else if name.eq_ignore_ascii_case("Upgrade") {
            if !value.eq_ignore_ascii_case(b"websocket") {
                return Ok(None); // Consider this not a websocket
            } else {
                upgrade = true;
            }
        }
    }
    if req.has_body() {
        debug!("Websocket handshake has payload");
        return Err(());
    }
    if !upgrade {
        debug!("No upgrade header for a websocket");
        return Err(());
    }
    if !version || accept.is_none() {
        debug!("No required headers for a websocket");
        return Err(());
    }
    Ok(Some(Handshake {
        accept: accept.take().unwrap(),
        protocols: protocols,
        extensions: extensions,
    }))
}
