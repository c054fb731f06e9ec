use std::io;
use std::str::Utf8Error;

quick_error! {
    /// Websocket framing error, works both for client and server
    /// connections
    ///
    /// Any of these is fatal to the connection; `close_code()` gives the
    /// status to put into the close frame before tearing it down.
    #[derive(Debug)]
    pub enum Error {
        /// Spool file IO error
        Io(err: io::Error) {
            description("IO error")
            display("IO error: {}", err)
            from()
        }
        /// Frame has non-zero reserved bits and no extension negotiated
        ReservedBits {
            description("Reserved frame bits are set")
        }
        /// Got websocket frame with unknown opcode
        InvalidOpcode(code: u8) {
            description("Opcode of the frame is invalid")
            display("Opcode of the frame is invalid: {}", code)
        }
        /// Got unmasked frame from a client
        Unmasked {
            description("Received unmasked frame")
        }
        /// Control frame with the fin flag unset
        ControlFragmented {
            description("Received fragmented control frame")
        }
        /// Control frame with a payload longer than 125 bytes
        ControlTooLong {
            description("Received control frame that is too long")
        }
        /// Continuation frame without a fragmented message in progress
        UnexpectedContinuation {
            description("Received continuation frame with no \
                message in progress")
        }
        /// New data frame in the middle of a fragmented message
        MessageInterrupted {
            description("Received data frame in the middle of \
                a fragmented message")
        }
        /// 64-bit frame length with the high bit set
        BadLength {
            description("Frame length is not a valid 63-bit number")
        }
        /// Received frame that is longer than configured limit
        FrameTooLong {
            description("Received frame that is too long")
        }
        /// Reassembled message is longer than configured limit
        MessageTooLong {
            description("Received message that is too long")
        }
        /// Text message can't be decoded
        InvalidUtf8(err: Utf8Error) {
            description("Error decoding text message")
            display("Error decoding text message: {}", err)
            from()
        }
        /// Close frame payload of one byte, or a non-utf-8 reason
        BadCloseFrame {
            description("Received malformed close frame")
        }
    }
}

impl Error {
    /// The status code to send in the close frame for this error
    pub fn close_code(&self) -> u16 {
        use self::Error::*;
        match *self {
            FrameTooLong | MessageTooLong => 1009,
            InvalidUtf8(..) => 1007,
            _ => 1002,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Error;

    #[test]
    fn close_codes() {
        assert_eq!(Error::FrameTooLong.close_code(), 1009);
        assert_eq!(Error::MessageTooLong.close_code(), 1009);
        assert_eq!(Error::Unmasked.close_code(), 1002);
        assert_eq!(Error::ReservedBits.close_code(), 1002);
    }

    #[test]
    fn send_sync() {
        fn send_sync<T: Send + Sync>(_: T) {}
        send_sync(Error::BadCloseFrame);
    }
}
