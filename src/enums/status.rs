/// Enum with the HTTP status codes the library itself needs, plus `Raw`
/// for everything else.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    // custom http code
    Raw(u16, String),
    //  1xx status codes
    Continue,                        // 100
    SwitchingProtocols,              // 101
    //  2xx status codes
    Ok,                              // 200
    Created,                         // 201
    Accepted,                        // 202
    NoContent,                       // 204
    PartialContent,                  // 206
    //  3xx status codes
    MovedPermanently,                // 301
    Found,                           // 302
    SeeOther,                        // 303
    NotModified,                     // 304
    TemporaryRedirect,               // 307
    PermanentRedirect,               // 308
    //  4xx status codes
    BadRequest,                      // 400
    Unauthorized,                    // 401
    Forbidden,                       // 403
    NotFound,                        // 404
    MethodNotAllowed,                // 405
    RequestTimeout,                  // 408
    LengthRequired,                  // 411
    PayloadTooLarge,                 // 413
    UriTooLong,                      // 414
    RangeNotSatisfiable,             // 416
    UpgradeRequired,                 // 426
    RequestHeaderFieldsTooLarge,     // 431
    //  5xx status codes
    InternalServerError,             // 500
    NotImplemented,                  // 501
    BadGateway,                      // 502
    ServiceUnavailable,              // 503
    GatewayTimeout,                  // 504
    VersionNotSupported,             // 505
}

impl Status {
    pub fn code(&self) -> u16 {
        use self::Status::*;
        match *self {
            Continue => 100,
            SwitchingProtocols => 101,
            Ok => 200,
            Created => 201,
            Accepted => 202,
            NoContent => 204,
            PartialContent => 206,
            MovedPermanently => 301,
            Found => 302,
            SeeOther => 303,
            NotModified => 304,
            TemporaryRedirect => 307,
            PermanentRedirect => 308,
            BadRequest => 400,
            Unauthorized => 401,
            Forbidden => 403,
            NotFound => 404,
            MethodNotAllowed => 405,
            RequestTimeout => 408,
            LengthRequired => 411,
            PayloadTooLarge => 413,
            UriTooLong => 414,
            RangeNotSatisfiable => 416,
            UpgradeRequired => 426,
            RequestHeaderFieldsTooLarge => 431,
            InternalServerError => 500,
            NotImplemented => 501,
            BadGateway => 502,
            ServiceUnavailable => 503,
            GatewayTimeout => 504,
            VersionNotSupported => 505,
            Raw(code, _) => code,
        }
    }

    pub fn reason(&self) -> &str {
        use self::Status::*;
        match *self {
            Continue => "Continue",
            SwitchingProtocols => "Switching Protocols",
            Ok => "OK",
            Created => "Created",
            Accepted => "Accepted",
            NoContent => "No Content",
            PartialContent => "Partial Content",
            MovedPermanently => "Moved Permanently",
            Found => "Found",
            SeeOther => "See Other",
            NotModified => "Not Modified",
            TemporaryRedirect => "Temporary Redirect",
            PermanentRedirect => "Permanent Redirect",
            BadRequest => "Bad Request",
            Unauthorized => "Unauthorized",
            Forbidden => "Forbidden",
            NotFound => "Not Found",
            MethodNotAllowed => "Method Not Allowed",
            RequestTimeout => "Request Timeout",
            LengthRequired => "Length Required",
            PayloadTooLarge => "Payload Too Large",
            UriTooLong => "Request-URI Too Long",
            RangeNotSatisfiable => "Range Not Satisfiable",
            UpgradeRequired => "Upgrade Required",
            RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            InternalServerError => "Internal Server Error",
            NotImplemented => "Not Implemented",
            BadGateway => "Bad Gateway",
            ServiceUnavailable => "Service Unavailable",
            GatewayTimeout => "Gateway Timeout",
            VersionNotSupported => "HTTP Version Not Supported",
            Raw(_, ref reason) => reason,
        }
    }
}
