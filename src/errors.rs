use crate::{http::types::StatusCode, Version};
use std::{error, io, net::SocketAddr};
use thiserror::Error;

/// Boxed application error carried by [`Error::Handler`].
pub type BoxError = Box<dyn error::Error + Send + Sync + 'static>;

/// Protocol-level faults detected while decoding a message off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("socket stream is empty")]
    EmptyStream,

    #[error("malformed start line")]
    InvalidStartLine,
    #[error("invalid HTTP method")]
    InvalidMethod,
    #[error("unsupported HTTP version")]
    UnsupportedVersion,

    #[error("malformed header line")]
    InvalidHeader,
    #[error("missing `Host` header")]
    MissingHost,
    #[error("invalid `Host` header")]
    InvalidHost,
    #[error("multiple `Content-Length` headers given")]
    MultipleContentLength,
    #[error("header fields too large")]
    HeaderTooLarge,

    #[error("payload too large")]
    BodyTooLarge,
    #[error("malformed chunked body")]
    InvalidChunk,

    #[error("service temporarily unavailable")]
    ServiceUnavailable,
}

macro_rules! http_errors {
    ($($name:ident: $status:expr, $line:literal, $len:literal => $json:literal; )*) => {
        /// Status code the client receives for this fault.
        pub const fn status(&self) -> StatusCode {
            match self { $( Self::$name => $status, )* }
        }

        /// Canned `connection: close` response for this fault.
        pub(crate) const fn as_http(&self, version: Version, json: bool) -> &'static [u8] {
            match (json, self, version) { $(
                (true, Self::$name, Version::Http11) => concat!(
                    "HTTP/1.1 ", $line, "\r\n",
                    "connection: close\r\n",
                    "content-length: ", $len, "\r\n",
                    "content-type: application/json\r\n",
                    "\r\n",
                    $json
                ),
                (false, Self::$name, Version::Http11) => concat!(
                    "HTTP/1.1 ", $line, "\r\n",
                    "connection: close\r\n",
                    "content-length: 0\r\n\r\n",
                ),
                (true, Self::$name, Version::Http10) => concat!(
                    "HTTP/1.0 ", $line, "\r\n",
                    "connection: close\r\n",
                    "content-length: ", $len, "\r\n",
                    "content-type: application/json\r\n",
                    "\r\n",
                    $json
                ),
                (false, Self::$name, Version::Http10) => concat!(
                    "HTTP/1.0 ", $line, "\r\n",
                    "connection: close\r\n",
                    "content-length: 0\r\n\r\n",
                ),
            )* }.as_bytes()
        }
    };
}

impl ErrorKind {
    http_errors! {
        EmptyStream: StatusCode::BAD_REQUEST, "400 Bad Request", "48"
            => r#"{"error":"Empty request","code":"EMPTY_REQUEST"}"#;

        InvalidStartLine: StatusCode::BAD_REQUEST, "400 Bad Request", "62"
            => r#"{"error":"Malformed request line","code":"INVALID_START_LINE"}"#;
        InvalidMethod: StatusCode::BAD_REQUEST, "400 Bad Request", "55"
            => r#"{"error":"Invalid HTTP method","code":"INVALID_METHOD"}"#;
        UnsupportedVersion: StatusCode::HTTP_VERSION_NOT_SUPPORTED, "505 HTTP Version Not Supported", "67"
            => r#"{"error":"HTTP version not supported","code":"UNSUPPORTED_VERSION"}"#;

        InvalidHeader: StatusCode::BAD_REQUEST, "400 Bad Request", "57"
            => r#"{"error":"Invalid header format","code":"INVALID_HEADER"}"#;
        MissingHost: StatusCode::BAD_REQUEST, "400 Bad Request", "53"
            => r#"{"error":"Missing Host header","code":"MISSING_HOST"}"#;
        InvalidHost: StatusCode::BAD_REQUEST, "400 Bad Request", "53"
            => r#"{"error":"Invalid Host header","code":"INVALID_HOST"}"#;
        MultipleContentLength: StatusCode::BAD_REQUEST, "400 Bad Request", "76"
            => r#"{"error":"Multiple Content-Length headers","code":"MULTIPLE_CONTENT_LENGTH"}"#;
        HeaderTooLarge: StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE, "431 Request Header Fields Too Large", "61"
            => r#"{"error":"Header fields too large","code":"HEADER_TOO_LARGE"}"#;

        BodyTooLarge: StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large", "58"
            => r#"{"error":"Request body too large","code":"BODY_TOO_LARGE"}"#;
        InvalidChunk: StatusCode::BAD_REQUEST, "400 Bad Request", "57"
            => r#"{"error":"Malformed chunked body","code":"INVALID_CHUNK"}"#;

        ServiceUnavailable: StatusCode::SERVICE_UNAVAILABLE, "503 Service Unavailable", "72"
            => r#"{"error":"Service temporarily unavailable","code":"SERVICE_UNAVAILABLE"}"#;
    }
}

/// A protocol fault attributed to the peer that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ClientError {
    pub kind: ErrorKind,
    pub peer: Option<SocketAddr>,
}

impl ClientError {
    pub const fn new(kind: ErrorKind) -> Self {
        Self { kind, peer: None }
    }

    pub fn with_peer(mut self, peer: Option<SocketAddr>) -> Self {
        self.peer = peer;
        self
    }

    #[inline]
    pub const fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

impl From<ErrorKind> for ClientError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("socket stream is closed")]
    Closed,
    #[error("timed out waiting for the peer")]
    Timeout,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("cannot send a request to `{0}`")]
    InvalidUri(String),

    #[error("`{0}` does not resolve to a controller")]
    NotAController(String),
    #[error("`{0}` does not resolve to a middleware")]
    NotAMiddleware(String),
    #[error("nothing is bound to `{0}`")]
    UnresolvedBinding(String),
    #[error("controller `{controller}` has no action `{action}`")]
    UnknownAction { controller: String, action: String },
    #[error("invalid route pattern `{uri}`")]
    InvalidRoute {
        uri: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("view error: {0}")]
    View(String),

    #[error("request handler failed")]
    Handler(#[source] BoxError),
}

impl Error {
    /// Wraps an application error raised by a handler.
    pub fn handler<E: Into<BoxError>>(error: E) -> Self {
        Self::Handler(error.into())
    }

    /// Whether this error only means the peer went away.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::Closed => true,
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::Client(ClientError::new(kind))
    }
}
