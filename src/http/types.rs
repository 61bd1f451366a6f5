#![allow(rustdoc::bare_urls)]

//! Core HTTP protocol types and utilities

use crate::errors::ErrorKind;
use std::fmt;

// METHOD

/// HTTP request methods
///
/// # References
///
/// - [RFC 7231, Section 4](https://datatracker.ietf.org/doc/html/rfc7231#section-4)
/// - [RFC 5789](https://datatracker.ietf.org/doc/html/rfc5789) (PATCH method)
///
/// [`Method::Any`] never appears on the wire; routes use it to match every method.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method - transfer a current representation of the target resource
    /// [[RFC7231, Section 4.3.1](https://tools.ietf.org/html/rfc7231#section-4.3.1)]
    Get,
    /// PUT method - replace all current representations of the target resource with the request payload
    /// [[RFC7231, Section 4.3.4](https://tools.ietf.org/html/rfc7231#section-4.3.4)]
    Put,
    /// POST method - perform resource-specific processing on the request payload
    /// [[RFC7231, Section 4.3.3](https://tools.ietf.org/html/rfc7231#section-4.3.3)]
    Post,
    /// HEAD method - same as GET but without response body
    /// [[RFC7231, Section 4.3.2](https://tools.ietf.org/html/rfc7231#section-4.3.2)]
    Head,
    /// PATCH method - apply partial modifications to a resource
    /// [[RFC5789, Section 2](https://tools.ietf.org/html/rfc5789#section-2)]
    Patch,
    /// DELETE method - remove all current representations of the target resource
    /// [[RFC7231, Section 4.3.5](https://tools.ietf.org/html/rfc7231#section-4.3.5)]
    Delete,
    /// OPTIONS method - describe the communication options for the target resource
    /// [[RFC7231, Section 4.3.7](https://tools.ietf.org/html/rfc7231#section-4.3.7)]
    Options,
    /// Route wildcard, written `*`
    Any,
}

impl Method {
    #[inline]
    pub(crate) fn from_bytes(src: &[u8]) -> Result<Self, ErrorKind> {
        match src {
            b"GET" => Ok(Method::Get),
            b"PUT" => Ok(Method::Put),
            b"POST" => Ok(Method::Post),
            b"HEAD" => Ok(Method::Head),
            b"PATCH" => Ok(Method::Patch),
            b"DELETE" => Ok(Method::Delete),
            b"OPTIONS" => Ok(Method::Options),
            _ => Err(ErrorKind::InvalidMethod),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Any => "*",
        }
    }

    /// Whether a route registered for `self` accepts a request made with `other`.
    #[inline]
    pub fn accepts(&self, other: Method) -> bool {
        *self == Method::Any || *self == other
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// VERSION

/// HTTP protocol version
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Version {
    /// HTTP/1.0 - Added headers and status codes (1996)
    ///
    /// [RFC 1945](https://tools.ietf.org/html/rfc1945)
    Http10,

    /// HTTP/1.1 - Current standard with keep-alive and chunking (1999)
    ///
    /// [RFC 7230](https://tools.ietf.org/html/rfc7230) and related
    #[default]
    Http11,
}

impl Version {
    /// Parses the part after `HTTP/` of a start line.
    ///
    /// Anything shaped like `DIGITS[.DIGITS]` that is not `1.0`/`1.1` is
    /// well-formed but unsupported.
    pub(crate) fn from_bytes(src: &[u8]) -> Result<Self, ErrorKind> {
        match src {
            b"1.1" => Ok(Version::Http11),
            b"1.0" => Ok(Version::Http10),
            _ if is_version_shaped(src) => Err(ErrorKind::UnsupportedVersion),
            _ => Err(ErrorKind::InvalidStartLine),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "1.0",
            Version::Http11 => "1.1",
        }
    }
}

fn is_version_shaped(src: &[u8]) -> bool {
    let (major, minor) = match src.iter().position(|&b| b == b'.') {
        Some(dot) => (&src[..dot], Some(&src[dot + 1..])),
        None => (src, None),
    };
    let digits = |part: &[u8]| !part.is_empty() && part.iter().all(u8::is_ascii_digit);

    digits(major) && minor.map_or(true, digits)
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}", self.as_str())
    }
}

// STATUS CODE

/// HTTP status code.
///
/// Any three-digit code can be carried; the named constants below also know
/// their reason phrase.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(u16);

macro_rules! status_codes {
    ($( $(#[$docs:meta])* $name:ident = $code:literal, $reason:literal; )*) => {
        impl StatusCode {
            $(
                $(#[$docs])*
                pub const $name: StatusCode = StatusCode($code);
            )*

            /// Canonical reason phrase, if the code is a known one.
            pub const fn canonical_reason(&self) -> Option<&'static str> {
                match self.0 {
                    $( $code => Some($reason), )*
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    /// [[RFC7231, Section 6.2.1](https://tools.ietf.org/html/rfc7231#section-6.2.1)]
    CONTINUE = 100, "Continue";
    /// [[RFC7231, Section 6.2.2](https://tools.ietf.org/html/rfc7231#section-6.2.2)]
    SWITCHING_PROTOCOLS = 101, "Switching Protocols";

    /// [[RFC7231, Section 6.3.1](https://tools.ietf.org/html/rfc7231#section-6.3.1)]
    OK = 200, "OK";
    /// [[RFC7231, Section 6.3.2](https://tools.ietf.org/html/rfc7231#section-6.3.2)]
    CREATED = 201, "Created";
    /// [[RFC7231, Section 6.3.3](https://tools.ietf.org/html/rfc7231#section-6.3.3)]
    ACCEPTED = 202, "Accepted";
    /// [[RFC7231, Section 6.3.5](https://tools.ietf.org/html/rfc7231#section-6.3.5)]
    NO_CONTENT = 204, "No Content";

    /// [[RFC7231, Section 6.4.1](https://tools.ietf.org/html/rfc7231#section-6.4.1)]
    MULTIPLE_CHOICES = 300, "Multiple Choices";
    /// [[RFC7231, Section 6.4.2](https://tools.ietf.org/html/rfc7231#section-6.4.2)]
    MOVED_PERMANENTLY = 301, "Moved Permanently";
    /// [[RFC7231, Section 6.4.3](https://tools.ietf.org/html/rfc7231#section-6.4.3)]
    FOUND = 302, "Found";
    /// [[RFC7231, Section 6.4.4](https://tools.ietf.org/html/rfc7231#section-6.4.4)]
    SEE_OTHER = 303, "See Other";
    /// [[RFC7232, Section 4.1](https://tools.ietf.org/html/rfc7232#section-4.1)]
    NOT_MODIFIED = 304, "Not Modified";
    /// [[RFC7231, Section 6.4.7](https://tools.ietf.org/html/rfc7231#section-6.4.7)]
    TEMPORARY_REDIRECT = 307, "Temporary Redirect";
    /// [[RFC7538, Section 3](https://tools.ietf.org/html/rfc7538#section-3)]
    PERMANENT_REDIRECT = 308, "Permanent Redirect";

    /// [[RFC7231, Section 6.5.1](https://tools.ietf.org/html/rfc7231#section-6.5.1)]
    BAD_REQUEST = 400, "Bad Request";
    /// [[RFC7235, Section 3.1](https://tools.ietf.org/html/rfc7235#section-3.1)]
    UNAUTHORIZED = 401, "Unauthorized";
    /// [[RFC7231, Section 6.5.3](https://tools.ietf.org/html/rfc7231#section-6.5.3)]
    FORBIDDEN = 403, "Forbidden";
    /// [[RFC7231, Section 6.5.4](https://tools.ietf.org/html/rfc7231#section-6.5.4)]
    NOT_FOUND = 404, "Not Found";
    /// [[RFC7231, Section 6.5.5](https://tools.ietf.org/html/rfc7231#section-6.5.5)]
    METHOD_NOT_ALLOWED = 405, "Method Not Allowed";
    /// [[RFC7231, Section 6.5.6](https://tools.ietf.org/html/rfc7231#section-6.5.6)]
    NOT_ACCEPTABLE = 406, "Not Acceptable";
    /// [[RFC7231, Section 6.5.7](https://tools.ietf.org/html/rfc7231#section-6.5.7)]
    REQUEST_TIMEOUT = 408, "Request Timeout";
    /// [[RFC7231, Section 6.5.8](https://tools.ietf.org/html/rfc7231#section-6.5.8)]
    CONFLICT = 409, "Conflict";
    /// [[RFC7231, Section 6.5.9](https://tools.ietf.org/html/rfc7231#section-6.5.9)]
    GONE = 410, "Gone";
    /// [[RFC7231, Section 6.5.10](https://tools.ietf.org/html/rfc7231#section-6.5.10)]
    LENGTH_REQUIRED = 411, "Length Required";
    /// [[RFC7231, Section 6.5.11](https://tools.ietf.org/html/rfc7231#section-6.5.11)]
    PAYLOAD_TOO_LARGE = 413, "Payload Too Large";
    /// [[RFC7231, Section 6.5.12](https://tools.ietf.org/html/rfc7231#section-6.5.12)]
    URI_TOO_LONG = 414, "URI Too Long";
    /// [[RFC7231, Section 6.5.13](https://tools.ietf.org/html/rfc7231#section-6.5.13)]
    UNSUPPORTED_MEDIA_TYPE = 415, "Unsupported Media Type";
    /// [[RFC4918](https://tools.ietf.org/html/rfc4918)]
    UNPROCESSABLE_ENTITY = 422, "Unprocessable Entity";
    /// [[RFC6585, Section 4](https://tools.ietf.org/html/rfc6585#section-4)]
    TOO_MANY_REQUESTS = 429, "Too Many Requests";
    /// [[RFC6585, Section 5](https://tools.ietf.org/html/rfc6585#section-5)]
    REQUEST_HEADER_FIELDS_TOO_LARGE = 431, "Request Header Fields Too Large";

    /// [[RFC7231, Section 6.6.1](https://tools.ietf.org/html/rfc7231#section-6.6.1)]
    INTERNAL_SERVER_ERROR = 500, "Internal Server Error";
    /// [[RFC7231, Section 6.6.2](https://tools.ietf.org/html/rfc7231#section-6.6.2)]
    NOT_IMPLEMENTED = 501, "Not Implemented";
    /// [[RFC7231, Section 6.6.3](https://tools.ietf.org/html/rfc7231#section-6.6.3)]
    BAD_GATEWAY = 502, "Bad Gateway";
    /// [[RFC7231, Section 6.6.4](https://tools.ietf.org/html/rfc7231#section-6.6.4)]
    SERVICE_UNAVAILABLE = 503, "Service Unavailable";
    /// [[RFC7231, Section 6.6.5](https://tools.ietf.org/html/rfc7231#section-6.6.5)]
    GATEWAY_TIMEOUT = 504, "Gateway Timeout";
    /// [[RFC7231, Section 6.6.6](https://tools.ietf.org/html/rfc7231#section-6.6.6)]
    HTTP_VERSION_NOT_SUPPORTED = 505, "HTTP Version Not Supported";
}

impl StatusCode {
    /// Accepts any code in `100..=999`.
    pub const fn from_u16(code: u16) -> Option<Self> {
        match code {
            100..=999 => Some(StatusCode(code)),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Reason phrase written on the status line; unknown codes get an empty one.
    pub const fn reason(&self) -> &'static str {
        match self.canonical_reason() {
            Some(reason) => reason,
            None => "",
        }
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::OK
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason())
    }
}

// CONTENT TYPE

/// Canonical content types and the extension table used for format negotiation.
pub struct ContentType;

impl ContentType {
    pub const HEADER: &'static str = "content-type";

    pub const BIN: &'static str = "application/octet-stream";
    pub const CSS: &'static str = "text/css";
    pub const CSV: &'static str = "text/csv";
    pub const HTML: &'static str = "text/html";
    pub const JS: &'static str = "text/javascript";
    pub const JSON: &'static str = "application/json";
    pub const JSONLD: &'static str = "application/ld+json";
    pub const PHP: &'static str = "application/x-httpd-php";
    pub const TXT: &'static str = "text/plain";
    pub const XML: &'static str = "application/xml";

    /// Maps a format extension (with or without the leading dot) to its content type.
    pub fn from_extension(extension: &str) -> Option<&'static str> {
        match extension.trim_start_matches('.') {
            "csv" => Some(Self::CSV),
            "json" => Some(Self::JSON),
            "jsonld" => Some(Self::JSONLD),
            "html" => Some(Self::HTML),
            "php" => Some(Self::PHP),
            "xml" => Some(Self::XML),
            _ => None,
        }
    }

    /// Canonical constant for a media type, ignoring parameters and case.
    pub fn from_media_type(value: &str) -> Option<&'static str> {
        let essence = Self::essence(value);
        [
            Self::BIN,
            Self::CSS,
            Self::CSV,
            Self::HTML,
            Self::JS,
            Self::JSON,
            Self::JSONLD,
            Self::PHP,
            Self::TXT,
            Self::XML,
        ]
        .into_iter()
        .find(|known| *known == essence)
    }

    /// Media type without parameters, lower-cased: `Text/HTML; charset=utf-8` -> `text/html`.
    pub fn essence(value: &str) -> String {
        value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }
}

// URI

/// Destination of a request, reconstructed from the start line and `Host`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Uri {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl Uri {
    /// Parses `scheme://host[:port][/path][?query][#fragment]`.
    ///
    /// Only the shape needed to address an HTTP peer is understood; userinfo
    /// is not supported.
    pub fn parse(value: &str) -> Option<Self> {
        let (scheme, rest) = value.split_once("://")?;
        let (rest, fragment) = match rest.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (rest, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query.to_string())),
            None => (rest, None),
        };
        let (authority, path) = match rest.find('/') {
            Some(index) => (&rest[..index], &rest[index..]),
            None => (rest, "/"),
        };
        let (host, port) = split_authority(authority)?;

        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_string(),
            port,
            path: path.to_string(),
            query,
            fragment,
        })
    }

    /// Request target as written on a request line: `path[?query]`.
    pub fn target(&self) -> String {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        match &self.query {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }

    /// Explicit port, or the scheme's default one.
    pub fn port_or_default(&self) -> u16 {
        self.port
            .unwrap_or(if self.scheme == "https" { 443 } else { 80 })
    }
}

fn split_authority(authority: &str) -> Option<(&str, Option<u16>)> {
    if authority.is_empty() {
        return None;
    }

    let split = match authority.strip_prefix('[') {
        Some(rest) => rest.find(']').map(|end| end + 2),
        None => authority.find(':'),
    };

    match split {
        Some(index) if index < authority.len() => {
            let port = authority[index..].strip_prefix(':')?.parse().ok()?;
            Some((&authority[..index], Some(port)))
        }
        _ => Some((authority, None)),
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        f.write_str(&self.target())?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}
