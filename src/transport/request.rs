use super::{write_message, Addresses, Reader};
use crate::{
    errors::{Error, ErrorKind},
    http::{
        body::Body,
        headers::HeaderBag,
        request::{split_target, Request},
        types::{Method, Uri, Version},
    },
    limits::TransportLimits,
};
use memchr::memchr_iter;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncRead, AsyncWrite};

static HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<host>[a-z\d._\-]+|\[[\da-f:.]+\])(?::(?P<port>[1-9]\d*))?$")
        .expect("host pattern compiles")
});

/// Request codec: decodes requests on the server side, encodes them on the client side.
#[derive(Debug, Clone, Default)]
pub struct RequestTransport {
    limits: TransportLimits,
}

impl RequestTransport {
    pub fn new(limits: TransportLimits) -> Self {
        Self { limits }
    }

    #[inline]
    pub fn limits(&self) -> &TransportLimits {
        &self.limits
    }

    /// Reads one request off `stream`.
    ///
    /// Protocol faults come back as [`Error::Client`] tagged with `addresses.peer`.
    pub async fn receive<R>(&self, stream: &mut R, addresses: Addresses) -> Result<Request, Error>
    where
        R: AsyncRead + Unpin,
    {
        self.decode(stream, addresses).await.map_err(|err| match err {
            Error::Client(err) => Error::Client(err.with_peer(addresses.peer)),
            other => other,
        })
    }

    async fn decode<R>(&self, stream: &mut R, addresses: Addresses) -> Result<Request, Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = Reader::new(stream, &self.limits);
        let head = reader.read_head().await?;

        let (start_line, raw_headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
        let (method, target, version) = parse_request_line(start_line)?;
        let headers = HeaderBag::parse(raw_headers)?;

        let host = headers.host().ok_or(ErrorKind::MissingHost)?;
        let (host, port) = parse_host(host)?;
        let (path, query) = split_target(target);
        let uri = Uri {
            scheme: "http".into(),
            host,
            port: port.or(addresses.local.map(|local| local.port())),
            path,
            query,
            fragment: None,
        };

        let body = reader.read_body(&headers, false).await?;

        Ok(Request::from_parts(
            method,
            uri,
            version,
            headers,
            body,
            addresses.peer,
        ))
    }

    /// Writes `request` onto `stream`: request line, headers, blank line, body.
    pub async fn send<W>(&self, request: &Request, stream: &mut W) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin,
    {
        let mut head = format!(
            "{} {} {}",
            request.method(),
            request.uri().target(),
            request.version()
        );
        if !request.headers().is_empty() {
            head.push_str("\r\n");
            head.push_str(&request.headers().serialize());
        }

        let body = match request.body().is_empty() {
            true => Body::Empty,
            false => Body::Full(request.body().clone()),
        };
        write_message(stream, head, body, &self.limits).await
    }
}

/// Splits `METHOD SP TARGET SP HTTP/VERSION`.
fn parse_request_line(line: &str) -> Result<(Method, &str, Version), ErrorKind> {
    let bytes = line.as_bytes();
    let mut spaces = memchr_iter(b' ', bytes);

    let (Some(first), Some(second), None) = (spaces.next(), spaces.next(), spaces.next()) else {
        return Err(ErrorKind::InvalidStartLine);
    };

    let target = &line[first + 1..second];
    if first == 0 || target.is_empty() || target.bytes().any(|b| b.is_ascii_whitespace()) {
        return Err(ErrorKind::InvalidStartLine);
    }

    let version = bytes[second + 1..]
        .strip_prefix(b"HTTP/")
        .ok_or(ErrorKind::InvalidStartLine)?;

    Ok((
        Method::from_bytes(&bytes[..first])?,
        target,
        Version::from_bytes(version)?,
    ))
}

/// Validates a `Host` value and splits off its port.
fn parse_host(value: &str) -> Result<(String, Option<u16>), ErrorKind> {
    let captures = HOST.captures(value).ok_or(ErrorKind::InvalidHost)?;
    let port = match captures.name("port") {
        Some(port) => Some(port.as_str().parse().map_err(|_| ErrorKind::InvalidHost)?),
        None => None,
    };

    Ok((captures["host"].to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::net::SocketAddr;

    const LOCAL: &str = "127.0.0.1:8080";
    const PEER: &str = "10.0.0.7:51000";

    fn addresses() -> Addresses {
        Addresses {
            local: Some(LOCAL.parse().unwrap()),
            peer: Some(PEER.parse().unwrap()),
        }
    }

    async fn receive(raw: &str) -> Result<Request, Error> {
        receive_with(raw, TransportLimits::default()).await
    }

    async fn receive_with(raw: &str, limits: TransportLimits) -> Result<Request, Error> {
        let mut stream = raw.as_bytes();
        RequestTransport::new(limits).receive(&mut stream, addresses()).await
    }

    fn kind(result: Result<Request, Error>) -> ErrorKind {
        match result {
            Err(Error::Client(err)) => err.kind,
            other => panic!("expected a client error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn decodes_a_request() {
        let request = receive(
            "\r\nPOST /users?sort=name HTTP/1.1\r\nHost: example.com\r\n\
             Content-Type: application/json\r\nContent-Length: 13\r\n\r\n{\"name\":\"a\"}!",
        )
        .await
        .unwrap();

        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.version(), Version::Http11);
        assert_eq!(request.path(), "/users");
        assert_eq!(request.query(), Some("sort=name"));
        assert_eq!(request.host(), "example.com");
        assert_eq!(request.uri().port, Some(8080));
        assert_eq!(request.uri().scheme, "http");
        assert_eq!(request.body(), &Bytes::from("{\"name\":\"a\"}!"));
        assert_eq!(request.peer(), Some(PEER.parse::<SocketAddr>().unwrap()));
    }

    #[tokio::test]
    async fn host_header() {
        #[rustfmt::skip]
        let cases = [
            ("Host: example.com",       Ok(("example.com", Some(8080)))),
            ("Host: Example.COM:81",    Ok(("Example.COM", Some(81)))),
            ("Host: [::1]:3000",        Ok(("[::1]", Some(3000)))),
            ("Host: 10.0.0.1",          Ok(("10.0.0.1", Some(8080)))),
            ("Host: a.com:0",           Err(ErrorKind::InvalidHost)),
            ("Host: a.com:99999",       Err(ErrorKind::InvalidHost)),
            ("Host: bad host",          Err(ErrorKind::InvalidHost)),
            ("Host: a.com/path",        Err(ErrorKind::InvalidHost)),
            ("Accept: */*",             Err(ErrorKind::MissingHost)),
        ];

        for (header, expected) in cases {
            let raw = format!("GET / HTTP/1.1\r\n{header}\r\n\r\n");
            let result = receive(&raw).await;

            match expected {
                Ok((host, port)) => {
                    let request = result.unwrap();
                    assert_eq!((request.host(), request.uri().port), (host, port), "{header}");
                }
                Err(expected) => assert_eq!(kind(result), expected, "{header}"),
            }
        }
    }

    #[tokio::test]
    async fn start_line() {
        #[rustfmt::skip]
        let cases = [
            ("GET / HTTP/1.0",            Ok((Method::Get, Version::Http10))),
            ("DELETE /a/b HTTP/1.1",      Ok((Method::Delete, Version::Http11))),
            ("GET / HTTP/2.0",            Err(ErrorKind::UnsupportedVersion)),
            ("GET / HTTP/1.1 extra",      Err(ErrorKind::InvalidStartLine)),
            ("GET /  HTTP/1.1",           Err(ErrorKind::InvalidStartLine)),
            ("GET / FTP/1.1",             Err(ErrorKind::InvalidStartLine)),
            (" / HTTP/1.1",               Err(ErrorKind::InvalidStartLine)),
            ("GET /",                     Err(ErrorKind::InvalidStartLine)),
            ("BREW / HTTP/1.1",           Err(ErrorKind::InvalidMethod)),
        ];

        for (line, expected) in cases {
            let raw = format!("{line}\r\nHost: a\r\n\r\n");
            let result = receive(&raw).await;

            match expected {
                Ok((method, version)) => {
                    let request = result.unwrap();
                    assert_eq!((request.method(), request.version()), (method, version), "{line}");
                }
                Err(expected) => assert_eq!(kind(result), expected, "{line}"),
            }
        }
    }

    #[tokio::test]
    async fn ceilings() {
        let huge_header = format!("GET / HTTP/1.1\r\nHost: a\r\nX: {}\r\n\r\n", "v".repeat(5000));
        assert_eq!(kind(receive(&huge_header).await), ErrorKind::HeaderTooLarge);

        let huge_body = "POST / HTTP/1.1\r\nHost: a\r\nContent-Length: 999999\r\n\r\nabc";
        assert_eq!(kind(receive(huge_body).await), ErrorKind::BodyTooLarge);

        let doubled = "POST / HTTP/1.1\r\nHost: a\r\nContent-Length: 1\r\nContent-Length: 1\r\n\r\na";
        assert_eq!(kind(receive(doubled).await), ErrorKind::MultipleContentLength);
    }

    #[tokio::test]
    async fn client_errors_carry_the_peer() {
        match receive("GET / HTTP/1.1\r\n\r\n").await {
            Err(Error::Client(err)) => {
                assert_eq!(err.kind, ErrorKind::MissingHost);
                assert_eq!(err.peer, addresses().peer);
                assert_eq!(err.status().as_u16(), 400);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn bodies() {
        #[rustfmt::skip]
        let cases = [
            ("Content-Length: 5\r\n\r\nhello",               "hello"),
            ("Content-Length: 50\r\n\r\npartial",            "partial"),
            ("Content-Length: ten\r\n\r\nignored",           ""),
            ("\r\nignored",                                  ""),
            ("Transfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n", "Wikipedia"),
        ];

        for (tail, expected) in cases {
            let raw = format!("POST /upload HTTP/1.1\r\nHost: a\r\n{tail}");
            let request = receive(&raw).await.unwrap();
            assert_eq!(request.body(), &Bytes::from(expected), "{tail:?}");
        }
    }

    #[tokio::test]
    async fn chunked_body_over_ceiling() {
        let limits = TransportLimits {
            body_size: 4,
            ..TransportLimits::default()
        };
        let raw = "POST / HTTP/1.1\r\nHost: a\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n3\r\ndef\r\n0\r\n\r\n";

        assert_eq!(kind(receive_with(raw, limits).await), ErrorKind::BodyTooLarge);
    }

    #[tokio::test]
    async fn send_writes_wire_format() {
        let request = Request::builder(Method::Put, "/items/1?force=true")
            .header("Host", "example.com")
            .body("data")
            .build();
        let mut out = Vec::new();

        RequestTransport::default().send(&request, &mut out).await.unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "PUT /items/1?force=true HTTP/1.1\r\nhost: example.com\r\ncontent-length: 4\r\n\r\ndata"
        );
    }

    #[tokio::test]
    async fn sent_request_decodes_back() {
        let request = Request::builder(Method::Get, "/search?q=kiln")
            .header("Host", "localhost:9000")
            .header("Accept", "application/json")
            .build();
        let mut wire = Vec::new();
        RequestTransport::default().send(&request, &mut wire).await.unwrap();

        let decoded = RequestTransport::default()
            .receive(&mut wire.as_slice(), Addresses::default())
            .await
            .unwrap();
        assert_eq!(decoded.path(), "/search");
        assert_eq!(decoded.query(), Some("q=kiln"));
        assert_eq!(decoded.uri().port, Some(9000));
        assert_eq!(decoded.headers().accept(), Some("application/json"));
    }
}
