use super::{write_message, Io, Reader};
use crate::{
    errors::{Error, ErrorKind},
    http::{
        body::Body,
        headers::HeaderBag,
        response::Response,
        types::{Method, StatusCode, Version},
    },
    limits::TransportLimits,
};
use tokio::io::{AsyncRead, AsyncWrite};

/// What is left of the stream once a response has been sent.
pub enum Handoff<S> {
    /// The stream is still ours; the caller closes it.
    Retained(S),
    /// The stream went to the response's upgrade handler.
    Upgraded,
}

/// Response codec: encodes responses on the server side, decodes them on the client side.
#[derive(Debug, Clone, Default)]
pub struct ResponseTransport {
    limits: TransportLimits,
}

impl ResponseTransport {
    pub fn new(limits: TransportLimits) -> Self {
        Self { limits }
    }

    /// Writes the status line, headers, blank line and body of `response`.
    ///
    /// The body is consumed; an upgrade handler, if any, is left in place.
    pub async fn write<W>(&self, response: &mut Response, stream: &mut W) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin,
    {
        let head = response.head();
        write_message(stream, head, response.take_body(), &self.limits).await
    }

    /// Writes `response` to a request made with `method`, then hands `stream`
    /// to its upgrade handler if it has one.
    ///
    /// Answers to `HEAD` keep their framing headers but go out without a body.
    /// The handler runs to completion before this returns [`Handoff::Upgraded`].
    pub async fn send<S>(
        &self,
        mut response: Response,
        mut stream: S,
        method: Method,
    ) -> Result<Handoff<S>, Error>
    where
        S: Io + 'static,
    {
        let upgrade = response.take_upgrade();
        if method == Method::Head {
            drop(response.take_body());
            write_message(&mut stream, response.head(), Body::Empty, &self.limits).await?;
        } else {
            self.write(&mut response, &mut stream).await?;
        }

        match upgrade {
            Some(handler) => {
                handler(Box::new(stream)).await;
                Ok(Handoff::Upgraded)
            }
            None => Ok(Handoff::Retained(stream)),
        }
    }

    /// Reads one response off `stream`, answering a request made with `method`.
    ///
    /// Responses to `HEAD`, `1xx`, `204` and `304` carry no body. Other
    /// responses without `Content-Length` or chunked framing are read until
    /// the peer closes.
    pub async fn receive<R>(&self, stream: &mut R, method: Method) -> Result<Response, Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = Reader::new(stream, &self.limits);
        let head = reader.read_head().await?;

        let (status_line, raw_headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
        let (version, status) = parse_status_line(status_line)?;
        let headers = HeaderBag::parse(raw_headers)?;

        let bodiless = method == Method::Head
            || status.as_u16() < 200
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED;
        let body = match bodiless {
            true => Body::Empty,
            false => Body::Full(reader.read_body(&headers, true).await?),
        };

        Ok(Response::from_parts(version, status, headers, body))
    }
}

/// Splits `HTTP/VERSION SP CODE [SP REASON]`.
fn parse_status_line(line: &str) -> Result<(Version, StatusCode), ErrorKind> {
    let rest = line.strip_prefix("HTTP/").ok_or(ErrorKind::InvalidStartLine)?;
    let (version, rest) = rest.split_once(' ').ok_or(ErrorKind::InvalidStartLine)?;
    let version = Version::from_bytes(version.as_bytes())?;

    let code = match rest.split_once(' ') {
        Some((code, _reason)) => code,
        None => rest,
    };
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ErrorKind::InvalidStartLine);
    }

    let status = code
        .parse()
        .ok()
        .and_then(StatusCode::from_u16)
        .ok_or(ErrorKind::InvalidStartLine)?;
    Ok((version, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn receive(raw: &str, method: Method) -> Result<Response, Error> {
        ResponseTransport::default()
            .receive(&mut raw.as_bytes(), method)
            .await
    }

    #[tokio::test]
    async fn write_is_byte_exact() {
        let mut response = Response::text("Hello World!");
        let mut out = Vec::new();

        ResponseTransport::default()
            .write(&mut response, &mut out)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 200 OK\r\ncontent-length: 12\r\ncontent-type: text/plain\r\n\r\nHello World!"
        );
    }

    #[tokio::test]
    async fn large_bodies_are_written_whole() {
        let limits = TransportLimits {
            write_chunk: 3,
            ..TransportLimits::default()
        };
        let mut response = Response::new("abcdefgh", StatusCode::OK);
        let mut out = Vec::new();

        ResponseTransport::new(limits)
            .write(&mut response, &mut out)
            .await
            .unwrap();
        assert!(out.ends_with(b"\r\n\r\nabcdefgh"));
    }

    #[tokio::test]
    async fn streamed_response_on_the_wire() {
        let chunks = futures_util::stream::iter(["foo", ""].map(Bytes::from));
        let mut response = Response::streamed(chunks);
        let mut out = Vec::new();

        ResponseTransport::default()
            .write(&mut response, &mut out)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n3\r\nfoo\r\n0\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn send_retains_the_stream() {
        let (server, mut client) = tokio::io::duplex(1024);

        let handoff = ResponseTransport::default()
            .send(Response::not_found(), server, Method::Get)
            .await
            .unwrap();
        let Handoff::Retained(server) = handoff else {
            panic!("plain responses keep the stream");
        };
        drop(server);

        let mut wire = String::new();
        client.read_to_string(&mut wire).await.unwrap();
        assert_eq!(wire, "HTTP/1.1 404 Not Found\r\n\r\n");
    }

    #[tokio::test]
    async fn head_answers_keep_framing_without_a_body() {
        #[rustfmt::skip]
        let cases = [
            (Response::text("Hello World!"), "HTTP/1.1 200 OK\r\ncontent-length: 12\r\ncontent-type: text/plain\r\n\r\n"),
            (Response::streamed(futures_util::stream::iter(["foo"].map(Bytes::from))),
                                             "HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n"),
        ];

        for (response, expected) in cases {
            let (server, mut client) = tokio::io::duplex(1024);
            let handoff = ResponseTransport::default()
                .send(response, server, Method::Head)
                .await
                .unwrap();
            drop(handoff);

            let mut wire = String::new();
            client.read_to_string(&mut wire).await.unwrap();
            assert_eq!(wire, expected);
        }
    }

    #[tokio::test]
    async fn send_hands_the_stream_to_the_upgrade() {
        let (server, mut client) = tokio::io::duplex(1024);
        let mut response = Response::empty(StatusCode::OK);
        response.headers_mut().set("Upgrade", "echo");
        response.upgrade(|mut io| async move {
            let _ = io.write_all(b"upgraded").await;
        });

        let handoff = ResponseTransport::default()
            .send(response, server, Method::Get)
            .await
            .unwrap();
        assert!(matches!(handoff, Handoff::Upgraded));

        let mut wire = String::new();
        client.read_to_string(&mut wire).await.unwrap();
        assert_eq!(
            wire,
            "HTTP/1.1 101 Switching Protocols\r\nupgrade: echo\r\n\r\nupgraded"
        );
    }

    #[tokio::test]
    async fn receive_responses() {
        #[rustfmt::skip]
        let cases = [
            ("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhiXX",               Method::Get,  200, "hi"),
            ("HTTP/1.0 201 Created\r\n\r\nuntil close",                        Method::Post, 201, "until close"),
            ("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nok\r\n0\r\n\r\n", Method::Get, 200, "ok"),
            ("HTTP/1.1 204 No Content\r\n\r\nstray",                           Method::Get,  204, ""),
            ("HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n",                   Method::Head, 200, ""),
            ("HTTP/1.1 299\r\n\r\n",                                           Method::Get,  299, ""),
        ];

        for (raw, method, status, body) in cases {
            let mut response = receive(raw, method).await.unwrap();
            assert_eq!(response.status().as_u16(), status, "{raw:?}");
            assert_eq!(response.take_body().collect().await, Bytes::from(body), "{raw:?}");
        }
    }

    #[tokio::test]
    async fn received_headers_are_kept_verbatim() {
        let response = receive(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1\r\na\r\n0\r\n\r\n",
            Method::Get,
        )
        .await
        .unwrap();

        assert_eq!(response.headers().transfer_encoding(), Some("chunked"));
        assert_eq!(response.headers().get("content-length"), None);
    }

    #[tokio::test]
    async fn malformed_status_lines() {
        #[rustfmt::skip]
        let cases = [
            ("HTTP/1.1 2000 OK",    ErrorKind::InvalidStartLine),
            ("HTTP/1.1 OK",         ErrorKind::InvalidStartLine),
            ("HTTX/1.1 200 OK",     ErrorKind::InvalidStartLine),
            ("HTTP/1.1 099 Low",    ErrorKind::InvalidStartLine),
            ("HTTP/3 200 OK",       ErrorKind::UnsupportedVersion),
        ];

        for (line, expected) in cases {
            let raw = format!("{line}\r\n\r\n");
            match receive(&raw, Method::Get).await {
                Err(Error::Client(err)) => assert_eq!(err.kind, expected, "{line}"),
                other => panic!("{line}: unexpected {other:?}"),
            }
        }
    }
}
