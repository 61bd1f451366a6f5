//! Middleware every router installs, outermost first:
//! [`HandleErrors`], [`LogRequest`], [`Compression`], [`AddServerHeader`], [`AddFrameGuard`].

use super::{Middleware, Next};
use crate::{
    errors::Error,
    http::{request::Request, response::Response},
    transport::is_chunked,
    BoxFuture,
};
use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression as Level,
};
use std::{
    error::Error as StdError,
    fmt::Write,
    io::{self, Write as _},
    sync::Arc,
    time::Instant,
};

/// The global middleware, in the order they wrap each request.
pub fn defaults() -> Vec<Arc<dyn Middleware>> {
    vec![
        Arc::new(HandleErrors),
        Arc::new(LogRequest),
        Arc::new(Compression::standard()),
        Arc::new(AddServerHeader::default()),
        Arc::new(AddFrameGuard),
    ]
}

/// Logs errors escaping the chain, with their whole source chain, and
/// passes them on unchanged.
///
/// No response is made up here: the connection driver decides what happens
/// to the socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandleErrors;

impl Middleware for HandleErrors {
    fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
        Box::pin(async move {
            let method = request.method();
            let path = request.path().to_string();

            next.run(request).await.map_err(|err| {
                tracing::error!(
                    %method,
                    %path,
                    error = %err,
                    chain = %source_chain(&err),
                    "unhandled error while handling request"
                );
                err
            })
        })
    }
}

fn source_chain(err: &dyn StdError) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let _ = write!(chain, ": {cause}");
        source = cause.source();
    }
    chain
}

/// Logs one line per answered request on the `kiln::http` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequest;

impl Middleware for LogRequest {
    fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = request.method();
            let path = request.path().to_string();

            let response = next.run(request).await?;

            let elapsed = format!("{:.2}", start.elapsed().as_secs_f64() * 1000.0);
            let status = response.status().as_u16();
            tracing::info!(
                target: "kiln::http",
                %method,
                %path,
                elapsed_ms = %elapsed,
                status,
                "{method} {path} ({elapsed} ms) - HTTP {status}"
            );

            Ok(response)
        })
    }
}

/// A body codec usable by [`Compression`].
pub trait ContentEncoder: Send + Sync {
    fn encode(&self, body: &[u8]) -> io::Result<Vec<u8>>;
}

impl<F> ContentEncoder for F
where
    F: Fn(&[u8]) -> io::Result<Vec<u8>> + Send + Sync,
{
    fn encode(&self, body: &[u8]) -> io::Result<Vec<u8>> {
        self(body)
    }
}

/// `gzip` at the default compression level.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gzip;

impl ContentEncoder for Gzip {
    fn encode(&self, body: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Level::default());
        encoder.write_all(body)?;
        encoder.finish()
    }
}

/// `deflate` (raw DEFLATE stream) at the default compression level.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deflate;

impl ContentEncoder for Deflate {
    fn encode(&self, body: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::with_capacity(body.len() / 2), Level::default());
        encoder.write_all(body)?;
        encoder.finish()
    }
}

/// Encodes response bodies with the heaviest `Accept-Encoding` coding that
/// has a registered encoder.
///
/// `*` picks the first registered encoder. Chunked responses, responses that
/// already carry `Content-Encoding` and requests without a usable coding pass
/// through untouched.
#[derive(Clone, Default)]
pub struct Compression {
    encoders: Vec<(String, Arc<dyn ContentEncoder>)>,
}

impl Compression {
    /// No encoders; register them with [`with_encoder`](Self::with_encoder).
    pub fn new() -> Self {
        Self::default()
    }

    /// [`Gzip`] then [`Deflate`], as installed by [`defaults`].
    pub fn standard() -> Self {
        Self::new().with_encoder("gzip", Gzip).with_encoder("deflate", Deflate)
    }

    /// Registers `encoder` for the content coding `name` (e.g. `gzip`).
    pub fn with_encoder(mut self, name: &str, encoder: impl ContentEncoder + 'static) -> Self {
        self.encoders
            .push((name.to_ascii_lowercase(), Arc::new(encoder)));
        self
    }

    fn select(&self, request: &Request) -> Option<usize> {
        let accepted = request.headers().weighted("accept-encoding");

        accepted
            .iter()
            .filter(|entry| entry.weight > 0.0)
            .find_map(|entry| self.encoders.iter().position(|(name, _)| *name == entry.value))
            .or_else(|| {
                let wildcard = accepted.iter().any(|entry| entry.value == "*" && entry.weight > 0.0);
                (wildcard && !self.encoders.is_empty()).then_some(0)
            })
    }
}

impl Middleware for Compression {
    fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
        Box::pin(async move {
            let selected = self.select(&request);
            let mut response = next.run(request).await?;

            let Some(index) = selected else {
                return Ok(response);
            };
            if is_chunked(response.headers()) || response.headers().content_encoding().is_some() {
                return Ok(response);
            }

            let (name, encoder) = &self.encoders[index];
            let content = response.take_body().collect().await;
            match encoder.encode(&content) {
                Ok(encoded) => {
                    response.set_body(encoded);
                    response.headers_mut().set("content-encoding", name);
                }
                Err(err) => {
                    tracing::warn!(encoding = %name, error = %err, "failed to encode response body");
                    response.set_body(content);
                }
            }

            Ok(response)
        })
    }
}

/// Sets the `Server` header.
#[derive(Debug, Clone)]
pub struct AddServerHeader {
    name: String,
}

impl AddServerHeader {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for AddServerHeader {
    fn default() -> Self {
        Self::new("kiln")
    }
}

impl Middleware for AddServerHeader {
    fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
        Box::pin(async move {
            let mut response = next.run(request).await?;
            response.headers_mut().set("server", &self.name);
            Ok(response)
        })
    }
}

/// Adds `X-Frame-Options: SAMEORIGIN` unless the response already has the header.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddFrameGuard;

impl Middleware for AddFrameGuard {
    fn handle<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, Result<Response, Error>> {
        Box::pin(async move {
            let mut response = next.run(request).await?;
            response
                .headers_mut()
                .set_with("x-frame-options", "SAMEORIGIN", false);
            Ok(response)
        })
    }
}
