//! Minimal plain-HTTP client built on the two codecs.
//!
//! Every call opens a fresh connection, writes one request, reads one
//! response and closes the socket. TLS is not supported: only `http://`
//! targets are accepted.

use crate::{
    errors::Error,
    http::{
        headers::HeaderBag,
        request::Request,
        response::Response,
        types::{ContentType, Method, Uri},
    },
    limits::ClientLimits,
    transport::{RequestTransport, ResponseTransport},
};
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use std::{fmt, time::Duration};
use tokio::{io::AsyncWriteExt, net::TcpStream};

const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Sends requests prepared from a shared set of headers, query parameters
/// and body.
///
/// # Examples
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), kiln::Error> {
/// use kiln::client::HttpClient;
/// use std::time::Duration;
///
/// let mut response = HttpClient::new()
///     .accepts_json()
///     .query("page", 2)
///     .timeout(Duration::from_secs(5))
///     .get("http://127.0.0.1:8080/articles")
///     .await?;
///
/// assert!(response.is_successful());
/// let body = response.take_body().collect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    limits: ClientLimits,
    headers: HeaderBag,
    query: Vec<(String, String)>,
    body: Bytes,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ClientLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    #[inline]
    pub fn limits(&self) -> &ClientLimits {
        &self.limits
    }

    /// Sets the `Accept` header.
    pub fn accepts(self, content_type: &str) -> Self {
        self.header("accept", content_type)
    }

    pub fn accepts_json(self) -> Self {
        self.accepts(ContentType::JSON)
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, content_type: &str) -> Self {
        self.header("content-type", content_type)
    }

    /// Sets a header, replacing any previous value.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn headers<I, N, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in headers {
            self.headers.set(name.as_ref(), value.as_ref());
        }
        self
    }

    /// Appends a query parameter; names and values are percent-encoded.
    pub fn query(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Sets the request body together with its `Content-Type`.
    pub fn body(mut self, body: impl Into<Bytes>, content_type: &str) -> Self {
        self.body = body.into();
        self.content_type(content_type)
    }

    /// Upper bound for one whole exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.limits.timeout = timeout;
        self
    }

    pub async fn get(&self, uri: &str) -> Result<Response, Error> {
        self.call(Method::Get, uri).await
    }

    /// Sends `data` as a JSON body.
    pub async fn post<T: Serialize + ?Sized>(&self, uri: &str, data: &T) -> Result<Response, Error> {
        let body = serde_json::to_vec(data)?;
        self.clone()
            .body(body, ContentType::JSON)
            .call(Method::Post, uri)
            .await
    }

    pub async fn put(&self, uri: &str) -> Result<Response, Error> {
        self.call(Method::Put, uri).await
    }

    pub async fn patch(&self, uri: &str) -> Result<Response, Error> {
        self.call(Method::Patch, uri).await
    }

    pub async fn delete(&self, uri: &str) -> Result<Response, Error> {
        self.call(Method::Delete, uri).await
    }

    pub async fn head(&self, uri: &str) -> Result<Response, Error> {
        self.call(Method::Head, uri).await
    }

    pub async fn options(&self, uri: &str) -> Result<Response, Error> {
        self.call(Method::Options, uri).await
    }

    /// Sends the prepared request with an arbitrary method.
    pub async fn call(&self, method: Method, uri: &str) -> Result<Response, Error> {
        let request = self.prepare(method, uri)?;
        self.send(request).await
    }

    /// Sends `request` as is, adding `Host` when it has none.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUri`] for anything but an `http://` target
    /// - [`Error::Timeout`] when the exchange outlives the client timeout
    /// - I/O and protocol errors of the exchange itself
    pub async fn send(&self, mut request: Request) -> Result<Response, Error> {
        let uri = request.uri().clone();
        if uri.scheme != "http" {
            return Err(Error::InvalidUri(uri.to_string()));
        }

        if request.headers().host().is_none() {
            let host = match uri.port {
                Some(port) => format!("{}:{port}", uri.host),
                None => uri.host.clone(),
            };
            request.headers_mut().set("host", &host);
        }

        tracing::debug!(method = %request.method(), uri = %uri, "sending request");

        let exchange = async {
            let host = uri.host.trim_start_matches('[').trim_end_matches(']');
            let mut stream = TcpStream::connect((host, uri.port_or_default())).await?;
            stream.set_nodelay(self.limits.nodelay)?;

            RequestTransport::new(self.limits.transport.clone())
                .send(&request, &mut stream)
                .await?;
            let response = ResponseTransport::new(self.limits.transport.clone())
                .receive(&mut stream, request.method())
                .await;

            let _ = stream.shutdown().await;
            response
        };

        let response = tokio::time::timeout(self.limits.timeout, exchange)
            .await
            .map_err(|_| Error::Timeout)??;

        tracing::debug!(uri = %uri, status = response.status().as_u16(), "response received");
        Ok(response)
    }

    fn prepare(&self, method: Method, uri: &str) -> Result<Request, Error> {
        let mut target = Uri::parse(uri).ok_or_else(|| Error::InvalidUri(uri.to_string()))?;

        if !self.query.is_empty() {
            let extra = self
                .query
                .iter()
                .map(|(name, value)| {
                    format!("{}={}", utf8_percent_encode(name, QUERY), utf8_percent_encode(value, QUERY))
                })
                .collect::<Vec<_>>()
                .join("&");

            target.query = match target.query.take() {
                Some(query) if !query.is_empty() => Some(format!("{query}&{extra}")),
                _ => Some(extra),
            };
        }

        let mut builder = Request::builder(method, &target.target()).uri(target);
        if !self.body.is_empty() {
            builder = builder.body(self.body.clone());
        }

        let mut request = builder.build();
        for (name, value) in self.headers.iter() {
            for value in value.iter() {
                request.headers_mut().add(name, value);
            }
        }
        Ok(request)
    }
}
