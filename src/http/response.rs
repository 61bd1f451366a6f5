use crate::{
    errors::Error,
    http::{
        body::Body,
        headers::HeaderBag,
        types::{ContentType, StatusCode, Version},
    },
    transport::{chunked, Io},
    BoxFuture,
};
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::fmt;

/// Takes over the socket once an upgraded response has been written.
pub type UpgradeHandler = Box<dyn FnOnce(Box<dyn Io>) -> BoxFuture<'static, ()> + Send>;

/// A structured HTTP response.
///
/// # Body and `Content-Length`
///
/// | Body set with                      | `Content-Length`             |
/// |------------------------------------|------------------------------|
/// | [`set_body`](Self::set_body)       | set to the buffer length     |
/// | [`set_stream`](Self::set_stream)   | removed                      |
/// | [`streamed`](Self::streamed)       | removed, body is chunked     |
///
/// # Examples
/// ```
/// use kiln::{Response, StatusCode};
///
/// let response = Response::text("Hello World!");
/// assert_eq!(response.status(), StatusCode::OK);
/// assert_eq!(response.headers().get("content-length"), Some("12"));
/// assert_eq!(response.headers().get("content-type"), Some("text/plain"));
/// ```
pub struct Response {
    status: StatusCode,
    headers: HeaderBag,
    body: Body,
    version: Version,
    on_upgrade: Option<UpgradeHandler>,
}

impl Response {
    /// Response with `status`, no headers and no body.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderBag::new(),
            body: Body::Empty,
            version: Version::Http11,
            on_upgrade: None,
        }
    }

    /// Response exactly as decoded off the wire; `Content-Length` is not recomputed.
    pub(crate) fn from_parts(
        version: Version,
        status: StatusCode,
        headers: HeaderBag,
        body: Body,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            version,
            on_upgrade: None,
        }
    }

    pub fn new(body: impl Into<Body>, status: StatusCode) -> Self {
        let mut response = Self::empty(status);
        response.set_body(body);
        response
    }

    /// `307 Temporary Redirect` to `url`.
    pub fn redirect(url: &str) -> Self {
        Self::redirect_with(url, StatusCode::TEMPORARY_REDIRECT)
    }

    pub fn redirect_with(url: &str, status: StatusCode) -> Self {
        let mut response = Self::empty(status);
        response.headers.set("location", url);
        response
    }

    /// Serializes `content` into an `application/json` response.
    pub fn json<T: Serialize + ?Sized>(content: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(content)?;
        Ok(Self::text_with(body, ContentType::JSON))
    }

    pub fn html(content: impl Into<Body>) -> Self {
        Self::text_with(content, ContentType::HTML)
    }

    /// `text/plain` response.
    pub fn text(content: impl Into<Body>) -> Self {
        Self::text_with(content, ContentType::TXT)
    }

    pub fn text_with(content: impl Into<Body>, content_type: &str) -> Self {
        let mut response = Self::new(content, StatusCode::OK);
        response.set_content_type(content_type);
        response
    }

    pub fn not_found() -> Self {
        Self::empty(StatusCode::NOT_FOUND)
    }

    /// Chunked response whose body is produced by `chunks`.
    ///
    /// Empty chunks are skipped so that only the terminal chunk has size zero.
    pub fn streamed<S>(chunks: S) -> Self
    where
        S: Stream<Item = Bytes> + Send + 'static,
    {
        let framed = chunks
            .filter(|chunk| std::future::ready(!chunk.is_empty()))
            .map(|chunk| chunked::encode_chunk(&chunk))
            .chain(stream::once(async { Bytes::from_static(chunked::LAST_CHUNK) }));

        let mut response = Self::empty(StatusCode::OK);
        response.set_stream(Body::stream(framed));
        response.headers.set("transfer-encoding", "chunked");
        response
    }

    #[inline]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    #[inline]
    pub fn headers(&self) -> &HeaderBag {
        &self.headers
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderBag {
        &mut self.headers
    }

    #[inline]
    pub const fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) -> &mut Self {
        self.version = version;
        self
    }

    pub fn set_content_type(&mut self, content_type: &str) -> &mut Self {
        self.headers.set(ContentType::HEADER, content_type);
        self
    }

    #[inline]
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    /// Replaces the body; buffered bodies also set `Content-Length`.
    pub fn set_body(&mut self, body: impl Into<Body>) -> &mut Self {
        let body = body.into();
        match body.len() {
            Some(len) => {
                self.headers.set("content-length", &len.to_string());
            }
            None => {
                self.headers.remove("content-length");
            }
        }
        self.body = body;
        self
    }

    /// Replaces the body with a stream of unknown length.
    pub fn set_stream(&mut self, body: Body) -> &mut Self {
        self.headers.remove("content-length");
        self.body = body;
        self
    }

    /// Switches to `101 Switching Protocols`; `handler` receives the socket
    /// once this response is on the wire.
    pub fn upgrade<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: FnOnce(Box<dyn Io>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.on_upgrade = Some(Box::new(move |io| Box::pin(handler(io))));
        self.status = StatusCode::SWITCHING_PROTOCOLS;
        self
    }

    pub fn is_upgrade(&self) -> bool {
        self.on_upgrade.is_some()
    }

    pub(crate) fn take_upgrade(&mut self) -> Option<UpgradeHandler> {
        self.on_upgrade.take()
    }

    #[inline]
    pub const fn is_successful(&self) -> bool {
        self.status.is_success()
    }

    /// Status line and headers as they go on the wire, without the blank line.
    pub(crate) fn head(&self) -> String {
        let mut head = format!(
            "HTTP/{} {} {}",
            self.version.as_str(),
            self.status.as_u16(),
            self.status.reason()
        );
        if !self.headers.is_empty() {
            head.push_str("\r\n");
            head.push_str(&self.headers.serialize());
        }
        head
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::empty(StatusCode::OK)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("version", &self.version)
            .field("upgrade", &self.on_upgrade.is_some())
            .finish()
    }
}
