use crate::{
    errors::Error,
    http::{
        headers::HeaderBag,
        types::{ContentType, Method, Uri, Version},
    },
    routing::route::Route,
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::{net::SocketAddr, sync::Arc};

/// Parameters captured from the path, decoded from a JSON body or bound explicitly.
pub type Parameters = Map<String, Value>;

/// A structured HTTP request.
///
/// Built once per connection by the
/// [`RequestTransport`](crate::transport::RequestTransport), then handed by
/// value through the middleware pipeline. The router fills in the matched
/// [`Route`], the merged [parameters](Self::parameters) and the requested
/// [format](Self::format) before the handler sees it.
///
/// # Body parameters
///
/// When `Content-Type` is `application/json` and the body is a JSON object,
/// its members become parameters right away:
/// ```
/// use kiln::{Method, Request};
///
/// let request = Request::builder(Method::Post, "/users")
///     .header("Content-Type", "application/json")
///     .body(r#"{"name":"ada"}"#)
///     .build();
///
/// assert_eq!(request.parameter("name"), Some(&"ada".into()));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,

    headers: HeaderBag,
    body: Bytes,
    content_length: Option<usize>,

    route: Option<Arc<Route>>,
    parameters: Parameters,
    bindings: Parameters,
    format: &'static str,

    peer: Option<SocketAddr>,
}

impl Request {
    pub(crate) fn from_parts(
        method: Method,
        uri: Uri,
        version: Version,
        headers: HeaderBag,
        body: Bytes,
        peer: Option<SocketAddr>,
    ) -> Self {
        let content_length = headers.content_length();
        let mut request = Self {
            method,
            uri,
            version,
            headers,
            body,
            content_length,
            route: None,
            parameters: Parameters::new(),
            bindings: Parameters::new(),
            format: ContentType::HTML,
            peer,
        };
        request.parameters = request.body_parameters();
        request
    }

    /// Starts a request for `target` (`/path?query`) on `localhost`.
    pub fn builder(method: Method, target: &str) -> RequestBuilder {
        let (path, query) = split_target(target);
        RequestBuilder {
            method,
            uri: Uri {
                scheme: "http".into(),
                host: "localhost".into(),
                port: None,
                path,
                query,
                fragment: None,
            },
            headers: HeaderBag::new(),
            body: Bytes::new(),
        }
    }

    #[inline]
    pub const fn method(&self) -> Method {
        self.method
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[inline]
    pub const fn version(&self) -> Version {
        self.version
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
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Declared `Content-Length`, if it was a single numeric value.
    #[inline]
    pub const fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.uri.path
    }

    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.uri.query.as_deref()
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.uri.host
    }

    /// Address of the client that sent the request, when it came off a socket.
    #[inline]
    pub const fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Route matched by the router, once dispatched.
    #[inline]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_deref()
    }

    #[inline]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Binds a value that overrides any parameter of the same name at dispatch.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    #[inline]
    pub fn bindings(&self) -> &Parameters {
        &self.bindings
    }

    /// Content type the client asked the response to be in.
    #[inline]
    pub const fn format(&self) -> &'static str {
        self.format
    }

    pub fn is_json(&self) -> bool {
        self.headers
            .content_type()
            .is_some_and(|value| ContentType::essence(value) == ContentType::JSON)
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    fn body_parameters(&self) -> Parameters {
        if !self.is_json() || self.body.is_empty() {
            return Parameters::new();
        }

        match serde_json::from_slice(&self.body) {
            Ok(Value::Object(map)) => map,
            _ => Parameters::new(),
        }
    }

    pub(crate) fn set_route(&mut self, route: Arc<Route>) {
        self.route = Some(route);
    }

    pub(crate) fn set_parameters(&mut self, parameters: Parameters) {
        self.parameters = parameters;
    }

    pub(crate) fn set_format(&mut self, format: &'static str) {
        self.format = format;
    }
}

pub(crate) fn split_target(target: &str) -> (String, Option<String>) {
    match target.split_once('?') {
        Some((path, query)) if !path.is_empty() => (path.to_string(), Some(query.to_string())),
        _ => (target.to_string(), None),
    }
}

/// Assembles a [`Request`] outside of the wire transport, for clients and tests.
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderBag,
    body: Bytes,
}

impl RequestBuilder {
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Sets the body together with its `Content-Length`.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.headers
            .set("content-length", &self.body.len().to_string());
        self
    }

    pub fn build(self) -> Request {
        Request::from_parts(
            self.method,
            self.uri,
            Version::Http11,
            self.headers,
            self.body,
            None,
        )
    }
}
